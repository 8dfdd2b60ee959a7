//! Routing engines: trait abstraction for route + trip-time backends.
//!
//! The simulator issues one batched [`RoutingEngine::route`] call per dispatch
//! batch and reads [`RoutingEngine::cached_route`] for commands that reference a
//! previously resolved origin/destination pair.
//!
//! [`H3GridRoutingEngine`] is the built-in backend: H3 grid paths, Haversine
//! distance at a fixed average speed, and an LRU cache keyed by the directional
//! `(origin, destination)` cell pair.

use std::num::NonZeroUsize;

use h3o::CellIndex;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spatial::{cell_vec_serde, distance_km_between_cells, grid_path};

/// Directional cache key.
pub type RouteKey = (CellIndex, CellIndex);

/// A route and the time it takes to drive it, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResult {
    #[serde(with = "cell_vec_serde")]
    pub route: Vec<CellIndex>,
    pub triptime: u64,
}

impl RouteResult {
    pub fn new(route: Vec<CellIndex>, triptime: u64) -> Self {
        Self { route, triptime }
    }

    /// No drivable route; dispatchers treat it as a no-op.
    pub fn unreachable() -> Self {
        Self {
            route: Vec::new(),
            triptime: 0,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.triptime == 0
    }
}

pub trait RoutingEngine: Send {
    /// Resolve every pair. The result has the same length and order as `od_pairs`.
    fn route(&mut self, od_pairs: &[RouteKey]) -> Vec<RouteResult>;

    /// A previously resolved route, without computing anything new.
    fn cached_route(&self, origin: CellIndex, destination: CellIndex) -> Option<RouteResult>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRoutingConfig {
    /// Average driving speed used to turn distance into trip time.
    pub speed_kmh: f64,
    pub cache_capacity: usize,
}

impl Default for GridRoutingConfig {
    fn default() -> Self {
        Self {
            speed_kmh: 40.0,
            cache_capacity: 20_000,
        }
    }
}

pub struct H3GridRoutingEngine {
    config: GridRoutingConfig,
    cache: LruCache<RouteKey, RouteResult>,
}

impl H3GridRoutingEngine {
    pub fn new(config: GridRoutingConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            cache: LruCache::new(capacity),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cached pairs, most recently used first.
    pub fn cached_keys(&self) -> Vec<RouteKey> {
        self.cache.iter().map(|(key, _)| *key).collect()
    }

    fn compute(&self, from: CellIndex, to: CellIndex) -> RouteResult {
        if from == to {
            return RouteResult::new(vec![from], 0);
        }
        let Some(cells) = grid_path(from, to) else {
            return RouteResult::unreachable();
        };
        let distance_km: f64 = cells
            .windows(2)
            .map(|hop| distance_km_between_cells(hop[0], hop[1]))
            .sum();
        let secs = (distance_km / self.config.speed_kmh * 3600.0).round();
        // Distinct cells never collapse into a zero-length trip.
        let triptime = if secs.is_finite() { (secs as u64).max(1) } else { 0 };
        RouteResult::new(cells, triptime)
    }
}

impl Default for H3GridRoutingEngine {
    fn default() -> Self {
        Self::new(GridRoutingConfig::default())
    }
}

impl RoutingEngine for H3GridRoutingEngine {
    fn route(&mut self, od_pairs: &[RouteKey]) -> Vec<RouteResult> {
        let mut hits = 0usize;
        let mut results = Vec::with_capacity(od_pairs.len());
        for &(from, to) in od_pairs {
            if let Some(cached) = self.cache.get(&(from, to)) {
                hits += 1;
                results.push(cached.clone());
                continue;
            }
            let result = self.compute(from, to);
            // Only drivable routes are cached; failures are retried.
            if !result.route.is_empty() {
                self.cache.put((from, to), result.clone());
            }
            results.push(result);
        }
        debug!(pairs = od_pairs.len(), cache_hits = hits, "routed batch");
        results
    }

    fn cached_route(&self, origin: CellIndex, destination: CellIndex) -> Option<RouteResult> {
        self.cache.peek(&(origin, destination)).cloned()
    }
}
