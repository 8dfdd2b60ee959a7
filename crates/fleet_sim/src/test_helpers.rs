//! Test helpers: shared cells and scripted collaborators.
//!
//! [`RecordingRoutingEngine`] answers from fixed trip times and records every
//! batched call; [`ScriptedDemand`] replays a fixed list of customers at their
//! request times.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use h3o::{CellIndex, LatLng, Resolution};

use crate::customer::Customer;
use crate::demand::DemandGenerator;
use crate::ids::CustomerId;
use crate::routing::{RouteKey, RouteResult, RoutingEngine};

/// A standard test cell used across test files for consistency.
/// This is a valid H3 cell at resolution 10.
pub const TEST_CELL: u64 = 0x8a1fb46622dffff;

/// Get the test cell as a `CellIndex`.
///
/// # Panics
///
/// Panics if the test cell constant is invalid (should never happen).
pub fn test_cell() -> CellIndex {
    CellIndex::try_from(TEST_CELL).expect("TEST_CELL should be a valid H3 cell")
}

/// A cell adjacent to [`test_cell`].
pub fn test_neighbor_cell() -> CellIndex {
    test_cell()
        .grid_disk::<Vec<_>>(1)
        .into_iter()
        .find(|c| *c != test_cell())
        .expect("test cell should have neighbors")
}

/// A cell within two rings of [`test_cell`], distinct from it and from [`test_neighbor_cell`].
pub fn test_distant_cell() -> CellIndex {
    test_cell()
        .grid_disk::<Vec<_>>(2)
        .into_iter()
        .find(|c| *c != test_cell() && *c != test_neighbor_cell())
        .expect("test cell should have distant neighbors")
}

/// The resolution-9 cell containing `(lat, lng)`.
///
/// # Panics
///
/// Panics on coordinates H3 rejects.
pub fn cell(lat: f64, lng: f64) -> CellIndex {
    LatLng::new(lat, lng)
        .expect("valid coordinates")
        .to_cell(Resolution::Nine)
}

/// A waiting customer requested at `requested_at`.
pub fn customer_at(id: &str, origin: CellIndex, requested_at: u64, patience: u64, trip_time: u64) -> Customer {
    Customer::new(
        CustomerId::from(id),
        origin,
        test_distant_cell(),
        requested_at,
        patience,
        trip_time,
    )
}

/// Every batch the engine received, in call order. Cloned handles share the log.
#[derive(Debug, Clone, Default)]
pub struct RoutingCalls(Arc<Mutex<Vec<Vec<RouteKey>>>>);

impl RoutingCalls {
    pub fn count(&self) -> usize {
        self.all().len()
    }

    pub fn all(&self) -> Vec<Vec<RouteKey>> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Vec<RouteKey>> {
        self.all().pop()
    }

    fn push(&self, batch: Vec<RouteKey>) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(batch);
        }
    }
}

/// Routing engine with scripted trip times per destination.
///
/// Routes are `[origin, destination]`; unknown destinations use the default
/// trip time. Cached routes are whatever was registered with [`Self::with_cached`].
#[derive(Debug, Clone)]
pub struct RecordingRoutingEngine {
    calls: RoutingCalls,
    default_triptime: u64,
    triptimes: HashMap<CellIndex, u64>,
    cache: HashMap<RouteKey, RouteResult>,
}

impl RecordingRoutingEngine {
    pub fn new(default_triptime: u64) -> Self {
        Self {
            calls: RoutingCalls::default(),
            default_triptime,
            triptimes: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    pub fn with_triptime(mut self, destination: CellIndex, triptime: u64) -> Self {
        self.triptimes.insert(destination, triptime);
        self
    }

    pub fn with_cached(mut self, origin: CellIndex, destination: CellIndex, result: RouteResult) -> Self {
        self.cache.insert((origin, destination), result);
        self
    }

    /// Handle to the call log that stays valid after the engine is boxed.
    pub fn calls(&self) -> RoutingCalls {
        self.calls.clone()
    }
}

impl RoutingEngine for RecordingRoutingEngine {
    fn route(&mut self, od_pairs: &[RouteKey]) -> Vec<RouteResult> {
        self.calls.push(od_pairs.to_vec());
        od_pairs
            .iter()
            .map(|&(origin, destination)| {
                let triptime = self
                    .triptimes
                    .get(&destination)
                    .copied()
                    .unwrap_or(self.default_triptime);
                RouteResult::new(vec![origin, destination], triptime)
            })
            .collect()
    }

    fn cached_route(&self, origin: CellIndex, destination: CellIndex) -> Option<RouteResult> {
        self.cache.get(&(origin, destination)).cloned()
    }
}

/// Demand replaying a fixed customer list at each customer's request time.
#[derive(Debug, Default)]
pub struct ScriptedDemand {
    pending: Vec<Customer>,
}

impl ScriptedDemand {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self { pending: customers }
    }
}

impl DemandGenerator for ScriptedDemand {
    fn generate(&mut self, current_time: u64, timestep: u64) -> Vec<Customer> {
        let end = current_time.saturating_add(timestep);
        let (due, later): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|c| c.requested_at() >= current_time && c.requested_at() < end);
        self.pending = later;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_is_resolution_ten() {
        assert_eq!(test_cell().resolution(), Resolution::Ten);
    }

    #[test]
    fn test_cells_are_distinct() {
        assert_ne!(test_cell(), test_neighbor_cell());
        assert_ne!(test_cell(), test_distant_cell());
        assert_ne!(test_neighbor_cell(), test_distant_cell());
    }

    #[test]
    fn recording_engine_logs_batches() {
        let mut engine = RecordingRoutingEngine::new(90).with_triptime(test_neighbor_cell(), 0);
        let calls = engine.calls();
        let results = engine.route(&[
            (test_cell(), test_neighbor_cell()),
            (test_cell(), test_distant_cell()),
        ]);
        assert_eq!(calls.count(), 1);
        assert_eq!(results[0].triptime, 0);
        assert_eq!(results[1].triptime, 90);
    }

    #[test]
    fn scripted_demand_releases_customers_on_time() {
        let mut demand = ScriptedDemand::new(vec![
            customer_at("c1", test_cell(), 30, 600, 300),
            customer_at("c2", test_cell(), 90, 600, 300),
        ]);
        let first = demand.generate(0, 60);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id().as_str(), "c1");
        assert!(demand.generate(0, 60).is_empty());
        assert_eq!(demand.generate(60, 60).len(), 1);
    }
}
