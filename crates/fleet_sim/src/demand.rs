//! Demand generators: produce the customers arriving within a tick.

use h3o::Resolution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::customer::Customer;
use crate::distributions::ExponentialDuration;
use crate::ids::CustomerId;
use crate::spatial::{distance_km_between_cells, Bounds, DEFAULT_RESOLUTION};

pub trait DemandGenerator: Send {
    /// Customers whose request falls in `[current_time, current_time + timestep)`.
    fn generate(&mut self, current_time: u64, timestep: u64) -> Vec<Customer>;

    /// Forget per-episode state. Called when the simulator is reset.
    fn reset(&mut self) {}
}

/// A generator that never produces anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDemand;

impl DemandGenerator for NoDemand {
    fn generate(&mut self, _current_time: u64, _timestep: u64) -> Vec<Customer> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoissonDemandConfig {
    /// Expected requests per simulated hour.
    pub rate_per_hour: f64,
    /// Area origins and destinations are drawn from.
    pub bounds: Bounds,
    pub resolution: Resolution,
    /// Patience is drawn uniformly from `[min_patience, max_patience]` seconds.
    pub min_patience: u64,
    pub max_patience: u64,
    /// Average speed used to estimate the ride time.
    pub speed_kmh: f64,
    pub min_trip_time: u64,
    pub seed: u64,
}

impl Default for PoissonDemandConfig {
    fn default() -> Self {
        Self {
            rate_per_hour: 120.0,
            bounds: Bounds::BERLIN,
            resolution: DEFAULT_RESOLUTION,
            min_patience: 120,
            max_patience: 900,
            speed_kmh: 30.0,
            min_trip_time: 60,
            seed: 0,
        }
    }
}

/// Poisson arrivals with uniformly placed origins and destinations.
///
/// Inter-arrival gaps are exponential with mean `3600 / rate_per_hour` seconds,
/// drawn from a seeded RNG so the same seed yields the same customers.
pub struct PoissonDemandGenerator {
    config: PoissonDemandConfig,
    rng: StdRng,
    next_arrival: Option<f64>,
    issued: u64,
}

impl PoissonDemandGenerator {
    pub fn new(config: PoissonDemandConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            next_arrival: None,
            issued: 0,
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    fn sample_gap(&mut self) -> f64 {
        if self.config.rate_per_hour <= 0.0 {
            return f64::INFINITY;
        }
        ExponentialDuration::new(3600.0 / self.config.rate_per_hour).sample(&mut self.rng)
    }

    fn spawn(&mut self, requested_at: u64) -> Option<Customer> {
        let origin = self
            .config
            .bounds
            .sample_cell(&mut self.rng, self.config.resolution)?;
        let destination = self
            .config
            .bounds
            .sample_cell(&mut self.rng, self.config.resolution)?;
        let patience = if self.config.max_patience > self.config.min_patience {
            self.rng
                .gen_range(self.config.min_patience..=self.config.max_patience)
        } else {
            self.config.min_patience
        };
        let distance_km = distance_km_between_cells(origin, destination);
        let ride_secs = (distance_km / self.config.speed_kmh * 3600.0).round();
        let trip_time = if ride_secs.is_finite() {
            (ride_secs as u64).max(self.config.min_trip_time)
        } else {
            self.config.min_trip_time
        };

        let id = CustomerId::new(format!("c{}", self.issued));
        self.issued += 1;
        Some(Customer::new(
            id,
            origin,
            destination,
            requested_at,
            patience,
            trip_time,
        ))
    }
}

impl DemandGenerator for PoissonDemandGenerator {
    fn generate(&mut self, current_time: u64, timestep: u64) -> Vec<Customer> {
        let start = current_time as f64;
        let end = current_time.saturating_add(timestep) as f64;
        let mut next = match self.next_arrival {
            Some(next) if next >= start => next,
            _ => start + self.sample_gap(),
        };

        let mut arrivals = Vec::new();
        while next < end {
            if let Some(customer) = self.spawn(next as u64) {
                arrivals.push(customer);
            }
            next += self.sample_gap();
        }
        self.next_arrival = Some(next);

        debug!(current_time, arrivals = arrivals.len(), "generated demand");
        arrivals
    }

    fn reset(&mut self) {
        self.next_arrival = None;
    }
}
