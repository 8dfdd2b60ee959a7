//! Simulator configuration.

use crate::error::SimError;

/// Default timestep: one simulated minute.
const DEFAULT_TIMESTEP_SECS: u64 = 60;

/// Default off-duty base duration: one hour. Samples land in `[30 min, 90 min)`.
const DEFAULT_OFF_DURATION_SECS: u64 = 60 * 60;

/// Default mean of the pickup-duration distribution: five minutes.
const DEFAULT_PICKUP_DURATION_MEAN_SECS: f64 = 5.0 * 60.0;

/// Parameters the [`crate::Simulator`] is built from.
///
/// Times are in seconds. `start_time` is a Unix timestamp so the hourly
/// heartbeat lines up with wall-clock hours.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub start_time: u64,
    pub timestep: u64,
    /// Base of the off-duty rest distribution (uniform over `[base/2, base*3/2)`).
    pub off_duration: u64,
    /// Mean of the exponential pickup-duration distribution.
    pub pickup_duration_mean: f64,
    /// Time in market after which a vehicle exits. `None` keeps vehicles forever.
    pub vehicle_shift: Option<u64>,
    /// Seed for the simulator's random source.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_time: 0,
            timestep: DEFAULT_TIMESTEP_SECS,
            off_duration: DEFAULT_OFF_DURATION_SECS,
            pickup_duration_mean: DEFAULT_PICKUP_DURATION_MEAN_SECS,
            vehicle_shift: None,
            seed: 42,
        }
    }
}

impl SimConfig {
    pub fn with_start_time(mut self, start_time: u64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_timestep(mut self, timestep: u64) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_off_duration(mut self, off_duration: u64) -> Self {
        self.off_duration = off_duration;
        self
    }

    pub fn with_pickup_duration_mean(mut self, mean: f64) -> Self {
        self.pickup_duration_mean = mean;
        self
    }

    pub fn with_vehicle_shift(mut self, shift: u64) -> Self {
        self.vehicle_shift = Some(shift);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check the parameters the simulator cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.timestep == 0 {
            return Err(SimError::ZeroTimestep);
        }
        if self.off_duration == 0 {
            return Err(SimError::ZeroOffDuration);
        }
        if !(self.pickup_duration_mean.is_finite() && self.pickup_duration_mean > 0.0) {
            return Err(SimError::InvalidPickupMean {
                mean: self.pickup_duration_mean,
            });
        }
        Ok(())
    }
}
