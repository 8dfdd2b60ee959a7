//! Fixed-step simulation clock.

use chrono::{DateTime, Utc};

/// One simulated hour in seconds.
pub const ONE_HOUR_SECS: u64 = 60 * 60;

/// Simulated time plus the increment applied by each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    now: u64,
    timestep: u64,
}

impl SimulationClock {
    pub fn new(start_time: u64, timestep: u64) -> Self {
        Self {
            now: start_time,
            timestep,
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn set_now(&mut self, now: u64) {
        self.now = now;
    }

    pub fn set_timestep(&mut self, timestep: u64) {
        self.timestep = timestep;
    }

    /// The half-open interval `[now, now + timestep)` the current tick covers.
    pub fn window(&self) -> (u64, u64) {
        (self.now, self.now.saturating_add(self.timestep))
    }

    /// Move time forward by one timestep and return the new time.
    pub fn advance(&mut self) -> u64 {
        self.now = self.now.saturating_add(self.timestep);
        self.now
    }

    pub fn is_hour_boundary(&self) -> bool {
        self.now % ONE_HOUR_SECS == 0
    }

    /// Current time read as a Unix timestamp.
    pub fn wall_clock(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.now).ok()?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_by_timestep() {
        let mut clock = SimulationClock::new(100, 60);
        assert_eq!(clock.window(), (100, 160));
        assert_eq!(clock.advance(), 160);
        assert_eq!(clock.advance(), 220);
        assert_eq!(clock.now(), 220);
    }

    #[test]
    fn hour_boundary_is_exact_multiple() {
        let mut clock = SimulationClock::new(ONE_HOUR_SECS - 60, 60);
        assert!(!clock.is_hour_boundary());
        clock.advance();
        assert!(clock.is_hour_boundary());
        clock.advance();
        assert!(!clock.is_hour_boundary());
    }

    #[test]
    fn wall_clock_reads_unix_seconds() {
        let clock = SimulationClock::new(1_700_000_400, 60);
        let ts = clock.wall_clock().expect("valid timestamp");
        assert_eq!(ts.timestamp(), 1_700_000_400);
    }
}
