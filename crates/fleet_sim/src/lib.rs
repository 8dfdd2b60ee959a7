//! Discrete-time fleet dispatch simulator.
//!
//! The [`simulator::Simulator`] advances simulated time in fixed steps, owns the
//! vehicle and customer stores, pulls new demand each tick and applies match and
//! dispatch commands issued by an external policy between ticks.

pub mod clock;
pub mod commands;
pub mod config;
pub mod customer;
pub mod demand;
pub mod distributions;
pub mod error;
pub mod ids;
pub mod routing;
pub mod simulator;
pub mod spatial;
pub mod store;
pub mod telemetry;
pub mod vehicle;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use commands::{DispatchAction, DispatchCommand, MatchCommand};
pub use config::SimConfig;
pub use error::{SimError, TransitionError};
pub use ids::{CustomerId, VehicleId};
pub use simulator::Simulator;
