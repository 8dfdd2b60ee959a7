use crate::customer::CustomerState;
use crate::ids::VehicleId;
use crate::vehicle::VehicleState;

/// Errors returned by fallible simulator operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// The timestep must advance time.
    #[error("timestep must be greater than zero")]
    ZeroTimestep,

    /// Off-duty sampling needs a positive base duration.
    #[error("off-duty base duration must be greater than zero")]
    ZeroOffDuration,

    /// Pickup-duration sampling needs a positive, finite mean.
    #[error("pickup duration mean must be positive and finite, got {mean}")]
    InvalidPickupMean { mean: f64 },

    /// `populate_vehicle` was called with an id that is already tracked.
    #[error("vehicle '{id}' is already tracked")]
    DuplicateVehicle { id: VehicleId },
}

/// A command an entity's state machine refused to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("vehicle in state {state:?} cannot {command}")]
    Vehicle {
        state: VehicleState,
        command: &'static str,
    },

    #[error("customer in state {state:?} cannot {command}")]
    Customer {
        state: CustomerState,
        command: &'static str,
    },
}
