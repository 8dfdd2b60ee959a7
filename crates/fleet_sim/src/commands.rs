//! Commands an external policy issues between ticks.

use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::ids::{CustomerId, VehicleId};
use crate::spatial::cell_serde;

/// Pair one vehicle with one waiting customer. `duration` is both the vehicle's
/// ETA to the pickup and the customer's wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCommand {
    pub vehicle_id: VehicleId,
    pub customer_id: CustomerId,
    pub duration: u64,
}

impl MatchCommand {
    pub fn new(
        vehicle_id: impl Into<VehicleId>,
        customer_id: impl Into<CustomerId>,
        duration: u64,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            customer_id: customer_id.into(),
            duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchAction {
    /// Rest for a randomly sampled duration.
    OffDuty,
    /// Cruise along a route the routing engine already cached.
    CachedRoute {
        #[serde(with = "cell_serde")]
        origin: CellIndex,
        #[serde(with = "cell_serde")]
        destination: CellIndex,
    },
    /// Cruise from the vehicle's current location to `destination`.
    Destination {
        #[serde(with = "cell_serde")]
        destination: CellIndex,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCommand {
    pub vehicle_id: VehicleId,
    pub action: DispatchAction,
}

impl DispatchCommand {
    pub fn off_duty(vehicle_id: impl Into<VehicleId>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            action: DispatchAction::OffDuty,
        }
    }

    pub fn cached_route(
        vehicle_id: impl Into<VehicleId>,
        origin: CellIndex,
        destination: CellIndex,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            action: DispatchAction::CachedRoute {
                origin,
                destination,
            },
        }
    }

    pub fn destination(vehicle_id: impl Into<VehicleId>, destination: CellIndex) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            action: DispatchAction::Destination { destination },
        }
    }
}
