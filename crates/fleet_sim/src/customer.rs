//! Customer state machine.
//!
//! Every non-terminal state runs a timer: patience while `Waiting`, the pickup
//! ETA while `WaitingForVehicle`, the trip time while `Riding`. When a timer
//! runs out the customer moves on (`Disappeared`, `Riding`, `Arrived`).

use bevy_ecs::prelude::Component;
use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::ids::CustomerId;
use crate::spatial::cell_serde;
use crate::store::Tracked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerState {
    Waiting,
    WaitingForVehicle,
    Riding,
    Arrived,
    Disappeared,
}

impl CustomerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, CustomerState::Arrived | CustomerState::Disappeared)
    }
}

#[derive(Debug, Clone, Component)]
pub struct Customer {
    id: CustomerId,
    origin: CellIndex,
    destination: CellIndex,
    state: CustomerState,
    requested_at: u64,
    trip_time: u64,
    elapsed: u64,
    timer: u64,
    waited: u64,
}

impl Customer {
    /// A new request. The customer gives up after `patience` seconds unless
    /// matched; once picked up the ride lasts `trip_time` seconds.
    pub fn new(
        id: CustomerId,
        origin: CellIndex,
        destination: CellIndex,
        requested_at: u64,
        patience: u64,
        trip_time: u64,
    ) -> Self {
        Self {
            id,
            origin,
            destination,
            state: CustomerState::Waiting,
            requested_at,
            trip_time,
            elapsed: 0,
            timer: patience,
            waited: 0,
        }
    }

    pub fn id(&self) -> &CustomerId {
        &self.id
    }

    pub fn origin(&self) -> CellIndex {
        self.origin
    }

    pub fn destination(&self) -> CellIndex {
        self.destination
    }

    pub fn state(&self) -> CustomerState {
        self.state
    }

    pub fn requested_at(&self) -> u64 {
        self.requested_at
    }

    pub fn trip_time(&self) -> u64 {
        self.trip_time
    }

    /// Total time spent before pickup (unmatched plus waiting for the vehicle).
    pub fn waited(&self) -> u64 {
        self.waited
    }

    pub fn is_arrived(&self) -> bool {
        self.state == CustomerState::Arrived
    }

    pub fn is_disappeared(&self) -> bool {
        self.state == CustomerState::Disappeared
    }

    /// A vehicle is on its way and arrives after `duration` seconds.
    pub fn wait_for_vehicle(&mut self, duration: u64) -> Result<(), TransitionError> {
        if self.state != CustomerState::Waiting {
            return Err(TransitionError::Customer {
                state: self.state,
                command: "wait for a vehicle",
            });
        }
        self.enter(CustomerState::WaitingForVehicle, duration);
        Ok(())
    }

    pub fn advance(&mut self, dt: u64) {
        let mut remaining = dt;
        while remaining > 0 && !self.state.is_terminal() {
            let left = self.timer.saturating_sub(self.elapsed);
            let spent = left.min(remaining);
            self.elapsed += spent;
            remaining -= spent;
            if matches!(
                self.state,
                CustomerState::Waiting | CustomerState::WaitingForVehicle
            ) {
                self.waited += spent;
            }

            if self.elapsed >= self.timer {
                self.on_timer_expired();
            }
        }
    }

    fn on_timer_expired(&mut self) {
        match self.state {
            CustomerState::Waiting => self.enter(CustomerState::Disappeared, 0),
            CustomerState::WaitingForVehicle => self.enter(CustomerState::Riding, self.trip_time),
            CustomerState::Riding => self.enter(CustomerState::Arrived, 0),
            CustomerState::Arrived | CustomerState::Disappeared => {}
        }
    }

    fn enter(&mut self, state: CustomerState, timer: u64) {
        self.state = state;
        self.elapsed = 0;
        self.timer = timer;
    }
}

/// Read-only view of a customer handed to the dispatch policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: CustomerId,
    #[serde(with = "cell_serde")]
    pub origin: CellIndex,
    #[serde(with = "cell_serde")]
    pub destination: CellIndex,
    pub state: CustomerState,
    pub requested_at: u64,
    pub waited_secs: u64,
}

impl Tracked for Customer {
    type Id = CustomerId;
    type Snapshot = CustomerSnapshot;

    fn id(&self) -> &CustomerId {
        &self.id
    }

    fn snapshot(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            id: self.id.clone(),
            origin: self.origin,
            destination: self.destination,
            state: self.state,
            requested_at: self.requested_at,
            waited_secs: self.waited,
        }
    }
}
