//! Vehicle state machine.
//!
//! A vehicle owns its state and only changes it through commands
//! ([`Vehicle::cruise`], [`Vehicle::take_rest`], [`Vehicle::head_for_customer`])
//! or through time passing in [`Vehicle::advance`]. The simulator never sets
//! the state directly.

use bevy_ecs::prelude::Component;
use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::error::TransitionError;
use crate::ids::{CustomerId, VehicleId};
use crate::spatial::cell_serde;
use crate::store::Tracked;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleState {
    Idle,
    Cruising,
    HeadingToCustomer,
    OffDuty,
    Exited,
}

impl VehicleState {
    /// States a dispatch or match command may interrupt.
    fn accepts_commands(self) -> bool {
        matches!(self, VehicleState::Idle | VehicleState::Cruising)
    }
}

/// Accumulated performance metrics, reported when the vehicle exits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleScore {
    pub idle_secs: u64,
    pub cruising_secs: u64,
    pub pickup_secs: u64,
    pub off_duty_secs: u64,
    pub pickups: u64,
}

impl VehicleScore {
    /// Score components in record order.
    pub fn components(&self) -> Vec<f64> {
        vec![
            self.idle_secs as f64,
            self.cruising_secs as f64,
            self.pickup_secs as f64,
            self.off_duty_secs as f64,
            self.pickups as f64,
        ]
    }

    fn accrue(&mut self, state: VehicleState, secs: u64) {
        match state {
            VehicleState::Idle => self.idle_secs += secs,
            VehicleState::Cruising => self.cruising_secs += secs,
            VehicleState::HeadingToCustomer => self.pickup_secs += secs,
            VehicleState::OffDuty => self.off_duty_secs += secs,
            VehicleState::Exited => {}
        }
    }
}

#[derive(Debug, Clone, Component)]
pub struct Vehicle {
    id: VehicleId,
    location: CellIndex,
    state: VehicleState,
    /// Cells of the current cruise; a single target cell while heading to a customer.
    route: Vec<CellIndex>,
    activity_elapsed: u64,
    activity_duration: u64,
    assigned_customer: Option<CustomerId>,
    time_in_market: u64,
    shift: Option<u64>,
    score: VehicleScore,
}

impl Vehicle {
    /// A new idle vehicle at `location`.
    pub fn new(id: VehicleId, location: CellIndex) -> Self {
        Self {
            id,
            location,
            state: VehicleState::Idle,
            route: Vec::new(),
            activity_elapsed: 0,
            activity_duration: 0,
            assigned_customer: None,
            time_in_market: 0,
            shift: None,
            score: VehicleScore::default(),
        }
    }

    /// Exit the market once `shift` seconds have been spent in it.
    pub fn with_shift(mut self, shift: Option<u64>) -> Self {
        self.shift = shift;
        self
    }

    pub fn id(&self) -> &VehicleId {
        &self.id
    }

    pub fn location(&self) -> CellIndex {
        self.location
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn route(&self) -> &[CellIndex] {
        &self.route
    }

    pub fn assigned_customer(&self) -> Option<&CustomerId> {
        self.assigned_customer.as_ref()
    }

    /// Seconds left in the current cruise, pickup or rest.
    pub fn remaining_activity(&self) -> u64 {
        match self.state {
            VehicleState::Idle | VehicleState::Exited => 0,
            _ => self.activity_duration.saturating_sub(self.activity_elapsed),
        }
    }

    pub fn time_in_market(&self) -> u64 {
        self.time_in_market
    }

    pub fn exited_market(&self) -> bool {
        self.state == VehicleState::Exited
    }

    pub fn score(&self) -> Vec<f64> {
        self.score.components()
    }

    pub fn score_breakdown(&self) -> &VehicleScore {
        &self.score
    }

    /// Drive towards a customer's origin, arriving after `duration` seconds.
    pub fn head_for_customer(
        &mut self,
        origin: CellIndex,
        duration: u64,
        customer_id: CustomerId,
    ) -> Result<(), TransitionError> {
        self.ensure_accepts("head for a customer")?;
        self.begin(VehicleState::HeadingToCustomer, vec![origin], duration);
        self.assigned_customer = Some(customer_id);
        Ok(())
    }

    /// Cruise along `route`, reaching its last cell after `duration` seconds.
    pub fn cruise(&mut self, route: Vec<CellIndex>, duration: u64) -> Result<(), TransitionError> {
        self.ensure_accepts("cruise")?;
        self.begin(VehicleState::Cruising, route, duration);
        self.assigned_customer = None;
        Ok(())
    }

    /// Go off duty for `duration` seconds, then become idle again.
    pub fn take_rest(&mut self, duration: u64) -> Result<(), TransitionError> {
        self.ensure_accepts("take rest")?;
        self.begin(VehicleState::OffDuty, Vec::new(), duration);
        self.assigned_customer = None;
        Ok(())
    }

    /// Let `dt` seconds pass. Activities that finish mid-step hand the rest of
    /// the step to the idle state; reaching the shift limit exits the market.
    pub fn advance(&mut self, dt: u64) {
        if self.state == VehicleState::Exited {
            return;
        }

        let mut remaining = dt;
        while remaining > 0 && self.state != VehicleState::Idle {
            let left = self.activity_duration.saturating_sub(self.activity_elapsed);
            let spent = left.min(remaining);
            self.score.accrue(self.state, spent);
            self.activity_elapsed += spent;
            remaining -= spent;

            if self.activity_elapsed >= self.activity_duration {
                self.finish_activity();
            } else if self.state == VehicleState::Cruising {
                self.follow_route();
            }
        }
        self.score.accrue(self.state, remaining);

        self.time_in_market = self.time_in_market.saturating_add(dt);
        if self.shift.is_some_and(|shift| self.time_in_market >= shift) {
            self.state = VehicleState::Exited;
            self.route.clear();
            self.assigned_customer = None;
        }
    }

    fn ensure_accepts(&self, command: &'static str) -> Result<(), TransitionError> {
        if self.state.accepts_commands() {
            Ok(())
        } else {
            Err(TransitionError::Vehicle {
                state: self.state,
                command,
            })
        }
    }

    fn begin(&mut self, state: VehicleState, route: Vec<CellIndex>, duration: u64) {
        self.state = state;
        self.route = route;
        self.activity_elapsed = 0;
        self.activity_duration = duration;
    }

    fn finish_activity(&mut self) {
        match self.state {
            VehicleState::Cruising => {
                if let Some(&last) = self.route.last() {
                    self.location = last;
                }
            }
            VehicleState::HeadingToCustomer => {
                if let Some(&origin) = self.route.first() {
                    self.location = origin;
                }
                self.score.pickups += 1;
                self.assigned_customer = None;
            }
            VehicleState::OffDuty | VehicleState::Idle | VehicleState::Exited => {}
        }
        self.state = VehicleState::Idle;
        self.route.clear();
        self.activity_elapsed = 0;
        self.activity_duration = 0;
    }

    /// Place the vehicle on the route cell matching the elapsed share of the cruise.
    fn follow_route(&mut self) {
        if self.route.is_empty() || self.activity_duration == 0 {
            return;
        }
        let last = self.route.len() - 1;
        let idx = (self.activity_elapsed as u128 * last as u128 / self.activity_duration as u128) as usize;
        self.location = self.route[idx.min(last)];
    }
}

/// Read-only view of a vehicle handed to the dispatch policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    #[serde(with = "cell_serde")]
    pub location: CellIndex,
    pub state: VehicleState,
    pub assigned_customer: Option<CustomerId>,
    pub remaining_secs: u64,
    pub time_in_market: u64,
}

impl Tracked for Vehicle {
    type Id = VehicleId;
    type Snapshot = VehicleSnapshot;

    fn id(&self) -> &VehicleId {
        &self.id
    }

    fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id.clone(),
            location: self.location,
            state: self.state,
            assigned_customer: self.assigned_customer.clone(),
            remaining_secs: self.remaining_activity(),
            time_in_market: self.time_in_market,
        }
    }
}
