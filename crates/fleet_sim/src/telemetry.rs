//! Telemetry: vehicle score records and per-state counts.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::customer::CustomerState;
use crate::ids::VehicleId;
use crate::vehicle::VehicleState;

/// One vehicle's final score, stamped with the time of the tick it exited in.
/// Field order is `time, vehicle_id, score...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub time: u64,
    pub vehicle_id: VehicleId,
    pub score: Vec<f64>,
}

impl ScoreRecord {
    pub fn new(time: u64, vehicle_id: VehicleId, score: Vec<f64>) -> Self {
        Self {
            time,
            vehicle_id,
            score,
        }
    }
}

impl fmt::Display for ScoreRecord {
    /// Comma-separated, in field order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.time, self.vehicle_id)?;
        for component in &self.score {
            write!(f, ",{component}")?;
        }
        Ok(())
    }
}

/// Side channel collecting score records in emission order.
#[derive(Debug, Default)]
pub struct ScoreLog {
    records: Vec<ScoreRecord>,
}

impl ScoreLog {
    pub fn record(&mut self, record: ScoreRecord) {
        info!(
            target: "fleet_sim::score",
            time = record.time,
            vehicle_id = %record.vehicle_id,
            score = %record,
            "vehicle score"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hand over every record collected so far.
    pub fn drain(&mut self) -> Vec<ScoreRecord> {
        std::mem::take(&mut self.records)
    }
}

/// Aggregated entity counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimCounts {
    pub vehicles_idle: usize,
    pub vehicles_cruising: usize,
    pub vehicles_heading_to_customer: usize,
    pub vehicles_off_duty: usize,
    pub customers_waiting: usize,
    pub customers_waiting_for_vehicle: usize,
    pub customers_riding: usize,
}

impl SimCounts {
    pub fn add_vehicle(&mut self, state: VehicleState) {
        match state {
            VehicleState::Idle => self.vehicles_idle += 1,
            VehicleState::Cruising => self.vehicles_cruising += 1,
            VehicleState::HeadingToCustomer => self.vehicles_heading_to_customer += 1,
            VehicleState::OffDuty => self.vehicles_off_duty += 1,
            // Exited vehicles are removed in the tick they exit.
            VehicleState::Exited => {}
        }
    }

    pub fn add_customer(&mut self, state: CustomerState) {
        match state {
            CustomerState::Waiting => self.customers_waiting += 1,
            CustomerState::WaitingForVehicle => self.customers_waiting_for_vehicle += 1,
            CustomerState::Riding => self.customers_riding += 1,
            CustomerState::Arrived | CustomerState::Disappeared => {}
        }
    }

    pub fn vehicles(&self) -> usize {
        self.vehicles_idle
            + self.vehicles_cruising
            + self.vehicles_heading_to_customer
            + self.vehicles_off_duty
    }

    pub fn customers(&self) -> usize {
        self.customers_waiting + self.customers_waiting_for_vehicle + self.customers_riding
    }
}
