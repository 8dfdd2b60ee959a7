//! Simulator: fixed-step driver for the vehicle and customer populations.
//!
//! An external control loop calls [`Simulator::step`] once per tick and, between
//! ticks, any number of [`Simulator::match_vehicles`] and
//! [`Simulator::dispatch_vehicles`] calls. Each tick runs, in order:
//!
//! 1. advance every customer, dropping the ones that arrived or disappeared;
//! 2. advance every vehicle, scoring and dropping the ones that exited;
//! 3. merge the demand generated for `[t, t + dt)` into the customer store;
//! 4. advance the clock;
//! 5. log a heartbeat on every simulated hour.
//!
//! Stores are walked in insertion order, so the same inputs and seed always give
//! the same routing batches and score records.

use h3o::CellIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn, Level};

use crate::clock::SimulationClock;
use crate::commands::{DispatchAction, DispatchCommand, MatchCommand};
use crate::config::SimConfig;
use crate::customer::{Customer, CustomerSnapshot, CustomerState};
use crate::demand::DemandGenerator;
use crate::distributions::{ExponentialDuration, OffDutyDuration};
use crate::error::SimError;
use crate::ids::{CustomerId, VehicleId};
use crate::routing::RoutingEngine;
use crate::store::{EntityStore, Tracked};
use crate::telemetry::{ScoreLog, ScoreRecord, SimCounts};
use crate::vehicle::{Vehicle, VehicleSnapshot};

pub struct Simulator {
    config: SimConfig,
    clock: SimulationClock,
    vehicles: EntityStore<Vehicle>,
    customers: EntityStore<Customer>,
    demand: Box<dyn DemandGenerator>,
    routing: Box<dyn RoutingEngine>,
    rng: StdRng,
    scores: ScoreLog,
    /// Customers merged by the most recent `step`.
    new_requests: Vec<CustomerId>,
}

impl Simulator {
    /// Build a simulator with empty stores, seeded from `config.seed`.
    pub fn new(
        config: SimConfig,
        demand: Box<dyn DemandGenerator>,
        routing: Box<dyn RoutingEngine>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let clock = SimulationClock::new(config.start_time, config.timestep);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            clock,
            vehicles: EntityStore::new(),
            customers: EntityStore::new(),
            demand,
            routing,
            rng,
            scores: ScoreLog::default(),
            new_requests: Vec::new(),
        })
    }

    /// Replace the random source used for off-duty and pickup sampling.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Start a new episode: empty both stores and optionally move the clock or
    /// change the timestep. A zero timestep is rejected and nothing changes.
    pub fn reset(&mut self, start_time: Option<u64>, timestep: Option<u64>) -> Result<(), SimError> {
        if timestep == Some(0) {
            return Err(SimError::ZeroTimestep);
        }
        if let Some(start_time) = start_time {
            self.clock.set_now(start_time);
        }
        if let Some(timestep) = timestep {
            self.clock.set_timestep(timestep);
        }
        self.vehicles.clear();
        self.customers.clear();
        self.new_requests.clear();
        self.demand.reset();
        debug!(
            now = self.clock.now(),
            timestep = self.clock.timestep(),
            "simulator reset"
        );
        Ok(())
    }

    /// Add one idle vehicle at `location`.
    pub fn populate_vehicle(
        &mut self,
        vehicle_id: impl Into<VehicleId>,
        location: CellIndex,
    ) -> Result<(), SimError> {
        let id = vehicle_id.into();
        if self.vehicles.contains(&id) {
            return Err(SimError::DuplicateVehicle { id });
        }
        let vehicle = Vehicle::new(id, location).with_shift(self.config.vehicle_shift);
        self.vehicles.insert(vehicle);
        Ok(())
    }

    /// Run one tick.
    pub fn step(&mut self) {
        let dt = self.clock.timestep();

        self.customers.retain(|customer| {
            customer.advance(dt);
            !(customer.is_arrived() || customer.is_disappeared())
        });

        let now = self.clock.now();
        let scores = &mut self.scores;
        self.vehicles.retain(|vehicle| {
            vehicle.advance(dt);
            if !vehicle.exited_market() {
                return true;
            }
            scores.record(ScoreRecord::new(now, vehicle.id().clone(), vehicle.score()));
            false
        });

        self.populate_new_customers();
        self.clock.advance();

        if self.clock.is_hour_boundary() {
            match self.clock.wall_clock() {
                Some(elapsed) => info!(%elapsed, "simulation heartbeat"),
                None => info!(now = self.clock.now(), "simulation heartbeat"),
            }
        }
        if tracing::enabled!(Level::DEBUG) {
            debug!(now = self.clock.now(), counts = ?self.counts(), "tick complete");
        }
    }

    /// Pair vehicles with waiting customers. Commands naming an unknown id, or
    /// an entity that cannot take the match, are skipped with a warning.
    pub fn match_vehicles(&mut self, commands: &[MatchCommand]) {
        for command in commands {
            if !self.vehicles.contains(&command.vehicle_id) {
                warn!(vehicle_id = %command.vehicle_id, "match skipped: unknown vehicle id");
                continue;
            }
            let Some(customer) = self.customers.get(&command.customer_id) else {
                warn!(customer_id = %command.customer_id, "match skipped: unknown customer id");
                continue;
            };
            if customer.state() != CustomerState::Waiting {
                warn!(
                    customer_id = %command.customer_id,
                    state = ?customer.state(),
                    "match skipped: customer is not waiting"
                );
                continue;
            }
            let origin = customer.origin();

            let Some(vehicle) = self.vehicles.get_mut(&command.vehicle_id) else {
                continue;
            };
            if let Err(err) =
                vehicle.head_for_customer(origin, command.duration, command.customer_id.clone())
            {
                warn!(vehicle_id = %command.vehicle_id, %err, "match skipped");
                continue;
            }
            if let Some(customer) = self.customers.get_mut(&command.customer_id) {
                if let Err(err) = customer.wait_for_vehicle(command.duration) {
                    warn!(customer_id = %command.customer_id, %err, "customer refused match");
                }
            }
        }
    }

    /// Apply dispatch commands. Off-duty and cached-route commands take effect
    /// immediately; destination commands are routed together in one batched
    /// routing call, in encounter order.
    pub fn dispatch_vehicles(&mut self, commands: &[DispatchCommand]) {
        let mut od_pairs = Vec::new();
        let mut routed = Vec::new();

        for command in commands {
            let Some(vehicle) = self.vehicles.get_mut(&command.vehicle_id) else {
                warn!(vehicle_id = %command.vehicle_id, "dispatch skipped: unknown vehicle id");
                continue;
            };

            match command.action {
                DispatchAction::OffDuty => {
                    let duration = OffDutyDuration::new(self.config.off_duration).sample(&mut self.rng);
                    if let Err(err) = vehicle.take_rest(duration) {
                        warn!(vehicle_id = %command.vehicle_id, %err, "off-duty dispatch skipped");
                    }
                }
                DispatchAction::CachedRoute {
                    origin,
                    destination,
                } => {
                    let Some(cached) = self.routing.cached_route(origin, destination) else {
                        warn!(
                            vehicle_id = %command.vehicle_id,
                            %origin,
                            %destination,
                            "dispatch skipped: route not in cache"
                        );
                        continue;
                    };
                    if let Err(err) = vehicle.cruise(cached.route, cached.triptime) {
                        warn!(vehicle_id = %command.vehicle_id, %err, "cached-route dispatch skipped");
                    }
                }
                DispatchAction::Destination { destination } => {
                    od_pairs.push((vehicle.location(), destination));
                    routed.push(command.vehicle_id.clone());
                }
            }
        }

        if od_pairs.is_empty() {
            return;
        }
        debug!(batch = od_pairs.len(), "routing dispatch batch");
        let results = self.routing.route(&od_pairs);
        if results.len() < od_pairs.len() {
            warn!(
                requested = od_pairs.len(),
                returned = results.len(),
                "routing engine returned a short batch"
            );
        }

        for (vehicle_id, result) in routed.iter().zip(results) {
            if result.is_degenerate() {
                continue;
            }
            let Some(vehicle) = self.vehicles.get_mut(vehicle_id) else {
                continue;
            };
            if let Err(err) = vehicle.cruise(result.route, result.triptime) {
                warn!(%vehicle_id, %err, "destination dispatch skipped");
            }
        }
    }

    /// Emit a score record for every tracked vehicle without removing any.
    pub fn score_active_vehicles(&mut self) {
        let now = self.clock.now();
        for vehicle in self.vehicles.iter() {
            self.scores
                .record(ScoreRecord::new(now, vehicle.id().clone(), vehicle.score()));
        }
    }

    /// Draw an off-duty duration in `[off_duration/2, off_duration*3/2)`.
    pub fn sample_off_duration(&mut self) -> u64 {
        OffDutyDuration::new(self.config.off_duration).sample(&mut self.rng)
    }

    /// Draw an exponentially distributed pickup duration.
    pub fn sample_pickup_duration(&mut self) -> f64 {
        ExponentialDuration::new(self.config.pickup_duration_mean).sample(&mut self.rng)
    }

    pub fn get_current_time(&self) -> u64 {
        self.clock.now()
    }

    pub fn get_timestep(&self) -> u64 {
        self.clock.timestep()
    }

    /// Customers merged by the latest tick that are still tracked and unmatched.
    pub fn get_new_requests(&self) -> Vec<CustomerSnapshot> {
        self.new_requests
            .iter()
            .filter_map(|id| self.customers.get(id))
            .filter(|customer| customer.state() == CustomerState::Waiting)
            .map(|customer| customer.snapshot())
            .collect()
    }

    /// Every tracked customer still waiting for a match.
    pub fn get_waiting_requests(&self) -> Vec<CustomerSnapshot> {
        self.customers
            .iter()
            .filter(|customer| customer.state() == CustomerState::Waiting)
            .map(|customer| customer.snapshot())
            .collect()
    }

    pub fn get_vehicles_state(&self) -> Vec<VehicleSnapshot> {
        self.vehicles.snapshot()
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn customer(&self, id: &CustomerId) -> Option<&Customer> {
        self.customers.get(id)
    }

    pub fn counts(&self) -> SimCounts {
        let mut counts = SimCounts::default();
        for vehicle in self.vehicles.iter() {
            counts.add_vehicle(vehicle.state());
        }
        for customer in self.customers.iter() {
            counts.add_customer(customer.state());
        }
        counts
    }

    pub fn scores(&self) -> &[ScoreRecord] {
        self.scores.records()
    }

    pub fn drain_scores(&mut self) -> Vec<ScoreRecord> {
        self.scores.drain()
    }

    pub fn routing_engine(&self) -> &dyn RoutingEngine {
        self.routing.as_ref()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    fn populate_new_customers(&mut self) {
        let (now, _) = self.clock.window();
        let arrivals = self.demand.generate(now, self.clock.timestep());
        self.new_requests.clear();
        for customer in arrivals {
            self.new_requests.push(customer.id().clone());
            self.customers.insert(customer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand::NoDemand;
    use crate::routing::{RouteKey, RouteResult};
    use crate::test_helpers::{
        customer_at, test_cell, test_distant_cell, test_neighbor_cell, RecordingRoutingEngine,
        ScriptedDemand,
    };
    use crate::vehicle::VehicleState;
    use tracing_test::traced_test;

    fn simulator(routing: RecordingRoutingEngine) -> Simulator {
        Simulator::new(
            SimConfig::default().with_start_time(0).with_timestep(60),
            Box::new(NoDemand),
            Box::new(routing),
        )
        .expect("valid config")
    }

    #[test]
    #[traced_test]
    fn unknown_vehicle_in_match_is_logged_and_skipped() {
        let mut sim = Simulator::new(
            SimConfig::default().with_timestep(60),
            Box::new(ScriptedDemand::new(vec![customer_at(
                "c1",
                test_neighbor_cell(),
                0,
                600,
                300,
            )])),
            Box::new(RecordingRoutingEngine::new(60)),
        )
        .unwrap();
        sim.populate_vehicle("v1", test_cell()).unwrap();
        sim.step();

        sim.match_vehicles(&[
            MatchCommand::new("ghost", "c1", 120),
            MatchCommand::new("v1", "c1", 120),
        ]);

        assert!(logs_contain("match skipped: unknown vehicle id"));
        let vehicle = sim.vehicle(&VehicleId::from("v1")).unwrap();
        assert_eq!(vehicle.state(), VehicleState::HeadingToCustomer);
        assert_eq!(vehicle.remaining_activity(), 120);
    }

    #[test]
    #[traced_test]
    fn unknown_vehicle_in_dispatch_is_logged_and_skipped() {
        let mut sim = simulator(RecordingRoutingEngine::new(60));
        sim.populate_vehicle("v1", test_cell()).unwrap();
        sim.dispatch_vehicles(&[
            DispatchCommand::destination("ghost", test_neighbor_cell()),
            DispatchCommand::destination("v1", test_neighbor_cell()),
        ]);
        assert!(logs_contain("dispatch skipped: unknown vehicle id"));
        assert_eq!(
            sim.vehicle(&VehicleId::from("v1")).map(Vehicle::state),
            Some(VehicleState::Cruising)
        );
    }

    #[test]
    #[traced_test]
    fn cache_miss_is_logged_and_skipped() {
        let mut sim = simulator(RecordingRoutingEngine::new(60));
        sim.populate_vehicle("v1", test_cell()).unwrap();
        sim.dispatch_vehicles(&[DispatchCommand::cached_route(
            "v1",
            test_cell(),
            test_distant_cell(),
        )]);
        assert!(logs_contain("route not in cache"));
        assert_eq!(
            sim.vehicle(&VehicleId::from("v1")).map(Vehicle::state),
            Some(VehicleState::Idle)
        );
    }

    #[test]
    #[traced_test]
    fn exit_emits_score_log_line() {
        let mut sim = Simulator::new(
            SimConfig::default().with_timestep(60).with_vehicle_shift(60),
            Box::new(NoDemand),
            Box::new(RecordingRoutingEngine::new(60)),
        )
        .unwrap();
        sim.populate_vehicle("v9", test_cell()).unwrap();
        sim.step();
        assert!(logs_contain("vehicle score"));
        assert!(logs_contain("0,v9,60,0,0,0,0"));
    }

    #[test]
    #[traced_test]
    fn hour_boundary_logs_heartbeat() {
        let mut sim = Simulator::new(
            SimConfig::default().with_start_time(3540).with_timestep(60),
            Box::new(NoDemand),
            Box::new(RecordingRoutingEngine::new(60)),
        )
        .unwrap();
        sim.step();
        assert_eq!(sim.get_current_time(), 3600);
        assert!(logs_contain("simulation heartbeat"));
        assert!(logs_contain("1970-01-01 01:00:00 UTC"));
    }

    /// Resolves only the first pair of every batch.
    struct FirstPairOnly;

    impl RoutingEngine for FirstPairOnly {
        fn route(&mut self, od_pairs: &[RouteKey]) -> Vec<RouteResult> {
            od_pairs
                .iter()
                .take(1)
                .map(|&(origin, destination)| RouteResult::new(vec![origin, destination], 90))
                .collect()
        }

        fn cached_route(&self, _: CellIndex, _: CellIndex) -> Option<RouteResult> {
            None
        }
    }

    #[test]
    #[traced_test]
    fn short_routing_batch_applies_leading_results_only() {
        let mut sim = Simulator::new(
            SimConfig::default().with_start_time(0).with_timestep(60),
            Box::new(NoDemand),
            Box::new(FirstPairOnly),
        )
        .unwrap();
        sim.populate_vehicle("a", test_cell()).unwrap();
        sim.populate_vehicle("b", test_cell()).unwrap();

        sim.dispatch_vehicles(&[
            DispatchCommand::destination("a", test_neighbor_cell()),
            DispatchCommand::destination("b", test_distant_cell()),
        ]);

        assert!(logs_contain("routing engine returned a short batch"));
        let a = sim.vehicle(&VehicleId::from("a")).unwrap();
        assert_eq!(a.state(), VehicleState::Cruising);
        assert_eq!(a.remaining_activity(), 90);
        assert_eq!(
            sim.vehicle(&VehicleId::from("b")).map(Vehicle::state),
            Some(VehicleState::Idle)
        );
    }

    #[test]
    fn step_drops_finished_entities_across_a_large_population() {
        let customers = (0..2_000)
            .map(|i| customer_at(&format!("c{i}"), test_cell(), 0, 60 + (i % 2) * 600, 60))
            .collect();
        let mut sim = Simulator::new(
            SimConfig::default()
                .with_start_time(0)
                .with_timestep(60)
                .with_vehicle_shift(120),
            Box::new(ScriptedDemand::new(customers)),
            Box::new(RecordingRoutingEngine::new(60)),
        )
        .unwrap();
        for i in 0..2_000 {
            sim.populate_vehicle(format!("v{i}"), test_cell()).unwrap();
        }

        sim.step();
        assert_eq!(sim.get_waiting_requests().len(), 2_000);
        sim.step();
        let waiting: Vec<_> = sim.get_waiting_requests().into_iter().map(|c| c.id).collect();
        assert_eq!(waiting.len(), 1_000);
        assert_eq!(waiting.first(), Some(&CustomerId::from("c1")));
        assert_eq!(sim.get_vehicles_state().len(), 0);
        let exited: Vec<_> = sim.scores().iter().map(|r| r.vehicle_id.to_string()).collect();
        assert_eq!(exited.len(), 2_000);
        assert_eq!(exited[..3], ["v0", "v1", "v2"]);
    }

    #[test]
    fn duplicate_vehicle_is_rejected() {
        let mut sim = simulator(RecordingRoutingEngine::new(60));
        sim.populate_vehicle("v1", test_cell()).unwrap();
        let err = sim.populate_vehicle("v1", test_neighbor_cell()).unwrap_err();
        assert_eq!(
            err,
            SimError::DuplicateVehicle {
                id: VehicleId::from("v1")
            }
        );
        assert_eq!(
            sim.vehicle(&VehicleId::from("v1")).map(Vehicle::location),
            Some(test_cell())
        );
    }

    #[test]
    fn reset_with_zero_timestep_changes_nothing() {
        let mut sim = simulator(RecordingRoutingEngine::new(60));
        sim.populate_vehicle("v1", test_cell()).unwrap();
        assert_eq!(sim.reset(Some(0), Some(0)), Err(SimError::ZeroTimestep));
        assert_eq!(sim.get_timestep(), 60);
        assert_eq!(sim.get_vehicles_state().len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Simulator::new(
            SimConfig::default().with_timestep(0),
            Box::new(NoDemand),
            Box::new(RecordingRoutingEngine::new(60)),
        );
        assert!(matches!(result, Err(SimError::ZeroTimestep)));
    }
}
