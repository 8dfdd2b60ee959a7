use fleet_sim::customer::Customer;
use fleet_sim::demand::{DemandGenerator, NoDemand};
use fleet_sim::test_helpers::{RecordingRoutingEngine, RoutingCalls, ScriptedDemand};
use fleet_sim::{SimConfig, Simulator};
use h3o::CellIndex;

/// Builder for simulators wired to scripted collaborators.
pub struct TestSimBuilder {
    config: SimConfig,
    customers: Vec<Customer>,
    routing: RecordingRoutingEngine,
    vehicles: Vec<(String, CellIndex)>,
}

impl Default for TestSimBuilder {
    fn default() -> Self {
        Self {
            config: SimConfig::default().with_start_time(0).with_timestep(60),
            customers: Vec::new(),
            routing: RecordingRoutingEngine::new(120),
            vehicles: Vec::new(),
        }
    }
}

impl TestSimBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Customers released by a scripted demand generator at their request time.
    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customers.push(customer);
        self
    }

    pub fn with_routing(mut self, routing: RecordingRoutingEngine) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_vehicle(mut self, id: &str, location: CellIndex) -> Self {
        self.vehicles.push((id.to_owned(), location));
        self
    }

    /// Build the simulator plus a handle on the routing call log.
    pub fn build(self) -> (Simulator, RoutingCalls) {
        let calls = self.routing.calls();
        let demand: Box<dyn DemandGenerator> = if self.customers.is_empty() {
            Box::new(NoDemand)
        } else {
            Box::new(ScriptedDemand::new(self.customers))
        };
        let mut sim = Simulator::new(self.config, demand, Box::new(self.routing))
            .expect("valid test config");
        for (id, location) in self.vehicles {
            sim.populate_vehicle(id, location).expect("unique vehicle id");
        }
        (sim, calls)
    }
}
