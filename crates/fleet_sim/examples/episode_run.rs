//! Run a two-hour Berlin episode under a greedy nearest-idle policy and print
//! the score records.
//!
//! Run with: cargo run -p fleet_sim --example episode_run
//! Set RUST_LOG=fleet_sim=debug for per-tick counts.

use fleet_sim::demand::{PoissonDemandConfig, PoissonDemandGenerator};
use fleet_sim::routing::H3GridRoutingEngine;
use fleet_sim::spatial::{distance_km_between_cells, Bounds, DEFAULT_RESOLUTION};
use fleet_sim::vehicle::VehicleState;
use fleet_sim::{MatchCommand, SimConfig, Simulator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fleet_sim=info")),
        )
        .init();

    const NUM_VEHICLES: usize = 100;
    const SIMULATION_HOURS: u64 = 2;
    const SEED: u64 = 123;

    let config = SimConfig::default()
        .with_start_time(0)
        .with_timestep(60)
        .with_vehicle_shift(SIMULATION_HOURS * 3600 / 2)
        .with_seed(SEED);
    let demand = PoissonDemandGenerator::new(PoissonDemandConfig {
        rate_per_hour: 400.0,
        seed: SEED,
        ..Default::default()
    });
    let mut sim = Simulator::new(config, Box::new(demand), Box::new(H3GridRoutingEngine::default()))
        .expect("valid config");

    let mut rng = StdRng::seed_from_u64(SEED);
    for i in 0..NUM_VEHICLES {
        let cell = Bounds::BERLIN
            .sample_cell(&mut rng, DEFAULT_RESOLUTION)
            .expect("Berlin cell");
        sim.populate_vehicle(format!("v{i}"), cell).expect("unique id");
    }

    let ticks = SIMULATION_HOURS * 3600 / sim.get_timestep();
    let mut matched = 0;
    for _ in 0..ticks {
        sim.step();

        let mut idle: Vec<_> = sim
            .get_vehicles_state()
            .into_iter()
            .filter(|v| v.state == VehicleState::Idle)
            .collect();
        let mut commands = Vec::new();
        for request in sim.get_waiting_requests() {
            let nearest = idle
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    distance_km_between_cells(a.location, request.origin)
                        .total_cmp(&distance_km_between_cells(b.location, request.origin))
                })
                .map(|(i, _)| i);
            let Some(index) = nearest else {
                break;
            };
            let vehicle = idle.swap_remove(index);
            let duration = sim.sample_pickup_duration().round().max(1.0) as u64;
            commands.push(MatchCommand::new(vehicle.id, request.id, duration));
        }
        matched += commands.len();
        sim.match_vehicles(&commands);
    }
    sim.score_active_vehicles();

    println!(
        "--- Episode run ({} vehicles, {}h, seed {}) ---",
        NUM_VEHICLES, SIMULATION_HOURS, SEED
    );
    println!("Simulation time: {} s", sim.get_current_time());
    println!("Matches issued: {}", matched);
    println!("\nScore records (time,vehicle,idle,cruising,pickup,off_duty,pickups):");
    for record in sim.scores() {
        println!("  {}", record);
    }
}
