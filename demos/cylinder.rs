//! Flow past a cylinder in a channel at Re = 100
//!
//! cargo run --release --example cylinder
use rustipcs::config::MeshSource;
use rustipcs::{RunConfig, Simulation};

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .init();
    // Parameters
    let config = RunConfig {
        viscosity: 1e-3,
        density: 1.,
        end_time: 8.,
        mesh: MeshSource::Channel { lcar: 0.02 },
        render_every: 100,
        ..RunConfig::default()
    };
    let mut sim = Simulation::new(&config).unwrap();
    if let Err(err) = sim.run() {
        eprintln!("run stopped after {} steps: {}", sim.step(), err);
    }
}
