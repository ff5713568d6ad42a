//! Heavy disk released upstream of the cylinder, density transported
//! with the flow (Crank-Nicolson, SUPG)
//!
//! cargo run --release --example density_blob
use rustipcs::config::{MeshSource, TentativeStrategy};
use rustipcs::field::DenseDisk;
use rustipcs::{RunConfig, Simulation};

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .init();
    // Parameters
    let config = RunConfig {
        transport: true,
        diffusivity: 1e-3,
        supg: 1.0,
        strategy: TentativeStrategy::Implicit {
            tolerance: 1e-6,
            max_iterations: 5,
        },
        dense_disk: Some(DenseDisk {
            center: [0.6, 0.2],
            radius: 0.05,
            factor: 3.,
        }),
        steps: Some(2000),
        mesh: MeshSource::Channel { lcar: 0.03 },
        render_every: 50,
        ..RunConfig::default()
    };
    let mut sim = Simulation::new(&config).unwrap();
    if let Err(err) = sim.run() {
        eprintln!("run stopped after {} steps: {}", sim.step(), err);
    }
}
