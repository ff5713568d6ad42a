use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use rustipcs::config::{MeshSource, TentativeStrategy};
use rustipcs::mesh::ChannelGeometry;
use rustipcs::{Integrate, RunConfig, Simulation};

const SIZES: [(usize, usize); 3] = [(16, 8), (32, 16), (64, 32)];

fn config(nx: usize, ny: usize, strategy: TentativeStrategy, transport: bool) -> RunConfig {
    RunConfig {
        viscosity: 0.05,
        cfl: 0.2,
        strategy,
        transport,
        geometry: ChannelGeometry::without_obstacle(),
        mesh: MeshSource::Structured { nx, ny },
        sample_every: 0,
        render_every: 0,
        ..RunConfig::default()
    }
}

pub fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("ProjectionPipeline");
    group.significance_level(0.1).sample_size(10);
    let implicit = TentativeStrategy::Implicit {
        tolerance: 1e-6,
        max_iterations: 3,
    };
    for (nx, ny) in SIZES.iter() {
        let mut sim = Simulation::new(&config(*nx, *ny, TentativeStrategy::Explicit, false)).unwrap();
        let name = format!("Explicit: {}x{}", nx, ny);
        group.bench_function(&name, |b| b.iter(|| sim.update().unwrap()));
        let mut sim = Simulation::new(&config(*nx, *ny, implicit, true)).unwrap();
        let name = format!("Implicit + transport: {}x{}", nx, ny);
        group.bench_function(&name, |b| b.iter(|| sim.update().unwrap()));
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
