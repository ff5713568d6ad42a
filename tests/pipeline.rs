use rustipcs::boundary::{BoundaryConditionSet, InletProfile};
use rustipcs::config::{MeshSource, RunConfig};
use rustipcs::error::{Error, SetupError, SolveError};
use rustipcs::field::{DenseDisk, Quantity};
use rustipcs::integrate::Phase;
use rustipcs::mesh::{BoundaryRegion, ChannelGeometry};
use rustipcs::navier::{Discretization, ProjectionPipeline, SimulationParameters};
use rustipcs::{Integrate, Simulation};
use std::sync::Arc;

fn channel(transport: bool) -> RunConfig {
    RunConfig {
        viscosity: 0.05,
        cfl: 0.2,
        transport,
        steps: Some(10),
        geometry: ChannelGeometry::without_obstacle(),
        mesh: MeshSource::Structured { nx: 8, ny: 4 },
        sample_every: 0,
        render_every: 0,
        ..RunConfig::default()
    }
}

fn assert_divergence_reduced(config: &RunConfig, steps: usize) {
    let mut sim = Simulation::new(config).unwrap();
    for _ in 0..steps {
        sim.update().unwrap();
    }
    assert_eq!(sim.reports().len(), steps);
    for (i, report) in sim.reports().iter().enumerate() {
        assert!(report.divergence_tentative > 0., "step {}", i + 1);
        assert!(
            report.divergence_corrected < report.divergence_tentative,
            "step {}: {:.3e} -> {:.3e}",
            i + 1,
            report.divergence_tentative,
            report.divergence_corrected
        );
    }
}

#[test]
fn test_projection_reduces_divergence() {
    assert_divergence_reduced(&channel(false), 50);
}

#[test]
fn test_projection_reduces_divergence_around_cylinder() {
    let config = RunConfig {
        mesh: MeshSource::Channel { lcar: 0.03 },
        sample_every: 0,
        render_every: 0,
        ..RunConfig::default()
    };
    assert_divergence_reduced(&config, 20);
}

#[test]
fn test_tentative_matrix_constant_without_transport() {
    let mut sim = Simulation::new(&channel(false)).unwrap();
    sim.update().unwrap();
    let first = sim.pipeline().tentative_matrix().values().to_vec();
    sim.update().unwrap();
    sim.update().unwrap();
    let third = sim.pipeline().tentative_matrix().values().to_vec();
    assert_eq!(first, third);
}

#[test]
fn test_tentative_matrix_follows_density() {
    let config = RunConfig {
        dense_disk: Some(DenseDisk {
            center: [0.3, 0.2],
            radius: 0.2,
            factor: 5.,
        }),
        diffusivity: 0.05,
        ..channel(true)
    };
    let mut sim = Simulation::new(&config).unwrap();
    sim.update().unwrap();
    let first = sim.pipeline().tentative_matrix().values().to_vec();
    sim.update().unwrap();
    let second = sim.pipeline().tentative_matrix().values().to_vec();
    let diff = first
        .iter()
        .zip(second.iter())
        .fold(0f64, |acc, (a, b)| acc.max((a - b).abs()));
    assert!(diff > 0.);
}

#[test]
fn test_previous_untouched_by_failed_step() {
    let mut config = channel(false);
    config.solvers.pressure.config.max_iter = 1;
    config.solvers.pressure.config.rtol = 1e-14;
    let mut sim = Simulation::new(&config).unwrap();
    let before = sim.fields().previous().clone();
    let err = sim.update().unwrap_err();
    assert!(matches!(
        err,
        Error::Solve(SolveError::NotConverged { .. })
    ));
    assert_eq!(sim.phase(), Phase::Aborted(0));
    assert_eq!(sim.step(), 0);
    assert_eq!(sim.fields().previous(), &before);
    assert_eq!(sim.fields().current(), &before);
}

#[test]
fn test_missing_outlet_pressure_is_singular() {
    let config = channel(false);
    let mesh = Arc::new(config.mesh.build(&config.geometry).unwrap());
    let ctx = Arc::new(Discretization::new(mesh.clone(), false).unwrap());
    let profile = InletProfile {
        peak: config.reference_velocity,
        height: config.geometry.height,
    };
    let mut bcs = BoundaryConditionSet::channel(profile, 0., false);
    bcs.setup(&mesh).unwrap();
    bcs.remove(BoundaryRegion::Outlet, Quantity::Pressure);
    let params = SimulationParameters::new(&config, mesh.h_min(), 1.).unwrap();
    let err = ProjectionPipeline::new(ctx, &bcs, params, &config).unwrap_err();
    assert!(matches!(err, SetupError::SingularSystem(_)));
}
