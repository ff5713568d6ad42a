//! # Time integration
//!
//! [`Integrate`] is the step interface, [`integrate`] the loop around it.
//! [`Simulation`] owns the field store and the projection pipeline and
//! moves through the phases
//! `Idle -> Stepping(1) -> Committed(1) -> Stepping(2) -> ... -> Terminal(N)`.
//! `previous` is only written in the transition to `Committed`.
use crate::boundary::{BoundaryConditionSet, InletProfile, SystemKind};
use crate::config::{RunConfig, TentativeStrategy};
use crate::error::{Result, SetupError};
use crate::field::{dense_disk, random_disturbance, FieldStore, Quantity};
use crate::io::{write_snapshot, ResultStore};
use crate::mesh::Mesh;
use crate::navier::{Discretization, ProjectionPipeline, SimulationParameters, StepReport};
use log::{info, warn};
use ndarray::Array1;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Integrate trait, step forward in time, and write results
pub trait Integrate {
    /// Advance one time step
    fn update(&mut self) -> Result<()>;
    /// Receive current time
    fn get_time(&self) -> f64;
    /// Get timestep
    fn get_dt(&self) -> f64;
    /// Called after every committed step (sampling, snapshots)
    fn callback(&mut self) -> Result<()>;
    /// Stop before the next step
    fn exit(&mut self) -> bool;
}

/// Integrate pde, that implements the Integrate trait.
///
/// Stop criteria:
/// 1. `max_steps` steps done
/// 2. `pde.exit()`
///
/// Returns the number of steps done. Errors of `update` and `callback`
/// end the loop.
pub fn integrate<T: Integrate>(pde: &mut T, max_steps: usize) -> Result<usize> {
    let mut timestep: usize = 0;
    loop {
        // Break
        if timestep >= max_steps {
            info!("timestep limit reached: {}", timestep);
            break;
        }
        if pde.exit() {
            info!("exit at time {:.4}", pde.get_time());
            break;
        }

        // Update
        pde.update()?;
        timestep += 1;

        // Save
        pde.callback()?;
    }
    Ok(timestep)
}

/// State of the time loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Set up, no step started
    Idle,
    /// Sub-steps of step n running
    Stepping(usize),
    /// Step n committed
    Committed(usize),
    /// All steps done, n committed
    Terminal(usize),
    /// Step failed, n is the last committed step
    Aborted(usize),
}

/// Which committed steps are sampled and rendered
///
/// Steps count from 1. With `every = k` the steps k, 2k, 3k, ... are
/// taken, so step 1 is skipped unless k = 1 and the last step N is
/// taken whenever k divides N. The initial state (step 0) is never
/// sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotPolicy {
    /// Sample into the result store every n steps (0 = never)
    pub sample_every: usize,
    /// Write a vtu snapshot every n steps (0 = never)
    pub render_every: usize,
}

impl SnapshotPolicy {
    fn hits(every: usize, step: usize) -> bool {
        every > 0 && step > 0 && step % every == 0
    }

    /// Sample at `step`
    pub fn sample(&self, step: usize) -> bool {
        Self::hits(self.sample_every, step)
    }

    /// Render at `step`
    pub fn render(&self, step: usize) -> bool {
        Self::hits(self.render_every, step)
    }
}

/// Flow past the obstacle, driven by [`integrate`]
#[derive(Debug)]
pub struct Simulation {
    pipeline: ProjectionPipeline,
    fields: FieldStore,
    results: ResultStore,
    policy: SnapshotPolicy,
    run_dir: PathBuf,
    step: usize,
    phase: Phase,
    cancel: Arc<AtomicBool>,
    reports: Vec<StepReport>,
}

impl Simulation {
    /// Build mesh and all systems from `config`
    pub fn new(config: &RunConfig) -> Result<Self> {
        let mesh = config.mesh.build(&config.geometry)?;
        Self::with_mesh(config, mesh)
    }

    /// Set up on a given tagged mesh
    ///
    /// # Errors
    /// Invalid parameters, degenerate cells, boundary regions without
    /// facets and a pressure system without anchor.
    pub fn with_mesh(config: &RunConfig, mesh: Mesh) -> Result<Self> {
        config.validate()?;
        let mesh = Arc::new(mesh);
        let ctx = Arc::new(Discretization::new(mesh.clone(), config.transport)?);

        let profile = InletProfile {
            peak: config.reference_velocity,
            height: config.geometry.height,
        };
        let mut bcs =
            BoundaryConditionSet::channel(profile, config.outlet_pressure, config.geometry.obstacle);
        bcs.setup(&mesh)?;
        let mean = bcs
            .inlet_mean()
            .ok_or_else(|| SetupError::InvalidConfig("no inflow profile".into()))?;
        let params = SimulationParameters::new(config, mesh.h_min(), mean)?;
        let pipeline = ProjectionPipeline::new(ctx.clone(), &bcs, params, config)?;

        let implicit = matches!(config.strategy, TentativeStrategy::Implicit { .. });
        let mut fields = ctx.allocate_fields(implicit);
        if config.disturbance > 0. {
            let fixed: Vec<usize> = bcs
                .dirichlet_dofs(ctx.velocity_space(), SystemKind::Velocity)
                .iter()
                .map(|(dof, _)| *dof)
                .collect();
            let mut u = Array1::zeros(ctx.velocity_space().num_dofs());
            random_disturbance(&mut u, config.disturbance, &fixed);
            fields.initialize(Quantity::Velocity, &u);
        }
        if let Some(space) = ctx.scalar_space() {
            let r = match &config.dense_disk {
                Some(disk) => dense_disk(space, config.density, disk),
                None => Array1::from_elem(space.num_dofs(), config.density),
            };
            fields.initialize(Quantity::Scalar, &r);
        }

        info!("vertices: {}, cells: {}", mesh.num_vertices(), mesh.num_cells());
        info!(
            "unknowns: velocity {}, pressure {}, scalar {}",
            ctx.velocity_space().num_dofs(),
            ctx.pressure_space().num_dofs(),
            ctx.scalar_space().map_or(0, |s| s.num_dofs())
        );
        info!(
            "Re = {:.2}, U_mean = {:.4}, h_min = {:.4e}",
            params.reynolds(),
            params.mean_velocity,
            params.h_min
        );
        info!(
            "dt = {:.4e}, CFL = {:.3}, steps = {}",
            params.dt,
            params.cfl(),
            params.steps
        );

        Ok(Self {
            pipeline,
            fields,
            results: ResultStore::new(&mesh),
            policy: SnapshotPolicy {
                sample_every: config.sample_every,
                render_every: config.render_every,
            },
            run_dir: config.run_dir(),
            step: 0,
            phase: Phase::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            reports: Vec::new(),
        })
    }

    /// Run the remaining steps and export the samples.
    /// Returns the number of steps done in this call.
    pub fn run(&mut self) -> Result<usize> {
        let remaining = self.params().steps.saturating_sub(self.step);
        let done = integrate(self, remaining)?;
        if self.step >= self.params().steps {
            self.phase = Phase::Terminal(self.step);
        }
        self.export()?;
        Ok(done)
    }

    /// Write the result store to the run directory, named with the
    /// last committed step
    pub fn export(&self) -> Result<Vec<PathBuf>> {
        #[allow(unused_mut)]
        let mut written = self.results.export(&self.run_dir, self.step)?;
        #[cfg(feature = "hdf5")]
        written.push(crate::io::write_h5(&self.run_dir, self.step, &self.results)?);
        Ok(written)
    }

    /// Handle to cancel the run before the next step
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Committed steps
    pub fn step(&self) -> usize {
        self.step
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Parameters
    pub fn params(&self) -> &SimulationParameters {
        self.pipeline.params()
    }

    /// Pipeline
    pub fn pipeline(&self) -> &ProjectionPipeline {
        &self.pipeline
    }

    /// Field store
    pub fn fields(&self) -> &FieldStore {
        &self.fields
    }

    /// Sampled results
    pub fn results(&self) -> &ResultStore {
        &self.results
    }

    /// Reports of all committed steps
    pub fn reports(&self) -> &[StepReport] {
        &self.reports
    }

    /// Output directory
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Change the output directory
    pub fn set_run_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.run_dir = dir.as_ref().to_path_buf();
    }
}

impl Integrate for Simulation {
    fn update(&mut self) -> Result<()> {
        let n = self.step + 1;
        self.phase = Phase::Stepping(n);
        match self.pipeline.advance(self.fields.split()) {
            Ok(report) => {
                self.fields.commit();
                self.step = n;
                self.phase = Phase::Committed(n);
                self.reports.push(report);
                Ok(())
            }
            Err(err) => {
                self.fields.rollback();
                self.phase = Phase::Aborted(self.step);
                Err(err.into())
            }
        }
    }

    fn get_time(&self) -> f64 {
        self.params().time(self.step)
    }

    fn get_dt(&self) -> f64 {
        self.params().dt
    }

    fn callback(&mut self) -> Result<()> {
        let n = self.step;
        let ctx = self.pipeline.context();
        if self.policy.sample(n) {
            self.results.sample(n, ctx, self.fields.previous());
        }
        if self.policy.render(n) {
            let time = self.params().time(n);
            write_snapshot(&self.run_dir, n, time, ctx, self.fields.previous())?;
            if let Some(report) = self.reports.last() {
                info!(
                    "step {:>6} time {:8.4} | div u {:.3e} | outlet mean {:.4} | picard {}",
                    n,
                    time,
                    report.divergence_corrected,
                    report.outlet_mean,
                    report.picard.iterations
                );
            }
        }
        Ok(())
    }

    fn exit(&mut self) -> bool {
        if self.cancel.load(Ordering::SeqCst) {
            info!("run cancelled after {} steps", self.step);
            return true;
        }
        if !self.fields.previous().is_finite() {
            warn!("non-finite field after {} steps", self.step);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MeshSource;

    struct Counter {
        steps: usize,
        stop_at: Option<usize>,
    }

    impl Integrate for Counter {
        fn update(&mut self) -> Result<()> {
            self.steps += 1;
            Ok(())
        }
        fn get_time(&self) -> f64 {
            self.steps as f64 * self.get_dt()
        }
        fn get_dt(&self) -> f64 {
            0.1
        }
        fn callback(&mut self) -> Result<()> {
            Ok(())
        }
        fn exit(&mut self) -> bool {
            self.stop_at.map_or(false, |n| self.steps >= n)
        }
    }

    #[test]
    fn test_integrate_stops() {
        let mut pde = Counter {
            steps: 0,
            stop_at: None,
        };
        assert_eq!(integrate(&mut pde, 7).unwrap(), 7);
        let mut pde = Counter {
            steps: 0,
            stop_at: Some(3),
        };
        assert_eq!(integrate(&mut pde, 7).unwrap(), 3);
    }

    #[test]
    fn test_snapshot_policy() {
        let policy = SnapshotPolicy {
            sample_every: 2,
            render_every: 0,
        };
        assert!(policy.sample(4));
        assert!(!policy.sample(3));
        assert!(!policy.sample(1));
        assert!(!policy.sample(0));
        assert!(!policy.render(100));
    }

    fn config() -> RunConfig {
        RunConfig {
            viscosity: 0.05,
            cfl: 0.2,
            steps: Some(4),
            geometry: crate::mesh::ChannelGeometry::without_obstacle(),
            mesh: MeshSource::Structured { nx: 8, ny: 4 },
            render_every: 0,
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_phases_and_sampling() {
        let mut sim = Simulation::new(&config()).unwrap();
        assert_eq!(sim.phase(), Phase::Idle);
        sim.update().unwrap();
        assert_eq!(sim.phase(), Phase::Committed(1));
        assert_eq!(sim.fields().previous(), sim.fields().current());
        sim.callback().unwrap();
        assert!(sim.results().is_empty());
        sim.update().unwrap();
        sim.callback().unwrap();
        assert_eq!(sim.results().steps(), &[2]);
        assert_eq!(sim.reports().len(), 2);
    }

    #[test]
    fn test_cancel_before_step() {
        let mut sim = Simulation::new(&config()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        sim.set_run_dir(dir.path());
        sim.cancel_flag().store(true, Ordering::SeqCst);
        assert_eq!(sim.run().unwrap(), 0);
        assert_eq!(sim.step(), 0);
        assert_eq!(sim.phase(), Phase::Idle);
    }

    #[test]
    fn test_run_reaches_terminal() {
        let mut sim = Simulation::new(&config()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        sim.set_run_dir(dir.path());
        assert_eq!(sim.run().unwrap(), 4);
        assert_eq!(sim.phase(), Phase::Terminal(4));
        assert!(dir.path().join("000004u.json").exists());
        assert!(dir.path().join("000000t.json").exists());
    }
}
