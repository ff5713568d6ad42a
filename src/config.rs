//! # Run configuration
//!
//! Every option has a default, so a configuration file only needs to list
//! what differs. Files are JSON:
//!
//! ```json
//! {
//!     "viscosity": 0.001,
//!     "cfl": 0.05,
//!     "steps": 200,
//!     "strategy": { "kind": "implicit", "tolerance": 1e-6, "max_iterations": 10 },
//!     "transport": true,
//!     "mesh": { "kind": "channel", "lcar": 0.02 }
//! }
//! ```
use crate::error::{Result, SetupError};
use crate::field::DenseDisk;
use crate::mesh::{read_gmsh, ChannelGeometry, GeometryProvider, Mesh};
use crate::solver::SolverPair;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// How the convective term of the tentative velocity is treated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TentativeStrategy {
    /// Convection at the previous time level
    Explicit,
    /// Fixed-point iteration on the convecting velocity
    Implicit {
        /// Stop when the iterate changes less than this (relative)
        tolerance: f64,
        /// Iteration cap
        max_iterations: usize,
    },
}

impl Default for TentativeStrategy {
    fn default() -> Self {
        TentativeStrategy::Explicit
    }
}

/// Where the mesh comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MeshSource {
    /// Built-in channel generator with mesh size `lcar`
    Channel {
        /// Characteristic mesh size
        lcar: f64,
    },
    /// Structured nx x ny channel grid
    Structured {
        /// Cells in x
        nx: usize,
        /// Cells in y
        ny: usize,
    },
    /// Gmsh MSH 2.2 file
    Gmsh {
        /// File path
        path: PathBuf,
    },
}

impl Default for MeshSource {
    fn default() -> Self {
        MeshSource::Channel { lcar: 0.02 }
    }
}

impl MeshSource {
    /// Generate or read the mesh, tagged with the regions of `geometry`
    pub fn build(&self, geometry: &ChannelGeometry) -> Result<Mesh> {
        match self {
            MeshSource::Channel { lcar } => Ok(geometry.generate(*lcar)?),
            MeshSource::Structured { nx, ny } => Ok(geometry.structured(*nx, *ny)?),
            MeshSource::Gmsh { path } => read_gmsh(path, geometry),
        }
    }
}

/// Solver pair per sub-step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverPairs {
    /// Tentative velocity
    pub tentative: SolverPair,
    /// Pressure correction
    pub pressure: SolverPair,
    /// Velocity correction
    pub correction: SolverPair,
    /// Scalar transport
    pub transport: SolverPair,
}

impl Default for SolverPairs {
    fn default() -> Self {
        Self {
            tentative: SolverPair::bicgstab_amg(),
            pressure: SolverPair::cg_ssor(),
            correction: SolverPair::cg_ssor(),
            transport: SolverPair::bicgstab_amg(),
        }
    }
}

/// All options of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Reference density rho
    pub density: f64,
    /// Dynamic viscosity mu
    pub viscosity: f64,
    /// Diffusion coefficient D of the scalar
    pub diffusivity: f64,
    /// Characteristic length (cylinder diameter)
    pub characteristic_length: f64,
    /// Reference (peak inflow) velocity
    pub reference_velocity: f64,
    /// CFL target used to derive dt
    pub cfl: f64,
    /// Simulated time, ignored if `steps` is set
    pub end_time: f64,
    /// Number of time steps
    pub steps: Option<usize>,
    /// Tentative velocity strategy
    pub strategy: TentativeStrategy,
    /// Solve scalar transport
    pub transport: bool,
    /// SUPG coefficient, 0 disables stabilization
    pub supg: f64,
    /// Initial dense region of the scalar
    pub dense_disk: Option<DenseDisk>,
    /// Amplitude of the random initial velocity disturbance
    pub disturbance: f64,
    /// Sample fields into the result store every n steps
    pub sample_every: usize,
    /// Write a visualization snapshot every n steps
    pub render_every: usize,
    /// Base output directory
    pub output: PathBuf,
    /// Reference pressure at the outlet
    pub outlet_pressure: f64,
    /// Channel geometry and region predicates
    pub geometry: ChannelGeometry,
    /// Mesh source
    pub mesh: MeshSource,
    /// Solver pairs
    pub solvers: SolverPairs,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            density: 1.,
            viscosity: 1e-3,
            diffusivity: 0.01,
            characteristic_length: 0.1,
            reference_velocity: 1.5,
            cfl: 0.05,
            end_time: 8.,
            steps: None,
            strategy: TentativeStrategy::Explicit,
            transport: false,
            supg: 0.,
            dense_disk: Some(DenseDisk::default()),
            disturbance: 0.,
            sample_every: 2,
            render_every: 100,
            output: PathBuf::from("results"),
            outlet_pressure: 0.,
            geometry: ChannelGeometry::default(),
            mesh: MeshSource::default(),
            solvers: SolverPairs::default(),
        }
    }
}

impl RunConfig {
    /// Read configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> std::result::Result<(), SetupError> {
        let positive = [
            ("density", self.density),
            ("viscosity", self.viscosity),
            ("characteristic_length", self.characteristic_length),
            ("reference_velocity", self.reference_velocity),
            ("cfl", self.cfl),
        ];
        for (name, value) in positive.iter() {
            if !(*value > 0.) || !value.is_finite() {
                return Err(SetupError::NonPositiveParameter {
                    name: *name,
                    value: *value,
                });
            }
        }
        if self.transport && !(self.diffusivity >= 0.) {
            return Err(SetupError::NonPositiveParameter {
                name: "diffusivity",
                value: self.diffusivity,
            });
        }
        if self.steps.is_none() && !(self.end_time > 0.) {
            return Err(SetupError::NonPositiveParameter {
                name: "end_time",
                value: self.end_time,
            });
        }
        if let TentativeStrategy::Implicit { max_iterations, .. } = self.strategy {
            if max_iterations == 0 {
                return Err(SetupError::InvalidConfig(
                    "implicit strategy needs at least one iteration".into(),
                ));
            }
        }
        if self.supg < 0. {
            return Err(SetupError::InvalidConfig("supg must not be negative".into()));
        }
        Ok(())
    }

    /// Run directory: `<output>/mu(..)_rho(..)_D(..)`
    pub fn run_dir(&self) -> PathBuf {
        self.output.join(format!(
            "mu({:.4})_rho({:.4})_D({:.4})",
            self.viscosity, self.density, self.diffusivity
        ))
    }
}
