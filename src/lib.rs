#![warn(missing_docs)]
//! # rustipcs: incremental pressure correction for channel flow
//!
//! Finite element solver for unsteady incompressible flow past a cylinder
//! in a channel, optionally coupled to a transported density field.
//!
//! Every time step is split into
//! - tentative velocity (P2, stress form, explicit or fixed-point convection)
//! - pressure correction (P1 Poisson problem, outlet pressure fixed)
//! - velocity correction (projection with the pressure increment)
//! - scalar transport (P1, Crank-Nicolson, optional SUPG)
//!
//! Each sub-step owns a [`solver::LinearSystem`] with its own Krylov method
//! and preconditioner. Systems with constant coefficients are assembled
//! once, all others every step.
//!
//! # Example
//! Flow past the cylinder at Re = 100, written to `results/`
//! ```ignore
//! use rustipcs::{RunConfig, Simulation};
//!
//! let config = RunConfig {
//!     steps: Some(200),
//!     ..RunConfig::default()
//! };
//! let mut sim = Simulation::new(&config)?;
//! sim.run()?;
//! ```
pub mod boundary;
pub mod config;
pub mod error;
pub mod fem;
pub mod field;
pub mod integrate;
pub mod io;
pub mod mesh;
pub mod navier;
pub mod solver;
pub mod space;
pub use config::RunConfig;
pub use error::{Error, Result};
pub use integrate::{integrate, Integrate, Simulation};
