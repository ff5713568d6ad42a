//! # Incremental pressure correction scheme
//!
//! Each time step runs four sub-steps in fixed order:
//!
//! 1. tentative velocity u* (P2) from u1, p1 and the density
//! 2. pressure p (P1) from div u*
//! 3. corrected velocity u from u* and grad(p - p1)
//! 4. transported scalar (P1), if enabled
//!
//! See [`ProjectionPipeline::advance`].
pub mod context;
pub mod correction;
pub mod diagnostics;
pub mod params;
pub mod pipeline;
pub mod pressure;
pub mod tentative;
pub mod transport;
pub use context::Discretization;
pub use correction::VelocityCorrection;
pub use params::{cfl_timestep, SimulationParameters};
pub use pipeline::{ProjectionPipeline, StepReport};
pub use pressure::PressureCorrection;
pub use tentative::{FixedPoint, TentativeVelocity};
pub use transport::ScalarTransport;
