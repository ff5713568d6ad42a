//! # Sparse linear algebra
//!
//! Compressed sparse row matrices, Krylov solvers (CG, BiCGStab) and
//! preconditioners (Jacobi, SSOR, aggregation AMG). A [`LinearSystem`]
//! bundles matrix, right-hand side, Dirichlet constraints and the
//! solver pair of one sub-step.
pub mod amg;
pub mod csr;
pub mod krylov;
pub mod precond;
pub mod system;
pub use amg::Amg;
pub use csr::{CsrMatrix, CsrPattern};
pub use krylov::{BiCgStab, Cg, Krylov, KrylovMethod, Solve, SolverConfig, SolverReport};
pub use precond::{Precondition, Preconditioner, PreconditionerKind};
pub use system::{AssemblyPolicy, LinearSystem, SolverPair};
