//! Error types
//!
//! Setup errors abort before the first step. Solve errors abort the
//! run at the step where they occur. Io errors surface at the first
//! snapshot that cannot be written; the committed state stays valid.
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Mesh construction and import errors
#[derive(Error, Debug)]
pub enum MeshError {
    /// Triangle with (near) zero area
    #[error("degenerate triangle {cell} with area {area:e}")]
    DegenerateCell { cell: usize, area: f64 },

    /// Triangle references a vertex that does not exist
    #[error("triangle {cell} references vertex {vertex}, mesh has {num_vertices} vertices")]
    InvalidIndex {
        cell: usize,
        vertex: usize,
        num_vertices: usize,
    },

    /// Vertex not referenced by any triangle
    #[error("vertex {0} is not referenced by any triangle")]
    OrphanVertex(usize),

    /// No triangles
    #[error("mesh contains no triangles")]
    Empty,

    /// Malformed Gmsh input
    #[error("gmsh parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Gmsh format version other than 2.x ASCII
    #[error("unsupported gmsh format version: {0}")]
    UnsupportedVersion(String),

    /// Required section is missing
    #[error("missing section: {0}")]
    MissingSection(String),
}

/// Errors detected before time stepping starts
#[derive(Error, Debug)]
pub enum SetupError {
    /// Time step must be finite and strictly positive
    #[error("time step must be positive and finite, got {0}")]
    NonPositiveDt(f64),

    /// Physical parameter out of range
    #[error("parameter `{name}` must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    /// A boundary region is referenced by a condition but tags no facet
    #[error("boundary region {0} has no facets")]
    EmptyRegion(String),

    /// Pressure system without reference value
    #[error("system `{0}` is singular (no Dirichlet anchor)")]
    SingularSystem(&'static str),

    /// Invalid combination of run options
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Linear solve failures
#[derive(Error, Debug)]
pub enum SolveError {
    /// Iteration cap reached before tolerance
    #[error("{system}: no convergence after {iterations} iterations (residual {residual:e})")]
    NotConverged {
        system: &'static str,
        iterations: usize,
        residual: f64,
    },

    /// Krylov recurrence broke down
    #[error("{system}: breakdown at iteration {iterations}")]
    Breakdown {
        system: &'static str,
        iterations: usize,
    },

    /// Solution contains NaN or infinity
    #[error("{0}: solution is not finite")]
    NonFinite(&'static str),
}

/// Top level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "hdf5")]
    #[error("hdf5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}
