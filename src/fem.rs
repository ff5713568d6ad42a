//! # Finite element building blocks
//!
//! Quadrature, Lagrange P1/P2 basis functions and parallel assembly of
//! cell and facet kernels.
pub mod assembly;
pub mod element;
pub mod quadrature;
pub use assembly::{
    assemble_facet_matrix, assemble_facet_vector, assemble_matrix, assemble_vector, sparsity,
};
pub use element::{basis_gradients, basis_values, CellGeometry, CellValues};
pub use quadrature::{gauss_line3, QuadratureRule};
