//! # Output
//!
//! Snapshots are VTK unstructured grid files written during the run.
//! The result store keeps sampled vertex values and exports them as JSON
//! (and hdf5 with feature `hdf5`) at the end of the run.
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod store;
pub mod vtk;
#[cfg(feature = "hdf5")]
pub use self::hdf5::write_h5;
pub use store::ResultStore;
pub use vtk::{write_snapshot, write_vtu};
