//! # Discretized fields
//!
//! A [`Field`] holds the coefficients of one physical quantity on its
//! function space. The [`FieldStore`] keeps the `current`, `previous` and
//! (for the implicit tentative velocity) `iterate` instances.
pub mod initial;
pub mod store;
pub use initial::{dense_disk, random_disturbance, DenseDisk};
pub use store::{FieldSet, FieldStore, StepFields};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    /// Velocity vector, P2
    Velocity,
    /// Pressure, P1
    Pressure,
    /// Transported scalar (density), P1
    Scalar,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Velocity => "velocity",
            Quantity::Pressure => "pressure",
            Quantity::Scalar => "scalar",
        };
        write!(f, "{}", name)
    }
}

/// Time level of a field instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Solution of the step in progress
    Current,
    /// Last committed step
    Previous,
    /// Fixed-point iterate of the implicit tentative velocity
    Iterate,
}

/// Coefficients of one quantity
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Quantity
    pub quantity: Quantity,
    /// Coefficient vector
    pub v: Array1<f64>,
}

impl Field {
    /// Zero field with `n` coefficients
    pub fn zeros(quantity: Quantity, n: usize) -> Self {
        Self {
            quantity,
            v: Array1::zeros(n),
        }
    }

    /// Number of coefficients
    pub fn len(&self) -> usize {
        self.v.len()
    }

    /// Empty field
    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    /// Euclidean norm of the coefficients
    pub fn norm(&self) -> f64 {
        self.v.dot(&self.v).sqrt()
    }

    /// Euclidean norm of the difference to `other`
    pub fn distance(&self, other: &Field) -> f64 {
        let d = &self.v - &other.v;
        d.dot(&d).sqrt()
    }

    /// All coefficients finite
    pub fn is_finite(&self) -> bool {
        self.v.iter().all(|x| x.is_finite())
    }
}
