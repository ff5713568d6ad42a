//! Preconditioners z = M^-1 r
use super::amg::Amg;
use super::csr::CsrMatrix;
use enum_dispatch::enum_dispatch;
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};

/// Apply preconditioner
#[enum_dispatch]
pub trait Precondition {
    /// z = M^-1 r
    fn apply(&self, r: &Array1<f64>, z: &mut Array1<f64>);
}

/// Selectable preconditioner kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreconditionerKind {
    /// No preconditioning
    None,
    /// Diagonal scaling
    Jacobi,
    /// Symmetric successive over-relaxation
    Ssor,
    /// Aggregation algebraic multigrid
    Amg,
}

/// Collection of preconditioners
#[enum_dispatch(Precondition)]
#[derive(Debug, Clone)]
pub enum Preconditioner {
    /// M = I
    Identity(Identity),
    /// M = D
    Jacobi(Jacobi),
    /// M = (D + wL) D^-1 (D + wU) / (2 - w)
    Ssor(Ssor),
    /// One V-cycle
    Amg(Amg),
}

impl Preconditioner {
    /// Set up preconditioner of `kind` for `matrix`
    pub fn build(kind: PreconditionerKind, matrix: &CsrMatrix) -> Self {
        match kind {
            PreconditionerKind::None => Identity.into(),
            PreconditionerKind::Jacobi => Jacobi::from_matrix(matrix).into(),
            PreconditionerKind::Ssor => Ssor::from_matrix(matrix, 1.).into(),
            PreconditionerKind::Amg => Amg::from_matrix(matrix).into(),
        }
    }
}

fn safe_inverse(d: f64) -> f64 {
    if d.abs() > f64::MIN_POSITIVE {
        1. / d
    } else {
        1.
    }
}

/// Identity
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Precondition for Identity {
    fn apply(&self, r: &Array1<f64>, z: &mut Array1<f64>) {
        z.assign(r);
    }
}

/// Diagonal (Jacobi) scaling
#[derive(Debug, Clone)]
pub struct Jacobi {
    inv_diag: Array1<f64>,
}

impl Jacobi {
    /// Extract inverse diagonal
    pub fn from_matrix(matrix: &CsrMatrix) -> Self {
        Self {
            inv_diag: matrix.diagonal().mapv(safe_inverse),
        }
    }
}

impl Precondition for Jacobi {
    fn apply(&self, r: &Array1<f64>, z: &mut Array1<f64>) {
        Zip::from(z)
            .and(r)
            .and(&self.inv_diag)
            .for_each(|z, &r, &d| *z = r * d);
    }
}

/// Symmetric successive over-relaxation
#[derive(Debug, Clone)]
pub struct Ssor {
    matrix: CsrMatrix,
    diag: Array1<f64>,
    omega: f64,
}

impl Ssor {
    /// Relaxation factor `omega` in (0, 2)
    pub fn from_matrix(matrix: &CsrMatrix, omega: f64) -> Self {
        let diag = matrix
            .diagonal()
            .mapv(|d| if d.abs() > f64::MIN_POSITIVE { d } else { 1. });
        Self {
            matrix: matrix.clone(),
            diag,
            omega,
        }
    }
}

impl Precondition for Ssor {
    fn apply(&self, r: &Array1<f64>, z: &mut Array1<f64>) {
        let n = self.diag.len();
        let w = self.omega;

        // (D + wL) y = r
        for i in 0..n {
            let mut sum = r[i];
            for (j, a) in self.matrix.row_iter(i) {
                if j < i {
                    sum -= w * a * z[j];
                }
            }
            z[i] = sum / self.diag[i];
        }

        // y = (2 - w) D y
        for i in 0..n {
            z[i] *= self.diag[i] * (2. - w);
        }

        // (D + wU) z = y
        for i in (0..n).rev() {
            let mut sum = z[i];
            for (j, a) in self.matrix.row_iter(i) {
                if j > i {
                    sum -= w * a * z[j];
                }
            }
            z[i] = sum / self.diag[i];
        }
    }
}
