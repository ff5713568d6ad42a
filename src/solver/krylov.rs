//! Krylov subspace methods
//!
//! Convergence: `|r| < atol` or `|r| / |b| < rtol`.
use super::csr::CsrMatrix;
use super::precond::{Precondition, Preconditioner};
use enum_dispatch::enum_dispatch;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Tolerances and iteration cap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Log every iteration (trace level)
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
            verbose: false,
        }
    }
}

/// Outcome of a solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverReport {
    /// Iterations performed
    pub iterations: usize,
    /// Final residual norm
    pub residual: f64,
    /// Tolerance reached
    pub converged: bool,
    /// Recurrence broke down
    pub breakdown: bool,
}

impl SolverReport {
    fn converged(iterations: usize, residual: f64) -> Self {
        Self {
            iterations,
            residual,
            converged: true,
            breakdown: false,
        }
    }
}

/// Solve A x = b with initial guess x
#[enum_dispatch]
pub trait Solve {
    /// Solve, x holds the initial guess on entry
    fn solve(
        &self,
        a: &CsrMatrix,
        b: &Array1<f64>,
        x: &mut Array1<f64>,
        precond: &Preconditioner,
    ) -> SolverReport;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Selectable Krylov methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KrylovMethod {
    /// Conjugate gradients, symmetric positive definite systems
    Cg,
    /// Stabilized bi-conjugate gradients, general systems
    Bicgstab,
}

/// Collection of Krylov solvers
#[enum_dispatch(Solve)]
#[derive(Debug, Clone)]
pub enum Krylov {
    /// Preconditioned conjugate gradients
    Cg(Cg),
    /// Preconditioned BiCGStab
    BiCgStab(BiCgStab),
}

impl Krylov {
    /// Solver of kind `method`
    pub fn new(method: KrylovMethod, config: SolverConfig) -> Self {
        match method {
            KrylovMethod::Cg => Cg { config }.into(),
            KrylovMethod::Bicgstab => BiCgStab { config }.into(),
        }
    }
}

fn norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

const STAGNATION: f64 = 1e-300;

/// Preconditioned conjugate gradients
#[derive(Debug, Clone)]
pub struct Cg {
    /// Tolerances
    pub config: SolverConfig,
}

impl Solve for Cg {
    fn solve(
        &self,
        a: &CsrMatrix,
        b: &Array1<f64>,
        x: &mut Array1<f64>,
        precond: &Preconditioner,
    ) -> SolverReport {
        let n = b.len();
        let b_norm = norm(b);
        if b_norm == 0. {
            x.fill(0.);
            return SolverReport::converged(0, 0.);
        }
        let mut r = b - &a.dot(x);
        let mut res = norm(&r);
        if res < self.config.atol || res / b_norm < self.config.rtol {
            return SolverReport::converged(0, res);
        }
        let mut z = Array1::zeros(n);
        precond.apply(&r, &mut z);
        let mut p = z.clone();
        let mut ap = Array1::zeros(n);
        let mut rz = r.dot(&z);

        for iter in 0..self.config.max_iter {
            a.mul_vec(&p, &mut ap);
            let pap = p.dot(&ap);
            if pap.abs() < STAGNATION {
                return SolverReport {
                    iterations: iter,
                    residual: res,
                    converged: false,
                    breakdown: true,
                };
            }
            let alpha = rz / pap;
            x.scaled_add(alpha, &p);
            r.scaled_add(-alpha, &ap);
            res = norm(&r);
            if self.config.verbose {
                log::trace!("CG iter {}: residual = {:.6e}", iter + 1, res);
            }
            if res < self.config.atol || res / b_norm < self.config.rtol {
                return SolverReport::converged(iter + 1, res);
            }
            precond.apply(&r, &mut z);
            let rz_new = r.dot(&z);
            let beta = rz_new / rz;
            rz = rz_new;
            p *= beta;
            p += &z;
        }
        SolverReport {
            iterations: self.config.max_iter,
            residual: res,
            converged: false,
            breakdown: false,
        }
    }

    fn name(&self) -> &'static str {
        "cg"
    }
}

/// Preconditioned BiCGStab (right preconditioning)
#[derive(Debug, Clone)]
pub struct BiCgStab {
    /// Tolerances
    pub config: SolverConfig,
}

impl Solve for BiCgStab {
    #[allow(clippy::many_single_char_names)]
    fn solve(
        &self,
        a: &CsrMatrix,
        b: &Array1<f64>,
        x: &mut Array1<f64>,
        precond: &Preconditioner,
    ) -> SolverReport {
        let n = b.len();
        let b_norm = norm(b);
        if b_norm == 0. {
            x.fill(0.);
            return SolverReport::converged(0, 0.);
        }
        let mut r = b - &a.dot(x);
        let mut res = norm(&r);
        if res < self.config.atol || res / b_norm < self.config.rtol {
            return SolverReport::converged(0, res);
        }
        let r0 = r.clone();
        let mut p = Array1::zeros(n);
        let mut v = Array1::zeros(n);
        let mut y = Array1::zeros(n);
        let mut z = Array1::zeros(n);
        let mut t = Array1::zeros(n);
        let (mut rho_old, mut alpha, mut omega) = (1., 1., 1.);

        for iter in 0..self.config.max_iter {
            let rho = r0.dot(&r);
            if rho.abs() < STAGNATION {
                return SolverReport {
                    iterations: iter,
                    residual: res,
                    converged: false,
                    breakdown: true,
                };
            }
            if iter == 0 {
                p.assign(&r);
            } else {
                let beta = (rho / rho_old) * (alpha / omega);
                // p = r + beta (p - omega v)
                p.scaled_add(-omega, &v);
                p *= beta;
                p += &r;
            }
            rho_old = rho;

            precond.apply(&p, &mut y);
            a.mul_vec(&y, &mut v);
            let r0v = r0.dot(&v);
            if r0v.abs() < STAGNATION {
                return SolverReport {
                    iterations: iter,
                    residual: res,
                    converged: false,
                    breakdown: true,
                };
            }
            alpha = rho / r0v;

            // s = r - alpha v, stored in r
            r.scaled_add(-alpha, &v);
            x.scaled_add(alpha, &y);
            res = norm(&r);
            if res < self.config.atol || res / b_norm < self.config.rtol {
                return SolverReport::converged(iter + 1, res);
            }

            precond.apply(&r, &mut z);
            a.mul_vec(&z, &mut t);
            let tt = t.dot(&t);
            omega = if tt > STAGNATION { t.dot(&r) / tt } else { 0. };
            if omega.abs() < STAGNATION {
                return SolverReport {
                    iterations: iter + 1,
                    residual: res,
                    converged: false,
                    breakdown: true,
                };
            }
            x.scaled_add(omega, &z);
            r.scaled_add(-omega, &t);
            res = norm(&r);
            if self.config.verbose {
                log::trace!("BiCGStab iter {}: residual = {:.6e}", iter + 1, res);
            }
            if res < self.config.atol || res / b_norm < self.config.rtol {
                return SolverReport::converged(iter + 1, res);
            }
        }
        SolverReport {
            iterations: self.config.max_iter,
            residual: res,
            converged: false,
            breakdown: false,
        }
    }

    fn name(&self) -> &'static str {
        "bicgstab"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::precond::PreconditionerKind;

    fn approx_eq(result: &Array1<f64>, expected: &Array1<f64>) {
        let dif = 1e-6;
        for (a, b) in expected.iter().zip(result.iter()) {
            if (a - b).abs() > dif {
                panic!("Large difference of values, got {} expected {}.", b, a)
            }
        }
    }

    fn spd_matrix(n: usize) -> CsrMatrix {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 4.));
            if i > 0 {
                t.push((i, i - 1, -1.));
            }
            if i + 1 < n {
                t.push((i, i + 1, -1.));
            }
        }
        CsrMatrix::from_triplets(n, n, &t)
    }

    fn convection_matrix(n: usize) -> CsrMatrix {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 3.));
            if i > 0 {
                t.push((i, i - 1, -2.));
            }
            if i + 1 < n {
                t.push((i, i + 1, -0.5));
            }
        }
        CsrMatrix::from_triplets(n, n, &t)
    }

    #[test]
    fn test_cg_all_preconditioners() {
        let a = spd_matrix(50);
        let expected = Array1::from_shape_fn(50, |i| (i as f64 * 0.3).sin());
        let b = a.dot(&expected);
        for kind in [
            PreconditionerKind::None,
            PreconditionerKind::Jacobi,
            PreconditionerKind::Ssor,
            PreconditionerKind::Amg,
        ] {
            let precond = Preconditioner::build(kind, &a);
            let solver = Krylov::new(KrylovMethod::Cg, SolverConfig::default());
            let mut x = Array1::zeros(50);
            let report = solver.solve(&a, &b, &mut x, &precond);
            assert!(report.converged, "{:?}: {:?}", kind, report);
            approx_eq(&x, &expected);
        }
    }

    #[test]
    fn test_bicgstab_nonsymmetric() {
        let a = convection_matrix(300);
        let expected = Array1::from_shape_fn(300, |i| 1. + (i as f64 * 0.1).cos());
        let b = a.dot(&expected);
        for kind in [PreconditionerKind::Jacobi, PreconditionerKind::Amg] {
            let precond = Preconditioner::build(kind, &a);
            let solver = Krylov::new(KrylovMethod::Bicgstab, SolverConfig::default());
            let mut x = Array1::zeros(300);
            let report = solver.solve(&a, &b, &mut x, &precond);
            assert!(report.converged, "{:?}: {:?}", kind, report);
            approx_eq(&x, &expected);
        }
    }

    #[test]
    fn test_iteration_cap() {
        let a = spd_matrix(100);
        let b = Array1::from_elem(100, 1.);
        let config = SolverConfig {
            max_iter: 2,
            ..SolverConfig::default()
        };
        let precond = Preconditioner::build(PreconditionerKind::None, &a);
        let mut x = Array1::zeros(100);
        let report = Cg { config }.solve(&a, &b, &mut x, &precond);
        assert!(!report.converged);
        assert_eq!(report.iterations, 2);
    }

    #[test]
    fn test_zero_rhs() {
        let a = spd_matrix(5);
        let precond = Preconditioner::build(PreconditionerKind::None, &a);
        let mut x = Array1::from_elem(5, 3.);
        let report = Krylov::new(KrylovMethod::Bicgstab, SolverConfig::default()).solve(
            &a,
            &Array1::zeros(5),
            &mut x,
            &precond,
        );
        assert!(report.converged);
        assert!(x.iter().all(|v| *v == 0.));
    }
}
