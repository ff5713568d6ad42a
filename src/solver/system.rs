//! Linear system of one sub-step
//!
//! Holds the assembled matrix, the right-hand side, the Dirichlet
//! constraints and the solver pair. Dirichlet rows and columns are
//! eliminated symmetrically; the right-hand side is lifted with the
//! assembled matrix before each solve.
use super::csr::{CsrMatrix, CsrPattern};
use super::krylov::{Krylov, KrylovMethod, Solve, SolverConfig, SolverReport};
use super::precond::{Preconditioner, PreconditionerKind};
use crate::error::SolveError;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// When the matrix is rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyPolicy {
    /// Constant coefficients, assembled at the first solve only
    AssembleOnce,
    /// Coefficients change between steps
    ReassembleEveryStep,
}

/// Iterative method and preconditioner of one system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverPair {
    /// Krylov method
    pub method: KrylovMethod,
    /// Preconditioner
    pub preconditioner: PreconditionerKind,
    /// Tolerances
    #[serde(flatten)]
    pub config: SolverConfig,
}

impl Default for SolverPair {
    fn default() -> Self {
        Self::cg_ssor()
    }
}

impl SolverPair {
    /// Symmetric positive definite systems
    pub fn cg_ssor() -> Self {
        Self {
            method: KrylovMethod::Cg,
            preconditioner: PreconditionerKind::Ssor,
            config: SolverConfig::default(),
        }
    }

    /// Non-symmetric convection dominated systems
    pub fn bicgstab_amg() -> Self {
        Self {
            method: KrylovMethod::Bicgstab,
            preconditioner: PreconditionerKind::Amg,
            config: SolverConfig::default(),
        }
    }
}

/// Matrix, right-hand side and constraints of one sub-step
#[derive(Debug, Clone)]
pub struct LinearSystem {
    name: &'static str,
    policy: AssemblyPolicy,
    pair: SolverPair,
    solver: Krylov,
    /// Assembled operator without constraints
    raw: CsrMatrix,
    /// Operator after elimination
    matrix: CsrMatrix,
    precond: Option<Preconditioner>,
    rhs: Array1<f64>,
    constrained: Vec<bool>,
    values: Array1<f64>,
    assemblies: usize,
    dirty: bool,
}

impl LinearSystem {
    /// Empty system on `pattern`
    pub fn new(
        name: &'static str,
        pattern: Arc<CsrPattern>,
        policy: AssemblyPolicy,
        pair: SolverPair,
    ) -> Self {
        let n = pattern.nrows();
        let raw = CsrMatrix::zeros(pattern);
        Self {
            name,
            policy,
            pair,
            solver: Krylov::new(pair.method, pair.config),
            matrix: raw.clone(),
            raw,
            precond: None,
            rhs: Array1::zeros(n),
            constrained: vec![false; n],
            values: Array1::zeros(n),
            assemblies: 0,
            dirty: true,
        }
    }

    /// Name used in logs and errors
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Assembly policy
    pub fn policy(&self) -> AssemblyPolicy {
        self.policy
    }

    /// Solver pair
    pub fn pair(&self) -> SolverPair {
        self.pair
    }

    /// Number of unknowns
    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// Whether the next step must rebuild the matrix
    pub fn needs_assembly(&self) -> bool {
        self.assemblies == 0 || self.policy == AssemblyPolicy::ReassembleEveryStep
    }

    /// Number of matrix assemblies so far
    pub fn assemblies(&self) -> usize {
        self.assemblies
    }

    /// Rebuild the matrix. `fill` receives a zeroed matrix on the fixed pattern.
    pub fn assemble<F: FnOnce(&mut CsrMatrix)>(&mut self, fill: F) {
        self.raw.clear();
        fill(&mut self.raw);
        self.assemblies += 1;
        self.dirty = true;
    }

    /// Assembled operator (without constraints)
    pub fn matrix(&self) -> &CsrMatrix {
        &self.raw
    }

    /// Operator with constraints eliminated
    pub fn constrained_matrix(&mut self) -> &CsrMatrix {
        self.finalize();
        &self.matrix
    }

    /// Right-hand side, to be filled before [`LinearSystem::solve`]
    pub fn rhs_mut(&mut self) -> &mut Array1<f64> {
        &mut self.rhs
    }

    /// Replace Dirichlet constraints. Later entries override earlier
    /// ones on the same dof.
    pub fn set_dirichlet(&mut self, dofs: &[(usize, f64)]) {
        let mut constrained = vec![false; self.size()];
        self.values.fill(0.);
        for &(dof, value) in dofs {
            constrained[dof] = true;
            self.values[dof] = value;
        }
        if constrained != self.constrained {
            self.constrained = constrained;
            self.dirty = true;
        }
    }

    /// Number of constrained dofs
    pub fn num_constrained(&self) -> usize {
        self.constrained.iter().filter(|c| **c).count()
    }

    fn finalize(&mut self) {
        if !self.dirty {
            return;
        }
        self.matrix = self.raw.clone();
        self.matrix.eliminate(&self.constrained);
        self.precond = None;
        self.dirty = false;
    }

    /// The operator annihilates constants, i.e. it has no anchor
    pub fn is_singular(&mut self) -> bool {
        self.finalize();
        let ones = Array1::from_elem(self.size(), 1.);
        let y = self.matrix.dot(&ones);
        let defect = y.iter().fold(0f64, |m, v| m.max(v.abs()));
        defect <= 1e-12 * self.matrix.norm_inf()
    }

    /// Apply constraints and solve. `x` is the initial guess and receives
    /// the solution.
    pub fn solve(&mut self, x: &mut Array1<f64>) -> Result<SolverReport, SolveError> {
        self.finalize();

        // lifting
        let mut g = Array1::zeros(self.size());
        for (i, &c) in self.constrained.iter().enumerate() {
            if c {
                g[i] = self.values[i];
            }
        }
        let lift = self.raw.dot(&g);
        let mut b = self.rhs.clone();
        for (i, &c) in self.constrained.iter().enumerate() {
            if c {
                b[i] = g[i];
                x[i] = g[i];
            } else {
                b[i] -= lift[i];
            }
        }

        self.iterate(&b, x)
    }

    /// Solve the constrained operator for `b` with zero Dirichlet values.
    /// Constrained entries of `b` are ignored and vanish in the result.
    pub fn solve_homogeneous(&mut self, b: &Array1<f64>) -> Result<Array1<f64>, SolveError> {
        let mut b = b.clone();
        for (i, &c) in self.constrained.iter().enumerate() {
            if c {
                b[i] = 0.;
            }
        }
        let mut x = Array1::zeros(self.size());
        self.iterate(&b, &mut x)?;
        Ok(x)
    }

    fn iterate(&mut self, b: &Array1<f64>, x: &mut Array1<f64>) -> Result<SolverReport, SolveError> {
        self.finalize();
        if self.precond.is_none() {
            self.precond = Some(Preconditioner::build(self.pair.preconditioner, &self.matrix));
        }
        let precond = match &self.precond {
            Some(p) => p,
            None => return Err(SolveError::NonFinite(self.name)),
        };
        let report = self.solver.solve(&self.matrix, b, x, precond);
        log::debug!(
            "{}: {} {} iterations, residual {:.3e}",
            self.name,
            self.solver.name(),
            report.iterations,
            report.residual
        );
        if report.breakdown {
            return Err(SolveError::Breakdown {
                system: self.name,
                iterations: report.iterations,
            });
        }
        if !report.converged {
            return Err(SolveError::NotConverged {
                system: self.name,
                iterations: report.iterations,
                residual: report.residual,
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(SolveError::NonFinite(self.name));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn laplace_pattern(n: usize) -> Arc<CsrPattern> {
        let rows = (0..n)
            .map(|i| {
                let mut set = BTreeSet::new();
                set.insert(i);
                if i > 0 {
                    set.insert(i - 1);
                }
                if i + 1 < n {
                    set.insert(i + 1);
                }
                set
            })
            .collect();
        Arc::new(CsrPattern::from_rows(n, rows))
    }

    fn fill_neumann_laplace(a: &mut CsrMatrix) {
        let n = a.nrows();
        for e in 0..n - 1 {
            a.add(e, e, 1.);
            a.add(e + 1, e + 1, 1.);
            a.add(e, e + 1, -1.);
            a.add(e + 1, e, -1.);
        }
    }

    #[test]
    fn test_dirichlet_lifting() {
        // -u'' = 0, u(0) = 1, u(1) = 3 -> linear
        let n = 11;
        let mut sys = LinearSystem::new(
            "laplace",
            laplace_pattern(n),
            AssemblyPolicy::AssembleOnce,
            SolverPair::cg_ssor(),
        );
        sys.assemble(fill_neumann_laplace);
        sys.set_dirichlet(&[(0, 1.), (n - 1, 3.)]);
        let mut x = Array1::zeros(n);
        sys.solve(&mut x).unwrap();
        for i in 0..n {
            let expected = 1. + 2. * i as f64 / (n - 1) as f64;
            assert!((x[i] - expected).abs() < 1e-6);
        }
        // constrained matrix stays symmetric
        let a = sys.constrained_matrix();
        for i in 0..n {
            for (j, v) in a.row_iter(i) {
                assert!((v - a.get(j, i)).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_homogeneous_solve_ignores_values() {
        // -u'' = 1 on 10 elements, u(0) = u(1) = 0 whatever the stored values
        let n = 11;
        let h = 0.1;
        let mut sys = LinearSystem::new(
            "laplace",
            laplace_pattern(n),
            AssemblyPolicy::AssembleOnce,
            SolverPair::cg_ssor(),
        );
        sys.assemble(fill_neumann_laplace);
        sys.set_dirichlet(&[(0, 1.), (n - 1, 3.)]);
        // stiffness without the 1/h factor, load h per node
        let b = Array1::from_elem(n, h * h);
        let x = sys.solve_homogeneous(&b).unwrap();
        for i in 0..n {
            let t = i as f64 * h;
            assert!((x[i] - 0.5 * t * (1. - t)).abs() < 1e-7);
        }
    }

    #[test]
    fn test_later_constraint_overrides() {
        let mut sys = LinearSystem::new(
            "laplace",
            laplace_pattern(3),
            AssemblyPolicy::AssembleOnce,
            SolverPair::cg_ssor(),
        );
        sys.assemble(fill_neumann_laplace);
        sys.set_dirichlet(&[(0, 1.), (2, 0.), (0, 5.)]);
        let mut x = Array1::zeros(3);
        sys.solve(&mut x).unwrap();
        assert!((x[0] - 5.).abs() < 1e-10);
    }

    #[test]
    fn test_missing_anchor_is_singular() {
        let mut sys = LinearSystem::new(
            "pressure",
            laplace_pattern(5),
            AssemblyPolicy::AssembleOnce,
            SolverPair::cg_ssor(),
        );
        sys.assemble(fill_neumann_laplace);
        assert!(sys.is_singular());
        sys.set_dirichlet(&[(4, 0.)]);
        assert!(!sys.is_singular());
    }

    #[test]
    fn test_assembly_policy() {
        let mut once = LinearSystem::new(
            "a",
            laplace_pattern(3),
            AssemblyPolicy::AssembleOnce,
            SolverPair::cg_ssor(),
        );
        assert!(once.needs_assembly());
        once.assemble(fill_neumann_laplace);
        assert!(!once.needs_assembly());

        let mut every = LinearSystem::new(
            "b",
            laplace_pattern(3),
            AssemblyPolicy::ReassembleEveryStep,
            SolverPair::bicgstab_amg(),
        );
        every.assemble(fill_neumann_laplace);
        assert!(every.needs_assembly());
        assert_eq!(every.assemblies(), 1);
    }

    #[test]
    fn test_solver_pair_serde() {
        let pair: SolverPair =
            serde_json::from_str(r#"{"method": "bicgstab", "preconditioner": "amg", "rtol": 1e-6}"#)
                .unwrap();
        assert_eq!(pair.method, KrylovMethod::Bicgstab);
        assert_eq!(pair.preconditioner, PreconditionerKind::Amg);
        assert_eq!(pair.config.rtol, 1e-6);
        assert_eq!(pair.config.max_iter, 1000);
    }
}
