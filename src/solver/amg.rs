//! Aggregation based algebraic multigrid
//!
//! Unsmoothed aggregation with piecewise constant prolongation. The
//! hierarchy is applied as a single V-cycle with one symmetric
//! Gauss-Seidel sweep before and after the coarse correction. The
//! coarsest level is solved with its inverse, computed once by a faer LU
//! factorization. A singular coarsest level is smoothed instead.
//!
//! Rows without strong off-diagonal couplings (e.g. eliminated Dirichlet
//! rows) are not aggregated and are handled by the smoother alone.
use super::csr::CsrMatrix;
use super::precond::Precondition;
use faer::{linalg::solvers::Solve, Mat};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Strength of connection threshold
const THETA: f64 = 0.08;
/// Stop coarsening below this size
const COARSE_SIZE: usize = 200;
/// Maximum number of levels
const MAX_LEVELS: usize = 10;
/// Largest level solved with the dense factorization
const DIRECT_SIZE: usize = 1500;
/// Accepted defect of A * inv(A) - I on the coarsest level
const INVERSE_DEFECT: f64 = 1e-8;
/// Not aggregated
const NONE: usize = usize::MAX;

/// One level of the hierarchy
#[derive(Debug, Clone)]
struct Level {
    matrix: CsrMatrix,
    diag: Array1<f64>,
    /// Aggregate of each row on this level
    aggregate: Vec<usize>,
    num_coarse: usize,
}

/// Multigrid hierarchy
#[derive(Debug, Clone)]
pub struct Amg {
    levels: Vec<Level>,
    coarse: Coarse,
}

/// Solver on the coarsest level
#[derive(Debug, Clone)]
enum Coarse {
    /// Inverse of the coarsest matrix
    Direct(Array2<f64>),
    /// Coarsening stalled on a large level, or the level is singular
    Smooth(CsrMatrix, Array1<f64>),
}

impl Coarse {
    fn from_matrix(a: CsrMatrix) -> Self {
        if a.nrows() <= DIRECT_SIZE {
            if let Some(inv) = dense_inverse(&a) {
                return Coarse::Direct(inv);
            }
            log::debug!("amg: singular coarsest level of size {}, smoothing", a.nrows());
        }
        let diag = smoother_diagonal(&a);
        Coarse::Smooth(a, diag)
    }
}

impl Amg {
    /// Build hierarchy
    pub fn from_matrix(matrix: &CsrMatrix) -> Self {
        let mut levels = Vec::new();
        let mut current = matrix.clone();
        while current.nrows() > COARSE_SIZE && levels.len() + 1 < MAX_LEVELS {
            let (aggregate, num_coarse) = aggregate(&current);
            if num_coarse == 0 || num_coarse * 10 > current.nrows() * 9 {
                break;
            }
            let coarse = galerkin_product(&current, &aggregate, num_coarse);
            levels.push(Level {
                diag: smoother_diagonal(&current),
                matrix: current,
                aggregate,
                num_coarse,
            });
            current = coarse;
        }
        log::trace!(
            "amg: {} levels, coarsest size {}",
            levels.len() + 1,
            current.nrows()
        );
        Self {
            levels,
            coarse: Coarse::from_matrix(current),
        }
    }

    /// Number of levels including the coarsest
    pub fn num_levels(&self) -> usize {
        self.levels.len() + 1
    }

    fn vcycle(&self, level: usize, r: &Array1<f64>, z: &mut Array1<f64>) {
        if level == self.levels.len() {
            match &self.coarse {
                Coarse::Direct(inv) => z.assign(&inv.dot(r)),
                Coarse::Smooth(a, diag) => {
                    z.fill(0.);
                    for _ in 0..4 {
                        gauss_seidel(a, diag, r, z, false);
                        gauss_seidel(a, diag, r, z, true);
                    }
                }
            }
            return;
        }
        let lvl = &self.levels[level];
        let a = &lvl.matrix;
        z.fill(0.);

        // pre-smoothing
        gauss_seidel(a, &lvl.diag, r, z, false);

        // restrict residual
        let res = r - &a.dot(z);
        let mut rc = Array1::zeros(lvl.num_coarse);
        for (i, &agg) in lvl.aggregate.iter().enumerate() {
            if agg != NONE {
                rc[agg] += res[i];
            }
        }

        // coarse correction
        let mut zc = Array1::zeros(lvl.num_coarse);
        self.vcycle(level + 1, &rc, &mut zc);
        for (i, &agg) in lvl.aggregate.iter().enumerate() {
            if agg != NONE {
                z[i] += zc[agg];
            }
        }

        // post-smoothing
        gauss_seidel(a, &lvl.diag, r, z, true);
    }
}

impl Precondition for Amg {
    fn apply(&self, r: &Array1<f64>, z: &mut Array1<f64>) {
        self.vcycle(0, r, z);
    }
}

fn smoother_diagonal(a: &CsrMatrix) -> Array1<f64> {
    a.diagonal()
        .mapv(|d| if d.abs() > f64::MIN_POSITIVE { d } else { 1. })
}

/// One Gauss-Seidel sweep, forward or backward
fn gauss_seidel(a: &CsrMatrix, diag: &Array1<f64>, b: &Array1<f64>, x: &mut Array1<f64>, rev: bool) {
    let n = a.nrows();
    let mut sweep = |i: usize| {
        let mut sum = b[i];
        for (j, v) in a.row_iter(i) {
            if j != i {
                sum -= v * x[j];
            }
        }
        x[i] = sum / diag[i];
    };
    if rev {
        (0..n).rev().for_each(&mut sweep);
    } else {
        (0..n).for_each(&mut sweep);
    }
}

/// Strong neighbours of every row
fn strong_connections(a: &CsrMatrix) -> Vec<Vec<usize>> {
    let diag = a.diagonal();
    (0..a.nrows())
        .map(|i| {
            a.row_iter(i)
                .filter(|&(j, v)| {
                    j != i && v.abs() >= THETA * (diag[i] * diag[j]).abs().sqrt() && v != 0.
                })
                .map(|(j, _)| j)
                .collect()
        })
        .collect()
}

/// Greedy aggregation, returns aggregate index per row and number of aggregates
fn aggregate(a: &CsrMatrix) -> (Vec<usize>, usize) {
    let n = a.nrows();
    let strong = strong_connections(a);
    let mut agg = vec![NONE; n];
    let mut count = 0;

    // seeds whose whole neighbourhood is free
    for i in 0..n {
        if strong[i].is_empty() || agg[i] != NONE {
            continue;
        }
        if strong[i].iter().all(|&j| agg[j] == NONE) {
            agg[i] = count;
            for &j in &strong[i] {
                agg[j] = count;
            }
            count += 1;
        }
    }

    // attach leftovers to a neighbouring aggregate
    let snapshot = agg.clone();
    for i in 0..n {
        if agg[i] != NONE || strong[i].is_empty() {
            continue;
        }
        if let Some(&j) = strong[i].iter().find(|&&j| snapshot[j] != NONE) {
            agg[i] = snapshot[j];
        }
    }

    // remaining rows form their own aggregates
    for i in 0..n {
        if agg[i] != NONE || strong[i].is_empty() {
            continue;
        }
        agg[i] = count;
        for &j in &strong[i] {
            if agg[j] == NONE {
                agg[j] = count;
            }
        }
        count += 1;
    }
    (agg, count)
}

/// P^T A P for piecewise constant P
fn galerkin_product(a: &CsrMatrix, agg: &[usize], nc: usize) -> CsrMatrix {
    let mut entries: HashMap<(usize, usize), f64> = HashMap::new();
    for i in 0..a.nrows() {
        if agg[i] == NONE {
            continue;
        }
        for (j, v) in a.row_iter(i) {
            if agg[j] != NONE {
                *entries.entry((agg[i], agg[j])).or_insert(0.) += v;
            }
        }
    }
    let triplets: Vec<_> = entries.into_iter().map(|((i, j), v)| (i, j, v)).collect();
    CsrMatrix::from_triplets(nc, nc, &triplets)
}

/// Inverse of `a` from a full pivoting LU factorization, `None` if `a`
/// is (numerically) singular
fn dense_inverse(a: &CsrMatrix) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut dense = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        for (j, v) in a.row_iter(i) {
            dense[(i, j)] = v;
        }
    }
    let lu = dense.as_ref().full_piv_lu();
    let mut identity = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        identity[(i, i)] = 1.;
    }
    let x = lu.solve(&identity);
    let inv = Array2::from_shape_fn((n, n), |(i, j)| x[(i, j)]);
    if inv.iter().any(|v| !v.is_finite()) {
        return None;
    }

    // defect of A * inv - I
    let mut defect = 0f64;
    for i in 0..n {
        for k in 0..n {
            let mut sum = if i == k { -1. } else { 0. };
            for (j, v) in a.row_iter(i) {
                sum += v * inv[[j, k]];
            }
            defect = defect.max(sum.abs());
        }
    }
    if defect > INVERSE_DEFECT {
        return None;
    }
    Some(inv)
}
