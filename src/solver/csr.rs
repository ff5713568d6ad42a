//! Compressed sparse row matrix
//!
//! The sparsity pattern is shared (`Arc`) and immutable, so matrices
//! reassembled on the same pattern only rewrite their values.
use ndarray::{Array1, Zip};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Row pointers and sorted column indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrPattern {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// Build pattern from column sets per row
    pub fn from_rows(ncols: usize, rows: Vec<BTreeSet<usize>>) -> Self {
        let nrows = rows.len();
        let mut row_ptr = Vec::with_capacity(nrows + 1);
        let mut col_idx = Vec::with_capacity(rows.iter().map(|r| r.len()).sum());
        row_ptr.push(0);
        for row in rows {
            col_idx.extend(row.into_iter());
            row_ptr.push(col_idx.len());
        }
        Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
        }
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Column indices of row
    pub fn row(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// Storage range of row
    pub fn range(&self, row: usize) -> std::ops::Range<usize> {
        self.row_ptr[row]..self.row_ptr[row + 1]
    }

    /// Storage position of (row, col)
    pub fn find(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row(row).binary_search(&col).ok().map(|k| start + k)
    }
}

/// Sparse matrix on a shared pattern
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    pattern: Arc<CsrPattern>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Zero matrix on pattern
    pub fn zeros(pattern: Arc<CsrPattern>) -> Self {
        let values = vec![0.; pattern.nnz()];
        Self { pattern, values }
    }

    /// Build from triplets, duplicates are summed
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut rows = vec![BTreeSet::new(); nrows];
        for &(i, j, _) in triplets {
            rows[i].insert(j);
        }
        let mut matrix = Self::zeros(Arc::new(CsrPattern::from_rows(ncols, rows)));
        for &(i, j, v) in triplets {
            matrix.add(i, j, v);
        }
        matrix
    }

    /// Identity matrix
    pub fn identity(n: usize) -> Self {
        let triplets: Vec<_> = (0..n).map(|i| (i, i, 1.)).collect();
        Self::from_triplets(n, n, &triplets)
    }

    /// Shared pattern
    pub fn pattern(&self) -> &Arc<CsrPattern> {
        &self.pattern
    }

    /// Number of rows
    pub fn nrows(&self) -> usize {
        self.pattern.nrows
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.pattern.ncols
    }

    /// Stored values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Set all stored values to zero
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.);
    }

    /// Entry (row, col), zero if not stored
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.pattern
            .find(row, col)
            .map(|k| self.values[k])
            .unwrap_or(0.)
    }

    /// Add to stored entry. Returns false if (row, col) is not in the pattern.
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.pattern.find(row, col) {
            Some(k) => {
                self.values[k] += value;
                true
            }
            None => false,
        }
    }

    /// Iterate (col, value) of row
    pub fn row_iter(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.pattern.range(row);
        self.pattern.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Diagonal entries
    pub fn diagonal(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.nrows(), |i| self.get(i, i))
    }

    /// Replace row i by the unit row and column i by the unit column
    pub(crate) fn eliminate(&mut self, constrained: &[bool]) {
        for i in 0..self.nrows() {
            for k in self.pattern.range(i) {
                let j = self.pattern.col_idx[k];
                if constrained[i] || constrained[j] {
                    self.values[k] = if i == j { 1. } else { 0. };
                }
            }
        }
    }

    /// y = A x
    pub fn mul_vec(&self, x: &Array1<f64>, y: &mut Array1<f64>) {
        Zip::indexed(y).par_for_each(|i, yi| {
            *yi = self.row_iter(i).map(|(j, a)| a * x[j]).sum();
        });
    }

    /// Return A x
    pub fn dot(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut y = Array1::zeros(self.nrows());
        self.mul_vec(x, &mut y);
        y
    }

    /// Maximum absolute row sum
    pub fn norm_inf(&self) -> f64 {
        (0..self.nrows())
            .map(|i| self.row_iter(i).map(|(_, a)| a.abs()).sum::<f64>())
            .fold(0., f64::max)
    }

    /// Transpose
    pub fn transpose(&self) -> Self {
        let mut triplets = Vec::with_capacity(self.values.len());
        for i in 0..self.nrows() {
            for (j, a) in self.row_iter(i) {
                triplets.push((j, i, a));
            }
        }
        Self::from_triplets(self.ncols(), self.nrows(), &triplets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn laplace_1d(n: usize) -> CsrMatrix {
        let mut t = Vec::new();
        for i in 0..n {
            t.push((i, i, 2.));
            if i > 0 {
                t.push((i, i - 1, -1.));
            }
            if i + 1 < n {
                t.push((i, i + 1, -1.));
            }
        }
        CsrMatrix::from_triplets(n, n, &t)
    }

    #[test]
    fn test_mul_vec() {
        let a = laplace_1d(4);
        let y = a.dot(&array![1., 2., 3., 4.]);
        assert_eq!(y, array![0., 0., 0., 5.]);
    }

    #[test]
    fn test_duplicates_are_summed() {
        let a = CsrMatrix::from_triplets(2, 2, &[(0, 0, 1.), (0, 0, 2.), (1, 0, 1.)]);
        assert_eq!(a.get(0, 0), 3.);
        assert_eq!(a.get(0, 1), 0.);
        assert!(a.pattern().find(0, 1).is_none());
    }

    #[test]
    fn test_eliminate_is_symmetric() {
        let mut a = laplace_1d(3);
        a.eliminate(&[true, false, false]);
        assert_eq!(a.get(0, 0), 1.);
        assert_eq!(a.get(0, 1), 0.);
        assert_eq!(a.get(1, 0), 0.);
        assert_eq!(a.get(1, 1), 2.);
    }

    #[test]
    fn test_transpose() {
        let a = CsrMatrix::from_triplets(2, 3, &[(0, 2, 1.5), (1, 0, -1.)]);
        let t = a.transpose();
        assert_eq!(t.nrows(), 3);
        assert_eq!(t.get(2, 0), 1.5);
        assert_eq!(t.get(0, 1), -1.);
    }
}
