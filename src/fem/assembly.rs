//! Assembly of local kernels into global matrices and vectors
//!
//! Cell kernels are evaluated in parallel; the scatter into the global
//! matrix is sequential. Local rows and columns follow
//! [`FunctionSpace::cell_dofs`]: index `comp * num_local + a`.
use crate::mesh::{BoundaryRegion, Facet};
use crate::solver::{CsrMatrix, CsrPattern};
use crate::space::FunctionSpace;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Pattern coupling every test dof of a cell with every trial dof of it
pub fn sparsity(test: &FunctionSpace, trial: &FunctionSpace) -> CsrPattern {
    let mut rows = vec![BTreeSet::new(); test.num_dofs()];
    for cell in 0..test.mesh().num_cells() {
        let cols = trial.cell_dofs(cell);
        for i in test.cell_dofs(cell) {
            rows[i].extend(cols.iter().copied());
        }
    }
    CsrPattern::from_rows(trial.num_dofs(), rows)
}

/// Add cell contributions `kernel(cell, local)` to `matrix`
pub fn assemble_matrix<F>(matrix: &mut CsrMatrix, test: &FunctionSpace, trial: &FunctionSpace, kernel: F)
where
    F: Fn(usize, &mut Array2<f64>) + Sync,
{
    let (nr, nc) = (
        test.components() * test.num_local(),
        trial.components() * trial.num_local(),
    );
    let locals: Vec<Array2<f64>> = (0..test.mesh().num_cells())
        .into_par_iter()
        .map(|cell| {
            let mut local = Array2::zeros((nr, nc));
            kernel(cell, &mut local);
            local
        })
        .collect();
    for (cell, local) in locals.iter().enumerate() {
        scatter_matrix(matrix, &test.cell_dofs(cell), &trial.cell_dofs(cell), local);
    }
}

/// Add cell contributions `kernel(cell, local)` to `vector`
pub fn assemble_vector<F>(vector: &mut Array1<f64>, test: &FunctionSpace, kernel: F)
where
    F: Fn(usize, &mut Array1<f64>) + Sync,
{
    let n = test.components() * test.num_local();
    let locals: Vec<Array1<f64>> = (0..test.mesh().num_cells())
        .into_par_iter()
        .map(|cell| {
            let mut local = Array1::zeros(n);
            kernel(cell, &mut local);
            local
        })
        .collect();
    for (cell, local) in locals.iter().enumerate() {
        for (&i, v) in test.cell_dofs(cell).iter().zip(local.iter()) {
            vector[i] += v;
        }
    }
}

/// Add contributions of facets carrying any of `regions` to `matrix`.
/// Each facet is visited once. The local matrix refers to the dofs of
/// the adjacent cell.
pub fn assemble_facet_matrix<F>(
    matrix: &mut CsrMatrix,
    test: &FunctionSpace,
    trial: &FunctionSpace,
    regions: &[BoundaryRegion],
    kernel: F,
) where
    F: Fn(&Facet, &mut Array2<f64>),
{
    let (nr, nc) = (
        test.components() * test.num_local(),
        trial.components() * trial.num_local(),
    );
    for facet in facets_of(test, regions) {
        let mut local = Array2::zeros((nr, nc));
        kernel(facet, &mut local);
        scatter_matrix(
            matrix,
            &test.cell_dofs(facet.cell),
            &trial.cell_dofs(facet.cell),
            &local,
        );
    }
}

/// Add contributions of facets carrying any of `regions` to `vector`
pub fn assemble_facet_vector<F>(
    vector: &mut Array1<f64>,
    test: &FunctionSpace,
    regions: &[BoundaryRegion],
    kernel: F,
) where
    F: Fn(&Facet, &mut Array1<f64>),
{
    let n = test.components() * test.num_local();
    for facet in facets_of(test, regions) {
        let mut local = Array1::zeros(n);
        kernel(facet, &mut local);
        for (&i, v) in test.cell_dofs(facet.cell).iter().zip(local.iter()) {
            vector[i] += v;
        }
    }
}

fn facets_of<'a>(
    space: &'a FunctionSpace,
    regions: &'a [BoundaryRegion],
) -> impl Iterator<Item = &'a Facet> {
    space
        .mesh()
        .facets
        .iter()
        .filter(move |f| regions.iter().any(|r| f.regions.contains(*r)))
}

fn scatter_matrix(matrix: &mut CsrMatrix, rows: &[usize], cols: &[usize], local: &Array2<f64>) {
    for (a, &i) in rows.iter().enumerate() {
        for (b, &j) in cols.iter().enumerate() {
            let v = local[[a, b]];
            if v != 0. {
                matrix.add(i, j, v);
            }
        }
    }
}
