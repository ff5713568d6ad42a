//! # Lagrange function spaces on a triangular mesh
//!
//! Nodes of a P1 space are the mesh vertices. A P2 space adds one node per
//! edge (its midpoint), numbered after the vertices: node `nv + e` belongs
//! to edge `e`. Local nodes of a cell are the three vertices followed, for
//! P2, by the three edge nodes in local edge order.
//!
//! Vector spaces store components blockwise: dof = `comp * num_nodes + node`.
use crate::mesh::{BoundaryRegion, Facet, Mesh};
use ndarray::{Array1, Array2, ArrayView1};
use std::sync::Arc;

/// Polynomial degree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degree {
    /// Linear
    P1,
    /// Quadratic
    P2,
}

impl Degree {
    /// Number of local nodes per triangle
    pub fn num_local(self) -> usize {
        match self {
            Degree::P1 => 3,
            Degree::P2 => 6,
        }
    }
}

/// Scalar or vector valued Lagrange space
#[derive(Debug, Clone)]
pub struct FunctionSpace {
    mesh: Arc<Mesh>,
    degree: Degree,
    components: usize,
    coords: Array2<f64>,
    cell_nodes: Array2<usize>,
}

impl FunctionSpace {
    /// Build space of `degree` with `components` components (1 or 2)
    pub fn new(mesh: Arc<Mesh>, degree: Degree, components: usize) -> Self {
        let nv = mesh.num_vertices();
        let num_nodes = match degree {
            Degree::P1 => nv,
            Degree::P2 => nv + mesh.num_edges(),
        };
        let mut coords = Array2::zeros((num_nodes, 2));
        coords
            .slice_mut(ndarray::s![..nv, ..])
            .assign(&mesh.vertices);
        if degree == Degree::P2 {
            for (e, [a, b]) in mesh.edges.iter().enumerate() {
                for d in 0..2 {
                    coords[[nv + e, d]] = 0.5 * (mesh.vertices[[*a, d]] + mesh.vertices[[*b, d]]);
                }
            }
        }
        let nloc = degree.num_local();
        let mut cell_nodes = Array2::zeros((mesh.num_cells(), nloc));
        for (c, cell) in mesh.cells.iter().enumerate() {
            for k in 0..3 {
                cell_nodes[[c, k]] = cell[k];
                if degree == Degree::P2 {
                    cell_nodes[[c, 3 + k]] = nv + mesh.cell_edges[c][k];
                }
            }
        }
        Self {
            mesh,
            degree,
            components: components.clamp(1, 2),
            coords,
            cell_nodes,
        }
    }

    /// Underlying mesh
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Polynomial degree
    pub fn degree(&self) -> Degree {
        self.degree
    }

    /// Number of components
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.coords.nrows()
    }

    /// Number of unknowns
    pub fn num_dofs(&self) -> usize {
        self.components * self.num_nodes()
    }

    /// Number of local nodes per cell
    pub fn num_local(&self) -> usize {
        self.degree.num_local()
    }

    /// Global dof of component `comp` at `node`
    pub fn dof(&self, comp: usize, node: usize) -> usize {
        comp * self.num_nodes() + node
    }

    /// Global nodes of a cell
    pub fn cell_nodes(&self, cell: usize) -> ArrayView1<usize> {
        self.cell_nodes.row(cell)
    }

    /// Global dofs of a cell, local index `comp * num_local + a`
    pub fn cell_dofs(&self, cell: usize) -> Vec<usize> {
        let nodes = self.cell_nodes(cell);
        (0..self.components)
            .flat_map(|c| nodes.iter().map(move |&n| (c, n)))
            .map(|(c, n)| self.dof(c, n))
            .collect()
    }

    /// Coordinates of a node
    pub fn node_coords(&self, node: usize) -> [f64; 2] {
        [self.coords[[node, 0]], self.coords[[node, 1]]]
    }

    /// Local node indices lying on a boundary facet
    pub fn facet_local_nodes(&self, facet: &Facet) -> Vec<usize> {
        let k = facet.local;
        let mut nodes = vec![(k + 1) % 3, (k + 2) % 3];
        if self.degree == Degree::P2 {
            nodes.push(3 + k);
        }
        nodes
    }

    /// Sorted nodes on facets of `region`
    pub fn region_nodes(&self, region: BoundaryRegion) -> Vec<usize> {
        let mut nodes: Vec<usize> = self
            .mesh
            .facets_in(region)
            .flat_map(|f| {
                let cell = self.cell_nodes(f.cell);
                self.facet_local_nodes(f)
                    .into_iter()
                    .map(move |a| cell[a])
            })
            .collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Local coefficients per component
    pub fn gather(&self, coeffs: &Array1<f64>, cell: usize) -> [[f64; 6]; 2] {
        let mut local = [[0.; 6]; 2];
        let nodes = self.cell_nodes(cell);
        for (c, loc) in local.iter_mut().enumerate().take(self.components) {
            for (a, &n) in nodes.iter().enumerate() {
                loc[a] = coeffs[self.dof(c, n)];
            }
        }
        local
    }

    /// Nodal interpolation of `f`
    pub fn interpolate<F: Fn([f64; 2]) -> [f64; 2]>(&self, f: F) -> Array1<f64> {
        let mut coeffs = Array1::zeros(self.num_dofs());
        for n in 0..self.num_nodes() {
            let v = f(self.node_coords(n));
            for c in 0..self.components {
                coeffs[self.dof(c, n)] = v[c];
            }
        }
        coeffs
    }

    /// Values of component `comp` at the mesh vertices
    pub fn vertex_values(&self, coeffs: &Array1<f64>, comp: usize) -> Array1<f64> {
        let nv = self.mesh.num_vertices();
        let start = comp * self.num_nodes();
        coeffs.slice(ndarray::s![start..start + nv]).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2_node_count() {
        let mesh = Arc::new(Mesh::rectangle(1., 1., 2, 2).unwrap());
        let p1 = FunctionSpace::new(mesh.clone(), Degree::P1, 1);
        let p2 = FunctionSpace::new(mesh.clone(), Degree::P2, 2);
        assert_eq!(p1.num_dofs(), 9);
        assert_eq!(p2.num_nodes(), 9 + mesh.num_edges());
        assert_eq!(p2.num_dofs(), 2 * (9 + 16));
        assert_eq!(p2.cell_dofs(0).len(), 12);
    }

    #[test]
    fn test_edge_nodes_are_midpoints() {
        let mesh = Arc::new(Mesh::rectangle(2., 1., 1, 1).unwrap());
        let p2 = FunctionSpace::new(mesh.clone(), Degree::P2, 1);
        for c in 0..mesh.num_cells() {
            let nodes = p2.cell_nodes(c);
            for k in 0..3 {
                let a = p2.node_coords(nodes[(k + 1) % 3]);
                let b = p2.node_coords(nodes[(k + 2) % 3]);
                let m = p2.node_coords(nodes[3 + k]);
                assert!((m[0] - 0.5 * (a[0] + b[0])).abs() < 1e-14);
                assert!((m[1] - 0.5 * (a[1] + b[1])).abs() < 1e-14);
            }
        }
    }

    #[test]
    fn test_interpolate_and_vertex_values() {
        let mesh = Arc::new(Mesh::rectangle(1., 1., 2, 2).unwrap());
        let p2 = FunctionSpace::new(mesh, Degree::P2, 2);
        let u = p2.interpolate(|p| [p[0], 2. * p[1]]);
        let uy = p2.vertex_values(&u, 1);
        assert_eq!(uy.len(), 9);
        assert!((uy[8] - 2.).abs() < 1e-14);
    }
}
