//! # Triangular mesh with tagged boundary facets
//!
//! A [`Mesh`] is built from vertex coordinates and triangle connectivity.
//! Construction validates the connectivity, orients every triangle
//! counter-clockwise and derives the edge list, the cell to edge map and
//! the boundary facets. Boundary facets carry a [`RegionMask`], filled once
//! at setup by [`Mesh::tag_boundary`].
//!
//! Local edge `k` of a triangle is the edge opposite to local vertex `k`.
pub mod channel;
pub mod gmsh;
pub mod regions;
pub use channel::{ChannelGeometry, GeometryProvider};
pub use gmsh::read_gmsh;
pub use regions::{BoundaryRegion, RegionMask};

use crate::error::MeshError;
use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;

/// Relative area below which a triangle counts as degenerate
const DEGENERATE_RATIO: f64 = 1e-12;

/// Boundary edge together with its owning cell
#[derive(Debug, Clone)]
pub struct Facet {
    /// Index into [`Mesh::edges`]
    pub edge: usize,
    /// Adjacent cell
    pub cell: usize,
    /// Local edge index inside `cell`
    pub local: usize,
    /// Regions this facet belongs to
    pub regions: RegionMask,
}

/// Two dimensional triangular mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex coordinates, shape (num_vertices, 2)
    pub vertices: Array2<f64>,
    /// Counter-clockwise vertex indices per triangle
    pub cells: Vec<[usize; 3]>,
    /// Unique edges as sorted vertex pairs
    pub edges: Vec<[usize; 2]>,
    /// Edge index of local edge k (opposite vertex k)
    pub cell_edges: Vec<[usize; 3]>,
    /// Edges with exactly one adjacent cell
    pub facets: Vec<Facet>,
}

impl Mesh {
    /// Build and validate mesh.
    ///
    /// # Errors
    /// Empty connectivity, out of range indices, orphan vertices
    /// and zero area triangles.
    pub fn new(vertices: Array2<f64>, cells: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if cells.is_empty() {
            return Err(MeshError::Empty);
        }
        let nv = vertices.nrows();
        let mut used = vec![false; nv];
        for (i, cell) in cells.iter().enumerate() {
            for &v in cell {
                if v >= nv {
                    return Err(MeshError::InvalidIndex {
                        cell: i,
                        vertex: v,
                        num_vertices: nv,
                    });
                }
                used[v] = true;
            }
        }
        if let Some(orphan) = used.iter().position(|u| !u) {
            return Err(MeshError::OrphanVertex(orphan));
        }

        let mut cells = cells;
        for (i, cell) in cells.iter_mut().enumerate() {
            let area = signed_area(&vertices, cell);
            let h = longest_edge(&vertices, cell);
            if area.abs() <= DEGENERATE_RATIO * h * h {
                return Err(MeshError::DegenerateCell {
                    cell: i,
                    area: area.abs(),
                });
            }
            if area < 0. {
                cell.swap(1, 2);
            }
        }

        // Edges
        let mut lookup: HashMap<[usize; 2], usize> = HashMap::new();
        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut owners: Vec<Vec<(usize, usize)>> = Vec::new();
        let mut cell_edges = vec![[0usize; 3]; cells.len()];
        for (i, cell) in cells.iter().enumerate() {
            for k in 0..3 {
                let key = sorted_pair(cell[(k + 1) % 3], cell[(k + 2) % 3]);
                let e = *lookup.entry(key).or_insert_with(|| {
                    edges.push(key);
                    owners.push(Vec::with_capacity(2));
                    edges.len() - 1
                });
                owners[e].push((i, k));
                cell_edges[i][k] = e;
            }
        }

        let facets = owners
            .iter()
            .enumerate()
            .filter(|(_, o)| o.len() == 1)
            .map(|(e, o)| Facet {
                edge: e,
                cell: o[0].0,
                local: o[0].1,
                regions: RegionMask::empty(),
            })
            .collect();

        Ok(Mesh {
            vertices,
            cells,
            edges,
            cell_edges,
            facets,
        })
    }

    /// Structured triangulation of the rectangle [0, length] x [0, height]
    pub fn rectangle(length: f64, height: f64, nx: usize, ny: usize) -> Result<Self, MeshError> {
        let (vertices, cells) = rectangle_grid(length, height, nx, ny);
        Self::new(vertices, cells)
    }

    /// Remove vertices that are not referenced by any triangle and
    /// renumber the connectivity accordingly.
    pub fn prune_orphans(
        vertices: &Array2<f64>,
        cells: &[[usize; 3]],
    ) -> (Array2<f64>, Vec<[usize; 3]>) {
        let nv = vertices.nrows();
        let mut map = vec![usize::MAX; nv];
        let mut kept = Vec::new();
        for cell in cells {
            for &v in cell {
                if v < nv && map[v] == usize::MAX {
                    map[v] = kept.len();
                    kept.push(v);
                }
            }
        }
        let mut pruned = Array2::zeros((kept.len(), 2));
        for (new, &old) in kept.iter().enumerate() {
            pruned.row_mut(new).assign(&vertices.row(old));
        }
        let cells = cells
            .iter()
            .map(|c| {
                [
                    map.get(c[0]).copied().unwrap_or(c[0]),
                    map.get(c[1]).copied().unwrap_or(c[1]),
                    map.get(c[2]).copied().unwrap_or(c[2]),
                ]
            })
            .collect();
        (pruned, cells)
    }

    /// Assign region tags to every boundary facet.
    ///
    /// `classify` receives the two end points of a facet. Previous
    /// tags are replaced.
    pub fn tag_boundary<F>(&mut self, classify: F)
    where
        F: Fn([f64; 2], [f64; 2]) -> RegionMask,
    {
        for i in 0..self.facets.len() {
            let [a, b] = self.edges[self.facets[i].edge];
            let mask = classify(self.vertex(a), self.vertex(b));
            self.facets[i].regions = mask;
        }
    }

    /// Number of vertices
    pub fn num_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    /// Number of triangles
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of edges
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Coordinates of vertex i
    pub fn vertex(&self, i: usize) -> [f64; 2] {
        let row: ArrayView1<f64> = self.vertices.row(i);
        [row[0], row[1]]
    }

    /// Corner coordinates of a triangle
    pub fn cell_coords(&self, cell: usize) -> [[f64; 2]; 3] {
        let c = self.cells[cell];
        [self.vertex(c[0]), self.vertex(c[1]), self.vertex(c[2])]
    }

    /// Area of a triangle
    pub fn cell_area(&self, cell: usize) -> f64 {
        signed_area(&self.vertices, &self.cells[cell])
    }

    /// Length of an edge
    pub fn edge_length(&self, edge: usize) -> f64 {
        let [a, b] = self.edges[edge];
        distance(self.vertex(a), self.vertex(b))
    }

    /// Minimum edge length
    pub fn h_min(&self) -> f64 {
        (0..self.num_edges())
            .map(|e| self.edge_length(e))
            .fold(f64::INFINITY, f64::min)
    }

    /// Boundary facets that carry `region`
    pub fn facets_in(&self, region: BoundaryRegion) -> impl Iterator<Item = &Facet> {
        self.facets
            .iter()
            .filter(move |f| f.regions.contains(region))
    }

    /// Total length of the facets carrying `region`
    pub fn region_length(&self, region: BoundaryRegion) -> f64 {
        self.facets_in(region).map(|f| self.edge_length(f.edge)).sum()
    }
}

/// Vertices and connectivity of a structured rectangle grid,
/// two triangles per quad.
pub(crate) fn rectangle_grid(
    length: f64,
    height: f64,
    nx: usize,
    ny: usize,
) -> (Array2<f64>, Vec<[usize; 3]>) {
    let (nx, ny) = (nx.max(1), ny.max(1));
    let mut vertices = Array2::zeros(((nx + 1) * (ny + 1), 2));
    for j in 0..=ny {
        for i in 0..=nx {
            let v = j * (nx + 1) + i;
            vertices[[v, 0]] = length * i as f64 / nx as f64;
            vertices[[v, 1]] = height * j as f64 / ny as f64;
        }
    }
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v00 = j * (nx + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + nx + 1;
            let v11 = v01 + 1;
            cells.push([v00, v10, v11]);
            cells.push([v00, v11, v01]);
        }
    }
    (vertices, cells)
}

fn sorted_pair(a: usize, b: usize) -> [usize; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn signed_area(vertices: &Array2<f64>, cell: &[usize; 3]) -> f64 {
    let (x0, y0) = (vertices[[cell[0], 0]], vertices[[cell[0], 1]]);
    let (x1, y1) = (vertices[[cell[1], 0]], vertices[[cell[1], 1]]);
    let (x2, y2) = (vertices[[cell[2], 0]], vertices[[cell[2], 1]]);
    0.5 * ((x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0))
}

fn longest_edge(vertices: &Array2<f64>, cell: &[usize; 3]) -> f64 {
    let p = |i: usize| [vertices[[cell[i], 0]], vertices[[cell[i], 1]]];
    distance(p(0), p(1))
        .max(distance(p(1), p(2)))
        .max(distance(p(2), p(0)))
}
