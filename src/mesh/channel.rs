//! Channel with a circular obstacle
//!
//! Default geometry: channel [0, 2.2] x [0, 0.41], cylinder of radius
//! 0.05 centred at (0.2, 0.2).
use super::regions::{BoundaryRegion, RegionMask};
use super::{rectangle_grid, Mesh};
use crate::error::MeshError;
use serde::{Deserialize, Serialize};

/// Produces a tagged triangulation for a given mesh size
pub trait GeometryProvider {
    /// Return a validated mesh with characteristic size `lcar`
    /// and tagged boundary facets.
    fn generate(&self, lcar: f64) -> Result<Mesh, MeshError>;
}

/// Channel geometry and region predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelGeometry {
    /// Channel length (x)
    pub length: f64,
    /// Channel height (y)
    pub height: f64,
    /// Centre of the cylinder
    pub center: [f64; 2],
    /// Radius of the cylinder
    pub radius: f64,
    /// Cut out the cylinder
    pub obstacle: bool,
    /// Tolerance of the coordinate predicates
    pub tol: f64,
    /// Extra radius accepted by the point-in-disk predicate
    pub obstacle_band: f64,
}

impl Default for ChannelGeometry {
    fn default() -> Self {
        Self {
            length: 2.2,
            height: 0.41,
            center: [0.2, 0.2],
            radius: 0.05,
            obstacle: true,
            tol: 1e-6,
            obstacle_band: 1e-6,
        }
    }
}

impl ChannelGeometry {
    /// Plain channel without cylinder
    pub fn without_obstacle() -> Self {
        Self {
            obstacle: false,
            ..Self::default()
        }
    }

    /// Point on the inlet plane
    pub fn is_inlet(&self, p: [f64; 2]) -> bool {
        p[0] < self.tol
    }

    /// Point on the outlet plane
    pub fn is_outlet(&self, p: [f64; 2]) -> bool {
        (p[0] - self.length).abs() < self.tol
    }

    /// Point on the bottom or top wall
    pub fn is_wall(&self, p: [f64; 2]) -> bool {
        p[1] < self.tol || p[1] > self.height - self.tol
    }

    /// Point inside (or on) the cylinder, widened by `band`
    pub fn in_obstacle(&self, p: [f64; 2], band: f64) -> bool {
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        dx * dx + dy * dy < (self.radius + band).powi(2)
    }

    /// Regions of a boundary facet with end points `a` and `b`
    pub fn classify(&self, a: [f64; 2], b: [f64; 2]) -> RegionMask {
        self.classify_with_band(a, b, self.obstacle_band)
    }

    fn classify_with_band(&self, a: [f64; 2], b: [f64; 2], band: f64) -> RegionMask {
        let mut mask = RegionMask::empty();
        if self.is_inlet(a) && self.is_inlet(b) {
            mask.insert(BoundaryRegion::Inlet);
        }
        if self.is_outlet(a) && self.is_outlet(b) {
            mask.insert(BoundaryRegion::Outlet);
        }
        if self.is_wall(a) && self.is_wall(b) {
            mask.insert(BoundaryRegion::Walls);
        }
        if self.obstacle && self.in_obstacle(a, band) && self.in_obstacle(b, band) {
            mask.insert(BoundaryRegion::Obstacle);
        }
        mask
    }

    /// Structured nx x ny triangulation, cylinder cut out if enabled
    pub fn structured(&self, nx: usize, ny: usize) -> Result<Mesh, MeshError> {
        let (vertices, mut cells) = rectangle_grid(self.length, self.height, nx, ny);
        let hx = self.length / nx.max(1) as f64;
        let hy = self.height / ny.max(1) as f64;
        if self.obstacle {
            cells.retain(|c| {
                let centroid = [
                    (vertices[[c[0], 0]] + vertices[[c[1], 0]] + vertices[[c[2], 0]]) / 3.,
                    (vertices[[c[0], 1]] + vertices[[c[1], 1]] + vertices[[c[2], 1]]) / 3.,
                ];
                !self.in_obstacle(centroid, 0.)
            });
        }
        let (vertices, cells) = Mesh::prune_orphans(&vertices, &cells);
        let mut mesh = Mesh::new(vertices, cells)?;

        // Hole boundary vertices lie within one cell diagonal of the circle
        let band = self.obstacle_band.max((hx * hx + hy * hy).sqrt());
        mesh.tag_boundary(|a, b| self.classify_with_band(a, b, band));
        Ok(mesh)
    }
}

impl GeometryProvider for ChannelGeometry {
    fn generate(&self, lcar: f64) -> Result<Mesh, MeshError> {
        let lcar = if lcar > 0. { lcar } else { self.height };
        let nx = (self.length / lcar).ceil() as usize;
        let ny = (self.height / lcar).ceil() as usize;
        self.structured(nx, ny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_plain_channel_regions() {
        let geo = ChannelGeometry::without_obstacle();
        let mesh = geo.structured(8, 4).unwrap();
        assert!((mesh.region_length(BoundaryRegion::Inlet) - 0.41).abs() < 1e-12);
        assert!((mesh.region_length(BoundaryRegion::Outlet) - 0.41).abs() < 1e-12);
        assert!((mesh.region_length(BoundaryRegion::Walls) - 4.4).abs() < 1e-12);
        assert_eq!(mesh.facets_in(BoundaryRegion::Obstacle).count(), 0);
        assert!(mesh.facets.iter().all(|f| !f.regions.is_empty()));
    }

    #[test]
    fn test_obstacle_is_cut_out_and_tagged() {
        let geo = ChannelGeometry::default();
        let mesh = geo.generate(0.02).unwrap();
        let perimeter = mesh.region_length(BoundaryRegion::Obstacle);
        assert!(perimeter > 0.8 * 2. * PI * geo.radius);
        assert!(perimeter < 1.6 * 2. * PI * geo.radius);
        // every boundary facet belongs to some region
        assert!(mesh.facets.iter().all(|f| !f.regions.is_empty()));
        for f in mesh.facets_in(BoundaryRegion::Obstacle) {
            assert!(!f.regions.contains(BoundaryRegion::Walls));
        }
    }

    #[test]
    fn test_wall_predicate_grouping_on_boundary() {
        // `bottom or top and on_boundary` vs `(bottom or top) and on_boundary`
        let geo = ChannelGeometry::without_obstacle();
        let mesh = geo.structured(8, 4).unwrap();
        let mut on_boundary = vec![false; mesh.num_vertices()];
        for f in &mesh.facets {
            for &v in &mesh.edges[f.edge] {
                on_boundary[v] = true;
            }
        }
        for (v, &ob) in on_boundary.iter().enumerate() {
            let p = mesh.vertex(v);
            let bottom = p[1] < geo.tol;
            let top = p[1] > geo.height - geo.tol;
            assert_eq!(bottom || (top && ob), (bottom || top) && ob);
        }
    }

    #[test]
    fn test_obstacle_predicate() {
        let geo = ChannelGeometry::default();
        assert!(geo.in_obstacle([0.25, 0.2], geo.obstacle_band));
        assert!(!geo.in_obstacle([0.2501, 0.2], geo.obstacle_band));
        assert!(geo.is_inlet([0., 0.3]));
        assert!(geo.is_outlet([2.2, 0.3]));
        assert!(geo.is_wall([1.0, 0.41]));
    }
}
