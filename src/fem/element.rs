//! Lagrange basis functions on a triangle
//!
//! Basis functions are written in barycentric coordinates λ:
//! - P1: φ_i = λ_i
//! - P2: φ_i = λ_i (2 λ_i - 1) at the vertices and φ_{3+k} = 4 λ_a λ_b on
//!   the edge k opposite vertex k, with a = k + 1, b = k + 2 (mod 3)
use super::quadrature::{gauss_line3, QuadratureRule};
use crate::space::Degree;

/// Affine geometry of a triangle
#[derive(Debug, Clone, Copy)]
pub struct CellGeometry {
    /// Corner coordinates
    pub coords: [[f64; 2]; 3],
    /// Area
    pub area: f64,
    /// Constant gradients of the barycentric coordinates
    pub grad_lambda: [[f64; 2]; 3],
}

impl CellGeometry {
    /// Geometry of a counter-clockwise triangle
    pub fn new(coords: [[f64; 2]; 3]) -> Self {
        let [[x0, y0], [x1, y1], [x2, y2]] = coords;
        let det = (x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0);
        let grad_lambda = [
            [(y1 - y2) / det, (x2 - x1) / det],
            [(y2 - y0) / det, (x0 - x2) / det],
            [(y0 - y1) / det, (x1 - x0) / det],
        ];
        Self {
            coords,
            area: 0.5 * det.abs(),
            grad_lambda,
        }
    }

    /// Physical point of barycentric coordinates
    pub fn map(&self, bary: [f64; 3]) -> [f64; 2] {
        let mut p = [0.; 2];
        for (l, c) in bary.iter().zip(self.coords.iter()) {
            p[0] += l * c[0];
            p[1] += l * c[1];
        }
        p
    }

    /// Outward unit normal of local edge k
    pub fn normal(&self, k: usize) -> [f64; 2] {
        let g = self.grad_lambda[k];
        let len = (g[0] * g[0] + g[1] * g[1]).sqrt();
        [-g[0] / len, -g[1] / len]
    }

    /// Length of local edge k
    pub fn edge_length(&self, k: usize) -> f64 {
        let a = self.coords[(k + 1) % 3];
        let b = self.coords[(k + 2) % 3];
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
    }
}

/// Basis values at barycentric point
pub fn basis_values(degree: Degree, l: [f64; 3]) -> [f64; 6] {
    let mut phi = [0.; 6];
    match degree {
        Degree::P1 => phi[..3].copy_from_slice(&l),
        Degree::P2 => {
            for i in 0..3 {
                phi[i] = l[i] * (2. * l[i] - 1.);
                phi[3 + i] = 4. * l[(i + 1) % 3] * l[(i + 2) % 3];
            }
        }
    }
    phi
}

/// Basis gradients at barycentric point
pub fn basis_gradients(degree: Degree, l: [f64; 3], geo: &CellGeometry) -> [[f64; 2]; 6] {
    let g = &geo.grad_lambda;
    let mut grad = [[0.; 2]; 6];
    match degree {
        Degree::P1 => grad[..3].copy_from_slice(g),
        Degree::P2 => {
            for i in 0..3 {
                let (a, b) = ((i + 1) % 3, (i + 2) % 3);
                for d in 0..2 {
                    grad[i][d] = (4. * l[i] - 1.) * g[i][d];
                    grad[3 + i][d] = 4. * (l[a] * g[b][d] + l[b] * g[a][d]);
                }
            }
        }
    }
    grad
}

/// Basis values, gradients and integration weights at quadrature points
#[derive(Debug, Clone)]
pub struct CellValues {
    /// Number of local basis functions
    pub nloc: usize,
    /// Weight times Jacobian
    pub jxw: Vec<f64>,
    /// Physical quadrature points
    pub points: Vec<[f64; 2]>,
    /// Basis values per point
    pub phi: Vec<[f64; 6]>,
    /// Basis gradients per point
    pub grad: Vec<[[f64; 2]; 6]>,
}

impl CellValues {
    /// Values on the cell interior
    pub fn new(geo: &CellGeometry, degree: Degree, rule: &QuadratureRule) -> Self {
        let bary: Vec<[f64; 3]> = rule.points.clone();
        let jxw = rule.weights.iter().map(|w| w * geo.area).collect();
        Self::from_points(geo, degree, &bary, jxw)
    }

    /// Values on local edge k
    pub fn on_edge(geo: &CellGeometry, degree: Degree, k: usize) -> Self {
        let (a, b) = ((k + 1) % 3, (k + 2) % 3);
        let len = geo.edge_length(k);
        let mut bary = Vec::with_capacity(3);
        let mut jxw = Vec::with_capacity(3);
        for (t, w) in gauss_line3().iter() {
            let mut l = [0.; 3];
            l[a] = 1. - t;
            l[b] = *t;
            bary.push(l);
            jxw.push(w * len);
        }
        Self::from_points(geo, degree, &bary, jxw)
    }

    fn from_points(geo: &CellGeometry, degree: Degree, bary: &[[f64; 3]], jxw: Vec<f64>) -> Self {
        Self {
            nloc: degree.num_local(),
            jxw,
            points: bary.iter().map(|l| geo.map(*l)).collect(),
            phi: bary.iter().map(|l| basis_values(degree, *l)).collect(),
            grad: bary.iter().map(|l| basis_gradients(degree, *l, geo)).collect(),
        }
    }

    /// Number of quadrature points
    pub fn len(&self) -> usize {
        self.jxw.len()
    }

    /// No quadrature points
    pub fn is_empty(&self) -> bool {
        self.jxw.is_empty()
    }

    /// Interpolated value at point q
    pub fn value(&self, q: usize, local: &[f64; 6]) -> f64 {
        (0..self.nloc).map(|a| local[a] * self.phi[q][a]).sum()
    }

    /// Interpolated gradient at point q
    pub fn gradient(&self, q: usize, local: &[f64; 6]) -> [f64; 2] {
        let mut g = [0.; 2];
        for a in 0..self.nloc {
            g[0] += local[a] * self.grad[q][a][0];
            g[1] += local[a] * self.grad[q][a][1];
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geo() -> CellGeometry {
        CellGeometry::new([[0.1, 0.], [1., 0.2], [0.3, 0.9]])
    }

    #[test]
    fn test_partition_of_unity() {
        let g = geo();
        for degree in [Degree::P1, Degree::P2] {
            let l = [0.2, 0.5, 0.3];
            let sum: f64 = basis_values(degree, l).iter().sum();
            assert!((sum - 1.).abs() < 1e-14);
            let grad = basis_gradients(degree, l, &g);
            let gx: f64 = grad.iter().map(|d| d[0]).sum();
            let gy: f64 = grad.iter().map(|d| d[1]).sum();
            assert!(gx.abs() < 1e-12 && gy.abs() < 1e-12);
        }
    }

    #[test]
    fn test_p2_reproduces_quadratic_gradient() {
        let g = geo();
        let f = |p: [f64; 2]| p[0] * p[0] + 3. * p[0] * p[1];
        let nodes = [
            g.coords[0],
            g.coords[1],
            g.coords[2],
            g.map([0., 0.5, 0.5]),
            g.map([0.5, 0., 0.5]),
            g.map([0.5, 0.5, 0.]),
        ];
        let mut local = [0.; 6];
        for (v, p) in local.iter_mut().zip(nodes.iter()) {
            *v = f(*p);
        }
        let cv = CellValues::new(&g, Degree::P2, &QuadratureRule::triangle_degree5());
        for q in 0..cv.len() {
            let p = cv.points[q];
            let grad = cv.gradient(q, &local);
            assert!((grad[0] - (2. * p[0] + 3. * p[1])).abs() < 1e-12);
            assert!((grad[1] - 3. * p[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_normals_point_outward() {
        let g = geo();
        let centroid = g.map([1. / 3.; 3]);
        for k in 0..3 {
            let n = g.normal(k);
            let mid = g.map({
                let mut l = [0.5; 3];
                l[k] = 0.;
                l
            });
            let out = [mid[0] - centroid[0], mid[1] - centroid[1]];
            assert!(n[0] * out[0] + n[1] * out[1] > 0.);
        }
    }

    #[test]
    fn test_edge_rule_length() {
        let g = geo();
        let cv = CellValues::on_edge(&g, Degree::P1, 2);
        let len: f64 = cv.jxw.iter().sum();
        assert!((len - g.edge_length(2)).abs() < 1e-14);
    }
}
