//! Quadrature rules on the reference triangle and the unit interval

/// Points in barycentric coordinates, weights sum to one
#[derive(Debug, Clone)]
pub struct QuadratureRule {
    /// Barycentric coordinates
    pub points: Vec<[f64; 3]>,
    /// Weights (relative to the cell area)
    pub weights: Vec<f64>,
}

impl QuadratureRule {
    /// 7-point rule, exact for polynomials of degree 5
    pub fn triangle_degree5() -> Self {
        let a1 = 0.059_715_871_789_770;
        let b1 = 0.470_142_064_105_115;
        let a2 = 0.797_426_985_353_087;
        let b2 = 0.101_286_507_323_456;
        let w0 = 0.225;
        let w1 = 0.132_394_152_788_506;
        let w2 = 0.125_939_180_544_827;
        Self {
            points: vec![
                [1. / 3., 1. / 3., 1. / 3.],
                [a1, b1, b1],
                [b1, a1, b1],
                [b1, b1, a1],
                [a2, b2, b2],
                [b2, a2, b2],
                [b2, b2, a2],
            ],
            weights: vec![w0, w1, w1, w1, w2, w2, w2],
        }
    }

    /// Single point at the centroid
    pub fn centroid() -> Self {
        Self {
            points: vec![[1. / 3., 1. / 3., 1. / 3.]],
            weights: vec![1.],
        }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// No points
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// 3-point Gauss rule on [0, 1]: (parameter, weight)
pub fn gauss_line3() -> [(f64, f64); 3] {
    let d = 0.15f64.sqrt();
    [(0.5 - d, 5. / 18.), (0.5, 8. / 18.), (0.5 + d, 5. / 18.)]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exact integral of x^i y^j over the reference triangle: i! j! / (i + j + 2)!
    fn exact(i: u32, j: u32) -> f64 {
        let f = |n: u32| (1..=n).product::<u32>() as f64;
        f(i) * f(j) / f(i + j + 2)
    }

    #[test]
    fn test_degree5_exactness() {
        let rule = QuadratureRule::triangle_degree5();
        let sum: f64 = rule.weights.iter().sum();
        assert!((sum - 1.).abs() < 1e-12);
        for i in 0..=5 {
            for j in 0..=(5 - i) {
                // reference triangle area 1/2, x = l1, y = l2
                let q: f64 = rule
                    .points
                    .iter()
                    .zip(&rule.weights)
                    .map(|(p, w)| w * 0.5 * p[1].powi(i as i32) * p[2].powi(j as i32))
                    .sum();
                assert!((q - exact(i, j)).abs() < 1e-12, "x^{} y^{}", i, j);
            }
        }
    }

    #[test]
    fn test_gauss_line() {
        let q: f64 = gauss_line3().iter().map(|(t, w)| w * t.powi(5)).sum();
        assert!((q - 1. / 6.).abs() < 1e-14);
    }
}
