//! Initial conditions
use crate::space::FunctionSpace;
use ndarray::Array1;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};

/// Disk of increased density in a uniform background
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseDisk {
    /// Centre
    pub center: [f64; 2],
    /// Radius
    pub radius: f64,
    /// Density inside relative to the background
    pub factor: f64,
}

impl Default for DenseDisk {
    fn default() -> Self {
        Self {
            center: [0.2, 0.2],
            radius: 0.05,
            factor: 10.,
        }
    }
}

/// Scalar field equal to `background * disk.factor` inside the disk and
/// `background` elsewhere
pub fn dense_disk(space: &FunctionSpace, background: f64, disk: &DenseDisk) -> Array1<f64> {
    let r2 = disk.radius * disk.radius;
    space.interpolate(|p| {
        let dx = p[0] - disk.center[0];
        let dy = p[1] - disk.center[1];
        let v = if dx * dx + dy * dy < r2 {
            background * disk.factor
        } else {
            background
        };
        [v, v]
    })
}

/// Add uniform noise in [-amp, amp] to all dofs not listed in `fixed`
pub fn random_disturbance(values: &mut Array1<f64>, amp: f64, fixed: &[usize]) {
    if amp <= 0. {
        return;
    }
    let mut noise: Array1<f64> = Array1::random(values.len(), Uniform::new(-amp, amp));
    for &dof in fixed {
        if dof < noise.len() {
            noise[dof] = 0.;
        }
    }
    *values += &noise;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::ChannelGeometry;
    use crate::space::Degree;
    use std::sync::Arc;

    #[test]
    fn test_dense_disk() {
        let mesh = Arc::new(ChannelGeometry::without_obstacle().structured(44, 8).unwrap());
        let space = FunctionSpace::new(mesh, Degree::P1, 1);
        let rho = dense_disk(&space, 1., &DenseDisk::default());
        let max = rho.iter().cloned().fold(f64::MIN, f64::max);
        let min = rho.iter().cloned().fold(f64::MAX, f64::min);
        assert_eq!(max, 10.);
        assert_eq!(min, 1.);
    }

    #[test]
    fn test_random_disturbance_keeps_fixed_dofs() {
        let mut v = Array1::zeros(10);
        random_disturbance(&mut v, 0.1, &[0, 3]);
        assert_eq!(v[0], 0.);
        assert_eq!(v[3], 0.);
        assert!(v.iter().all(|x| x.abs() <= 0.1));
        assert!(v.iter().any(|x| *x != 0.));
    }
}
