//! Integral quantities reported per step
use super::context::Discretization;
use crate::fem::{assemble_vector, CellValues};
use crate::mesh::BoundaryRegion;
use crate::space::Degree;
use ndarray::Array1;

/// Weak divergence (div u, q) for every pressure basis function q
pub fn weak_divergence(ctx: &Discretization, velocity: &Array1<f64>) -> Array1<f64> {
    let vspace = ctx.velocity_space();
    let pspace = ctx.pressure_space();
    let mut d = Array1::zeros(pspace.num_dofs());
    assemble_vector(&mut d, pspace, |cell, local| {
        let cv = CellValues::new(ctx.cell(cell), Degree::P2, ctx.rule());
        let u = vspace.gather(velocity, cell);
        for q in 0..cv.len() {
            let div = cv.gradient(q, &u[0])[0] + cv.gradient(q, &u[1])[1];
            let l = &ctx.rule().points[q];
            for a in 0..3 {
                local[a] += div * l[a] * cv.jxw[q];
            }
        }
    });
    d
}

/// Volume flux of `velocity` through `region`
pub fn flux(ctx: &Discretization, velocity: &Array1<f64>, region: BoundaryRegion) -> f64 {
    let space = ctx.velocity_space();
    let mut flux = 0.;
    for facet in ctx.mesh().facets_in(region) {
        let geo = ctx.cell(facet.cell);
        let cv = CellValues::on_edge(geo, Degree::P2, facet.local);
        let n = geo.normal(facet.local);
        let u = space.gather(velocity, facet.cell);
        for q in 0..cv.len() {
            flux += (cv.value(q, &u[0]) * n[0] + cv.value(q, &u[1]) * n[1]) * cv.jxw[q];
        }
    }
    flux
}

/// Mean normal velocity over the outlet
pub fn outlet_mean_velocity(ctx: &Discretization, velocity: &Array1<f64>) -> f64 {
    let length = ctx.mesh().region_length(BoundaryRegion::Outlet);
    if length > 0. {
        flux(ctx, velocity, BoundaryRegion::Outlet) / length
    } else {
        0.
    }
}

/// Euclidean norm of a - b
pub fn increment(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::ChannelGeometry;
    use std::sync::Arc;

    fn approx_eq(result: f64, expected: f64) {
        let dif = 1e-10;
        if (result - expected).abs() > dif {
            panic!(
                "Large difference of values, got {} expected {}.",
                result, expected
            )
        }
    }

    #[test]
    fn test_weak_divergence_of_linear_field() {
        let mesh = Arc::new(ChannelGeometry::without_obstacle().structured(8, 4).unwrap());
        let ctx = Discretization::new(mesh, false).unwrap();
        // div (x, y) = 2, hat functions sum to one
        let u = ctx.velocity_space().interpolate(|p| [p[0], p[1]]);
        approx_eq(weak_divergence(&ctx, &u).sum(), 2. * 2.2 * 0.41);
        let shear = ctx.velocity_space().interpolate(|p| [p[1], 0.]);
        let d = weak_divergence(&ctx, &shear);
        approx_eq(d.iter().fold(0f64, |m, v| m.max(v.abs())), 0.);
    }

    #[test]
    fn test_outlet_mean_of_parabola() {
        let mesh = Arc::new(ChannelGeometry::without_obstacle().structured(8, 4).unwrap());
        let ctx = Discretization::new(mesh, false).unwrap();
        let h = 0.41;
        let u = ctx
            .velocity_space()
            .interpolate(|p| [4. * 1.5 * p[1] * (h - p[1]) / (h * h), 0.]);
        // P2 is exact for the parabola
        approx_eq(outlet_mean_velocity(&ctx, &u), 1.);
        approx_eq(flux(&ctx, &u, BoundaryRegion::Inlet), -0.41);
    }
}
