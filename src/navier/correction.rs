//! Sub-step C: velocity correction
//!
//! (u, v) = (u*, v) - dt/rho0 (grad(p - p1), v)
//!
//! The correction u - u* lives in the admissible velocity space: it
//! vanishes on the velocity Dirichlet boundary, where u keeps the values
//! of u*. No new boundary data enters.
use super::context::{p1_gradient, Discretization};
use super::params::SimulationParameters;
use crate::boundary::{BoundaryConditionSet, SystemKind};
use crate::error::SolveError;
use crate::fem::{assemble_matrix, assemble_vector, sparsity, CellValues};
use crate::field::{Field, FieldSet};
use crate::solver::{AssemblyPolicy, LinearSystem, SolverPair};
use crate::space::Degree;
use ndarray::Array1;
use std::sync::Arc;

/// Velocity mass matrix system
#[derive(Debug, Clone)]
pub struct VelocityCorrection {
    system: LinearSystem,
    /// Dofs carrying a velocity Dirichlet condition
    fixed: Vec<usize>,
}

impl VelocityCorrection {
    /// Empty system, the mass matrix is assembled at the first solve
    pub fn new(ctx: &Discretization, bcs: &BoundaryConditionSet, pair: SolverPair) -> Self {
        let space = ctx.velocity_space();
        let pattern = Arc::new(sparsity(space, space));
        let fixed = bcs
            .dirichlet_dofs(space, SystemKind::Velocity)
            .iter()
            .map(|(dof, _)| *dof)
            .collect();
        Self {
            system: LinearSystem::new(
                "velocity correction",
                pattern,
                AssemblyPolicy::AssembleOnce,
                pair,
            ),
            fixed,
        }
    }

    /// Linear system
    pub fn system(&self) -> &LinearSystem {
        &self.system
    }

    /// Project `tentative` with the pressure increment, result in `velocity`
    pub fn solve(
        &mut self,
        ctx: &Discretization,
        params: &SimulationParameters,
        previous: &FieldSet,
        tentative: &Array1<f64>,
        pressure: &Field,
        velocity: &mut Field,
    ) -> Result<(), SolveError> {
        let space = ctx.velocity_space();
        let pspace = ctx.pressure_space();
        if self.system.needs_assembly() {
            self.system.assemble(|matrix| {
                assemble_matrix(matrix, space, space, |cell, local| {
                    let cv = CellValues::new(ctx.cell(cell), Degree::P2, ctx.rule());
                    for q in 0..cv.len() {
                        for a in 0..6 {
                            for b in 0..6 {
                                let m = cv.phi[q][a] * cv.phi[q][b] * cv.jxw[q];
                                local[[a, b]] += m;
                                local[[6 + a, 6 + b]] += m;
                            }
                        }
                    }
                });
            });
        }

        let scale = params.dt / params.density;
        let dp = &pressure.v - &previous.pressure.v;
        let rhs = self.system.rhs_mut();
        rhs.fill(0.);
        assemble_vector(rhs, space, |cell, local| {
            let geo = ctx.cell(cell);
            let cv = CellValues::new(geo, Degree::P2, ctx.rule());
            let us = space.gather(tentative, cell);
            let g = p1_gradient(&pspace.gather(&dp, cell)[0], geo);
            for q in 0..cv.len() {
                let w = cv.jxw[q];
                for ci in 0..2 {
                    let f = cv.value(q, &us[ci]) - scale * g[ci];
                    for a in 0..6 {
                        local[ci * 6 + a] += f * cv.phi[q][a] * w;
                    }
                }
            }
        });
        let keep: Vec<(usize, f64)> = self.fixed.iter().map(|&d| (d, tentative[d])).collect();
        self.system.set_dirichlet(&keep);
        velocity.v.assign(tentative);
        self.system.solve(&mut velocity.v)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::InletProfile;
    use crate::config::RunConfig;
    use crate::mesh::{ChannelGeometry, Mesh};

    #[test]
    fn test_zero_increment_reproduces_tentative() {
        let mesh = Arc::new(Mesh::rectangle(1., 1., 3, 3).unwrap());
        let ctx = Discretization::new(mesh, false).unwrap();
        let params = SimulationParameters::new(&RunConfig::default(), 0.1, 1.).unwrap();
        let bcs = BoundaryConditionSet::new();
        let mut correction = VelocityCorrection::new(&ctx, &bcs, SolverPair::cg_ssor());
        let store = ctx.allocate_fields(false);
        let tentative = ctx
            .velocity_space()
            .interpolate(|p| [p[0] * p[1], 1. - p[0] * p[0]]);
        let mut u = store.previous().velocity.clone();
        correction
            .solve(
                &ctx,
                &params,
                store.previous(),
                &tentative,
                &store.previous().pressure,
                &mut u,
            )
            .unwrap();
        let d = &u.v - &tentative;
        assert!(d.dot(&d).sqrt() < 1e-6);
        assert_eq!(correction.system().assemblies(), 1);
    }

    #[test]
    fn test_correction_vanishes_on_dirichlet_boundary() {
        let mesh = Arc::new(ChannelGeometry::without_obstacle().structured(8, 4).unwrap());
        let ctx = Discretization::new(mesh.clone(), false).unwrap();
        let profile = InletProfile {
            peak: 1.5,
            height: 0.41,
        };
        let mut bcs = BoundaryConditionSet::channel(profile, 0., false);
        bcs.setup(&mesh).unwrap();
        let params = SimulationParameters::new(&RunConfig::default(), 0.1, 1.).unwrap();
        let mut correction = VelocityCorrection::new(&ctx, &bcs, SolverPair::cg_ssor());
        let store = ctx.allocate_fields(false);
        let tentative = ctx
            .velocity_space()
            .interpolate(|p| [1. + p[1], p[0] * p[1]]);
        let mut pressure = store.previous().pressure.clone();
        pressure.v = ctx.pressure_space().interpolate(|p| [p[0] * p[1], 0.]);
        let mut u = store.previous().velocity.clone();
        correction
            .solve(&ctx, &params, store.previous(), &tentative, &pressure, &mut u)
            .unwrap();

        let fixed = bcs.dirichlet_dofs(ctx.velocity_space(), SystemKind::Velocity);
        assert!(!fixed.is_empty());
        for (dof, _) in &fixed {
            assert!((u.v[*dof] - tentative[*dof]).abs() < 1e-12);
        }
        let d = &u.v - &tentative;
        assert!(d.dot(&d).sqrt() > 1e-3);
    }
}
