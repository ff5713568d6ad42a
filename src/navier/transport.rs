//! Sub-step D: scalar transport
//!
//! Crank-Nicolson in time with r_mid = (r + r1) / 2:
//!
//! ((r - r1)/dt, s) + (u . grad r_mid, s) + D (grad r_mid, grad s)
//!     + (beta u . grad r_mid, u . grad s) = 0
//!
//! The streamline term is active for `supg > 0` with
//! beta = supg * h / (2 |u|), h the longest edge of the cell.
//! No Dirichlet conditions are applied.
use super::context::Discretization;
use super::params::SimulationParameters;
use crate::error::SolveError;
use crate::fem::{assemble_matrix, assemble_vector, sparsity, CellGeometry, CellValues};
use crate::field::Field;
use crate::solver::{AssemblyPolicy, LinearSystem, SolverPair};
use crate::space::{Degree, FunctionSpace};
use ndarray::Array1;
use std::sync::Arc;

/// Advection-diffusion system of the transported scalar
#[derive(Debug, Clone)]
pub struct ScalarTransport {
    system: LinearSystem,
    diffusivity: f64,
    supg: f64,
}

impl ScalarTransport {
    /// System on the scalar space, reassembled every step
    pub fn new(space: &FunctionSpace, diffusivity: f64, supg: f64, pair: SolverPair) -> Self {
        let pattern = Arc::new(sparsity(space, space));
        Self {
            system: LinearSystem::new(
                "scalar transport",
                pattern,
                AssemblyPolicy::ReassembleEveryStep,
                pair,
            ),
            diffusivity,
            supg,
        }
    }

    /// Linear system
    pub fn system(&self) -> &LinearSystem {
        &self.system
    }

    /// Advance the scalar with the corrected `velocity`
    pub fn solve(
        &mut self,
        ctx: &Discretization,
        params: &SimulationParameters,
        previous: &Field,
        velocity: &Array1<f64>,
        scalar: &mut Field,
    ) -> Result<(), SolveError> {
        let space = match ctx.scalar_space() {
            Some(space) => space,
            None => return Ok(()),
        };
        let vspace = ctx.velocity_space();
        let (dt, diff, supg) = (params.dt, self.diffusivity, self.supg);
        let r1 = &previous.v;

        // Local operator split into mass and transport part,
        // A = M/dt + K/2, b = (M/dt - K/2) r1
        let local_parts = |cell: usize| -> ([[f64; 3]; 3], [[f64; 3]; 3]) {
            let geo = ctx.cell(cell);
            let cv = CellValues::new(geo, Degree::P2, ctx.rule());
            let us = vspace.gather(velocity, cell);
            let h = diameter(geo);
            let g = &geo.grad_lambda;
            let mut mass = [[0.; 3]; 3];
            let mut transport = [[0.; 3]; 3];
            for q in 0..cv.len() {
                let l = &ctx.rule().points[q];
                let u = [cv.value(q, &us[0]), cv.value(q, &us[1])];
                let speed = (u[0] * u[0] + u[1] * u[1]).sqrt();
                let beta = if supg > 0. && speed > 0. {
                    supg * h / (2. * speed)
                } else {
                    0.
                };
                let w = cv.jxw[q];
                for a in 0..3 {
                    let ua = u[0] * g[a][0] + u[1] * g[a][1];
                    for b in 0..3 {
                        let ub = u[0] * g[b][0] + u[1] * g[b][1];
                        mass[a][b] += l[a] * l[b] * w;
                        transport[a][b] += (ub * l[a]
                            + diff * (g[a][0] * g[b][0] + g[a][1] * g[b][1])
                            + beta * ub * ua)
                            * w;
                    }
                }
            }
            (mass, transport)
        };

        self.system.assemble(|matrix| {
            assemble_matrix(matrix, space, space, |cell, local| {
                let (mass, transport) = local_parts(cell);
                for a in 0..3 {
                    for b in 0..3 {
                        local[[a, b]] = mass[a][b] / dt + 0.5 * transport[a][b];
                    }
                }
            });
        });
        let rhs = self.system.rhs_mut();
        rhs.fill(0.);
        assemble_vector(rhs, space, |cell, local| {
            let (mass, transport) = local_parts(cell);
            let r = space.gather(r1, cell)[0];
            for a in 0..3 {
                for b in 0..3 {
                    local[a] += (mass[a][b] / dt - 0.5 * transport[a][b]) * r[b];
                }
            }
        });
        self.system.solve(&mut scalar.v)?;
        Ok(())
    }
}

fn diameter(geo: &CellGeometry) -> f64 {
    (0..3).map(|k| geo.edge_length(k)).fold(0., f64::max)
}
