//! Sub-step A: tentative velocity
//!
//! Stress form with u_mid = (u + u1) / 2 and sigma = 2 mu eps(u) - p I:
//!
//! rho/dt (u - u1, v) + rho (c . grad) u, v) + (sigma(u_mid, p1), eps(v))
//!     + <p1 n, v> - <mu grad(u_mid)^T n, v> = 0
//!
//! Boundary integrals run over the regions without a velocity condition.
//! The convecting velocity c is u1 (explicit, moved to the right-hand side)
//! or the fixed-point iterate u_k (implicit).
use super::context::{p1_value, Discretization};
use super::params::SimulationParameters;
use crate::boundary::{BoundaryConditionSet, SystemKind};
use crate::config::TentativeStrategy;
use crate::error::SolveError;
use crate::fem::{
    assemble_facet_matrix, assemble_facet_vector, assemble_matrix, assemble_vector, sparsity,
    CellValues,
};
use crate::field::{Field, FieldSet};
use crate::mesh::BoundaryRegion;
use crate::solver::{AssemblyPolicy, CsrMatrix, LinearSystem, SolverPair};
use crate::space::Degree;
use ndarray::Array1;
use std::sync::Arc;

/// Outcome of the tentative velocity solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPoint {
    /// Number of linear solves
    pub iterations: usize,
    /// Iterate change fell below the tolerance (always true for the
    /// explicit strategy)
    pub converged: bool,
    /// Relative change of the last iteration
    pub change: f64,
}

/// Tentative velocity system
#[derive(Debug, Clone)]
pub struct TentativeVelocity {
    system: LinearSystem,
    strategy: TentativeStrategy,
    natural: Vec<BoundaryRegion>,
}

impl TentativeVelocity {
    /// Set up pattern, assembly policy and velocity constraints.
    /// `variable_density` selects the transported scalar as density.
    pub fn new(
        ctx: &Discretization,
        bcs: &BoundaryConditionSet,
        strategy: TentativeStrategy,
        variable_density: bool,
        pair: SolverPair,
    ) -> Self {
        let space = ctx.velocity_space();
        let policy = match (strategy, variable_density) {
            (TentativeStrategy::Explicit, false) => AssemblyPolicy::AssembleOnce,
            _ => AssemblyPolicy::ReassembleEveryStep,
        };
        let pattern = Arc::new(sparsity(space, space));
        let mut system = LinearSystem::new("tentative velocity", pattern, policy, pair);
        system.set_dirichlet(&bcs.dirichlet_dofs(space, SystemKind::Velocity));
        Self {
            system,
            strategy,
            natural: bcs.natural_regions(SystemKind::Velocity),
        }
    }

    /// Linear system
    pub fn system(&self) -> &LinearSystem {
        &self.system
    }

    /// Assembled operator of the last step
    pub fn matrix(&self) -> &CsrMatrix {
        self.system.matrix()
    }

    /// Solve for the tentative velocity, written to `velocity`.
    ///
    /// The implicit strategy stops at the iteration cap with the last
    /// iterate and reports `converged = false`.
    pub fn solve(
        &mut self,
        ctx: &Discretization,
        params: &SimulationParameters,
        previous: &FieldSet,
        velocity: &mut Field,
        iterate: Option<&mut Field>,
    ) -> Result<FixedPoint, SolveError> {
        let density = previous.scalar.as_ref().map(|s| &s.v);
        match self.strategy {
            TentativeStrategy::Explicit => {
                if self.system.needs_assembly() {
                    self.assemble(ctx, params, density, None);
                }
                self.fill_rhs(ctx, params, previous, density, true);
                self.system.solve(&mut velocity.v)?;
                Ok(FixedPoint {
                    iterations: 1,
                    converged: true,
                    change: 0.,
                })
            }
            TentativeStrategy::Implicit {
                tolerance,
                max_iterations,
            } => {
                let mut local;
                let uk: &mut Array1<f64> = match iterate {
                    Some(f) => &mut f.v,
                    None => {
                        local = previous.velocity.v.clone();
                        &mut local
                    }
                };
                uk.assign(&previous.velocity.v);
                self.fill_rhs(ctx, params, previous, density, false);

                let mut outcome = FixedPoint {
                    iterations: 0,
                    converged: false,
                    change: f64::INFINITY,
                };
                for k in 1..=max_iterations {
                    self.assemble(ctx, params, density, Some(&*uk));
                    velocity.v.assign(&*uk);
                    self.system.solve(&mut velocity.v)?;
                    let norm = velocity.norm();
                    let diff = &velocity.v - &*uk;
                    let change = diff.dot(&diff).sqrt() / if norm > 0. { norm } else { 1. };
                    uk.assign(&velocity.v);
                    outcome = FixedPoint {
                        iterations: k,
                        converged: change < tolerance,
                        change,
                    };
                    log::trace!("picard iteration {}: change {:.3e}", k, change);
                    if outcome.converged {
                        break;
                    }
                }
                if !outcome.converged {
                    log::warn!(
                        "tentative velocity: fixed-point iteration stopped after {} iterations, change {:.3e}",
                        outcome.iterations,
                        outcome.change
                    );
                }
                Ok(outcome)
            }
        }
    }

    fn assemble(
        &mut self,
        ctx: &Discretization,
        params: &SimulationParameters,
        density: Option<&Array1<f64>>,
        convecting: Option<&Array1<f64>>,
    ) {
        let space = ctx.velocity_space();
        let (rho0, mu, dt) = (params.density, params.viscosity, params.dt);
        let natural = &self.natural;
        self.system.assemble(|matrix| {
            assemble_matrix(matrix, space, space, |cell, local| {
                let geo = ctx.cell(cell);
                let cv = CellValues::new(geo, Degree::P2, ctx.rule());
                let rho_local = density.and_then(|r| ctx.scalar_space().map(|s| s.gather(r, cell)[0]));
                let c_local = convecting.map(|u| space.gather(u, cell));
                for q in 0..cv.len() {
                    let rho = match &rho_local {
                        Some(r) => p1_value(r, &ctx.rule().points[q]),
                        None => rho0,
                    };
                    let adv = c_local
                        .as_ref()
                        .map(|u| [cv.value(q, &u[0]), cv.value(q, &u[1])]);
                    let w = cv.jxw[q];
                    for a in 0..6 {
                        let (pa, ga) = (cv.phi[q][a], cv.grad[q][a]);
                        for b in 0..6 {
                            let (pb, gb) = (cv.phi[q][b], cv.grad[q][b]);
                            let mut diag = rho / dt * pa * pb + 0.5 * mu * (ga[0] * gb[0] + ga[1] * gb[1]);
                            if let Some(c) = adv {
                                diag += rho * pa * (c[0] * gb[0] + c[1] * gb[1]);
                            }
                            for ci in 0..2 {
                                for di in 0..2 {
                                    let mut v = 0.5 * mu * ga[di] * gb[ci];
                                    if ci == di {
                                        v += diag;
                                    }
                                    local[[ci * 6 + a, di * 6 + b]] += v * w;
                                }
                            }
                        }
                    }
                }
            });
            // -mu/2 <grad(u)^T n, v>
            assemble_facet_matrix(matrix, space, space, natural, |facet, local| {
                let geo = ctx.cell(facet.cell);
                let cv = CellValues::on_edge(geo, Degree::P2, facet.local);
                let n = geo.normal(facet.local);
                for q in 0..cv.len() {
                    let w = cv.jxw[q];
                    for a in 0..6 {
                        let pa = cv.phi[q][a];
                        for b in 0..6 {
                            let gb = cv.grad[q][b];
                            for ci in 0..2 {
                                for di in 0..2 {
                                    local[[ci * 6 + a, di * 6 + b]] -= 0.5 * mu * pa * gb[ci] * n[di] * w;
                                }
                            }
                        }
                    }
                }
            });
        });
    }

    fn fill_rhs(
        &mut self,
        ctx: &Discretization,
        params: &SimulationParameters,
        previous: &FieldSet,
        density: Option<&Array1<f64>>,
        explicit: bool,
    ) {
        let space = ctx.velocity_space();
        let pspace = ctx.pressure_space();
        let (rho0, mu, dt) = (params.density, params.viscosity, params.dt);
        let (u1, p1) = (&previous.velocity.v, &previous.pressure.v);
        let rhs = self.system.rhs_mut();
        rhs.fill(0.);
        assemble_vector(rhs, space, |cell, local| {
            let geo = ctx.cell(cell);
            let cv = CellValues::new(geo, Degree::P2, ctx.rule());
            let u = space.gather(u1, cell);
            let p = pspace.gather(p1, cell)[0];
            let rho_local = density.and_then(|r| ctx.scalar_space().map(|s| s.gather(r, cell)[0]));
            for q in 0..cv.len() {
                let l = &ctx.rule().points[q];
                let rho = match &rho_local {
                    Some(r) => p1_value(r, l),
                    None => rho0,
                };
                let uq = [cv.value(q, &u[0]), cv.value(q, &u[1])];
                // gu[i][j] = d u_i / d x_j
                let gu = [cv.gradient(q, &u[0]), cv.gradient(q, &u[1])];
                let pq = p1_value(&p, l);
                let w = cv.jxw[q];
                for ci in 0..2 {
                    let eps = [
                        0.5 * (gu[ci][0] + gu[0][ci]),
                        0.5 * (gu[ci][1] + gu[1][ci]),
                    ];
                    let mut force = rho / dt * uq[ci];
                    if explicit {
                        force -= rho * (uq[0] * gu[ci][0] + uq[1] * gu[ci][1]);
                    }
                    for a in 0..6 {
                        let ga = cv.grad[q][a];
                        local[ci * 6 + a] += (force * cv.phi[q][a]
                            - mu * (eps[0] * ga[0] + eps[1] * ga[1])
                            + pq * ga[ci])
                            * w;
                    }
                }
            }
        });
        // -<p1 n, v> + mu/2 <grad(u1)^T n, v>
        assemble_facet_vector(rhs, space, &self.natural, |facet, local| {
            let geo = ctx.cell(facet.cell);
            let cv = CellValues::on_edge(geo, Degree::P2, facet.local);
            let cp = CellValues::on_edge(geo, Degree::P1, facet.local);
            let n = geo.normal(facet.local);
            let u = space.gather(u1, facet.cell);
            let p = pspace.gather(p1, facet.cell)[0];
            for q in 0..cv.len() {
                let gu = [cv.gradient(q, &u[0]), cv.gradient(q, &u[1])];
                let pq = cp.value(q, &p);
                let w = cv.jxw[q];
                for ci in 0..2 {
                    let traction = 0.5 * mu * (gu[0][ci] * n[0] + gu[1][ci] * n[1]) - pq * n[ci];
                    for a in 0..6 {
                        local[ci * 6 + a] += traction * cv.phi[q][a] * w;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::InletProfile;
    use crate::config::RunConfig;
    use crate::field::StepFields;
    use crate::mesh::ChannelGeometry;

    fn setup(strategy: TentativeStrategy) -> (Discretization, SimulationParameters, TentativeVelocity) {
        let mesh = Arc::new(ChannelGeometry::without_obstacle().structured(8, 4).unwrap());
        let ctx = Discretization::new(mesh.clone(), false).unwrap();
        let config = RunConfig {
            viscosity: 0.05,
            cfl: 0.2,
            ..RunConfig::default()
        };
        let profile = InletProfile {
            peak: 1.5,
            height: 0.41,
        };
        let mut bcs = BoundaryConditionSet::channel(profile, 0., false);
        bcs.setup(&mesh).unwrap();
        let params = SimulationParameters::new(&config, mesh.h_min(), 1.).unwrap();
        let tentative = TentativeVelocity::new(&ctx, &bcs, strategy, false, SolverPair::bicgstab_amg());
        (ctx, params, tentative)
    }

    #[test]
    fn test_explicit_imposes_inflow() {
        let (ctx, params, mut tentative) = setup(TentativeStrategy::Explicit);
        assert_eq!(tentative.system().policy(), AssemblyPolicy::AssembleOnce);
        let store = ctx.allocate_fields(false);
        let mut u = store.previous().velocity.clone();
        let outcome = tentative
            .solve(&ctx, &params, store.previous(), &mut u, None)
            .unwrap();
        assert!(outcome.converged);
        // inlet centre node carries the peak velocity
        let space = ctx.velocity_space();
        let max = (0..space.num_nodes())
            .map(|n| u.v[space.dof(0, n)])
            .fold(f64::MIN, f64::max);
        assert!(max >= 1.5 - 1e-12 && max < 3.);
        assert!(u.is_finite());
    }

    #[test]
    fn test_implicit_reports_iterations() {
        let strategy = TentativeStrategy::Implicit {
            tolerance: 1e-12,
            max_iterations: 2,
        };
        let (ctx, params, mut tentative) = setup(strategy);
        assert_eq!(
            tentative.system().policy(),
            AssemblyPolicy::ReassembleEveryStep
        );
        let mut store = ctx.allocate_fields(true);
        let StepFields {
            previous,
            current,
            iterate,
        } = store.split();
        let outcome = tentative
            .solve(&ctx, &params, previous, &mut current.velocity, iterate)
            .unwrap();
        // cap reached, not an error
        assert_eq!(outcome.iterations, 2);
        assert!(!outcome.converged);
        assert_eq!(tentative.system().assemblies(), 2);
    }
}
