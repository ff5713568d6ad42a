//! Projection step: tentative velocity, pressure correction, velocity
//! correction and (optionally) scalar transport, in this order.
use super::context::Discretization;
use super::correction::VelocityCorrection;
use super::diagnostics::{increment, outlet_mean_velocity};
use super::params::SimulationParameters;
use super::pressure::PressureCorrection;
use super::tentative::{FixedPoint, TentativeVelocity};
use super::transport::ScalarTransport;
use crate::boundary::BoundaryConditionSet;
use crate::config::RunConfig;
use crate::error::{SetupError, SolveError};
use crate::field::StepFields;
use crate::solver::{CsrMatrix, LinearSystem};
use std::sync::Arc;

/// Diagnostics of one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Fixed-point iterations of the tentative velocity
    pub picard: FixedPoint,
    /// Weak divergence of u*, see [`PressureCorrection::divergence_norm`]
    pub divergence_tentative: f64,
    /// Weak divergence of u after the correction
    pub divergence_corrected: f64,
    /// |p - p1|
    pub pressure_increment: f64,
    /// Mean velocity through the outlet
    pub outlet_mean: f64,
}

/// The four sub-step systems of one time step
#[derive(Debug, Clone)]
pub struct ProjectionPipeline {
    ctx: Arc<Discretization>,
    params: SimulationParameters,
    tentative: TentativeVelocity,
    pressure: PressureCorrection,
    correction: VelocityCorrection,
    transport: Option<ScalarTransport>,
}

impl ProjectionPipeline {
    /// Set up all systems. The transported scalar (if `ctx` has a scalar
    /// space) acts as density in the tentative velocity.
    ///
    /// # Errors
    /// Pressure system without anchor.
    pub fn new(
        ctx: Arc<Discretization>,
        bcs: &BoundaryConditionSet,
        params: SimulationParameters,
        config: &RunConfig,
    ) -> Result<Self, SetupError> {
        let variable_density = ctx.scalar_space().is_some();
        let tentative = TentativeVelocity::new(
            &ctx,
            bcs,
            config.strategy,
            variable_density,
            config.solvers.tentative,
        );
        let pressure = PressureCorrection::new(&ctx, bcs, config.solvers.pressure)?;
        let correction = VelocityCorrection::new(&ctx, bcs, config.solvers.correction);
        let transport = ctx.scalar_space().map(|space| {
            ScalarTransport::new(
                space,
                params.diffusivity.unwrap_or(config.diffusivity),
                config.supg,
                config.solvers.transport,
            )
        });
        Ok(Self {
            ctx,
            params,
            tentative,
            pressure,
            correction,
            transport,
        })
    }

    /// Discretization
    pub fn context(&self) -> &Discretization {
        &self.ctx
    }

    /// Parameters
    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Operator of the tentative velocity (without constraints)
    pub fn tentative_matrix(&self) -> &CsrMatrix {
        self.tentative.matrix()
    }

    /// Systems in execution order
    pub fn systems(&self) -> Vec<&LinearSystem> {
        let mut systems = vec![
            self.tentative.system(),
            self.pressure.system(),
            self.correction.system(),
        ];
        if let Some(t) = &self.transport {
            systems.push(t.system());
        }
        systems
    }

    /// Run all sub-steps against `previous`, writing `current`.
    /// `previous` is never modified.
    pub fn advance(&mut self, fields: StepFields<'_>) -> Result<StepReport, SolveError> {
        let StepFields {
            previous,
            current,
            iterate,
        } = fields;
        let ctx = &*self.ctx;
        let params = &self.params;

        // Tentative velocity
        let picard = self
            .tentative
            .solve(ctx, params, previous, &mut current.velocity, iterate)?;
        let tentative = current.velocity.v.clone();
        let divergence_tentative = self.pressure.divergence_norm(ctx, &tentative)?;

        // Pressure correction
        self.pressure.solve(
            ctx,
            params,
            previous,
            &current.velocity,
            &mut current.pressure,
        )?;

        // Velocity correction
        self.correction.solve(
            ctx,
            params,
            previous,
            &tentative,
            &current.pressure,
            &mut current.velocity,
        )?;
        let divergence_corrected = self.pressure.divergence_norm(ctx, &current.velocity.v)?;

        // Scalar transport
        if let (Some(transport), Some(r1), Some(r)) = (
            self.transport.as_mut(),
            previous.scalar.as_ref(),
            current.scalar.as_mut(),
        ) {
            transport.solve(ctx, params, r1, &current.velocity.v, r)?;
        }

        let report = StepReport {
            picard,
            divergence_tentative,
            divergence_corrected,
            pressure_increment: increment(&current.pressure.v, &previous.pressure.v),
            outlet_mean: outlet_mean_velocity(ctx, &current.velocity.v),
        };
        log::debug!(
            "div u* {:.3e}, div u {:.3e}, |dp| {:.3e}",
            report.divergence_tentative,
            report.divergence_corrected,
            report.pressure_increment
        );
        Ok(report)
    }
}
