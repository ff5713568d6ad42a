//! Physical and time stepping parameters of a run
use crate::config::RunConfig;
use crate::error::SetupError;

/// Parameters fixed at setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    /// Reference density
    pub density: f64,
    /// Dynamic viscosity
    pub viscosity: f64,
    /// Diffusion coefficient of the scalar, if transported
    pub diffusivity: Option<f64>,
    /// Characteristic length
    pub characteristic_length: f64,
    /// Reference (peak) velocity
    pub reference_velocity: f64,
    /// Mean inflow velocity
    pub mean_velocity: f64,
    /// Smallest edge of the mesh
    pub h_min: f64,
    /// Time step
    pub dt: f64,
    /// Number of time steps
    pub steps: usize,
}

/// dt = cfl * h_min / u_ref
pub fn cfl_timestep(cfl: f64, h_min: f64, reference_velocity: f64) -> f64 {
    cfl * h_min / reference_velocity
}

impl SimulationParameters {
    /// Derive dt from the CFL target and the step count from the end
    /// time (or take the configured step count).
    pub fn new(config: &RunConfig, h_min: f64, mean_velocity: f64) -> Result<Self, SetupError> {
        config.validate()?;
        let dt = cfl_timestep(config.cfl, h_min, config.reference_velocity);
        if !(dt > 0.) || !dt.is_finite() {
            return Err(SetupError::NonPositiveDt(dt));
        }
        let steps = match config.steps {
            Some(n) => n,
            None => (config.end_time / dt).floor() as usize,
        };
        Ok(Self {
            density: config.density,
            viscosity: config.viscosity,
            diffusivity: if config.transport {
                Some(config.diffusivity)
            } else {
                None
            },
            characteristic_length: config.characteristic_length,
            reference_velocity: config.reference_velocity,
            mean_velocity,
            h_min,
            dt,
            steps,
        })
    }

    /// Re = rho * U_mean * L / mu
    pub fn reynolds(&self) -> f64 {
        self.density * self.mean_velocity * self.characteristic_length / self.viscosity
    }

    /// dt * U_ref / h_min
    pub fn cfl(&self) -> f64 {
        self.dt * self.reference_velocity / self.h_min
    }

    /// Simulated time after `n` steps
    pub fn time(&self, n: usize) -> f64 {
        n as f64 * self.dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_cfl_timestep() {
        let config = RunConfig {
            characteristic_length: 0.1,
            reference_velocity: 1.5,
            cfl: 0.05,
            ..RunConfig::default()
        };
        let params = SimulationParameters::new(&config, 0.02, 1.).unwrap();
        approx_eq(params.dt, 0.05 * 0.02 / 1.5);
        approx_eq(params.dt, 6.666666666666667e-4);
        approx_eq(params.cfl(), 0.05);
        assert!((params.steps as f64 - 8. / params.dt).abs() < 1.);
    }

    #[test]
    fn test_reynolds_uses_mean_inflow() {
        let params = SimulationParameters::new(&RunConfig::default(), 0.02, 1.).unwrap();
        approx_eq(params.reynolds(), 100.);
    }

    #[test]
    fn test_step_count_overrides_end_time() {
        let config = RunConfig {
            steps: Some(50),
            ..RunConfig::default()
        };
        let params = SimulationParameters::new(&config, 0.1, 1.).unwrap();
        assert_eq!(params.steps, 50);
        approx_eq(params.time(50), 50. * params.dt);
    }

    #[test]
    fn test_zero_mesh_size_is_rejected() {
        let err = SimulationParameters::new(&RunConfig::default(), 0., 1.).unwrap_err();
        assert!(matches!(err, SetupError::NonPositiveDt(_)));
    }
}
