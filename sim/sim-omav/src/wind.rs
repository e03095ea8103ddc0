//! Wind with exponentially correlated gusts.
//!
//! The wind a rotorcraft flies through is not white noise: gusts persist
//! for a correlation time before decaying back toward the mean. Each
//! component follows an Ornstein-Uhlenbeck process, discretized exactly so
//! the stationary standard deviation equals [`WindConfig::gust_std`]
//! regardless of the step size.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimOmavError};

/// Parameters of the wind process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindConfig {
    /// Mean wind velocity in the world frame (m/s).
    pub mean: Vector3<f64>,
    /// Stationary standard deviation of each gust component (m/s).
    pub gust_std: f64,
    /// Gust decorrelation time (s).
    pub correlation_time: f64,
}

impl WindConfig {
    /// Steady wind with no gusts.
    #[must_use]
    pub fn steady(mean: Vector3<f64>) -> Self {
        Self {
            mean,
            gust_std: 0.0,
            correlation_time: 2.0,
        }
    }

    /// Set the gust intensity and correlation time.
    #[must_use]
    pub fn with_gusts(mut self, gust_std: f64, correlation_time: f64) -> Self {
        self.gust_std = gust_std;
        self.correlation_time = correlation_time;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.mean.iter().all(|v| v.is_finite()) {
            return Err(SimOmavError::invalid_config("wind mean must be finite"));
        }
        if !(self.gust_std >= 0.0 && self.gust_std.is_finite()) {
            return Err(SimOmavError::invalid_config(
                "gust_std must be non-negative and finite",
            ));
        }
        if !(self.correlation_time > 0.0 && self.correlation_time.is_finite()) {
            return Err(SimOmavError::invalid_config(
                "correlation_time must be positive and finite",
            ));
        }
        Ok(())
    }
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            mean: Vector3::zeros(),
            gust_std: 0.8,
            correlation_time: 2.0,
        }
    }
}

/// Stateful wind process.
#[derive(Debug, Clone)]
pub struct WindField {
    config: WindConfig,
    current: Vector3<f64>,
}

impl WindField {
    /// Create a wind field starting at the mean velocity.
    ///
    /// # Errors
    ///
    /// Returns [`SimOmavError::InvalidConfig`] for invalid parameters.
    pub fn new(config: WindConfig) -> Result<Self> {
        config.validate()?;
        let current = config.mean;
        Ok(Self { config, current })
    }

    /// Wind velocity at the last step.
    #[must_use]
    pub fn current(&self) -> Vector3<f64> {
        self.current
    }

    /// Mean wind velocity.
    #[must_use]
    pub fn mean(&self) -> Vector3<f64> {
        self.config.mean
    }

    /// Advance the gust process by `dt` and return the new wind velocity.
    ///
    /// Uses the exact discretization `w' = m + a (w - m) + s sqrt(1 - a^2) x`
    /// with `a = exp(-dt / tau)` and `x` standard normal, which keeps the
    /// stationary distribution independent of `dt`.
    pub fn step<R: Rng + ?Sized>(&mut self, dt: f64, rng: &mut R) -> Vector3<f64> {
        let a = (-dt / self.config.correlation_time).exp();
        let diffusion = self.config.gust_std * (1.0 - a * a).sqrt();
        let noise = Vector3::new(
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
        );
        self.current = self.config.mean + (self.current - self.config.mean) * a + noise * diffusion;
        self.current
    }
}
