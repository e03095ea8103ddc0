//! Electrical power proxy and summary statistics.
//!
//! Rotor power scales super-linearly with thrust; the proxy
//! `P = idle + sum((kf * |u_i|)^1.5) / kf` captures the shape without
//! pretending to be a watt-accurate motor model. It is used for *relative*
//! comparisons only: lower proxy means less energy for the same wrench.

use serde::{Deserialize, Serialize};

use alloc_types::{ActuatorBounds, ActuatorCommand, AllocError, Result, VehicleGeometry};

/// Exponent of the thrust-to-power relation.
pub const POWER_EXPONENT: f64 = 1.5;

/// Power proxy for a rotor set.
///
/// Pure and deterministic: the same command always scores the same power.
/// Monotone non-decreasing in each per-actuator magnitude.
///
/// # Example
///
/// ```
/// use alloc_core::PowerModel;
/// use alloc_types::{ActuatorBounds, ActuatorCommand};
///
/// let model = PowerModel::new(1.0);
/// let bounds = vec![ActuatorBounds::non_negative(10.0); 2];
/// let power = model
///     .power(&ActuatorCommand::from_vec(vec![1.0, 4.0]), &bounds)
///     .unwrap();
/// assert!((power - 9.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerModel {
    /// Thrust coefficient `kf` relating command units to newtons.
    pub thrust_coeff: f64,
    /// Constant power draw at zero command.
    pub idle_power: f64,
}

impl PowerModel {
    /// Create a power model with zero idle draw.
    #[must_use]
    pub const fn new(thrust_coeff: f64) -> Self {
        Self {
            thrust_coeff,
            idle_power: 0.0,
        }
    }

    /// Power model matching a vehicle geometry.
    #[must_use]
    pub fn from_geometry(geometry: &VehicleGeometry) -> Self {
        Self::new(geometry.thrust_coeff)
    }

    /// Set the idle power draw.
    #[must_use]
    pub const fn with_idle_power(mut self, idle_power: f64) -> Self {
        self.idle_power = idle_power;
        self
    }

    /// Validate the model parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.thrust_coeff.is_finite() || self.thrust_coeff <= 0.0 {
            return Err(AllocError::invalid_geometry(format!(
                "thrust coefficient must be positive, got {}",
                self.thrust_coeff
            )));
        }
        if !self.idle_power.is_finite() || self.idle_power < 0.0 {
            return Err(AllocError::invalid_geometry(format!(
                "idle power must be non-negative, got {}",
                self.idle_power
            )));
        }
        Ok(())
    }

    /// Power proxy for a command.
    ///
    /// Out-of-bound entries are evaluated at their clipped value, so the
    /// proxy is defined on raw commands as well as allocator outputs.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::DimensionMismatch`] if `bounds` and `command`
    /// disagree in length.
    pub fn power(&self, command: &ActuatorCommand, bounds: &[ActuatorBounds]) -> Result<f64> {
        if bounds.len() != command.len() {
            return Err(AllocError::dimension_mismatch(
                "power bounds",
                command.len(),
                bounds.len(),
            ));
        }
        let sum: f64 = command
            .as_slice()
            .iter()
            .zip(bounds)
            .map(|(u, b)| (self.thrust_coeff * b.clamp(*u).abs()).powf(POWER_EXPONENT))
            .sum();
        Ok(self.idle_power + sum / self.thrust_coeff)
    }

    /// Relative energy savings of `candidate` over `baseline`, in percent.
    ///
    /// Positive when the candidate draws less power. Returns zero when the
    /// baseline is non-positive or too small to compare against.
    #[must_use]
    pub fn savings_percent(baseline: f64, candidate: f64) -> f64 {
        if !baseline.is_finite() || baseline <= f64::EPSILON {
            return 0.0;
        }
        (baseline - candidate) / baseline * 100.0
    }
}

/// Summary statistics over a set of power values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerStatistics {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// 50th percentile.
    pub median: f64,
    /// 25th percentile.
    pub q25: f64,
    /// 75th percentile.
    pub q75: f64,
}

impl PowerStatistics {
    /// Compute statistics over `values`. Returns `None` for an empty slice.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            mean,
            std: var.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: quantile(&sorted, 0.5),
            q25: quantile(&sorted, 0.25),
            q75: quantile(&sorted, 0.75),
        })
    }
}

/// Linear-interpolation quantile over a pre-sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wide_bounds(n: usize) -> Vec<ActuatorBounds> {
        vec![ActuatorBounds::symmetric(100.0); n]
    }

    #[test]
    fn zero_command_draws_idle_power() {
        let model = PowerModel::new(1.0).with_idle_power(3.5);
        let power = model
            .power(&ActuatorCommand::zeros(4), &wide_bounds(4))
            .unwrap();
        assert_relative_eq!(power, 3.5);
    }

    #[test]
    fn known_values() {
        let model = PowerModel::new(1.0);
        let power = model
            .power(&ActuatorCommand::from_vec(vec![1.0, 4.0]), &wide_bounds(2))
            .unwrap();
        // 1^1.5 + 4^1.5 = 1 + 8
        assert_relative_eq!(power, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn negative_thrust_costs_like_positive() {
        let model = PowerModel::new(1.0);
        let pos = model
            .power(&ActuatorCommand::from_vec(vec![4.0]), &wide_bounds(1))
            .unwrap();
        let neg = model
            .power(&ActuatorCommand::from_vec(vec![-4.0]), &wide_bounds(1))
            .unwrap();
        assert_relative_eq!(pos, neg);
    }

    #[test]
    fn monotone_in_magnitude() {
        let model = PowerModel::new(1.0);
        let bounds = wide_bounds(3);
        let small = model
            .power(&ActuatorCommand::from_vec(vec![1.0, 2.0, 3.0]), &bounds)
            .unwrap();
        let large = model
            .power(&ActuatorCommand::from_vec(vec![1.0, 2.5, 3.0]), &bounds)
            .unwrap();
        assert!(large > small);
    }

    #[test]
    fn out_of_bound_entries_are_clipped() {
        let model = PowerModel::new(1.0);
        let bounds = vec![ActuatorBounds::non_negative(10.0); 2];
        let clipped = model
            .power(&ActuatorCommand::from_vec(vec![50.0, -3.0]), &bounds)
            .unwrap();
        let capped = model
            .power(&ActuatorCommand::from_vec(vec![10.0, 0.0]), &bounds)
            .unwrap();
        assert_relative_eq!(clipped, capped);
    }

    #[test]
    fn thrust_coeff_scales_proxy() {
        let model = PowerModel::new(2.0);
        let bounds = wide_bounds(1);
        let power = model
            .power(&ActuatorCommand::from_vec(vec![2.0]), &bounds)
            .unwrap();
        // (2 * 2)^1.5 / 2 = 8 / 2
        assert_relative_eq!(power, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_mismatched_bounds() {
        let model = PowerModel::new(1.0);
        assert!(model
            .power(&ActuatorCommand::zeros(3), &wide_bounds(2))
            .is_err());
    }

    #[test]
    fn savings_percent_basic() {
        assert_relative_eq!(PowerModel::savings_percent(100.0, 90.0), 10.0);
        assert_relative_eq!(PowerModel::savings_percent(100.0, 110.0), -10.0);
        assert_relative_eq!(PowerModel::savings_percent(0.0, 10.0), 0.0);
        assert_relative_eq!(PowerModel::savings_percent(-5.0, 1.0), 0.0);
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        assert!(PowerModel::new(0.0).validate().is_err());
        assert!(PowerModel::new(1.0).with_idle_power(-1.0).validate().is_err());
        assert!(PowerModel::new(1.0).validate().is_ok());
    }

    #[test]
    fn statistics_known_values() {
        let stats = PowerStatistics::from_values(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_relative_eq!(stats.mean, 3.0);
        assert_relative_eq!(stats.std, 2.0_f64.sqrt());
        assert_relative_eq!(stats.min, 1.0);
        assert_relative_eq!(stats.max, 5.0);
        assert_relative_eq!(stats.median, 3.0);
        assert_relative_eq!(stats.q25, 2.0);
        assert_relative_eq!(stats.q75, 4.0);
    }

    #[test]
    fn statistics_empty_is_none() {
        assert!(PowerStatistics::from_values(&[]).is_none());
    }

    #[test]
    fn statistics_single_value() {
        let stats = PowerStatistics::from_values(&[7.0]).unwrap();
        assert_relative_eq!(stats.mean, 7.0);
        assert_relative_eq!(stats.std, 0.0);
        assert_relative_eq!(stats.median, 7.0);
        assert_relative_eq!(stats.q25, 7.0);
    }
}
