//! Episode-level domain randomization.
//!
//! Each episode draws wind and vehicle parameters once, up front. The plant
//! flies with the drawn values while the controller keeps its nominal ones,
//! so the dataset covers the model mismatch a real vehicle exhibits.

use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use alloc_types::VehicleGeometry;

use crate::error::{Result, SimOmavError};
use crate::wind::WindConfig;

/// Ranges the randomizer draws from, all uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRandomization {
    /// Mean wind speed (m/s), direction drawn uniformly in azimuth.
    pub wind_speed_range: (f64, f64),
    /// Gust standard deviation (m/s).
    pub gust_std_range: (f64, f64),
    /// Multiplier on nominal mass.
    pub mass_scale_range: (f64, f64),
    /// Per-axis multiplier on nominal inertia.
    pub inertia_scale_range: (f64, f64),
    /// Multiplier on the nominal thrust coefficient.
    pub thrust_scale_range: (f64, f64),
}

impl Default for DomainRandomization {
    fn default() -> Self {
        Self {
            wind_speed_range: (0.0, 12.0),
            gust_std_range: (0.0, 1.0),
            mass_scale_range: (0.9, 1.1),
            inertia_scale_range: (0.9, 1.1),
            thrust_scale_range: (0.95, 1.05),
        }
    }
}

impl DomainRandomization {
    /// No randomization: nominal vehicle in calm air.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            wind_speed_range: (0.0, 0.0),
            gust_std_range: (0.0, 0.0),
            mass_scale_range: (1.0, 1.0),
            inertia_scale_range: (1.0, 1.0),
            thrust_scale_range: (1.0, 1.0),
        }
    }

    /// Override the wind speed range.
    #[must_use]
    pub fn with_wind_speed(mut self, low: f64, high: f64) -> Self {
        self.wind_speed_range = (low, high);
        self
    }

    /// Validate that every range is ordered and physical.
    pub fn validate(&self) -> Result<()> {
        let ordered = |name: &str, (lo, hi): (f64, f64)| -> Result<()> {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(SimOmavError::invalid_config(format!(
                    "{name} range must be ordered and finite"
                )));
            }
            Ok(())
        };
        ordered("wind_speed", self.wind_speed_range)?;
        ordered("gust_std", self.gust_std_range)?;
        ordered("mass_scale", self.mass_scale_range)?;
        ordered("inertia_scale", self.inertia_scale_range)?;
        ordered("thrust_scale", self.thrust_scale_range)?;

        if self.wind_speed_range.0 < 0.0 || self.gust_std_range.0 < 0.0 {
            return Err(SimOmavError::invalid_config(
                "wind ranges must be non-negative",
            ));
        }
        if self.mass_scale_range.0 <= 0.0
            || self.inertia_scale_range.0 <= 0.0
            || self.thrust_scale_range.0 <= 0.0
        {
            return Err(SimOmavError::invalid_config(
                "scale ranges must be positive",
            ));
        }
        Ok(())
    }

    /// Draw one episode's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SimOmavError::InvalidConfig`] when the ranges fail
    /// validation.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        base: &VehicleGeometry,
        rng: &mut R,
    ) -> Result<EpisodeParams> {
        self.validate()?;

        let wind_speed = sample_range(rng, self.wind_speed_range);
        let azimuth = rng.gen_range(0.0..std::f64::consts::TAU);
        let wind_mean = Vector3::new(azimuth.cos(), azimuth.sin(), 0.0) * wind_speed;

        let inertia_scale = Vector3::new(
            sample_range(rng, self.inertia_scale_range),
            sample_range(rng, self.inertia_scale_range),
            sample_range(rng, self.inertia_scale_range),
        );

        Ok(EpisodeParams {
            wind_mean,
            wind_speed,
            gust_std: sample_range(rng, self.gust_std_range),
            mass: base.mass * sample_range(rng, self.mass_scale_range),
            inertia: base.inertia.component_mul(&inertia_scale),
            thrust_coeff: base.thrust_coeff * sample_range(rng, self.thrust_scale_range),
        })
    }
}

fn sample_range<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// One episode's drawn parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeParams {
    /// Mean wind velocity (world frame).
    pub wind_mean: Vector3<f64>,
    /// Magnitude of the mean wind.
    pub wind_speed: f64,
    /// Gust standard deviation.
    pub gust_std: f64,
    /// True vehicle mass (kg).
    pub mass: f64,
    /// True diagonal inertia (kg m^2).
    pub inertia: Vector3<f64>,
    /// True thrust coefficient.
    pub thrust_coeff: f64,
}

impl EpisodeParams {
    /// Nominal parameters of a vehicle in calm air.
    #[must_use]
    pub fn nominal(base: &VehicleGeometry) -> Self {
        Self {
            wind_mean: Vector3::zeros(),
            wind_speed: 0.0,
            gust_std: 0.0,
            mass: base.mass,
            inertia: base.inertia,
            thrust_coeff: base.thrust_coeff,
        }
    }

    /// The true vehicle this episode flies.
    ///
    /// Rotor drag stays nominal; only mass, inertia, and thrust scale.
    #[must_use]
    pub fn geometry(&self, base: &VehicleGeometry) -> VehicleGeometry {
        base.clone()
            .with_mass(self.mass)
            .with_inertia(self.inertia)
            .with_coefficients(self.thrust_coeff, base.drag_coeff)
    }

    /// Wind configuration for this episode.
    #[must_use]
    pub fn wind_config(&self) -> WindConfig {
        WindConfig::steady(self.wind_mean).with_gusts(self.gust_std, 2.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn samples_respect_ranges() {
        let ranges = DomainRandomization::default();
        let base = VehicleGeometry::tilted_octo();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..200 {
            let params = ranges.sample(&base, &mut rng).unwrap();
            assert!(params.wind_speed >= 0.0 && params.wind_speed <= 12.0);
            assert_relative_eq!(params.wind_mean.norm(), params.wind_speed, epsilon = 1e-9);
            assert_relative_eq!(params.wind_mean.z, 0.0);
            assert!(params.gust_std >= 0.0 && params.gust_std <= 1.0);
            assert!(params.mass >= base.mass * 0.9 && params.mass <= base.mass * 1.1);
            for axis in 0..3 {
                assert!(params.inertia[axis] >= base.inertia[axis] * 0.9 - 1e-12);
                assert!(params.inertia[axis] <= base.inertia[axis] * 1.1 + 1e-12);
            }
            assert!(params.thrust_coeff >= base.thrust_coeff * 0.95);
            assert!(params.thrust_coeff <= base.thrust_coeff * 1.05);
        }
    }

    #[test]
    fn sampling_is_deterministic_per_seed() {
        let ranges = DomainRandomization::default();
        let base = VehicleGeometry::tilted_octo();
        let mut rng_a = ChaCha8Rng::seed_from_u64(9);
        let mut rng_b = ChaCha8Rng::seed_from_u64(9);
        let a = ranges.sample(&base, &mut rng_a).unwrap();
        let b = ranges.sample(&base, &mut rng_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn disabled_randomization_is_nominal() {
        let base = VehicleGeometry::tilted_octo();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let params = DomainRandomization::disabled().sample(&base, &mut rng).unwrap();
        assert_eq!(params.mass, base.mass);
        assert_eq!(params.inertia, base.inertia);
        assert_eq!(params.thrust_coeff, base.thrust_coeff);
        assert_eq!(params.wind_speed, 0.0);
    }

    #[test]
    fn episode_geometry_applies_true_parameters() {
        let base = VehicleGeometry::tilted_octo();
        let params = EpisodeParams {
            wind_mean: Vector3::new(5.0, 0.0, 0.0),
            wind_speed: 5.0,
            gust_std: 0.5,
            mass: 4.4,
            inertia: Vector3::new(0.09, 0.07, 0.15),
            thrust_coeff: 1.04,
        };
        let geometry = params.geometry(&base);
        assert_eq!(geometry.mass, 4.4);
        assert_eq!(geometry.thrust_coeff, 1.04);
        assert_eq!(geometry.drag_coeff, base.drag_coeff);
        assert!(geometry.validate().is_ok());

        let wind = params.wind_config();
        assert_eq!(wind.mean, Vector3::new(5.0, 0.0, 0.0));
        assert_eq!(wind.gust_std, 0.5);
    }

    #[test]
    fn unordered_range_is_rejected() {
        let bad = DomainRandomization::default().with_wind_speed(8.0, 2.0);
        let base = VehicleGeometry::tilted_octo();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(bad.sample(&base, &mut rng).is_err());
    }

    #[test]
    fn params_serde_round_trip() {
        let base = VehicleGeometry::tilted_octo();
        let params = EpisodeParams::nominal(&base);
        let json = serde_json::to_string(&params).unwrap();
        let back: EpisodeParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
