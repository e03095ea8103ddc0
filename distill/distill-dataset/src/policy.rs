//! The inference seam between teacher search and learned policies.
//!
//! Everything that can supply null-space coefficients for an observation
//! sits behind [`Policy`]: the zero baseline, the reference search, and
//! (from the oracle crate) fitted regressors. The episode runner and the
//! evaluation harness only ever see this trait.

use std::sync::Mutex;

use nalgebra::Vector3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use alloc_core::{optimal_coefficients, NullSpaceAllocator, PowerModel, SearchOptions};
use alloc_types::VehicleGeometry;
use sim_omav::{HoverController, VehicleState, OBS_DIM};

use crate::error::Result;

/// Whether inference may perturb its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    /// Reproducible inference: labels, evaluation, deployment.
    Deterministic,
    /// Inference that may add noise to diversify visited states.
    Exploration,
}

/// A coefficient source driven by observations alone.
pub trait Policy: Send + Sync {
    /// Output dimensionality.
    fn coeff_dim(&self) -> usize;

    /// Coefficients for one observation.
    ///
    /// Implementations must be deterministic under
    /// [`InferenceMode::Deterministic`].
    fn infer(&self, observation: &[f64; OBS_DIM], mode: InferenceMode) -> Vec<f64>;
}

/// Always returns zero coefficients, i.e. the minimum-norm allocation.
///
/// Serves as the evaluation floor every learned policy must beat.
#[derive(Debug, Clone, Copy)]
pub struct ZeroPolicy {
    coeff_dim: usize,
}

impl ZeroPolicy {
    /// Zero policy of a given output dimensionality.
    #[must_use]
    pub fn new(coeff_dim: usize) -> Self {
        Self { coeff_dim }
    }
}

impl Policy for ZeroPolicy {
    fn coeff_dim(&self) -> usize {
        self.coeff_dim
    }

    fn infer(&self, _observation: &[f64; OBS_DIM], _mode: InferenceMode) -> Vec<f64> {
        vec![0.0; self.coeff_dim]
    }
}

/// Wraps a policy with seeded Gaussian output noise in exploration mode.
///
/// Deterministic inference passes through untouched, so wrapping never
/// changes labels or evaluation results.
pub struct SeededExploration<P> {
    inner: P,
    noise_std: f64,
    rng: Mutex<ChaCha8Rng>,
}

impl<P: Policy> SeededExploration<P> {
    /// Wrap `inner`, drawing noise from a ChaCha8 stream under `seed`.
    #[must_use]
    pub fn new(inner: P, noise_std: f64, seed: u64) -> Self {
        Self {
            inner,
            noise_std,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// The wrapped policy.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: Policy> Policy for SeededExploration<P> {
    fn coeff_dim(&self) -> usize {
        self.inner.coeff_dim()
    }

    fn infer(&self, observation: &[f64; OBS_DIM], mode: InferenceMode) -> Vec<f64> {
        let mut coefficients = self.inner.infer(observation, mode);
        if mode == InferenceMode::Exploration {
            if let Ok(mut rng) = self.rng.lock() {
                for value in &mut coefficients {
                    *value += self.noise_std * rng.sample::<f64, _>(StandardNormal);
                }
            }
        }
        coefficients
    }
}

/// The teacher search behind the [`Policy`] interface.
///
/// Reconstructs the commanded wrench from the observation with the same
/// outer loop the episodes fly, then runs the power-optimal search. States
/// whose search fails fall back to the zero vector, i.e. minimum norm.
pub struct ReferenceSearchPolicy {
    allocator: NullSpaceAllocator,
    power: PowerModel,
    controller: HoverController,
    target: Vector3<f64>,
    options: SearchOptions,
}

impl ReferenceSearchPolicy {
    /// Teacher policy for a nominal vehicle holding `target`.
    ///
    /// # Errors
    ///
    /// Propagates geometry validation failures.
    pub fn new(
        geometry: &VehicleGeometry,
        airframe_drag: f64,
        target: Vector3<f64>,
    ) -> Result<Self> {
        Ok(Self {
            allocator: NullSpaceAllocator::new(geometry)?,
            power: PowerModel::from_geometry(geometry),
            controller: HoverController::from_geometry(geometry, airframe_drag),
            target,
            options: SearchOptions::default(),
        })
    }

    /// Override the search options.
    #[must_use]
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }
}

impl Policy for ReferenceSearchPolicy {
    fn coeff_dim(&self) -> usize {
        self.allocator.coeff_dim()
    }

    fn infer(&self, observation: &[f64; OBS_DIM], _mode: InferenceMode) -> Vec<f64> {
        let Ok((state, wind_estimate)) = VehicleState::from_observation(observation) else {
            return vec![0.0; self.coeff_dim()];
        };
        let wrench = self.controller.wrench(&state, &self.target, &wind_estimate);
        match optimal_coefficients(&self.allocator, &self.power, &wrench, &self.options) {
            Ok(outcome) => outcome.coefficients.iter().copied().collect(),
            Err(_) => vec![0.0; self.coeff_dim()],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn hover_observation(wind: Vector3<f64>) -> [f64; OBS_DIM] {
        VehicleState::at_rest(Vector3::new(0.0, 0.0, 2.0)).observation(&wind)
    }

    #[test]
    fn test_zero_policy_is_mode_independent() {
        let policy = ZeroPolicy::new(2);
        let obs = hover_observation(Vector3::zeros());
        assert_eq!(policy.infer(&obs, InferenceMode::Deterministic), vec![0.0, 0.0]);
        assert_eq!(policy.infer(&obs, InferenceMode::Exploration), vec![0.0, 0.0]);
    }

    #[test]
    fn test_exploration_noise_is_seeded_and_mode_gated() {
        let obs = hover_observation(Vector3::zeros());

        let a = SeededExploration::new(ZeroPolicy::new(2), 0.1, 99);
        let b = SeededExploration::new(ZeroPolicy::new(2), 0.1, 99);

        // Deterministic mode is a pass-through.
        assert_eq!(a.infer(&obs, InferenceMode::Deterministic), vec![0.0, 0.0]);

        // Exploration perturbs, identically for identical seeds.
        let noisy_a = a.infer(&obs, InferenceMode::Exploration);
        let noisy_b = b.infer(&obs, InferenceMode::Exploration);
        assert_ne!(noisy_a, vec![0.0, 0.0]);
        assert_eq!(noisy_a, noisy_b);

        // Streams advance between calls.
        assert_ne!(a.infer(&obs, InferenceMode::Exploration), noisy_a);
    }

    #[test]
    fn test_reference_policy_matches_the_direct_search() {
        let geometry = VehicleGeometry::tilted_octo();
        let target = Vector3::new(0.0, 0.0, 2.0);
        let policy = ReferenceSearchPolicy::new(&geometry, 0.5, target).unwrap();
        assert_eq!(policy.coeff_dim(), 2);

        let wind = Vector3::new(6.0, -2.0, 0.0);
        let obs = hover_observation(wind);
        let from_policy = policy.infer(&obs, InferenceMode::Deterministic);

        let allocator = NullSpaceAllocator::new(&geometry).unwrap();
        let power = PowerModel::from_geometry(&geometry);
        let controller = HoverController::from_geometry(&geometry, 0.5);
        let state = VehicleState::at_rest(target);
        let wrench = controller.wrench(&state, &target, &wind);
        let direct = optimal_coefficients(
            &allocator,
            &power,
            &wrench,
            &SearchOptions::default(),
        )
        .unwrap();

        for (p, d) in from_policy.iter().zip(direct.coefficients.iter()) {
            assert_relative_eq!(p, d);
        }
    }

    #[test]
    fn test_reference_policy_survives_bad_observations() {
        let geometry = VehicleGeometry::tilted_octo();
        let policy =
            ReferenceSearchPolicy::new(&geometry, 0.5, Vector3::new(0.0, 0.0, 2.0)).unwrap();
        let mut obs = hover_observation(Vector3::zeros());
        obs[5] = f64::NAN;
        assert_eq!(policy.infer(&obs, InferenceMode::Deterministic), vec![0.0, 0.0]);
    }
}
