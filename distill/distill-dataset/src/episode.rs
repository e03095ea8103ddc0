//! Closed-loop episode execution with teacher labeling.
//!
//! One episode flies the vehicle through randomized wind with either the
//! teacher in the loop (dataset generation) or a learned policy (closed-loop
//! evaluation). The onboard side works from nominal vehicle knowledge: the
//! allocator, the controller, and the teacher search all use the nominal
//! geometry, while the plant integrates the episode's true parameters. Power
//! is always accounted with the true thrust coefficient.
//!
//! In teacher mode the flown coefficients carry uniform exploration jitter
//! so visited states cover a neighborhood of the optimal trajectory, but
//! recorded labels are always the clean teacher optimum.

use nalgebra::Vector3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use tracing::{debug, trace};

use alloc_core::{
    optimal_coefficients, ActuationMap, NullSpaceAllocator, PowerModel, SaturationPolicy,
    SearchOptions,
};
use alloc_types::{ActuatorCommand, AllocError, VehicleGeometry, Wrench};
use sim_omav::{
    EpisodeParams, HoverController, RigidBodyDynamics, VehicleDynamics, VehicleState, WindField,
};

use crate::error::{DatasetError, Result};
use crate::policy::{InferenceMode, Policy};
use crate::sample::DistillSample;

/// Per-episode timing, flight, and labeling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeConfig {
    /// Control step (s).
    pub dt: f64,
    /// Episode length (s).
    pub duration: f64,
    /// Settling time before any sample is recorded (s).
    pub warmup: f64,
    /// Record every n-th post-warmup step.
    pub record_stride: usize,
    /// Half-width of the uniform jitter on flown teacher coefficients.
    pub exploration: f64,
    /// Standard deviation of the wind estimate error (m/s).
    pub wind_estimate_std: f64,
    /// Airframe drag used by both the plant and the feedforward (N s/m).
    pub airframe_drag: f64,
    /// Station-keeping target position.
    pub target: Vector3<f64>,
    /// Teacher search options.
    pub search: SearchOptions,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            dt: 0.01,
            duration: 4.0,
            warmup: 1.0,
            record_stride: 5,
            exploration: 0.15,
            wind_estimate_std: 0.2,
            airframe_drag: 0.5,
            target: Vector3::new(0.0, 0.0, 2.0),
            search: SearchOptions::default(),
        }
    }
}

impl EpisodeConfig {
    /// Samples one surviving episode records.
    ///
    /// Exact for a validated configuration; the builder sizes its waves
    /// from this.
    #[must_use]
    pub fn samples_per_episode(&self) -> usize {
        let total = steps_for(self.duration, self.dt);
        let warmup = steps_for(self.warmup, self.dt);
        total
            .saturating_sub(warmup)
            .div_ceil(self.record_stride.max(1))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(DatasetError::invalid_config("dt must be positive"));
        }
        if !(self.duration > self.warmup && self.warmup >= 0.0) {
            return Err(DatasetError::invalid_config(
                "duration must exceed a non-negative warmup",
            ));
        }
        if self.record_stride == 0 {
            return Err(DatasetError::invalid_config("record_stride must be positive"));
        }
        if !(self.exploration >= 0.0 && self.exploration.is_finite()) {
            return Err(DatasetError::invalid_config(
                "exploration must be non-negative",
            ));
        }
        if !(self.wind_estimate_std >= 0.0 && self.wind_estimate_std.is_finite()) {
            return Err(DatasetError::invalid_config(
                "wind_estimate_std must be non-negative",
            ));
        }
        if !(self.airframe_drag >= 0.0 && self.airframe_drag.is_finite()) {
            return Err(DatasetError::invalid_config(
                "airframe_drag must be non-negative",
            ));
        }
        if !self.target.iter().all(|v| v.is_finite()) {
            return Err(DatasetError::invalid_config("target must be finite"));
        }
        self.search.validate()?;
        Ok(())
    }
}

/// Who supplies the flown coefficients.
#[derive(Clone, Copy)]
pub enum FlightMode<'a> {
    /// Teacher search with exploration jitter.
    Teacher,
    /// A learned policy under the given inference mode, labels still
    /// recorded for comparison.
    Policy(&'a dyn Policy, InferenceMode),
}

/// Result of one completed episode.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    /// Labeled samples recorded after warmup.
    pub samples: Vec<DistillSample>,
    /// The episode's drawn ground truth.
    pub params: EpisodeParams,
    /// Control steps executed.
    pub steps: usize,
    /// RMS distance to the target over the post-warmup window.
    pub rms_position_error: f64,
    /// Mean true power of the flown commands over the post-warmup window.
    pub mean_power_flown: f64,
    /// Steps where the flown coefficients needed a hard-clip fallback.
    pub fallback_steps: usize,
}

/// Executes episodes against a fixed nominal vehicle.
#[derive(Debug)]
pub struct EpisodeRunner {
    nominal: VehicleGeometry,
    config: EpisodeConfig,
    allocator: NullSpaceAllocator,
    fallback: NullSpaceAllocator,
    search_power: PowerModel,
}

impl EpisodeRunner {
    /// Build a runner for a nominal vehicle.
    ///
    /// # Errors
    ///
    /// Returns configuration and geometry errors up front, never mid-episode.
    pub fn new(nominal: VehicleGeometry, config: EpisodeConfig) -> Result<Self> {
        config.validate()?;
        let allocator = NullSpaceAllocator::new(&nominal)?;
        let fallback = NullSpaceAllocator::with_policy(&nominal, SaturationPolicy::HardClip)?;
        let search_power = PowerModel::from_geometry(&nominal);
        Ok(Self {
            nominal,
            config,
            allocator,
            fallback,
            search_power,
        })
    }

    /// The nominal vehicle this runner flies.
    #[must_use]
    pub fn nominal(&self) -> &VehicleGeometry {
        &self.nominal
    }

    /// Coefficient dimensionality of the labels.
    #[must_use]
    pub fn coeff_dim(&self) -> usize {
        self.allocator.coeff_dim()
    }

    /// Fly one episode, tagging its samples with `episode`.
    ///
    /// Deterministic in `(params, seed, mode)`: the seed drives wind gusts,
    /// estimate noise, and exploration jitter through a single stream.
    ///
    /// # Errors
    ///
    /// Divergence and teacher infeasibility reject the episode (see
    /// [`DatasetError::is_episode_rejection`]); anything else is a
    /// configuration-level failure.
    pub fn run(
        &self,
        episode: u64,
        params: &EpisodeParams,
        seed: u64,
        mode: FlightMode<'_>,
    ) -> Result<EpisodeOutcome> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let true_geometry = params.geometry(&self.nominal);
        true_geometry.validate()?;
        let true_map = ActuationMap::from_geometry(&true_geometry)?;
        let true_power = PowerModel::from_geometry(&true_geometry);

        let dynamics =
            RigidBodyDynamics::new(params.mass, params.inertia, self.config.airframe_drag)?;
        let controller = HoverController::from_geometry(&self.nominal, self.config.airframe_drag);
        let mut wind_field = WindField::new(params.wind_config())?;

        let total_steps = steps_for(self.config.duration, self.config.dt);
        let warmup_steps = steps_for(self.config.warmup, self.config.dt);

        let mut state = VehicleState::at_rest(self.config.target);
        let mut samples = Vec::new();
        let mut error_sq_sum = 0.0;
        let mut power_sum = 0.0;
        let mut window_steps = 0usize;
        let mut fallback_steps = 0usize;

        for step in 0..total_steps {
            let wind = wind_field.step(self.config.dt, &mut rng);
            let wind_estimate = wind + self.estimate_noise(&mut rng);
            let observation = state.observation(&wind_estimate);
            let wrench = controller.wrench(&state, &self.config.target, &wind_estimate);

            let recording =
                step >= warmup_steps && (step - warmup_steps) % self.config.record_stride == 0;

            // The teacher optimum is needed every step in teacher mode (it
            // is flown), but only at recorded steps under a policy.
            let (label, flown) = match mode {
                FlightMode::Teacher => {
                    let label = self.teacher_label(&wrench)?;
                    let mut flown = label.coefficients.clone();
                    for value in &mut flown {
                        *value +=
                            rng.gen_range(-self.config.exploration..=self.config.exploration);
                    }
                    (Some(label), flown)
                }
                FlightMode::Policy(policy, inference) => {
                    let label = if recording {
                        Some(self.teacher_label(&wrench)?)
                    } else {
                        None
                    };
                    (label, policy.infer(&observation, inference))
                }
            };

            let command = match self.allocator.allocate(&wrench, &flown) {
                Ok(allocation) => allocation.command,
                Err(err @ AllocError::Infeasible { .. }) => match mode {
                    // A labeled episode cannot recover: its comparison
                    // baseline is gone too.
                    FlightMode::Teacher => return Err(err.into()),
                    FlightMode::Policy(..) => {
                        fallback_steps += 1;
                        self.fallback.allocate(&wrench, &flown)?.command
                    }
                },
                Err(other) => return Err(other.into()),
            };

            if let (true, Some(label)) = (recording, &label) {
                let baseline = self.allocator.allocate_min_norm(&wrench)?;
                let power_baseline =
                    true_power.power(&baseline.command, self.allocator.bounds())?;
                let power_teacher =
                    true_power.power(&label.command, self.allocator.bounds())?;
                samples.push(DistillSample {
                    episode,
                    step,
                    observation,
                    coefficients: label.coefficients.clone(),
                    params: params.clone(),
                    power_baseline,
                    power_teacher,
                });
            }

            let applied = true_map.wrench_of(command.as_vector())?;
            dynamics.step(&mut state, &applied, &wind, self.config.dt, step)?;

            if step >= warmup_steps {
                error_sq_sum += (state.position - self.config.target).norm_squared();
                power_sum += true_power.power(&command, self.allocator.bounds())?;
                window_steps += 1;
            }
            trace!(step, wind_speed = wind.norm(), "episode step");
        }

        let window = window_steps.max(1) as f64;
        let outcome = EpisodeOutcome {
            samples,
            params: params.clone(),
            steps: total_steps,
            rms_position_error: (error_sq_sum / window).sqrt(),
            mean_power_flown: power_sum / window,
            fallback_steps,
        };
        debug!(
            samples = outcome.samples.len(),
            rms_error = outcome.rms_position_error,
            "episode complete"
        );
        Ok(outcome)
    }

    fn teacher_label(&self, wrench: &Wrench) -> Result<TeacherLabel> {
        let outcome =
            optimal_coefficients(&self.allocator, &self.search_power, wrench, &self.config.search)?;
        Ok(TeacherLabel {
            coefficients: outcome.coefficients.iter().copied().collect(),
            command: outcome.command,
        })
    }

    fn estimate_noise<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        let std = self.config.wind_estimate_std;
        Vector3::new(
            std * rng.sample::<f64, _>(StandardNormal),
            std * rng.sample::<f64, _>(StandardNormal),
            std * rng.sample::<f64, _>(StandardNormal),
        )
    }
}

struct TeacherLabel {
    coefficients: Vec<f64>,
    command: ActuatorCommand,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn steps_for(seconds: f64, dt: f64) -> usize {
    (seconds / dt).round() as usize
}
