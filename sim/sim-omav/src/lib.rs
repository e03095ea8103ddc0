//! Flight simulation for an omnidirectional tilted-rotor multirotor.
//!
//! This crate hosts everything between the allocator and the dataset
//! builder: the rigid-body plant, the wind process, the station-keeping
//! controller, and per-episode domain randomization. The coordinate
//! convention is z-up world frame; wrenches are expressed in the body
//! frame, matching what the allocator realizes.
//!
//! The crate is deliberately free of any learning machinery. It produces
//! [`VehicleState`] trajectories and flat observations; what to do with
//! them is the dataset builder's business.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

pub mod controller;
pub mod dynamics;
pub mod error;
pub mod randomize;
pub mod state;
pub mod wind;

pub use controller::HoverController;
pub use dynamics::{RigidBodyDynamics, VehicleDynamics, DEFAULT_RATE_LIMIT, DEFAULT_SPEED_LIMIT};
pub use error::{Result, SimOmavError};
pub use randomize::{DomainRandomization, EpisodeParams};
pub use state::{VehicleState, OBS_DIM};
pub use wind::{WindConfig, WindField};
