//! Basilica Core - DSP primitives and parameter plumbing for the reverb engine
//!
//! Everything here is allocation-free once constructed and usable from a
//! real-time audio callback.
//!
//! # Core Abstractions
//!
//! ## Parameters
//!
//! - [`ParamId`] - closed set of modulatable engine parameters
//! - [`SmoothedParam`] / [`LinearSmoothedParam`] - zipper-free trajectories
//! - [`ParameterBufferPool`] / [`ParameterBuffer`] - per-block lanes with a
//!   branchless constant/per-sample read
//!
//! ## Filters and Delays
//!
//! - [`DelayLine`] - circular buffer, read-before-write, fractional reads
//! - [`AllpassFilter`] - Schroeder diffuser
//! - [`OnePole`] - 6 dB/oct low-pass (and complementary high-pass)
//! - [`Biquad`] - RBJ second-order sections
//! - [`DcBlocker`] - DC removal
//! - [`EnvelopeFollower`] - attack/release level tracking
//!
//! ## Plumbing
//!
//! - [`StereoBuffer`] - preallocated stereo scratch
//! - [`StereoEffect`] - trait for externally supplied processors
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build against `alloc` only:
//!
//! ```toml
//! [dependencies]
//! basilica-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod allpass;
pub mod biquad;
pub mod buffer;
pub mod dc_blocker;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod math;
pub mod one_pole;
pub mod param;
pub mod param_buffer;
pub mod param_id;

pub use allpass::AllpassFilter;
pub use biquad::{Biquad, BiquadCoefficients};
pub use buffer::StereoBuffer;
pub use dc_blocker::DcBlocker;
pub use delay::DelayLine;
pub use effect::StereoEffect;
pub use envelope::EnvelopeFollower;
pub use math::{
    block_coeff, db_to_linear, flush_denormal, lerp, linear_to_db, rt60_gain, smoothing_coeff,
    soft_clip, soft_knee, soft_limit, wet_dry_mix,
};
pub use one_pole::{OnePole, one_pole_coeff};
pub use param::{LinearSmoothedParam, SmoothedParam};
pub use param_buffer::{ParameterBuffer, ParameterBufferPool};
pub use param_id::{ParamId, UnknownParamId};
