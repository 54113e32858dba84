//! Basilica reverb engine.
//!
//! A real-time, modulated feedback-delay-network reverb whose stages are
//! wired by a reconfigurable routing graph:
//!
//! - [`fdn`] - eight-line FDN tail with blended Hadamard/Householder mixing,
//!   per-line absorption and bloom envelope
//! - [`modulation`] - chaotic, stochastic, audio-reactive and LFO sources
//!   routed to parameters through a lock-free matrix
//! - [`morph`] - bilinear blending of four parameter sets
//! - [`nodes`] - input, early reflections, wander, elastic hall, insert
//!   slots and output stage
//! - [`routing`] - presets, validated snapshots and the audio-side graph with
//!   click-free transitions and bounded feedback
//! - [`ReverbEngine`] / [`EngineHandle`] - the audio-thread and control
//!   halves of the host-facing API
//!
//! ## Threads
//!
//! The audio thread owns the [`ReverbEngine`] and calls `process`. Any
//! number of [`EngineHandle`] clones may change parameters, routing and
//! modulation concurrently. Handles publish; the engine picks changes up at
//! the next block boundary and never blocks, allocates or frees memory.
//!
//! ## Example
//!
//! ```rust
//! use basilica_core::ParamId;
//! use basilica_reverb::{EngineSettings, ReverbEngine, RoutingPreset};
//!
//! let settings = EngineSettings::default().with_preset(RoutingPreset::Breathing);
//! let mut engine = ReverbEngine::new(settings);
//! engine.prepare(44100.0, 512, 2).unwrap();
//!
//! let handle = engine.handle();
//! handle.set_param(ParamId::Elasticity, 0.9).unwrap();
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! engine.process(&mut [&mut left, &mut right]).unwrap();
//! ```

pub mod engine;
pub mod error;
pub mod fdn;
pub mod modulation;
pub mod morph;
pub mod nodes;
pub mod routing;
mod shared;

pub use engine::{EngineSettings, MAX_BLOCK_SIZE, MODULATION_SCALE, ReverbEngine};
pub use error::EngineError;
pub use fdn::FdnCore;
pub use modulation::{
    LfoConfig, LfoShape, ModulationConnection, ModulationCurve, ModulationMatrix, RandomDensity,
    SourceKind,
};
pub use morph::{Corner, PresetMorpher};
pub use nodes::NodeId;
pub use routing::{ConnectionKind, RoutingConnection, RoutingPreset, RoutingSnapshot};
pub use shared::EngineHandle;
