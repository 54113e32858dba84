//! Modulation: stochastic and audio-reactive sources routed to parameters.
//!
//! The matrix is split along the thread boundary:
//!
//! - [`ModulationMatrix`] is the control-side handle. It validates and
//!   stores [`ModulationConnection`]s and publishes immutable snapshots.
//! - [`ModulationProcessor`] runs on the audio side once per block. It
//!   advances the [`SourceBank`], applies curve, depth, probability gate and
//!   per-connection smoothing, then sums per destination and clamps to
//!   [-1, 1].
//!
//! ```rust
//! use basilica_core::ParamId;
//! use basilica_reverb::modulation::{
//!     ModulationConnection, ModulationMatrix, ModulationProcessor, SourceKind,
//! };
//!
//! let matrix = ModulationMatrix::new();
//! matrix
//!     .set_connection(ModulationConnection::new(SourceKind::ChaosAttractor, 0, ParamId::Warp, 0.4))
//!     .unwrap();
//!
//! let mut processor = ModulationProcessor::new(48000.0, 7);
//! let block = [0.0f32; 256];
//! let offsets = processor.process(&block, &block, &matrix);
//! assert!(offsets.iter().all(|v| (-1.0..=1.0).contains(v)));
//! ```

mod curve;
mod matrix;
mod processor;
mod randomize;
mod sources;

pub use curve::ModulationCurve;
pub use matrix::{
    MAX_KEYS, MAX_SMOOTHING_MS, MIN_SMOOTHING_MS, ModulationConnection, ModulationMatrix,
    ModulationSet, connection_key,
};
pub use processor::{GATE_INTERVAL_MS, ModulationProcessor};
pub use randomize::{RandomDensity, random_connections};
pub use sources::{
    AudioFollower, BlockLfo, BrownianWalk, EnvelopeTracker, LFO_COUNT, LfoConfig, LfoShape,
    LorenzAttractor, SOURCE_AXES, SourceBank, SourceKind, SpringMass,
};
