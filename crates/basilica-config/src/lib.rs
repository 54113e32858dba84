//! TOML configuration for the basilica reverb engine.
//!
//! An [`EngineConfig`] describes the whole control state of a
//! [`ReverbEngine`](basilica_reverb::ReverbEngine): seed, input gain,
//! routing, parameter targets, modulation connections and LFO settings.
//!
//! - [`EngineConfig::load`] / [`EngineConfig::save`] move it to and from disk.
//! - [`EngineConfig::validate`] resolves every name into engine types.
//! - [`EngineConfig::apply`] writes it through an
//!   [`EngineHandle`](basilica_reverb::EngineHandle).
//! - [`EngineConfig::capture`] reads it back from a running engine.
//! - [`EngineConfig::morph`] blends four configs at a point on a square.
//!
//! # Example
//!
//! ```rust
//! use basilica_config::EngineConfig;
//! use basilica_core::ParamId;
//! use basilica_reverb::RoutingPreset;
//!
//! let config = EngineConfig::with_preset(RoutingPreset::ShimmerLoop)
//!     .with_param(ParamId::Time, 0.8);
//! let engine = config.build_engine().unwrap();
//!
//! let captured = EngineConfig::capture(&engine.handle());
//! assert_eq!(captured.routing.preset, "shimmer-loop");
//! assert_eq!(captured.params["time"], 0.8);
//! ```

mod apply;
mod config;
mod error;
mod morph;

pub use apply::ResolvedConfig;
pub use config::{
    ConnectionEntry, EngineConfig, EngineSection, LfoEntry, ModulationEntry, RoutingSection,
};
pub use error::ConfigError;
