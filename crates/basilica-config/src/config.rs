//! Engine configuration file format.

use std::collections::BTreeMap;
use std::path::Path;

use basilica_core::ParamId;
use basilica_reverb::modulation::{LfoConfig, ModulationConnection};
use basilica_reverb::{ConnectionKind, EngineSettings, RoutingConnection, RoutingPreset};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete engine state as a TOML document.
///
/// Names are resolved against the engine's closed sets ([`ParamId`],
/// [`RoutingPreset`], node and source names) by
/// [`validate`](Self::validate); nothing is looked up by string after that.
///
/// # TOML Format
///
/// ```toml
/// [engine]
/// seed = 195367370
/// input_gain_db = -3.0
/// sample_rate = 48000
/// max_block = 512
///
/// [routing]
/// preset = "custom"
/// bypass = ["wander"]
///
/// [params]
/// time = 0.8
/// warp = 0.3
///
/// [[modulation]]
/// source = "chaos"
/// axis = 0
/// destination = "warp"
/// depth = 0.4
///
/// [[lfo]]
/// index = 0
/// shape = "triangle"
/// rate_hz = 0.25
///
/// [[connection]]
/// from = "input"
/// to = "early"
///
/// [[connection]]
/// from = "early"
/// to = "output"
/// kind = "parallel"
/// blend = 0.7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Construction settings and processing hints.
    #[serde(default)]
    pub engine: EngineSection,

    /// Active routing.
    #[serde(default)]
    pub routing: RoutingSection,

    /// Normalized parameter targets by name. Missing names keep their
    /// defaults.
    #[serde(default)]
    pub params: BTreeMap<String, f32>,

    /// Modulation connections.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modulation: Vec<ModulationEntry>,

    /// User LFO settings. Slots not listed use factory settings.
    #[serde(default, rename = "lfo", skip_serializing_if = "Vec::is_empty")]
    pub lfos: Vec<LfoEntry>,

    /// Edges of a custom routing graph. Only valid with `preset = "custom"`.
    #[serde(default, rename = "connection", skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<ConnectionEntry>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EngineSection {
    /// Seed for early reflections and modulation randomness.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Input gain in dB.
    #[serde(default)]
    pub input_gain_db: f32,

    /// Sample rate hint for offline tools.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Block size hint for offline tools.
    #[serde(default = "default_max_block")]
    pub max_block: usize,
}

fn default_seed() -> u64 {
    EngineSettings::default().seed
}

fn default_sample_rate() -> u32 {
    48000
}

fn default_max_block() -> usize {
    512
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            input_gain_db: 0.0,
            sample_rate: default_sample_rate(),
            max_block: default_max_block(),
        }
    }
}

/// `[routing]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingSection {
    /// Preset name, or `"custom"` to use the `[[connection]]` list.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Nodes to bypass. When absent the preset's own bypass flags apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<Vec<String>>,
}

fn default_preset() -> String {
    RoutingPreset::default().name().to_string()
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            bypass: None,
        }
    }
}

/// One `[[modulation]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModulationEntry {
    /// Source name (`chaos`, `brownian`, `follower`, `tracker`, `lfo`, `spring`).
    pub source: String,
    /// Axis of the source.
    #[serde(default)]
    pub axis: usize,
    /// Destination parameter name.
    pub destination: String,
    /// Signed depth in [-1, 1].
    pub depth: f32,
    /// Smoothing time in ms, 20..=1000.
    #[serde(default = "default_smoothing_ms")]
    pub smoothing_ms: f32,
    /// Gate probability in [0, 1].
    #[serde(default = "default_probability")]
    pub probability: f32,
    /// Disabled connections glide out and stay silent.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Response curve (`linear`, `ease-in`, `ease-out`, `s-curve`,
    /// `steps:N`).
    #[serde(default = "default_curve")]
    pub curve: String,
}

fn default_smoothing_ms() -> f32 {
    200.0
}

fn default_probability() -> f32 {
    1.0
}

fn default_enabled() -> bool {
    true
}

fn default_curve() -> String {
    "linear".to_string()
}

impl From<&ModulationConnection> for ModulationEntry {
    fn from(conn: &ModulationConnection) -> Self {
        Self {
            source: conn.source.name().to_string(),
            axis: conn.axis,
            destination: conn.destination.name().to_string(),
            depth: conn.depth,
            smoothing_ms: conn.smoothing_ms,
            probability: conn.probability,
            enabled: conn.enabled,
            curve: conn.curve.to_string(),
        }
    }
}

/// One `[[lfo]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LfoEntry {
    /// LFO slot.
    pub index: usize,
    /// Waveform name.
    pub shape: String,
    /// Rate in Hz.
    pub rate_hz: f32,
    /// Square duty cycle.
    #[serde(default = "default_half")]
    pub pulse_width: f32,
    /// Skewed-triangle apex.
    #[serde(default = "default_half")]
    pub skew: f32,
    /// Phase offset in cycles.
    #[serde(default)]
    pub phase_offset: f32,
}

fn default_half() -> f32 {
    0.5
}

impl LfoEntry {
    /// Entry for slot `index`.
    pub fn new(index: usize, config: &LfoConfig) -> Self {
        Self {
            index,
            shape: config.shape.name().to_string(),
            rate_hz: config.rate_hz,
            pulse_width: config.pulse_width,
            skew: config.skew,
            phase_offset: config.phase_offset,
        }
    }
}

/// One `[[connection]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionEntry {
    /// Source node name.
    pub from: String,
    /// Destination node name.
    pub to: String,
    /// `serial`, `parallel`, `feedback` or `crossfeed`.
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Parallel blend in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend: Option<f32>,
    /// Feedback gain in [0, 0.95].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
    /// Crossfeed amount in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f32>,
}

fn default_kind() -> String {
    "serial".to_string()
}

impl From<&RoutingConnection> for ConnectionEntry {
    fn from(conn: &RoutingConnection) -> Self {
        let (blend, gain, amount) = match conn.kind {
            ConnectionKind::Serial => (None, None, None),
            ConnectionKind::Parallel { blend } => (Some(blend), None, None),
            ConnectionKind::Feedback { gain } => (None, Some(gain), None),
            ConnectionKind::Crossfeed { amount } => (None, None, Some(amount)),
        };
        Self {
            from: conn.from.name().to_string(),
            to: conn.to.name().to_string(),
            kind: conn.kind.name().to_string(),
            blend,
            gain,
            amount,
        }
    }
}

impl EngineConfig {
    /// A config that sets only the routing preset.
    pub fn with_preset(preset: RoutingPreset) -> Self {
        Self {
            routing: RoutingSection {
                preset: preset.name().to_string(),
                bypass: None,
            },
            ..Self::default()
        }
    }

    /// Sets one parameter by id.
    pub fn with_param(mut self, id: ParamId, value: f32) -> Self {
        self.params.insert(id.name().to_string(), value);
        self
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("config_load: {}", path.display());
        Ok(config)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the config to a TOML file, creating missing parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::write_file(parent, e))?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        tracing::debug!("config_save: {}", path.display());
        Ok(())
    }
}
