//! Closed set of modulatable engine parameters.
//!
//! Every control value that can be automated or modulated is one of the
//! [`ParamId`] variants. Strings are resolved to a `ParamId` once, when a
//! configuration is applied; the audio path only ever indexes arrays with
//! [`ParamId::index`].
//!
//! All values live in normalized \[0.0, 1.0\] space. Each consumer maps the
//! normalized value onto its own physical range.

use core::fmt;
use core::str::FromStr;

/// Identifier of a smoothed, modulatable engine parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    /// Decay time of the late field (RT60 and bloom length).
    Time,
    /// High-frequency absorption inside the delay network.
    Mass,
    /// Diffusion strength, injection level and early-reflection level.
    Density,
    /// Late-field swell after onsets.
    Bloom,
    /// Low-cut inside the feedback loop.
    Gravity,
    /// Blend of the mixing matrix bases and depth of the wander stage.
    Warp,
    /// Slow drift of delay lengths and absorption.
    Drift,
    /// Wall deformation of the elastic hall.
    Elasticity,
    /// High-shelf tilt at the output.
    Air,
    /// Stereo width at the output.
    Width,
    /// Engine dry/wet balance.
    Mix,
}

impl ParamId {
    /// Number of parameters.
    pub const COUNT: usize = 11;

    /// Every parameter in index order.
    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::Time,
        ParamId::Mass,
        ParamId::Density,
        ParamId::Bloom,
        ParamId::Gravity,
        ParamId::Warp,
        ParamId::Drift,
        ParamId::Elasticity,
        ParamId::Air,
        ParamId::Width,
        ParamId::Mix,
    ];

    /// Dense array index in `0..COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable lowercase name used in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            ParamId::Time => "time",
            ParamId::Mass => "mass",
            ParamId::Density => "density",
            ParamId::Bloom => "bloom",
            ParamId::Gravity => "gravity",
            ParamId::Warp => "warp",
            ParamId::Drift => "drift",
            ParamId::Elasticity => "elasticity",
            ParamId::Air => "air",
            ParamId::Width => "width",
            ParamId::Mix => "mix",
        }
    }

    /// Normalized value a freshly constructed engine starts from.
    pub const fn default_value(self) -> f32 {
        match self {
            ParamId::Time => 0.55,
            ParamId::Mass => 0.5,
            ParamId::Density => 0.5,
            ParamId::Bloom => 0.0,
            ParamId::Gravity => 0.25,
            ParamId::Warp => 0.0,
            ParamId::Drift => 0.2,
            ParamId::Elasticity => 0.5,
            ParamId::Air => 0.5,
            ParamId::Width => 0.5,
            ParamId::Mix => 1.0,
        }
    }

    /// Smoothing time constant applied to this parameter's trajectory.
    pub const fn smoothing_ms(self) -> f32 {
        match self {
            ParamId::Time | ParamId::Bloom => 40.0,
            ParamId::Mass => 60.0,
            ParamId::Density => 30.0,
            ParamId::Gravity => 80.0,
            ParamId::Warp | ParamId::Drift | ParamId::Elasticity => 100.0,
            ParamId::Air => 10.0,
            ParamId::Width | ParamId::Mix => 20.0,
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no [`ParamId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownParamId;

impl fmt::Display for UnknownParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown parameter name")
    }
}

impl FromStr for ParamId {
    type Err = UnknownParamId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::ALL
            .iter()
            .copied()
            .find(|id| id.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(UnknownParamId)
    }
}
