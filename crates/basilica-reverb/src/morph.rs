//! Bilinear morphing across four parameter sets.
//!
//! A [`PresetMorpher`] holds one full parameter set per corner of a unit
//! square. Moving the position blends them with bilinear weights, so each
//! corner is reproduced exactly and the center is their plain average.
//!
//! ```rust
//! use basilica_core::ParamId;
//! use basilica_reverb::morph::{Corner, PresetMorpher};
//!
//! let mut morpher = PresetMorpher::default();
//! morpher.set_corner_param(Corner::TopRight, ParamId::Time, 1.0);
//! morpher.set_position(1.0, 0.0).unwrap();
//! assert_eq!(morpher.param(ParamId::Time), 1.0);
//! ```

use core::fmt;
use core::str::FromStr;

use basilica_core::ParamId;

use crate::error::EngineError;
use crate::shared::{EngineHandle, sanitize_param};

/// One full set of normalized parameter values.
pub type ParamSet = [f32; ParamId::COUNT];

/// Corner of the morph square. `x` runs left to right, `y` top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// `(0, 0)`.
    TopLeft,
    /// `(1, 0)`.
    TopRight,
    /// `(0, 1)`.
    BottomLeft,
    /// `(1, 1)`.
    BottomRight,
}

impl Corner {
    /// Every corner, in weight order.
    pub const ALL: [Corner; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Dense index in `0..4`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Kebab-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Corner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| s.to_string())
    }
}

/// Bilinear weights of the four corners at `(x, y)`, in [`Corner::ALL`]
/// order. Coordinates are clamped to [0, 1]; the weights sum to 1.
pub fn corner_weights(x: f32, y: f32) -> [f32; 4] {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    [
        (1.0 - x) * (1.0 - y),
        x * (1.0 - y),
        (1.0 - x) * y,
        x * y,
    ]
}

/// Four parameter sets and a position between them.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetMorpher {
    corners: [ParamSet; 4],
    x: f32,
    y: f32,
}

impl PresetMorpher {
    /// Morpher over `corners` (in [`Corner::ALL`] order), positioned at the
    /// top-left corner. Values are clamped to [0, 1]; non-finite values
    /// fall back to the parameter default.
    pub fn new(corners: [ParamSet; 4]) -> Self {
        Self {
            corners: corners.map(sanitized),
            x: 0.0,
            y: 0.0,
        }
    }

    /// Replaces one corner's parameter set.
    pub fn set_corner(&mut self, corner: Corner, params: ParamSet) {
        self.corners[corner.index()] = sanitized(params);
    }

    /// Replaces a single value in one corner.
    pub fn set_corner_param(&mut self, corner: Corner, id: ParamId, value: f32) {
        self.corners[corner.index()][id.index()] = sanitize_param(id, value);
    }

    /// Parameter set stored at `corner`.
    pub fn corner(&self, corner: Corner) -> &ParamSet {
        &self.corners[corner.index()]
    }

    /// Moves to `(x, y)`, each clamped to [0, 1].
    pub fn set_position(&mut self, x: f32, y: f32) -> Result<(), EngineError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(EngineError::NonFinite("morph position"));
        }
        self.x = x.clamp(0.0, 1.0);
        self.y = y.clamp(0.0, 1.0);
        Ok(())
    }

    /// Current `(x, y)`.
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Corner weights at the current position.
    pub fn weights(&self) -> [f32; 4] {
        corner_weights(self.x, self.y)
    }

    /// Blended value of `id` at the current position.
    pub fn param(&self, id: ParamId) -> f32 {
        let weights = self.weights();
        let blended: f32 = self
            .corners
            .iter()
            .zip(weights)
            .map(|(set, w)| set[id.index()] * w)
            .sum();
        blended.clamp(0.0, 1.0)
    }

    /// Every blended value in [`ParamId::ALL`] order.
    pub fn params(&self) -> ParamSet {
        core::array::from_fn(|i| self.param(ParamId::ALL[i]))
    }

    /// Writes the blended set to `handle` as parameter targets. The engine
    /// smooths each one as for any other control write.
    pub fn apply(&self, handle: &EngineHandle) -> Result<(), EngineError> {
        for (id, value) in ParamId::ALL.into_iter().zip(self.params()) {
            handle.set_param(id, value)?;
        }
        tracing::debug!("morph_apply: x={:.3} y={:.3}", self.x, self.y);
        Ok(())
    }
}

impl Default for PresetMorpher {
    /// Every corner at the parameter defaults.
    fn default() -> Self {
        Self::new([ParamId::ALL.map(ParamId::default_value); 4])
    }
}

fn sanitized(params: ParamSet) -> ParamSet {
    core::array::from_fn(|i| sanitize_param(ParamId::ALL[i], params[i]))
}
