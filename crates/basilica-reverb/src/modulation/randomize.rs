//! Seeded random connection sets.

use core::fmt;
use core::str::FromStr;

use basilica_core::ParamId;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::curve::ModulationCurve;
use super::matrix::{MAX_KEYS, ModulationConnection};
use super::sources::SourceKind;

const NEGATE_PROBABILITY: f32 = 0.3;
const SMOOTHING_RANGE_MS: (f32, f32) = (100.0, 500.0);

/// How many connections a randomization installs, and how deep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RandomDensity {
    /// 2–3 shallow connections.
    Sparse,
    /// 4–8 moderate connections.
    #[default]
    Normal,
    /// 8–12 deep connections.
    Dense,
}

impl RandomDensity {
    /// Every density.
    pub const ALL: [RandomDensity; 3] = [Self::Sparse, Self::Normal, Self::Dense];

    /// Inclusive connection-count range.
    pub const fn count_range(self) -> (usize, usize) {
        match self {
            Self::Sparse => (2, 3),
            Self::Normal => (4, 8),
            Self::Dense => (8, 12),
        }
    }

    /// Inclusive depth-magnitude range.
    pub const fn depth_range(self) -> (f32, f32) {
        match self {
            Self::Sparse => (0.2, 0.4),
            Self::Normal => (0.2, 0.6),
            Self::Dense => (0.4, 0.8),
        }
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sparse => "sparse",
            Self::Normal => "normal",
            Self::Dense => "dense",
        }
    }
}

impl fmt::Display for RandomDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RandomDensity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| s.to_string())
    }
}

/// Every valid `(source, axis, destination)` triple, in key order.
fn candidate_keys() -> Vec<(SourceKind, usize, ParamId)> {
    let mut keys = Vec::with_capacity(MAX_KEYS);
    for source in SourceKind::ALL {
        for axis in 0..source.axes() {
            for destination in ParamId::ALL {
                keys.push((source, axis, destination));
            }
        }
    }
    keys
}

/// Draws a connection set. Same `density` and `seed`, same set.
///
/// Keys come from a shuffle of the full candidate list, so they are always
/// distinct and the count is always exactly the one drawn.
pub fn random_connections(density: RandomDensity, seed: u64) -> Vec<ModulationConnection> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (min_count, max_count) = density.count_range();
    let (min_depth, max_depth) = density.depth_range();

    let count = rng.random_range(min_count..=max_count);
    let mut keys = candidate_keys();
    keys.shuffle(&mut rng);

    keys.into_iter()
        .take(count)
        .map(|(source, axis, destination)| {
            let mut depth = rng.random_range(min_depth..=max_depth);
            if rng.random::<f32>() < NEGATE_PROBABILITY {
                depth = -depth;
            }
            ModulationConnection {
                source,
                destination,
                axis,
                depth,
                smoothing_ms: rng.random_range(SMOOTHING_RANGE_MS.0..=SMOOTHING_RANGE_MS.1),
                probability: 1.0,
                enabled: true,
                curve: ModulationCurve::Linear,
            }
        })
        .collect()
}
