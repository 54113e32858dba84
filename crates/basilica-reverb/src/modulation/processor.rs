//! Audio side of the modulation matrix.
//!
//! All per-connection state lives in fixed arrays indexed by connection
//! key, so a block never allocates whatever the published set looks like.

use basilica_core::{ParamId, block_coeff};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::matrix::{MAX_KEYS, ModulationMatrix};
use super::sources::{SOURCE_AXES, SourceBank};

/// Probability gates are redrawn at this cadence.
pub const GATE_INTERVAL_MS: f32 = 50.0;
/// A released connection below this magnitude is dropped.
const RELEASE_EPSILON: f32 = 1e-6;

/// Turns the published connection set into one value per [`ParamId`] each
/// block.
#[derive(Debug, Clone)]
pub struct ModulationProcessor {
    sample_rate: f32,
    seed: u64,
    sources: SourceBank,
    rng: ChaCha8Rng,
    smoothed: [f32; MAX_KEYS],
    smoothing_ms: [f32; MAX_KEYS],
    active: [bool; MAX_KEYS],
    gate_open: [bool; MAX_KEYS],
    gate_interval: usize,
    gate_elapsed: usize,
    outputs: [f32; ParamId::COUNT],
}

impl ModulationProcessor {
    /// Creates a processor with seeded sources and gate randomness.
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self {
            sample_rate,
            seed,
            sources: SourceBank::new(sample_rate, seed),
            rng: ChaCha8Rng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
            smoothed: [0.0; MAX_KEYS],
            smoothing_ms: [0.0; MAX_KEYS],
            active: [false; MAX_KEYS],
            gate_open: [false; MAX_KEYS],
            gate_interval: gate_interval_samples(sample_rate),
            gate_elapsed: 0,
            outputs: [0.0; ParamId::COUNT],
        }
    }

    /// Advances sources and smoothers by one block of input.
    ///
    /// Returns the per-destination offsets, each in [-1, 1].
    pub fn process(
        &mut self,
        left: &[f32],
        right: &[f32],
        matrix: &ModulationMatrix,
    ) -> &[f32; ParamId::COUNT] {
        let len = left.len();
        if len == 0 {
            return &self.outputs;
        }
        let set = matrix.load();
        let values: [f32; SOURCE_AXES] = *self.sources.process(left, right, &set.lfos);

        let redraw = self.gate_elapsed >= self.gate_interval;
        if redraw {
            self.gate_elapsed = 0;
        }
        self.gate_elapsed += len;

        let mut targets = [0.0f32; MAX_KEYS];
        let mut live = [false; MAX_KEYS];
        for conn in &set.connections {
            let key = conn.key();
            self.smoothing_ms[key] = conn.smoothing_ms;
            if !conn.enabled {
                continue;
            }
            if !self.active[key] || redraw {
                self.gate_open[key] = self.rng.random::<f32>() < conn.probability;
            }
            self.active[key] = true;
            live[key] = true;
            if self.gate_open[key] {
                let raw = values[conn.source.axis_offset() + conn.axis];
                targets[key] = conn.curve.apply(raw) * conn.depth;
            }
        }

        self.outputs = [0.0; ParamId::COUNT];
        for key in 0..MAX_KEYS {
            if !self.active[key] {
                continue;
            }
            let coeff = block_coeff(self.smoothing_ms[key], self.sample_rate, len);
            self.smoothed[key] += (targets[key] - self.smoothed[key]) * coeff;
            if !live[key] && self.smoothed[key].abs() < RELEASE_EPSILON {
                self.smoothed[key] = 0.0;
                self.active[key] = false;
                continue;
            }
            self.outputs[key % ParamId::COUNT] += self.smoothed[key];
        }
        for out in &mut self.outputs {
            *out = out.clamp(-1.0, 1.0);
        }
        &self.outputs
    }

    /// Offsets produced by the last block.
    pub fn outputs(&self) -> &[f32; ParamId::COUNT] {
        &self.outputs
    }

    /// Offset for one destination.
    pub fn value(&self, id: ParamId) -> f32 {
        self.outputs[id.index()]
    }

    /// Source axes from the last block.
    pub fn source_values(&self) -> &[f32; SOURCE_AXES] {
        self.sources.values()
    }

    /// Number of connections still contributing (live or gliding out).
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    /// Zeroes every smoother and reseeds the sources.
    pub fn reset(&mut self) {
        *self = Self::new(self.sample_rate, self.seed);
    }
}

fn gate_interval_samples(sample_rate: f32) -> usize {
    (libm::roundf(GATE_INTERVAL_MS * 0.001 * sample_rate) as usize).max(1)
}
