//! Early reflections: a seeded cluster of discrete taps per channel.

use basilica_core::{AllpassFilter, DelayLine, ParamId, ParameterBufferPool, lerp};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Taps per channel.
pub const TAPS: usize = 24;
const MIN_TAP_MS: f32 = 4.0;
const MAX_TAP_MS: f32 = 50.0;
const TAP_GAIN_RANGE: (f32, f32) = (0.08, 0.42);
/// Ceiling on `sqrt(Σ gain²)` per channel.
pub const TAP_ENERGY_LIMIT: f32 = 1.6;
const SMEAR_COEFF: f32 = 0.25;
const SMEAR_48K: [f32; 2] = [61.0, 67.0];
/// Output magnitude ceiling.
pub const OUTPUT_CEILING: f32 = 1.25;

#[derive(Debug, Clone)]
struct TapChannel {
    line: DelayLine,
    delays: [f32; TAPS],
    gains: [f32; TAPS],
    smear: AllpassFilter,
}

impl TapChannel {
    fn new(sample_rate: f32, rng: &mut ChaCha8Rng, smear_len: usize) -> Self {
        let mut delays = [0.0f32; TAPS];
        let mut gains = [0.0f32; TAPS];
        for (d, g) in delays.iter_mut().zip(gains.iter_mut()) {
            let ms = rng.random_range(MIN_TAP_MS..=MAX_TAP_MS);
            *d = ms * 0.001 * sample_rate;
            let magnitude = rng.random_range(TAP_GAIN_RANGE.0..=TAP_GAIN_RANGE.1);
            *g = if rng.random::<bool>() { magnitude } else { -magnitude };
        }
        let energy = libm::sqrtf(gains.iter().map(|g| g * g).sum());
        if energy > TAP_ENERGY_LIMIT {
            let scale = TAP_ENERGY_LIMIT / energy;
            for g in &mut gains {
                *g *= scale;
            }
        }
        Self {
            line: DelayLine::from_time(sample_rate, MAX_TAP_MS * 0.001 + 0.001),
            delays,
            gains,
            smear: AllpassFilter::new(smear_len, SMEAR_COEFF),
        }
    }

    #[inline]
    fn process(&mut self, x: f32, level: f32) -> f32 {
        let mut acc = 0.0;
        for (&d, &g) in self.delays.iter().zip(&self.gains) {
            acc += self.line.read(d) * g;
        }
        self.line.write(x);
        let reflected = self.smear.process(acc) * level;
        (x + reflected).clamp(-OUTPUT_CEILING, OUTPUT_CEILING)
    }

    fn clear(&mut self) {
        self.line.clear();
        self.smear.clear();
    }
}

/// Discrete early reflections ahead of the tail.
///
/// Left and right draw their taps from the same seeded stream one after the
/// other, so the two channels are decorrelated but reproducible. The level
/// follows `density`: `lerp(density, 0.25, 0.85)`.
#[derive(Debug, Clone)]
pub struct EarlyReflections {
    channels: [TapChannel; 2],
}

impl EarlyReflections {
    /// Lays out taps for `sample_rate` from `seed`.
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let scale = sample_rate / 48000.0;
        let smear_len = |d: f32| (libm::roundf(d * scale) as usize).max(1);
        let left = TapChannel::new(sample_rate, &mut rng, smear_len(SMEAR_48K[0]));
        let right = TapChannel::new(sample_rate, &mut rng, smear_len(SMEAR_48K[1]));
        Self {
            channels: [left, right],
        }
    }

    /// Tap delays in samples for channel 0 (left) or 1 (right).
    pub fn tap_delays(&self, channel: usize) -> &[f32; TAPS] {
        &self.channels[channel.min(1)].delays
    }

    /// Tap gains for channel 0 (left) or 1 (right).
    pub fn tap_gains(&self, channel: usize) -> &[f32; TAPS] {
        &self.channels[channel.min(1)].gains
    }

    /// Processes a stereo block in place.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        let density = params.buffer(ParamId::Density);
        let [ch_l, ch_r] = &mut self.channels;
        for (n, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let level = lerp(0.25, 0.85, density.get(n).clamp(0.0, 1.0));
            *l = ch_l.process(*l, level);
            *r = ch_r.process(*r, level);
        }
    }

    /// Clears the tap lines and smear filters. The layout is kept.
    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.clear();
        }
    }
}
