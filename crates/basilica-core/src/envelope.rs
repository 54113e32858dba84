//! Attack/release envelope follower.
//!
//! Runs per sample ([`EnvelopeFollower::process`]) or once per block on a
//! pre-measured level ([`EnvelopeFollower::process_level`]). The block form
//! is what the audio-reactive modulation sources use: they measure block RMS
//! and peak, then advance the follower by the block's duration.

use libm::expf;

use crate::math::flush_denormal;

/// Envelope follower with separate attack and release times.
///
/// # Example
///
/// ```rust
/// use basilica_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::with_times(48000.0, 10.0, 150.0);
/// let level = env.process_level(0.5, 512);
/// assert!(level > 0.0 && level < 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: f32,
    attack_ms: f32,
    release_ms: f32,
}

impl EnvelopeFollower {
    /// Creates a follower with 10 ms attack and 100 ms release.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_times(sample_rate, 10.0, 100.0)
    }

    /// Creates a follower with explicit times.
    pub fn with_times(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
            attack_ms: attack_ms.max(0.1),
            release_ms: release_ms.max(1.0),
        };
        follower.recalculate_coefficients();
        follower
    }

    /// Sets the attack time (minimum 0.1 ms).
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.1);
        self.recalculate_coefficients();
    }

    /// Attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Sets the release time (minimum 1 ms).
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(1.0);
        self.recalculate_coefficients();
    }

    /// Release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Updates the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Tracks the magnitude of one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormal(coeff * self.envelope + (1.0 - coeff) * level);
        self.envelope
    }

    /// Advances by a whole block toward a measured `level`.
    ///
    /// Equivalent to feeding `level` for `block_len` samples.
    pub fn process_level(&mut self, level: f32, block_len: usize) -> f32 {
        let level = level.abs();
        let time_ms = if level > self.envelope {
            self.attack_ms
        } else {
            self.release_ms
        };
        let coeff = expf(-(block_len as f32) * 1000.0 / (time_ms * self.sample_rate));
        self.envelope = flush_denormal(coeff * self.envelope + (1.0 - coeff) * level);
        self.envelope
    }

    /// Current envelope.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Zeroes the envelope.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn recalculate_coefficients(&mut self) {
        self.attack_coeff = expf(-1000.0 / (self.attack_ms * self.sample_rate));
        self.release_coeff = expf(-1000.0 / (self.release_ms * self.sample_rate));
    }
}

impl Default for EnvelopeFollower {
    fn default() -> Self {
        Self::new(48000.0)
    }
}
