//! Late-field envelope ("bloom").
//!
//! Blends a plain exponential decay with a plateau-then-decay shape. At
//! `bloom = 0` the wet output follows `exp(-t / decay)`; as bloom rises the
//! envelope holds near its peak for a growing fraction of the decay time and
//! the peak itself lifts to 1.5×. The envelope restarts whenever the input
//! crosses the onset threshold from below.

use basilica_core::{SmoothedParam, lerp};

/// Input magnitude that counts as an onset.
pub const ONSET_THRESHOLD: f32 = 1e-3;
const MIN_DECAY_SECS: f32 = 1.0;
const MAX_DECAY_SECS: f32 = 12.0;
const PEAK_GAIN: f32 = 0.5;
const MAX_ENVELOPE: f32 = 1.5;
/// Retrigger jumps are softened over this time.
const APPLY_SMOOTHING_MS: f32 = 5.0;

/// Onset-retriggered wet envelope.
#[derive(Debug, Clone)]
pub struct BloomEnvelope {
    elapsed: f32,
    dt: f32,
    armed: bool,
    applied: SmoothedParam,
}

impl BloomEnvelope {
    /// Creates an envelope at its peak, armed for the first onset.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            elapsed: 0.0,
            dt: 1.0 / sample_rate,
            armed: true,
            applied: SmoothedParam::with_config(1.0, sample_rate, APPLY_SMOOTHING_MS),
        }
    }

    /// Updates the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.dt = 1.0 / sample_rate;
        self.applied.set_sample_rate(sample_rate);
    }

    /// Feeds one input magnitude, restarting the envelope on an armed onset.
    #[inline]
    pub fn observe(&mut self, magnitude: f32) {
        if magnitude > ONSET_THRESHOLD {
            if self.armed {
                self.elapsed = 0.0;
                self.armed = false;
            }
        } else {
            self.armed = true;
        }
    }

    /// Advances one sample and returns the gain to apply to the wet signal.
    ///
    /// `time` and `bloom` are normalized parameter values.
    #[inline]
    pub fn advance(&mut self, time: f32, bloom: f32) -> f32 {
        let target = envelope_at(self.elapsed, time, bloom);
        self.elapsed += self.dt;
        self.applied.set_target(target);
        self.applied.advance()
    }

    /// Seconds since the last onset.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Returns to the peak, armed.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.armed = true;
        self.applied.set_immediate(1.0);
    }
}

/// Envelope value `elapsed` seconds after an onset.
pub fn envelope_at(elapsed: f32, time: f32, bloom: f32) -> f32 {
    let decay = lerp(MIN_DECAY_SECS, MAX_DECAY_SECS, time.clamp(0.0, 1.0));
    let bloom = bloom.clamp(0.0, 1.0);
    let exp_env = libm::expf(-elapsed / decay);
    let plateau_time = decay * (0.25 + 0.35 * bloom);
    let plateau_env = if elapsed < plateau_time {
        1.0
    } else {
        libm::expf(-(elapsed - plateau_time) / decay)
    };
    let peak = 1.0 + PEAK_GAIN * bloom * bloom;
    (exp_env + bloom * (plateau_env * peak - exp_env)).clamp(0.0, MAX_ENVELOPE)
}
