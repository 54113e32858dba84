//! The 8-line feedback delay network.

use basilica_core::{
    AllpassFilter, DelayLine, OnePole, ParamId, ParameterBufferPool, flush_denormal, lerp,
    one_pole_coeff, rt60_gain, soft_limit,
};
use core::f32::consts::{FRAC_PI_2, TAU};

use super::bloom::BloomEnvelope;
use super::matrix::{LINES, MixingMatrix};

// ── Constants (lengths in samples at 48 kHz) ────────────────────────────────

/// Line lengths. Primes, so no two lines share a resonance.
pub const DELAYS_48K: [f32; LINES] = [
    1423.0, 1637.0, 1871.0, 2099.0, 2357.0, 2633.0, 2909.0, 3203.0,
];
const INPUT_DIFFUSERS_48K: [f32; 2] = [149.0, 223.0];
const LATE_DIFFUSERS_48K: [f32; LINES] = [157.0, 173.0, 197.0, 223.0, 251.0, 281.0, 313.0, 347.0];

/// Largest delay excursion from drift.
pub const MAX_DRIFT_48K: f32 = 12.0;
/// Per-line feedback gain ceiling.
pub const MAX_LINE_GAIN: f32 = 0.9995;
/// RT60 at `time = 0`; `time = 1` gives 20× this.
pub const MIN_RT60_SECS: f32 = 1.0;
const RT60_RANGE: f32 = 20.0;

const DAMPING_OFFSETS: [f32; LINES] = [-0.035, -0.025, -0.015, -0.005, 0.005, 0.015, 0.025, 0.035];
const MAX_DAMPING: f32 = 0.98;
const LATE_COEFF_OFFSETS: [f32; LINES] = [-0.06, -0.045, -0.03, -0.015, 0.015, 0.03, 0.045, 0.06];

const INPUT_MID: [f32; LINES] = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
const INPUT_SIDE: [f32; LINES] = [1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0];
const INV_SQRT_8: f32 = 0.353_553_4;

// Constant-power pan weights at ±0.9, ±0.7, ±0.5, ±0.3.
const OUT_LEFT: [f32; LINES] = [
    0.996_917_3, 0.078_459_1, 0.972_369_9, 0.233_445_4, 0.923_879_5, 0.382_683_4, 0.852_640_2,
    0.522_498_6,
];
const OUT_RIGHT: [f32; LINES] = [
    0.078_459_1, 0.996_917_3, 0.233_445_4, 0.972_369_9, 0.382_683_4, 0.923_879_5, 0.522_498_6,
    0.852_640_2,
];
/// Σ OUT_LEFT² = 4, so 0.5 brings the tap sum back to unity power.
const OUTPUT_GAIN: f32 = 0.5;
const WET_KNEE: f32 = 0.85;
const WET_CEILING: f32 = 0.95;

const GRAVITY_MIN_HZ: f32 = 20.0;
const GRAVITY_MAX_HZ: f32 = 200.0;

const MAX_EARLY_MIX: f32 = 0.7;
const DRIFT_ABSORPTION_DEPTH: f32 = 0.02;

/// Maps normalized `time` to RT60 in seconds: `1 s · 20^time`.
#[inline]
pub fn rt60_seconds(time: f32) -> f32 {
    MIN_RT60_SECS * libm::powf(RT60_RANGE, time.clamp(0.0, 1.0))
}

/// Eight-line FDN with input/late diffusion, absorption, gravity and bloom.
///
/// Reads its controls from the engine's [`ParameterBufferPool`]: `time`,
/// `mass`, `density`, `gravity` and `bloom` per sample, `warp` and `drift`
/// once per block. Feedback gains are recomputed at each block boundary and
/// ramped linearly across the block.
#[derive(Debug, Clone)]
pub struct FdnCore {
    sample_rate: f32,
    lines: [DelayLine; LINES],
    delays: [f32; LINES],
    max_drift: f32,
    matrix: MixingMatrix,
    input_diffusers: [AllpassFilter; 2],
    late_diffusers: [AllpassFilter; LINES],
    absorption: [OnePole; LINES],
    gravity: [OnePole; LINES],
    gravity_poles: (f32, f32),
    gains: [f32; LINES],
    gains_primed: bool,
    drift_phase: [f32; LINES],
    drift_offsets: [f32; LINES],
    bloom: BloomEnvelope,
}

impl FdnCore {
    /// Allocates lines for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let scale = sample_rate / 48000.0;
        let delays = DELAYS_48K.map(|d| (d * scale).max(1.0));
        let max_drift = MAX_DRIFT_48K * scale;
        let capacity = libm::ceilf(delays[LINES - 1] + max_drift) as usize + 2;
        let diffuser_len = |d: f32| (libm::roundf(d * scale) as usize).max(1);

        Self {
            sample_rate,
            lines: core::array::from_fn(|_| DelayLine::new(capacity)),
            delays,
            max_drift,
            matrix: MixingMatrix::new(),
            input_diffusers: INPUT_DIFFUSERS_48K.map(|d| AllpassFilter::new(diffuser_len(d), 0.3)),
            late_diffusers: LATE_DIFFUSERS_48K.map(|d| AllpassFilter::new(diffuser_len(d), 0.4)),
            absorption: core::array::from_fn(|_| OnePole::with_coeff(0.5)),
            gravity: core::array::from_fn(|_| OnePole::with_coeff(0.0)),
            gravity_poles: (
                one_pole_coeff(GRAVITY_MIN_HZ, sample_rate),
                one_pole_coeff(GRAVITY_MAX_HZ, sample_rate),
            ),
            gains: [0.0; LINES],
            gains_primed: false,
            drift_phase: core::array::from_fn(|i| i as f32 / LINES as f32),
            drift_offsets: [0.0; LINES],
            bloom: BloomEnvelope::new(sample_rate),
        }
    }

    /// Sample rate the lines were sized for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Base line lengths in samples.
    pub fn delays(&self) -> &[f32; LINES] {
        &self.delays
    }

    /// Feedback gains reached at the end of the last block.
    pub fn gains(&self) -> &[f32; LINES] {
        &self.gains
    }

    /// The mixing matrix.
    pub fn matrix(&self) -> &MixingMatrix {
        &self.matrix
    }

    /// Upper bound on the closed-loop gain: `max gᵢ · ‖M‖₂`.
    pub fn loop_gain_bound(&self) -> f32 {
        let g = self.gains.iter().fold(0.0f32, |m, &g| m.max(g));
        g * self.matrix.spectral_norm()
    }

    /// Block-end feedback gains for a normalized `time`.
    pub fn target_gains(&self, time: f32) -> [f32; LINES] {
        let rt60 = rt60_seconds(time);
        self.delays
            .map(|d| rt60_gain(d, rt60, self.sample_rate).min(MAX_LINE_GAIN))
    }

    /// Processes one stereo block in place.
    ///
    /// `params` must hold lanes at least `left.len()` long.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        let len = left.len().min(right.len());
        if len == 0 {
            return;
        }

        let time = params.buffer(ParamId::Time);
        let mass = params.buffer(ParamId::Mass);
        let density = params.buffer(ParamId::Density);
        let gravity = params.buffer(ParamId::Gravity);
        let bloom = params.buffer(ParamId::Bloom);
        let warp = params.buffer(ParamId::Warp).last();
        let drift = params.buffer(ParamId::Drift).last().clamp(0.0, 1.0);

        self.matrix.set_warp(warp);

        // Gains: block-start → block-end, linear.
        let target_gains = self.target_gains(time.last());
        if !self.gains_primed {
            self.gains = target_gains;
            self.gains_primed = true;
        }
        let inv_len = 1.0 / len as f32;
        let gain_steps: [f32; LINES] =
            core::array::from_fn(|i| (target_gains[i] - self.gains[i]) * inv_len);

        // Drift: per-line slow sines, block-start → block-end.
        let start_offsets = self.drift_offsets;
        let depth = drift * self.max_drift;
        let mut wobble = [0.0f32; LINES];
        for i in 0..LINES {
            let rate = 0.07 + 0.017 * i as f32;
            self.drift_phase[i] += rate * len as f32 / self.sample_rate;
            self.drift_phase[i] -= libm::floorf(self.drift_phase[i]);
            let angle = TAU * self.drift_phase[i];
            self.drift_offsets[i] = depth * libm::sinf(angle);
            wobble[i] = drift * DRIFT_ABSORPTION_DEPTH * libm::sinf(angle + FRAC_PI_2);
        }
        let offset_steps: [f32; LINES] =
            core::array::from_fn(|i| (self.drift_offsets[i] - start_offsets[i]) * inv_len);

        let (pole_lo, pole_hi) = self.gravity_poles;
        let mut reads = [0.0f32; LINES];
        let mut mixed = [0.0f32; LINES];

        for n in 0..len {
            let t = (n + 1) as f32;
            let in_l = left[n];
            let in_r = right[n];

            let d = density.get(n).clamp(0.0, 1.0);
            let injection = lerp(0.18, 0.32, d) * INV_SQRT_8;
            let early_mix = lerp(0.45, 0.25, d).min(MAX_EARLY_MIX);
            let input_coeff = lerp(0.12, 0.6, d);
            let late_coeff = lerp(0.18, 0.7, d);
            let damping = lerp(0.1, 0.85, mass.get(n).clamp(0.0, 1.0));
            let gravity_pole = lerp(pole_lo, pole_hi, gravity.get(n).clamp(0.0, 1.0));

            self.bloom.observe(in_l.abs().max(in_r.abs()));

            for ap in &mut self.input_diffusers {
                ap.set_coefficient(input_coeff);
            }
            let diff_l = self.input_diffusers[0].process(in_l);
            let diff_r = self.input_diffusers[1].process(in_r);
            let mid = 0.5 * (diff_l + diff_r);
            let side = 0.5 * (diff_l - diff_r);

            for i in 0..LINES {
                let offset = start_offsets[i] + offset_steps[i] * t;
                reads[i] = self.lines[i].read(self.delays[i] + offset);
            }
            self.matrix.apply(&reads, &mut mixed);

            let mut wet_l = 0.0;
            let mut wet_r = 0.0;
            for i in 0..LINES {
                let ap = &mut self.late_diffusers[i];
                ap.set_coefficient((late_coeff * (1.0 + LATE_COEFF_OFFSETS[i])).clamp(0.05, 0.74));
                let late = ap.process(reads[i]);
                wet_l += late * OUT_LEFT[i];
                wet_r += late * OUT_RIGHT[i];
            }
            let envelope = self.bloom.advance(time.get(n), bloom.get(n));
            let wet_l = soft_limit(wet_l * OUTPUT_GAIN * envelope, WET_KNEE, WET_CEILING);
            let wet_r = soft_limit(wet_r * OUTPUT_GAIN * envelope, WET_KNEE, WET_CEILING);

            for i in 0..LINES {
                let g = self.gains[i] + gain_steps[i] * t;
                let inject = (mid * INPUT_MID[i] + side * INPUT_SIDE[i]) * injection;
                let x = mixed[i] * g + inject;

                let absorption = &mut self.absorption[i];
                absorption
                    .set_coeff((damping + DAMPING_OFFSETS[i] + wobble[i]).clamp(0.0, MAX_DAMPING));
                let damped = absorption.process(x);

                let hp = &mut self.gravity[i];
                hp.set_coeff(gravity_pole);
                let contained = hp.process_highpass(damped);

                self.lines[i].write(flush_denormal(contained));
            }

            left[n] = in_l * early_mix + wet_l * (1.0 - early_mix);
            right[n] = in_r * early_mix + wet_r * (1.0 - early_mix);
        }

        self.gains = target_gains;
    }

    /// Clears every line, filter, diffuser and the bloom envelope. Gains and
    /// the mixing matrix are kept.
    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for ap in self.input_diffusers.iter_mut().chain(self.late_diffusers.iter_mut()) {
            ap.clear();
        }
        for f in self.absorption.iter_mut().chain(self.gravity.iter_mut()) {
            f.reset();
        }
        self.bloom.reset();
    }
}
