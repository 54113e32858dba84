//! One-pole (6 dB/oct) filters.
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n])
//! coeff = exp(-2π * freq / sample_rate)
//! ```
//!
//! The low-pass has unity gain at DC and gain below 1 everywhere else, which
//! is what the FDN absorption stage and the feedback return filters rely on.
//! The high-pass is the complement `x - lowpass(x)`.

use crate::math::flush_denormal;
use libm::expf;

/// Coefficient for a one-pole low-pass at `freq_hz`.
#[inline]
pub fn one_pole_coeff(freq_hz: f32, sample_rate: f32) -> f32 {
    let nyquist = sample_rate * 0.5;
    expf(-core::f32::consts::TAU * freq_hz.clamp(0.0, nyquist) / sample_rate)
}

/// One-pole low-pass filter.
///
/// # Invariants
///
/// - `coeff` is kept in [0, 1), so the filter is stable with gain ≤ 1
/// - state is flushed to zero below 1e-20
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Creates a low-pass with cutoff `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
        };
        filter.recalculate_coeff();
        filter
    }

    /// Creates a filter from a raw pole coefficient.
    pub fn with_coeff(coeff: f32) -> Self {
        Self {
            state: 0.0,
            coeff: coeff.clamp(0.0, 0.9999),
            sample_rate: 48000.0,
            freq: 0.0,
        }
    }

    /// Sets the cutoff frequency.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz;
        self.recalculate_coeff();
    }

    /// Sets the pole coefficient directly. Clamped to [0, 0.9999].
    ///
    /// Higher values filter harder. The FDN uses this to drive absorption
    /// straight from a damping amount.
    #[inline]
    pub fn set_coeff(&mut self, coeff: f32) {
        self.coeff = coeff.clamp(0.0, 0.9999);
    }

    /// Current pole coefficient.
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Updates the sample rate, keeping the cutoff frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Low-pass one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// High-pass one sample (input minus the low-passed input).
    #[inline]
    pub fn process_highpass(&mut self, input: f32) -> f32 {
        input - self.process(input)
    }

    /// Last output.
    pub fn state(&self) -> f32 {
        self.state
    }

    /// Zeroes the state.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    fn recalculate_coeff(&mut self) {
        self.coeff = one_pole_coeff(self.freq, self.sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_passes_dc() {
        let mut lp = OnePole::new(48000.0, 1000.0);
        let mut out = 0.0;
        for _ in 0..48000 {
            out = lp.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-4);
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut hp = OnePole::new(48000.0, 100.0);
        let mut out = 1.0;
        for _ in 0..48000 {
            out = hp.process_highpass(1.0);
        }
        assert!(out.abs() < 1e-4);
    }

    #[test]
    fn lowpass_attenuates_nyquist() {
        let mut lp = OnePole::new(48000.0, 1000.0);
        let mut peak = 0.0f32;
        for n in 0..4800 {
            let x = if n % 2 == 0 { 1.0 } else { -1.0 };
            let y = lp.process(x);
            if n > 1000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.2, "peak {peak}");
    }

    #[test]
    fn coeff_is_clamped() {
        let mut lp = OnePole::with_coeff(2.0);
        assert!(lp.coeff() < 1.0);
        lp.set_coeff(-1.0);
        assert_eq!(lp.coeff(), 0.0);
    }
}
