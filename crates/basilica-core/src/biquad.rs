//! Second-order IIR sections with RBJ cookbook coefficients.
//!
//! Direct Form I:
//!
//! ```text
//! y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
//! ```
//!
//! DF1 keeps input history separate from output history, so coefficients can
//! be swapped between samples (the elastic hall retunes its modes while
//! running) without the state blowing up.

use core::f32::consts::PI;
use libm::{cosf, sinf};

use crate::math::flush_denormal;

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    /// Feedforward, current input.
    pub b0: f32,
    /// Feedforward, one sample back.
    pub b1: f32,
    /// Feedforward, two samples back.
    pub b2: f32,
    /// Feedback, one sample back.
    pub a1: f32,
    /// Feedback, two samples back.
    pub a2: f32,
}

impl BiquadCoefficients {
    /// Passes input through unchanged.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalizes raw cookbook terms by `a0`.
    pub fn from_raw(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let inv = 1.0 / a0;
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }

    /// Band-pass with 0 dB peak gain at `frequency`.
    pub fn bandpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = Self::prewarp(frequency, q, sample_rate);
        Self::from_raw(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
    }

    /// Low-pass.
    pub fn lowpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = Self::prewarp(frequency, q, sample_rate);
        let b = (1.0 - cos_w) / 2.0;
        Self::from_raw(b, 2.0 * b, b, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
    }

    /// High-pass.
    pub fn highpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_w, alpha) = Self::prewarp(frequency, q, sample_rate);
        let b = (1.0 + cos_w) / 2.0;
        Self::from_raw(b, -2.0 * b, b, 1.0 + alpha, -2.0 * cos_w, 1.0 - alpha)
    }

    fn prewarp(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32) {
        let nyquist = sample_rate * 0.5;
        let omega = 2.0 * PI * frequency.clamp(1.0, nyquist * 0.99) / sample_rate;
        (cosf(omega), sinf(omega) / (2.0 * q.max(0.05)))
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Biquad filter state plus its current coefficients.
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coeffs: BiquadCoefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a pass-through section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a section with the given coefficients.
    pub fn with_coefficients(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            ..Self::default()
        }
    }

    /// Replaces the coefficients, keeping the history.
    #[inline]
    pub fn set_coefficients(&mut self, coeffs: BiquadCoefficients) {
        self.coeffs = coeffs;
    }

    /// Current coefficients.
    pub fn coefficients(&self) -> BiquadCoefficients {
        self.coeffs
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = flush_denormal(output);
        self.y1
    }

    /// Zeroes the history.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libm::sinf;

    fn steady_peak(coeffs: BiquadCoefficients, freq: f32, sr: f32) -> f32 {
        let mut bq = Biquad::with_coefficients(coeffs);
        let mut peak = 0.0f32;
        for n in 0..(sr as usize) {
            let x = sinf(2.0 * PI * freq * n as f32 / sr);
            let y = bq.process(x);
            if n > sr as usize / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn identity_passes_through() {
        let mut bq = Biquad::new();
        assert_eq!(bq.process(0.3), 0.3);
        assert_eq!(bq.process(-0.7), -0.7);
    }

    #[test]
    fn bandpass_peaks_at_center() {
        let sr = 48000.0;
        let bp = BiquadCoefficients::bandpass(500.0, 5.0, sr);
        let center = steady_peak(bp, 500.0, sr);
        let off = steady_peak(bp, 4000.0, sr);
        assert!((center - 1.0).abs() < 0.05, "center {center}");
        assert!(off < 0.1, "off-center {off}");
    }

    #[test]
    fn lowpass_and_highpass_split() {
        let sr = 48000.0;
        let lp = steady_peak(BiquadCoefficients::lowpass(1000.0, 0.707, sr), 8000.0, sr);
        let hp = steady_peak(BiquadCoefficients::highpass(1000.0, 0.707, sr), 8000.0, sr);
        assert!(lp < 0.1);
        assert!(hp > 0.9);
    }
}
