//! DC blocking high-pass.
//!
//! `H(z) = (1 - z^-1) / (1 - R*z^-1)` with the pole `R` placed from a cutoff
//! frequency: `R = 1 - 2π * fc / fs`.

use core::f32::consts::PI;

use crate::math::flush_denormal;

/// First-order DC blocker.
///
/// ```rust
/// use basilica_core::DcBlocker;
///
/// let mut blocker = DcBlocker::new(48000.0, 20.0);
/// let mut y = 0.0;
/// for _ in 0..48000 {
///     y = blocker.process(0.5);
/// }
/// assert!(y.abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct DcBlocker {
    coeff: f32,
    cutoff_hz: f32,
    x_prev: f32,
    y_prev: f32,
}

impl DcBlocker {
    /// Creates a blocker with its -3 dB point at `cutoff_hz`.
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        Self {
            coeff: Self::pole(cutoff_hz, sample_rate),
            cutoff_hz,
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// Filters one sample: `y[n] = x[n] - x[n-1] + R*y[n-1]`.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = flush_denormal(input - self.x_prev + self.coeff * self.y_prev);
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    /// Recomputes the pole for a new sample rate, same cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.coeff = Self::pole(self.cutoff_hz, sample_rate);
    }

    /// Pole position R.
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Zeroes the state.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }

    fn pole(cutoff_hz: f32, sample_rate: f32) -> f32 {
        (1.0 - 2.0 * PI * cutoff_hz / sample_rate).clamp(0.9, 0.9999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pole_tracks_sample_rate() {
        let mut b = DcBlocker::new(48000.0, 20.0);
        let at_48k = b.coeff();
        b.set_sample_rate(96000.0);
        assert!(b.coeff() > at_48k);
    }

    #[test]
    fn passes_audio_band() {
        let sr = 48000.0;
        let mut b = DcBlocker::new(sr, 20.0);
        let mut peak = 0.0f32;
        for n in 0..48000 {
            let x = libm::sinf(2.0 * PI * 1000.0 * n as f32 / sr);
            let y = b.process(x);
            if n > 24000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak > 0.98);
    }
}
