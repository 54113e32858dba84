//! Schroeder allpass diffuser.
//!
//! ```text
//! w[n] = x[n] + g * w[n-D]
//! y[n] = w[n-D] - g * w[n]
//! ```
//!
//! Flat magnitude response for |g| < 1; only the phase is smeared. Chains of
//! these turn an impulse into a dense burst without coloring it.

use crate::delay::DelayLine;
use crate::math::flush_denormal;

/// Fixed-length allpass diffuser.
///
/// # Example
///
/// ```rust
/// use basilica_core::AllpassFilter;
///
/// let mut ap = AllpassFilter::new(149, 0.5);
/// let first = ap.process(1.0);
/// assert_eq!(first, -0.5);
/// ```
#[derive(Debug, Clone)]
pub struct AllpassFilter {
    delay: DelayLine,
    length: usize,
    coefficient: f32,
}

impl AllpassFilter {
    /// Largest coefficient magnitude accepted.
    pub const MAX_COEFFICIENT: f32 = 0.95;

    /// Creates a diffuser of `length` samples with coefficient `g`.
    pub fn new(length: usize, coefficient: f32) -> Self {
        let length = length.max(1);
        Self {
            delay: DelayLine::new(length),
            length,
            coefficient: coefficient.clamp(-Self::MAX_COEFFICIENT, Self::MAX_COEFFICIENT),
        }
    }

    /// Sets the coefficient, clamped to ±0.95.
    #[inline]
    pub fn set_coefficient(&mut self, coefficient: f32) {
        self.coefficient = coefficient.clamp(-Self::MAX_COEFFICIENT, Self::MAX_COEFFICIENT);
    }

    /// Current coefficient.
    #[inline]
    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    /// Delay length in samples.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Diffuses one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.delay.tap(self.length);
        let w = flush_denormal(input + self.coefficient * delayed);
        self.delay.write(w);
        delayed - self.coefficient * w
    }

    /// Zeroes the delay memory.
    pub fn clear(&mut self) {
        self.delay.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_impulse_energy() {
        let mut ap = AllpassFilter::new(37, 0.6);
        let mut energy = 0.0f64;
        for n in 0..20000 {
            let y = ap.process(if n == 0 { 1.0 } else { 0.0 });
            energy += f64::from(y * y);
        }
        assert!((energy - 1.0).abs() < 1e-3, "energy {energy}");
    }

    #[test]
    fn coefficient_is_clamped() {
        let mut ap = AllpassFilter::new(10, 2.0);
        assert_eq!(ap.coefficient(), AllpassFilter::MAX_COEFFICIENT);
        ap.set_coefficient(-5.0);
        assert_eq!(ap.coefficient(), -AllpassFilter::MAX_COEFFICIENT);
    }

    #[test]
    fn clear_silences_tail() {
        let mut ap = AllpassFilter::new(10, 0.5);
        ap.process(1.0);
        ap.clear();
        for _ in 0..50 {
            assert_eq!(ap.process(0.0), 0.0);
        }
    }
}
