//! Circular delay line with fractional reads.
//!
//! Every consumer in basilica follows the same order per sample: read first,
//! then write. A read of `d` samples therefore returns what was written `d`
//! writes ago, so the smallest meaningful delay is 1 and a read never sees
//! the sample about to be written. New lines are zero-filled.
//!
//! # Use Cases
//!
//! | Consumer | Delay Range | Modulated |
//! |----------|-------------|-----------|
//! | FDN lines | 30-70 ms | Yes (drift) |
//! | Allpass diffusers | 3-8 ms | No |
//! | Wander | 5-21 ms | Yes (LFO) |
//! | Early reflections | 4-50 ms | No |

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::math::flush_denormal;

/// Heap-allocated delay line with linear interpolation.
///
/// The buffer is allocated once at construction and never resized.
///
/// # Example
///
/// ```rust
/// use basilica_core::DelayLine;
///
/// let mut line = DelayLine::new(100);
/// line.write(1.0);
/// line.write(0.0);
/// assert_eq!(line.read(2.0), 1.0);
/// assert_eq!(line.read(1.5), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Creates a line that can delay by up to `max_delay_samples`.
    ///
    /// # Panics
    ///
    /// Panics if `max_delay_samples` is 0.
    pub fn new(max_delay_samples: usize) -> Self {
        assert!(max_delay_samples > 0, "delay capacity must be > 0");
        Self {
            // One extra slot so the interpolation partner of the longest
            // delay is still in the buffer.
            buffer: vec![0.0; max_delay_samples + 2],
            write_pos: 0,
        }
    }

    /// Creates a line from a sample rate and a maximum time in seconds.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        let samples = libm::ceilf((sample_rate * max_seconds).max(1.0)) as usize;
        Self::new(samples)
    }

    /// Longest delay a read can return, in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len() - 2
    }

    /// Sample written `delay` writes ago, linearly interpolated.
    ///
    /// `delay` is clamped to `[1, capacity]`.
    #[inline]
    pub fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, self.capacity() as f32);
        let whole = delay as usize;
        let frac = delay - whole as f32;

        let newer = (self.write_pos + len - whole) % len;
        let older = (newer + len - 1) % len;
        let a = self.buffer[newer];
        let b = self.buffer[older];
        a + (b - a) * frac
    }

    /// Sample written exactly `delay` writes ago, no interpolation.
    #[inline]
    pub fn tap(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, self.capacity());
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Appends a sample, flushing denormals.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = flush_denormal(sample);
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Zeroes the contents.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
