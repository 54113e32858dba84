//! Preallocated stereo scratch buffers.
//!
//! Buffers are sized to the prepared maximum block. A block of `len`
//! samples uses the first `len` samples of each channel; the tail is left
//! untouched.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Two non-interleaved channels of equal capacity.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    /// Left channel samples.
    pub left: Vec<f32>,
    /// Right channel samples.
    pub right: Vec<f32>,
}

impl StereoBuffer {
    /// Creates a zeroed buffer holding `capacity` samples per channel.
    pub fn new(capacity: usize) -> Self {
        Self {
            left: vec![0.0; capacity],
            right: vec![0.0; capacity],
        }
    }

    /// Resizes both channels. Allocates; control path only.
    pub fn resize(&mut self, capacity: usize) {
        self.left.resize(capacity, 0.0);
        self.right.resize(capacity, 0.0);
    }

    /// Samples per channel.
    pub fn capacity(&self) -> usize {
        self.left.len()
    }

    /// Zeroes both channels.
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }

    /// Zeroes the first `len` samples of both channels.
    pub fn clear_prefix(&mut self, len: usize) {
        self.left[..len].fill(0.0);
        self.right[..len].fill(0.0);
    }

    /// Copies the first `len` samples of `other`.
    pub fn copy_from(&mut self, other: &StereoBuffer, len: usize) {
        self.left[..len].copy_from_slice(&other.left[..len]);
        self.right[..len].copy_from_slice(&other.right[..len]);
    }

    /// Adds `gain * other` over the first `len` samples.
    #[inline]
    pub fn accumulate_scaled(&mut self, other: &StereoBuffer, gain: f32, len: usize) {
        for (dst, src) in self.left[..len].iter_mut().zip(&other.left[..len]) {
            *dst += *src * gain;
        }
        for (dst, src) in self.right[..len].iter_mut().zip(&other.right[..len]) {
            *dst += *src * gain;
        }
    }

    /// Adds `other` with a per-sample gain ramp over the first `len` samples.
    #[inline]
    pub fn accumulate_ramped(&mut self, other: &StereoBuffer, gains: &[f32], len: usize) {
        for i in 0..len {
            let g = gains[i];
            self.left[i] += other.left[i] * g;
            self.right[i] += other.right[i] * g;
        }
    }

    /// Adds `gain * other` with the channels swapped: left from `other`'s
    /// right, right from its left.
    #[inline]
    pub fn accumulate_crossed(&mut self, other: &StereoBuffer, gain: f32, len: usize) {
        for (dst, src) in self.left[..len].iter_mut().zip(&other.right[..len]) {
            *dst += *src * gain;
        }
        for (dst, src) in self.right[..len].iter_mut().zip(&other.left[..len]) {
            *dst += *src * gain;
        }
    }

    /// [`accumulate_crossed`](Self::accumulate_crossed) with a per-sample
    /// gain ramp.
    #[inline]
    pub fn accumulate_crossed_ramped(&mut self, other: &StereoBuffer, gains: &[f32], len: usize) {
        for i in 0..len {
            let g = gains[i];
            self.left[i] += other.right[i] * g;
            self.right[i] += other.left[i] * g;
        }
    }

    /// Mutable views of both channels, `len` samples long.
    pub fn channels_mut(&mut self, len: usize) -> (&mut [f32], &mut [f32]) {
        (&mut self.left[..len], &mut self.right[..len])
    }
}
