//! Block-based stereo effect trait.
//!
//! [`StereoEffect`] is the seam for coloration processors that live outside
//! this workspace (metallic resonators, pitch shifters, saturators). The
//! reverb graph hosts them in insert slots. Implementations must follow the
//! same real-time rules as the engine itself: no allocation, locking or I/O
//! inside [`process_stereo`](StereoEffect::process_stereo).
//!
//! # Example
//!
//! ```rust
//! use basilica_core::StereoEffect;
//!
//! struct Trim(f32);
//!
//! impl StereoEffect for Trim {
//!     fn prepare(&mut self, _sample_rate: f32, _max_block: usize) {}
//!
//!     fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
//!         for s in left.iter_mut().chain(right.iter_mut()) {
//!             *s *= self.0;
//!         }
//!     }
//!
//!     fn reset(&mut self) {}
//! }
//!
//! let mut trim = Trim(0.5);
//! let (mut l, mut r) = ([1.0f32; 4], [1.0f32; 4]);
//! trim.process_stereo(&mut l, &mut r);
//! assert_eq!(l[0], 0.5);
//! ```

/// In-place stereo processor driven one block at a time.
pub trait StereoEffect: Send {
    /// Called from the control path before processing starts and whenever
    /// the sample rate or maximum block size changes. May allocate.
    fn prepare(&mut self, sample_rate: f32, max_block: usize);

    /// Processes one block in place. Both slices have the same length,
    /// never more than the prepared maximum.
    fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Clears internal state, keeping configuration.
    fn reset(&mut self);

    /// Processing latency in samples. Informational only; the graph does
    /// not compensate it.
    fn latency_samples(&self) -> usize {
        0
    }
}
