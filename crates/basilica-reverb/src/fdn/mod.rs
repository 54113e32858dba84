//! Feedback delay network: mixing matrix, bloom envelope and the 8-line core.

mod bloom;
mod matrix;
mod network;

pub use bloom::{BloomEnvelope, ONSET_THRESHOLD, envelope_at};
pub use matrix::{LINES, MixingMatrix, hadamard, householder};
pub use network::{
    DELAYS_48K, FdnCore, MAX_DRIFT_48K, MAX_LINE_GAIN, MIN_RT60_SECS, rt60_seconds,
};
