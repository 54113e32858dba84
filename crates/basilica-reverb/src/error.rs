//! Error type for engine preparation and control operations.
//!
//! The audio path never constructs one of these except to report a
//! mis-sized or mis-shaped block back to the host.

use thiserror::Error;

use crate::modulation::SourceKind;
use crate::nodes::NodeId;

/// Errors returned by [`ReverbEngine`](crate::ReverbEngine) and
/// [`EngineHandle`](crate::EngineHandle).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No routing preset has this name.
    #[error("unknown routing preset '{0}'")]
    UnknownPreset(String),

    /// No parameter has this name.
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    /// No modulation source has this name.
    #[error("unknown modulation source '{0}'")]
    UnknownSource(String),

    /// No graph node has this name.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// Sample rate is not finite or not positive.
    #[error("invalid sample rate {0}: must be finite and > 0")]
    InvalidSampleRate(f32),

    /// Maximum block size is zero or above the supported limit.
    #[error("invalid max block size {size}: must be in 1..={max}")]
    InvalidBlockSize {
        /// Requested size.
        size: usize,
        /// Largest supported size.
        max: usize,
    },

    /// Channel count other than 1 or 2.
    #[error("unsupported channel count {0}: expected 1 or 2")]
    UnsupportedChannels(usize),

    /// Block channel layout differs from what was prepared.
    #[error("channel mismatch: prepared for {expected}, got {got}")]
    ChannelMismatch {
        /// Channels passed to `prepare`.
        expected: usize,
        /// Channels in the block.
        got: usize,
    },

    /// Channels of one block have different lengths.
    #[error("channel lengths differ: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first channel.
        left: usize,
        /// Length of the mismatching channel.
        right: usize,
    },

    /// Block longer than the prepared maximum.
    #[error("block of {len} samples exceeds prepared maximum {max}")]
    BlockTooLarge {
        /// Samples in the block.
        len: usize,
        /// Prepared maximum.
        max: usize,
    },

    /// `process` called before a successful `prepare`.
    #[error("engine has not been prepared")]
    NotPrepared,

    /// Modulation smoothing time outside the accepted window.
    #[error("smoothing time {0} ms outside 20..=1000 ms")]
    SmoothingOutOfRange(f32),

    /// Axis index beyond what the source provides.
    #[error("axis {axis} out of range for source {kind} ({axes} axes)")]
    InvalidAxis {
        /// Source the axis was requested from.
        kind: SourceKind,
        /// Requested axis.
        axis: usize,
        /// Number of axes the source has.
        axes: usize,
    },

    /// LFO slot index out of range.
    #[error("lfo index {index} out of range (0..{count})")]
    InvalidLfo {
        /// Requested slot.
        index: usize,
        /// Number of slots.
        count: usize,
    },

    /// A control value was NaN or infinite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),

    /// Serial/parallel edges form a cycle.
    #[error("routing cycle through node {0}")]
    Cycle(NodeId),

    /// An edge starts and ends on the same node.
    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    /// Edge enters `input` or leaves `output`.
    #[error("invalid edge {from} -> {to}: nothing may feed input or leave output")]
    InvalidEndpoint {
        /// Edge source.
        from: NodeId,
        /// Edge destination.
        to: NodeId,
    },

    /// Two edges share the same endpoints and kind family.
    #[error("duplicate connection {from} -> {to}")]
    DuplicateConnection {
        /// Edge source.
        from: NodeId,
        /// Edge destination.
        to: NodeId,
    },

    /// No forward path from `input` to `output`.
    #[error("output is not reachable from input")]
    OutputUnreachable,

    /// External effects only go into the resonator, shimmer and saturator
    /// slots.
    #[error("node {0} is not an insert slot")]
    NotInsertSlot(NodeId),

    /// More feedback edges than the graph has slots for.
    #[error("{count} feedback edges exceed the limit of {max}")]
    TooManyFeedbackEdges {
        /// Edges requested.
        count: usize,
        /// Slots available.
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_preset_display() {
        let err = EngineError::UnknownPreset("hall".into());
        assert_eq!(err.to_string(), "unknown routing preset 'hall'");
    }

    #[test]
    fn block_too_large_display() {
        let err = EngineError::BlockTooLarge { len: 1024, max: 512 };
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn invalid_axis_names_source() {
        let err = EngineError::InvalidAxis {
            kind: SourceKind::ChaosAttractor,
            axis: 3,
            axes: 3,
        };
        assert!(err.to_string().contains("chaos"), "{err}");
    }

    #[test]
    fn cycle_names_node() {
        let err = EngineError::Cycle(NodeId::Tail);
        assert_eq!(err.to_string(), "routing cycle through node tail");
    }
}
