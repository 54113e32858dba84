//! Edges of the routing graph.

use crate::nodes::NodeId;

/// Feedback gain ceiling, whatever the caller asks for.
pub const MAX_FEEDBACK_GAIN: f32 = 0.95;
/// Feedback edges a graph may hold.
pub const MAX_FEEDBACK_EDGES: usize = 8;

/// How an edge carries signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionKind {
    /// Full-level forward edge.
    Serial,
    /// Forward edge scaled by `blend` (0..=1).
    Parallel {
        /// Edge weight.
        blend: f32,
    },
    /// One-block-delayed return, filtered and soft-clipped.
    Feedback {
        /// Return gain, at most [`MAX_FEEDBACK_GAIN`].
        gain: f32,
    },
    /// Full-level forward edge that folds the channels toward their sum:
    /// `L' = (1 - a)·L + a·(L + R)/2`, and the same for `R'`. At 0 it is a
    /// serial edge; at 1 both sides carry the mono sum.
    Crossfeed {
        /// Fold amount `a` (0..=1).
        amount: f32,
    },
}

impl ConnectionKind {
    /// Kebab-case name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Parallel { .. } => "parallel",
            Self::Feedback { .. } => "feedback",
            Self::Crossfeed { .. } => "crossfeed",
        }
    }
}

/// Directed edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingConnection {
    /// Upstream node.
    pub from: NodeId,
    /// Downstream node.
    pub to: NodeId,
    /// Edge kind.
    pub kind: ConnectionKind,
}

impl RoutingConnection {
    /// Full-level forward edge.
    pub const fn serial(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            kind: ConnectionKind::Serial,
        }
    }

    /// Weighted forward edge.
    pub const fn parallel(from: NodeId, to: NodeId, blend: f32) -> Self {
        Self {
            from,
            to,
            kind: ConnectionKind::Parallel { blend },
        }
    }

    /// Feedback return from `from` into `to`.
    pub const fn feedback(from: NodeId, to: NodeId, gain: f32) -> Self {
        Self {
            from,
            to,
            kind: ConnectionKind::Feedback { gain },
        }
    }

    /// Channel-folding forward edge.
    pub const fn crossfeed(from: NodeId, to: NodeId, amount: f32) -> Self {
        Self {
            from,
            to,
            kind: ConnectionKind::Crossfeed { amount },
        }
    }

    /// True for feedback edges.
    pub const fn is_feedback(&self) -> bool {
        matches!(self.kind, ConnectionKind::Feedback { .. })
    }

    /// Forward weight: 1 for serial and crossfeed, the clamped blend for
    /// parallel, 0 for feedback.
    pub fn weight(&self) -> f32 {
        match self.kind {
            ConnectionKind::Serial | ConnectionKind::Crossfeed { .. } => 1.0,
            ConnectionKind::Parallel { blend } => blend.clamp(0.0, 1.0),
            ConnectionKind::Feedback { .. } => 0.0,
        }
    }

    /// Crossfeed amount clamped to `0..=1`; 0 for every other kind.
    pub fn crossfeed_amount(&self) -> f32 {
        match self.kind {
            ConnectionKind::Crossfeed { amount } => amount.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Split of [`weight`](Self::weight) into same-channel and
    /// opposite-channel gains.
    pub fn channel_weights(&self) -> (f32, f32) {
        let w = self.weight();
        let half = 0.5 * self.crossfeed_amount();
        (w * (1.0 - half), w * half)
    }

    /// Return gain clamped to `0..=MAX_FEEDBACK_GAIN`; 0 for forward edges.
    pub fn feedback_gain(&self) -> f32 {
        match self.kind {
            ConnectionKind::Feedback { gain } => gain.clamp(0.0, MAX_FEEDBACK_GAIN),
            _ => 0.0,
        }
    }

    /// Same edge with blend and gain clamped into range.
    pub fn clamped(self) -> Self {
        let kind = match self.kind {
            ConnectionKind::Serial => ConnectionKind::Serial,
            ConnectionKind::Parallel { .. } => ConnectionKind::Parallel {
                blend: self.weight(),
            },
            ConnectionKind::Feedback { .. } => ConnectionKind::Feedback {
                gain: self.feedback_gain(),
            },
            ConnectionKind::Crossfeed { .. } => ConnectionKind::Crossfeed {
                amount: self.crossfeed_amount(),
            },
        };
        Self { kind, ..self }
    }
}

impl core::fmt::Display for RoutingConnection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ConnectionKind::Serial => write!(f, "{} -> {}", self.from, self.to),
            ConnectionKind::Parallel { blend } => {
                write!(f, "{} -> {} (parallel {blend:.2})", self.from, self.to)
            }
            ConnectionKind::Feedback { gain } => {
                write!(f, "{} -> {} (feedback {gain:.2})", self.from, self.to)
            }
            ConnectionKind::Crossfeed { amount } => {
                write!(f, "{} -> {} (crossfeed {amount:.2})", self.from, self.to)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_gain_capped() {
        let fb = RoutingConnection::feedback(NodeId::Shimmer, NodeId::Tail, 3.0);
        assert_eq!(fb.feedback_gain(), MAX_FEEDBACK_GAIN);
        assert_eq!(fb.weight(), 0.0);
        assert_eq!(fb.clamped().kind, ConnectionKind::Feedback { gain: 0.95 });
    }

    #[test]
    fn parallel_blend_clamped() {
        let p = RoutingConnection::parallel(NodeId::Early, NodeId::Tail, -0.5);
        assert_eq!(p.weight(), 0.0);
        assert_eq!(RoutingConnection::serial(NodeId::Input, NodeId::Early).weight(), 1.0);
    }

    #[test]
    fn crossfeed_splits_weight_between_channels() {
        let c = RoutingConnection::crossfeed(NodeId::Tail, NodeId::Output, 0.5);
        assert_eq!(c.weight(), 1.0);
        assert_eq!(c.channel_weights(), (0.75, 0.25));
        let full = RoutingConnection::crossfeed(NodeId::Tail, NodeId::Output, 4.0);
        assert_eq!(full.clamped().kind, ConnectionKind::Crossfeed { amount: 1.0 });
        assert_eq!(full.channel_weights(), (0.5, 0.5));
        assert_eq!(
            RoutingConnection::serial(NodeId::Tail, NodeId::Output).channel_weights(),
            (1.0, 0.0)
        );
        assert_eq!(c.to_string(), "tail -> output (crossfeed 0.50)");
    }

    #[test]
    fn display_reads_like_an_edge() {
        let p = RoutingConnection::parallel(NodeId::Early, NodeId::Tail, 0.4);
        assert_eq!(p.to_string(), "early -> tail (parallel 0.40)");
    }
}
