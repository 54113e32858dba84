//! Reconfigurable routing graph.
//!
//! - [`RoutingConnection`] / [`RoutingPreset`] describe a graph.
//! - [`RoutingSnapshot`] is a validated, immutable graph with its Kahn
//!   order, weight table and feedback list.
//! - [`RoutingControl`] publishes snapshots from the control side.
//! - [`RoutingGraph`] executes them on the audio side, crossfading edge
//!   weights whenever the published graph changes.
//!
//! Feedback edges are always delayed by exactly one maximum block,
//! low-passed at 8 kHz, soft-clipped and gain-limited to 0.95.

mod connection;
mod control;
mod graph;
mod preset;
mod snapshot;

pub use connection::{ConnectionKind, MAX_FEEDBACK_EDGES, MAX_FEEDBACK_GAIN, RoutingConnection};
pub use control::RoutingControl;
pub use graph::{
    FEEDBACK_LOWPASS_HZ, FEEDBACK_SLOTS, FEEDBACK_SMOOTHING_MS, RoutingGraph, TRANSITION_MS,
    TransitionPhase,
};
pub use preset::RoutingPreset;
pub use snapshot::{
    EdgeSet, EdgeWeights, FeedbackEdge, NodeOrder, RoutingSnapshot, topological_order,
};
