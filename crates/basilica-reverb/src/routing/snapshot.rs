//! Immutable, validated routing graphs.
//!
//! A [`RoutingSnapshot`] is built and checked on the control side, then
//! published whole. Everything the audio side derives from it at run time
//! (union orders during a transition) goes through [`topological_order`],
//! which works on fixed arrays and never allocates.

use super::connection::{ConnectionKind, MAX_FEEDBACK_EDGES, RoutingConnection};
use super::preset::RoutingPreset;
use crate::error::EngineError;
use crate::nodes::NodeId;

const N: usize = NodeId::COUNT;

/// Forward adjacency, `edges[from][to]`.
pub type EdgeSet = [[bool; N]; N];
/// Forward weights, `weights[from][to]`. Crossfeed edges keep a second
/// table for the opposite-channel share.
pub type EdgeWeights = [[f32; N]; N];

/// Execution order over a subset of nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOrder {
    nodes: [NodeId; N],
    len: usize,
}

impl NodeOrder {
    /// Nodes in execution order.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes[..self.len]
    }

    /// Number of nodes in the order.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no node is scheduled.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of `id`, if scheduled.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.as_slice().iter().position(|&n| n == id)
    }
}

/// Kahn sort over the `present` nodes. Ties go to the lowest [`NodeId`], so
/// the order is deterministic.
///
/// On a cycle, returns the lowest node still waiting on an input.
pub fn topological_order(edges: &EdgeSet, present: &[bool; N]) -> Result<NodeOrder, NodeId> {
    let mut in_degree = [0usize; N];
    for from in 0..N {
        for to in 0..N {
            if edges[from][to] && present[from] && present[to] {
                in_degree[to] += 1;
            }
        }
    }

    let mut order = NodeOrder {
        nodes: [NodeId::Input; N],
        len: 0,
    };
    let mut emitted = [false; N];
    let wanted = present.iter().filter(|&&p| p).count();

    while order.len < wanted {
        let Some(next) = (0..N).find(|&i| present[i] && !emitted[i] && in_degree[i] == 0) else {
            let stuck = (0..N).find(|&i| present[i] && !emitted[i]).unwrap_or(0);
            return Err(NodeId::ALL[stuck]);
        };
        emitted[next] = true;
        order.nodes[order.len] = NodeId::ALL[next];
        order.len += 1;
        for to in 0..N {
            if edges[next][to] && present[to] {
                in_degree[to] -= 1;
            }
        }
    }
    Ok(order)
}

/// A feedback return, gain already clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackEdge {
    /// Node whose output is captured.
    pub from: NodeId,
    /// Node the return is mixed into.
    pub to: NodeId,
    /// Return gain.
    pub gain: f32,
}

/// Validated routing graph plus bypass flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingSnapshot {
    preset: RoutingPreset,
    connections: Vec<RoutingConnection>,
    edges: EdgeSet,
    weights: EdgeWeights,
    crossed: EdgeWeights,
    present: [bool; N],
    order: NodeOrder,
    feedback: Vec<FeedbackEdge>,
    bypass: [bool; N],
}

impl RoutingSnapshot {
    /// Validates `connections` and builds the snapshot.
    ///
    /// Blend and feedback gain are clamped. Errors on non-finite values,
    /// self-loops, edges into `input` or out of `output`, duplicate edges,
    /// more than [`MAX_FEEDBACK_EDGES`] feedback edges, forward cycles, and
    /// an `output` that `input` cannot reach.
    pub fn build(
        preset: RoutingPreset,
        connections: &[RoutingConnection],
        bypass: [bool; N],
    ) -> Result<Self, EngineError> {
        let mut edges = [[false; N]; N];
        let mut weights = [[0.0f32; N]; N];
        let mut crossed = [[0.0f32; N]; N];
        let mut feedback = Vec::new();
        let mut present = [false; N];
        present[NodeId::Input.index()] = true;
        present[NodeId::Output.index()] = true;

        for conn in connections {
            match conn.kind {
                ConnectionKind::Parallel { blend } if !blend.is_finite() => {
                    return Err(EngineError::NonFinite("parallel blend"));
                }
                ConnectionKind::Feedback { gain } if !gain.is_finite() => {
                    return Err(EngineError::NonFinite("feedback gain"));
                }
                ConnectionKind::Crossfeed { amount } if !amount.is_finite() => {
                    return Err(EngineError::NonFinite("crossfeed amount"));
                }
                _ => {}
            }
            if conn.from == conn.to {
                return Err(EngineError::SelfLoop(conn.from));
            }
            if conn.to == NodeId::Input || conn.from == NodeId::Output {
                return Err(EngineError::InvalidEndpoint {
                    from: conn.from,
                    to: conn.to,
                });
            }
            let duplicate = EngineError::DuplicateConnection {
                from: conn.from,
                to: conn.to,
            };
            let (f, t) = (conn.from.index(), conn.to.index());
            if conn.is_feedback() {
                if feedback
                    .iter()
                    .any(|e: &FeedbackEdge| e.from == conn.from && e.to == conn.to)
                {
                    return Err(duplicate);
                }
                feedback.push(FeedbackEdge {
                    from: conn.from,
                    to: conn.to,
                    gain: conn.feedback_gain(),
                });
            } else {
                if edges[f][t] {
                    return Err(duplicate);
                }
                edges[f][t] = true;
                (weights[f][t], crossed[f][t]) = conn.channel_weights();
            }
            present[f] = true;
            present[t] = true;
        }

        if feedback.len() > MAX_FEEDBACK_EDGES {
            return Err(EngineError::TooManyFeedbackEdges {
                count: feedback.len(),
                max: MAX_FEEDBACK_EDGES,
            });
        }
        let order = topological_order(&edges, &present).map_err(EngineError::Cycle)?;
        if !reaches(&edges, NodeId::Input, NodeId::Output) {
            return Err(EngineError::OutputUnreachable);
        }

        Ok(Self {
            preset,
            connections: connections.iter().map(|c| c.clamped()).collect(),
            edges,
            weights,
            crossed,
            present,
            order,
            feedback,
            bypass,
        })
    }

    /// Snapshot of a named preset. `Custom` has no edges of its own and
    /// fails with [`EngineError::OutputUnreachable`].
    pub fn for_preset(preset: RoutingPreset) -> Result<Self, EngineError> {
        Self::build(preset, &preset.connections(), preset.bypass())
    }

    /// A single `input -> output` wire under the custom label.
    pub fn passthrough() -> Self {
        let (i, o) = (NodeId::Input.index(), NodeId::Output.index());
        let mut edges = [[false; N]; N];
        let mut weights = [[0.0; N]; N];
        let mut present = [false; N];
        edges[i][o] = true;
        weights[i][o] = 1.0;
        present[i] = true;
        present[o] = true;
        let mut nodes = [NodeId::Input; N];
        nodes[1] = NodeId::Output;
        Self {
            preset: RoutingPreset::Custom,
            connections: vec![RoutingConnection::serial(NodeId::Input, NodeId::Output)],
            edges,
            weights,
            crossed: [[0.0; N]; N],
            present,
            order: NodeOrder { nodes, len: 2 },
            feedback: Vec::new(),
            bypass: [false; N],
        }
    }

    /// Same graph with one bypass flag changed.
    pub fn with_bypass(&self, node: NodeId, bypassed: bool) -> Self {
        let mut next = self.clone();
        next.bypass[node.index()] = bypassed;
        next
    }

    /// Same graph under another preset label.
    pub fn relabeled(&self, preset: RoutingPreset) -> Self {
        Self {
            preset,
            ..self.clone()
        }
    }

    /// Preset this graph came from.
    pub fn preset(&self) -> RoutingPreset {
        self.preset
    }

    /// Edges as supplied, clamped.
    pub fn connections(&self) -> &[RoutingConnection] {
        &self.connections
    }

    /// Forward adjacency.
    pub fn edges(&self) -> &EdgeSet {
        &self.edges
    }

    /// Same-channel forward weights.
    pub fn weights(&self) -> &EdgeWeights {
        &self.weights
    }

    /// Opposite-channel forward weights, nonzero only on crossfeed edges.
    pub fn crossed_weights(&self) -> &EdgeWeights {
        &self.crossed
    }

    /// Same-channel weight of `from -> to`, 0 without an edge.
    pub fn weight(&self, from: NodeId, to: NodeId) -> f32 {
        self.weights[from.index()][to.index()]
    }

    /// Opposite-channel weight of `from -> to`.
    pub fn crossed_weight(&self, from: NodeId, to: NodeId) -> f32 {
        self.crossed[from.index()][to.index()]
    }

    /// Nodes the graph touches (always including input and output).
    pub fn present(&self) -> &[bool; N] {
        &self.present
    }

    /// Execution order.
    pub fn order(&self) -> &NodeOrder {
        &self.order
    }

    /// Feedback returns.
    pub fn feedback(&self) -> &[FeedbackEdge] {
        &self.feedback
    }

    /// Bypass flags by [`NodeId::index`].
    pub fn bypass(&self) -> &[bool; N] {
        &self.bypass
    }

    /// True if `node` is bypassed.
    pub fn is_bypassed(&self, node: NodeId) -> bool {
        self.bypass[node.index()]
    }

    /// True if both snapshots route forward signal identically.
    pub fn same_forward_graph(&self, other: &Self) -> bool {
        self.edges == other.edges && self.weights == other.weights && self.crossed == other.crossed
    }
}

/// True if `to` can be reached from `from` along forward edges.
fn reaches(edges: &EdgeSet, from: NodeId, to: NodeId) -> bool {
    let mut seen = [false; N];
    let mut stack = [0usize; N];
    let mut top = 1;
    stack[0] = from.index();
    seen[from.index()] = true;
    while top > 0 {
        top -= 1;
        let node = stack[top];
        if node == to.index() {
            return true;
        }
        for next in 0..N {
            if edges[node][next] && !seen[next] {
                seen[next] = true;
                stack[top] = next;
                top += 1;
            }
        }
    }
    false
}
