//! Audio side of the routing graph.
//!
//! [`RoutingGraph`] owns every node, one output buffer per node and the
//! feedback return slots. Each block it:
//!
//! 1. observes a newly published snapshot (deferred while a transition is
//!    running) and plans the transition in fixed arrays;
//! 2. gathers feedback returns;
//! 3. runs the scheduled nodes, each fed by the weighted sum of its
//!    upstream outputs plus its returns;
//! 4. captures feedback sources into their rings;
//! 5. copies the `output` node to the caller.
//!
//! Edge weights ramp linearly over [`TRANSITION_MS`]. When the union of the
//! old and new forward edges is acyclic a single crossfade runs in union
//! order. Otherwise the old-only edges fade out in the old order first, then
//! the new-only edges fade in in the new order.

use std::sync::Arc;

use basilica_core::{
    OnePole, ParameterBufferPool, SmoothedParam, StereoBuffer, StereoEffect, soft_clip,
    wet_dry_mix,
};

use super::connection::MAX_FEEDBACK_EDGES;
use super::control::RoutingControl;
use super::snapshot::{EdgeSet, EdgeWeights, NodeOrder, RoutingSnapshot, topological_order};
use crate::error::EngineError;
use crate::nodes::{Node, NodeId};

const N: usize = NodeId::COUNT;

/// Edge crossfade length per phase.
pub const TRANSITION_MS: f32 = 30.0;
/// Feedback gain smoothing time.
pub const FEEDBACK_SMOOTHING_MS: f32 = 50.0;
/// Feedback return low-pass cutoff.
pub const FEEDBACK_LOWPASS_HZ: f32 = 8000.0;
/// Return slots: a full set of live edges plus as many fading out.
pub const FEEDBACK_SLOTS: usize = MAX_FEEDBACK_EDGES * 2;
/// A fading return below this gain is released.
const FEEDBACK_RELEASE: f32 = 1e-4;

/// Where a routing change currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// No change in flight.
    Idle,
    /// One crossfade over the union of old and new edges.
    Crossfade,
    /// First half of a two-phase change: old-only edges fade out.
    FadeOut,
    /// Second half: new-only edges fade in.
    FadeIn,
}

// ── Feedback slots ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct FeedbackSlot {
    edge: Option<(NodeId, NodeId)>,
    gain: SmoothedParam,
    lowpass: [OnePole; 2],
    ring: StereoBuffer,
    returned: StereoBuffer,
    pos: usize,
}

impl FeedbackSlot {
    fn new(sample_rate: f32, max_block: usize) -> Self {
        Self {
            edge: None,
            gain: SmoothedParam::with_config(0.0, sample_rate, FEEDBACK_SMOOTHING_MS),
            lowpass: [
                OnePole::new(sample_rate, FEEDBACK_LOWPASS_HZ),
                OnePole::new(sample_rate, FEEDBACK_LOWPASS_HZ),
            ],
            ring: StereoBuffer::new(max_block),
            returned: StereoBuffer::new(max_block),
            pos: 0,
        }
    }

    /// Reads `len` samples written exactly one ring length ago, scaled by
    /// the smoothed gain.
    fn gather(&mut self, len: usize) {
        let cap = self.ring.capacity();
        for i in 0..len {
            let idx = (self.pos + i) % cap;
            let g = self.gain.advance();
            self.returned.left[i] = self.ring.left[idx] * g;
            self.returned.right[i] = self.ring.right[idx] * g;
        }
    }

    /// Low-pass, soft clip, then write into the ring.
    fn capture(&mut self, source: &StereoBuffer, len: usize) {
        let cap = self.ring.capacity();
        let [lp_l, lp_r] = &mut self.lowpass;
        for i in 0..len {
            let idx = (self.pos + i) % cap;
            self.ring.left[idx] = soft_clip(lp_l.process(source.left[i]));
            self.ring.right[idx] = soft_clip(lp_r.process(source.right[i]));
        }
        self.pos = (self.pos + len) % cap;
    }

    fn clear(&mut self) {
        self.ring.clear();
        self.returned.clear();
        for lp in &mut self.lowpass {
            lp.reset();
        }
        self.pos = 0;
    }

    fn release(&mut self) {
        self.edge = None;
        self.gain.set_immediate(0.0);
        self.clear();
    }

    fn is_faded_out(&self) -> bool {
        self.gain.target() == 0.0 && self.gain.get().abs() < FEEDBACK_RELEASE
    }
}

// ── Graph ───────────────────────────────────────────────────────────────────

/// Executes published routing snapshots.
pub struct RoutingGraph {
    control: RoutingControl,
    max_block: usize,
    nodes: [Node; N],
    buffers: [StereoBuffer; N],
    dry: StereoBuffer,
    ramp: Vec<f32>,
    gains: Vec<f32>,
    bypass_fade: [SmoothedParam; N],
    feedback: [FeedbackSlot; FEEDBACK_SLOTS],

    active: Arc<RoutingSnapshot>,
    previous: Option<Arc<RoutingSnapshot>>,
    phase: TransitionPhase,
    elapsed: usize,
    ramp_samples: usize,
    run_order: NodeOrder,
    run_edges: EdgeSet,
    weights_from: EdgeWeights,
    weights_to: EdgeWeights,
    crossed_from: EdgeWeights,
    crossed_to: EdgeWeights,
}

impl RoutingGraph {
    /// Builds every node and adopts the currently published snapshot.
    /// Allocates.
    pub fn new(
        control: RoutingControl,
        sample_rate: f32,
        max_block: usize,
        seed: u64,
        input_gain_db: f32,
    ) -> Self {
        let active = control.snapshot();
        let nodes = core::array::from_fn(|i| {
            Node::new(NodeId::ALL[i], sample_rate, max_block, seed, input_gain_db)
        });
        let bypass_fade = core::array::from_fn(|i| {
            let target = if active.bypass()[i] { 0.0 } else { 1.0 };
            SmoothedParam::fast(target, sample_rate)
        });
        let ramp_samples = (libm::roundf(TRANSITION_MS * 0.001 * sample_rate) as usize).max(1);

        let mut graph = Self {
            control,
            max_block,
            nodes,
            buffers: core::array::from_fn(|_| StereoBuffer::new(max_block)),
            dry: StereoBuffer::new(max_block),
            ramp: vec![0.0; max_block],
            gains: vec![0.0; max_block],
            bypass_fade,
            feedback: core::array::from_fn(|_| FeedbackSlot::new(sample_rate, max_block)),
            run_order: *active.order(),
            run_edges: *active.edges(),
            weights_from: *active.weights(),
            weights_to: *active.weights(),
            crossed_from: *active.crossed_weights(),
            crossed_to: *active.crossed_weights(),
            active,
            previous: None,
            phase: TransitionPhase::Idle,
            elapsed: 0,
            ramp_samples,
        };
        graph.retarget_feedback();
        for slot in &mut graph.feedback {
            slot.gain.snap_to_target();
        }
        graph
    }

    /// Control handle this graph follows.
    pub fn control(&self) -> &RoutingControl {
        &self.control
    }

    /// Snapshot being executed (the incoming one during a transition).
    pub fn active_snapshot(&self) -> &RoutingSnapshot {
        &self.active
    }

    /// Current transition phase.
    pub fn transition_phase(&self) -> TransitionPhase {
        self.phase
    }

    /// Execution order of the current block.
    pub fn run_order(&self) -> &NodeOrder {
        &self.run_order
    }

    /// Number of feedback slots holding an edge, fading ones included.
    pub fn feedback_slots_in_use(&self) -> usize {
        self.feedback.iter().filter(|s| s.edge.is_some()).count()
    }

    /// Node in slot `id`.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutable node in slot `id`.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Installs an external effect into an insert slot.
    pub fn install(
        &mut self,
        node: NodeId,
        effect: Box<dyn StereoEffect>,
    ) -> Result<Option<Box<dyn StereoEffect>>, EngineError> {
        if !node.is_insert() {
            return Err(EngineError::NotInsertSlot(node));
        }
        self.nodes[node.index()]
            .install(effect)
            .map_err(|_| EngineError::NotInsertSlot(node))
    }

    /// Removes every installed insert effect.
    pub fn take_inserts(&mut self) -> Vec<(NodeId, Box<dyn StereoEffect>)> {
        NodeId::ALL
            .into_iter()
            .filter_map(|id| match &mut self.nodes[id.index()] {
                Node::Insert(slot) => slot.take().map(|fx| (id, fx)),
                _ => None,
            })
            .collect()
    }

    /// Processes one block in place: `left`/`right` carry the input in and
    /// the `output` node's signal out.
    ///
    /// Both slices must have the same length, at most the prepared maximum.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        let len = left.len().min(right.len()).min(self.max_block);
        if len == 0 {
            return;
        }
        self.observe();

        let ramping = self.phase != TransitionPhase::Idle;
        if ramping {
            let span = self.ramp_samples as f32;
            for (i, r) in self.ramp[..len].iter_mut().enumerate() {
                *r = ((self.elapsed + i + 1) as f32 / span).min(1.0);
            }
        }

        for slot in &mut self.feedback {
            if slot.edge.is_some() {
                slot.gather(len);
            }
        }

        let order = self.run_order;
        for &id in order.as_slice() {
            self.run_node(id, len, &left[..len], &right[..len], params, ramping);
        }

        for slot in &mut self.feedback {
            if let Some((from, _)) = slot.edge {
                slot.capture(&self.buffers[from.index()], len);
            }
        }

        let out = &self.buffers[NodeId::Output.index()];
        left[..len].copy_from_slice(&out.left[..len]);
        right[..len].copy_from_slice(&out.right[..len]);

        for slot in &mut self.feedback {
            if slot.edge.is_some() && slot.is_faded_out() {
                slot.release();
            }
        }

        if ramping {
            self.elapsed += len;
            if self.elapsed >= self.ramp_samples {
                self.finish_phase();
            }
        }
    }

    /// Silences every node, return and buffer, snaps all fades and lands on
    /// the latest published snapshot.
    pub fn reset(&mut self) {
        let latest = self.control.snapshot();
        self.active = latest;
        self.previous = None;
        self.phase = TransitionPhase::Idle;
        self.elapsed = 0;
        self.set_schedule_from_active();
        for node in &mut self.nodes {
            node.reset();
        }
        for buf in &mut self.buffers {
            buf.clear();
        }
        self.dry.clear();
        for (i, fade) in self.bypass_fade.iter_mut().enumerate() {
            fade.set_target(if self.active.bypass()[i] { 0.0 } else { 1.0 });
            fade.snap_to_target();
        }
        self.retarget_feedback();
        for slot in &mut self.feedback {
            slot.clear();
            slot.gain.snap_to_target();
            if slot.edge.is_some() && slot.gain.target() == 0.0 {
                slot.release();
            }
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    fn observe(&mut self) {
        if self.phase != TransitionPhase::Idle {
            return;
        }
        let latest = {
            let guard = self.control.load();
            if Arc::ptr_eq(&guard, &self.active) {
                return;
            }
            Arc::clone(&guard)
        };
        let old = core::mem::replace(&mut self.active, latest);

        for (i, fade) in self.bypass_fade.iter_mut().enumerate() {
            fade.set_target(if self.active.bypass()[i] { 0.0 } else { 1.0 });
        }
        self.retarget_feedback();

        if old.same_forward_graph(&self.active) {
            return;
        }

        let mut union_edges = *old.edges();
        let mut union_present = *old.present();
        for from in 0..N {
            union_present[from] |= self.active.present()[from];
            for to in 0..N {
                union_edges[from][to] |= self.active.edges()[from][to];
            }
        }

        self.weights_from = *old.weights();
        self.crossed_from = *old.crossed_weights();
        self.crossed_to = *self.active.crossed_weights();
        self.elapsed = 0;
        match topological_order(&union_edges, &union_present) {
            Ok(order) => {
                self.phase = TransitionPhase::Crossfade;
                self.run_order = order;
                self.run_edges = union_edges;
                self.weights_to = *self.active.weights();
            }
            Err(_) => {
                self.phase = TransitionPhase::FadeOut;
                self.run_order = *old.order();
                self.run_edges = *old.edges();
                // Old-only edges have no new weight, so they head to zero.
                self.weights_to = *self.active.weights();
            }
        }
        self.previous = Some(old);
    }

    fn finish_phase(&mut self) {
        self.elapsed = 0;
        if self.phase == TransitionPhase::FadeOut {
            self.phase = TransitionPhase::FadeIn;
            let old_edges = self.previous.as_ref().map_or([[false; N]; N], |p| *p.edges());
            let new_weights = *self.active.weights();
            let new_crossed = *self.active.crossed_weights();
            for from in 0..N {
                for to in 0..N {
                    let kept = old_edges[from][to];
                    self.weights_from[from][to] = if kept { new_weights[from][to] } else { 0.0 };
                    self.crossed_from[from][to] = if kept { new_crossed[from][to] } else { 0.0 };
                }
            }
            self.weights_to = new_weights;
            self.crossed_to = new_crossed;
            self.run_order = *self.active.order();
            self.run_edges = *self.active.edges();
            self.clear_unscheduled(false);
            return;
        }

        self.phase = TransitionPhase::Idle;
        self.previous = None;
        self.set_schedule_from_active();
        self.clear_unscheduled(true);
    }

    fn set_schedule_from_active(&mut self) {
        self.run_order = *self.active.order();
        self.run_edges = *self.active.edges();
        self.weights_from = *self.active.weights();
        self.weights_to = self.weights_from;
        self.crossed_from = *self.active.crossed_weights();
        self.crossed_to = self.crossed_from;
    }

    /// Zeroes the buffers of nodes outside the schedule so nothing reads a
    /// stale block. With `reset`, their audio state is cleared as well.
    fn clear_unscheduled(&mut self, reset: bool) {
        for id in NodeId::ALL {
            if self.run_order.position(id).is_some() {
                continue;
            }
            self.buffers[id.index()].clear();
            if reset {
                self.nodes[id.index()].reset();
            }
        }
    }

    fn retarget_feedback(&mut self) {
        let wanted = self.active.feedback();
        for slot in &mut self.feedback {
            if let Some((from, to)) = slot.edge {
                let gain = wanted
                    .iter()
                    .find(|e| e.from == from && e.to == to)
                    .map_or(0.0, |e| e.gain);
                slot.gain.set_target(gain);
            }
        }
        for edge in wanted {
            let key = Some((edge.from, edge.to));
            if self.feedback.iter().any(|s| s.edge == key) {
                continue;
            }
            let free = self.feedback.iter().position(|s| s.edge.is_none()).or_else(|| {
                // All slots busy: take over the quietest one that is fading.
                self.feedback
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.gain.target() == 0.0)
                    .min_by(|a, b| a.1.gain.get().abs().total_cmp(&b.1.gain.get().abs()))
                    .map(|(i, _)| i)
            });
            if let Some(i) = free {
                let slot = &mut self.feedback[i];
                slot.release();
                slot.edge = key;
                slot.gain.set_target(edge.gain);
            }
        }
    }

    // ── Node execution ──────────────────────────────────────────────────────

    fn run_node(
        &mut self,
        id: NodeId,
        len: usize,
        input_left: &[f32],
        input_right: &[f32],
        params: &ParameterBufferPool,
        ramping: bool,
    ) {
        let to = id.index();
        if id == NodeId::Input {
            let buf = &mut self.buffers[to];
            buf.left[..len].copy_from_slice(input_left);
            buf.right[..len].copy_from_slice(input_right);
        } else {
            self.buffers[to].clear_prefix(len);
            for from in 0..N {
                if !self.run_edges[from][to] {
                    continue;
                }
                let (src, dst) = get_ref_and_mut(&mut self.buffers, from, to);
                let w0 = self.weights_from[from][to];
                let w1 = self.weights_to[from][to];
                if !ramping || w0 == w1 {
                    if w1 != 0.0 {
                        dst.accumulate_scaled(src, w1, len);
                    }
                } else {
                    for (g, &t) in self.gains[..len].iter_mut().zip(&self.ramp[..len]) {
                        *g = w0 + (w1 - w0) * t;
                    }
                    dst.accumulate_ramped(src, &self.gains, len);
                }
                let x0 = self.crossed_from[from][to];
                let x1 = self.crossed_to[from][to];
                if !ramping || x0 == x1 {
                    if x1 != 0.0 {
                        dst.accumulate_crossed(src, x1, len);
                    }
                } else {
                    for (g, &t) in self.gains[..len].iter_mut().zip(&self.ramp[..len]) {
                        *g = x0 + (x1 - x0) * t;
                    }
                    dst.accumulate_crossed_ramped(src, &self.gains, len);
                }
            }
            for slot in &self.feedback {
                if matches!(slot.edge, Some((_, dest)) if dest == id) {
                    self.buffers[to].accumulate_scaled(&slot.returned, 1.0, len);
                }
            }
        }

        let fade = &mut self.bypass_fade[to];
        let fading = fade.target() < 1.0 || !fade.is_settled();
        if fading {
            self.dry.copy_from(&self.buffers[to], len);
        }

        // Bypassed nodes still process so their state stays warm.
        let (left, right) = self.buffers[to].channels_mut(len);
        self.nodes[to].process(left, right, params);

        if fading {
            let out = &mut self.buffers[to];
            for i in 0..len {
                let f = fade.advance();
                out.left[i] = wet_dry_mix(self.dry.left[i], out.left[i], f);
                out.right[i] = wet_dry_mix(self.dry.right[i], out.right[i], f);
            }
            if fade.is_settled() {
                fade.snap_to_target();
            }
        }
    }
}

impl core::fmt::Debug for RoutingGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoutingGraph")
            .field("preset", &self.active.preset())
            .field("phase", &self.phase)
            .field("order", &self.run_order.as_slice())
            .field("feedback_slots", &self.feedback_slots_in_use())
            .finish()
    }
}

/// Shared view of `bufs[src]` alongside a mutable view of `bufs[dst]`.
fn get_ref_and_mut(
    bufs: &mut [StereoBuffer; N],
    src: usize,
    dst: usize,
) -> (&StereoBuffer, &mut StereoBuffer) {
    debug_assert_ne!(src, dst);
    if src < dst {
        let (head, tail) = bufs.split_at_mut(dst);
        (&head[src], &mut tail[0])
    } else {
        let (head, tail) = bufs.split_at_mut(src);
        (&tail[0], &mut head[dst])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{RoutingConnection, RoutingPreset};

    const SR: f32 = 48000.0;

    fn graph(preset: RoutingPreset, max_block: usize) -> RoutingGraph {
        RoutingGraph::new(RoutingControl::new(preset), SR, max_block, 1, 0.0)
    }

    fn params(max_block: usize) -> ParameterBufferPool {
        ParameterBufferPool::new(max_block)
    }

    fn run_silence(g: &mut RoutingGraph, p: &ParameterBufferPool, block: usize, blocks: usize) {
        let mut l = vec![0.0f32; block];
        let mut r = vec![0.0f32; block];
        for _ in 0..blocks {
            g.process(&mut l, &mut r, p);
        }
    }

    #[test]
    fn cathedral_produces_a_tail() {
        let block = 256;
        let mut g = graph(RoutingPreset::Cathedral, block);
        let p = params(block);
        let mut l = vec![0.0f32; block];
        let mut r = vec![0.0f32; block];
        l[0] = 1.0;
        r[0] = 1.0;
        g.process(&mut l, &mut r, &p);
        let mut late_energy = 0.0f32;
        for _ in 0..40 {
            l.fill(0.0);
            r.fill(0.0);
            g.process(&mut l, &mut r, &p);
            late_energy += l.iter().chain(&r).map(|s| s * s).sum::<f32>();
            assert!(l.iter().chain(&r).all(|s| s.is_finite()));
        }
        assert!(late_energy > 1e-4, "late energy {late_energy}");
    }

    #[test]
    fn acyclic_union_crossfades_once() {
        let block = 128;
        let mut g = graph(RoutingPreset::Cathedral, block);
        let p = params(block);
        g.control().load_preset_kind(RoutingPreset::EarlyOnly);
        run_silence(&mut g, &p, block, 1);
        assert_eq!(g.transition_phase(), TransitionPhase::Crossfade);
        // 30 ms at 48 kHz is 1440 samples, just over 11 blocks.
        run_silence(&mut g, &p, block, 11);
        assert_eq!(g.transition_phase(), TransitionPhase::Idle);
        assert_eq!(g.run_order().as_slice(), &[NodeId::Input, NodeId::Early, NodeId::Output]);
    }

    #[test]
    fn cyclic_union_runs_two_phases() {
        let block = 128;
        let mut g = graph(RoutingPreset::Cathedral, block);
        let p = params(block);
        // cathedral has tail -> wander, breathing has wander -> tail.
        g.control().load_preset_kind(RoutingPreset::Breathing);
        run_silence(&mut g, &p, block, 1);
        assert_eq!(g.transition_phase(), TransitionPhase::FadeOut);
        run_silence(&mut g, &p, block, 11);
        assert_eq!(g.transition_phase(), TransitionPhase::FadeIn);
        assert_eq!(g.run_order(), g.active_snapshot().order());
        run_silence(&mut g, &p, block, 12);
        assert_eq!(g.transition_phase(), TransitionPhase::Idle);
    }

    #[test]
    fn new_snapshot_waits_for_running_transition() {
        let block = 128;
        let mut g = graph(RoutingPreset::Cathedral, block);
        let p = params(block);
        g.control().load_preset_kind(RoutingPreset::EarlyOnly);
        run_silence(&mut g, &p, block, 1);
        g.control().load_preset_kind(RoutingPreset::MetallicGrain);
        run_silence(&mut g, &p, block, 2);
        assert_eq!(g.active_snapshot().preset(), RoutingPreset::EarlyOnly);
        run_silence(&mut g, &p, block, 20);
        assert_eq!(g.active_snapshot().preset(), RoutingPreset::MetallicGrain);
    }

    #[test]
    fn crossfeed_edge_folds_channels() {
        let block = 64;
        let control = RoutingControl::new(RoutingPreset::Custom);
        control
            .load_custom(
                &[
                    RoutingConnection::crossfeed(NodeId::Input, NodeId::Resonator, 0.5),
                    RoutingConnection::serial(NodeId::Resonator, NodeId::Output),
                ],
                [false; NodeId::COUNT],
            )
            .unwrap();
        let mut g = RoutingGraph::new(control, SR, block, 1, 0.0);
        let p = params(block);
        let mut l: Vec<f32> = (0..block).map(|i| ((i * 7) % 5) as f32 * 0.1 - 0.2).collect();
        let mut r = vec![0.0f32; block];
        g.process(&mut l, &mut r, &p);

        let input = &g.buffers[NodeId::Input.index()];
        let folded = &g.buffers[NodeId::Resonator.index()];
        for i in 0..block {
            let (il, ir) = (input.left[i], input.right[i]);
            assert!((folded.left[i] - (0.75 * il + 0.25 * ir)).abs() < 1e-6);
            assert!((folded.right[i] - (0.25 * il + 0.75 * ir)).abs() < 1e-6);
        }
        assert!(folded.right.iter().any(|v| v.abs() > 1e-3), "right side stayed silent");
    }

    #[test]
    fn crossfeed_amount_change_ramps() {
        let block = 64;
        let edges = |amount| {
            [
                RoutingConnection::crossfeed(NodeId::Input, NodeId::Resonator, amount),
                RoutingConnection::serial(NodeId::Resonator, NodeId::Output),
            ]
        };
        let control = RoutingControl::new(RoutingPreset::Custom);
        control.load_custom(&edges(0.0), [false; NodeId::COUNT]).unwrap();
        let mut g = RoutingGraph::new(control, SR, block, 1, 0.0);
        let p = params(block);
        g.control().load_custom(&edges(1.0), [false; NodeId::COUNT]).unwrap();

        let mut l = vec![0.5f32; block];
        let mut r = vec![0.0f32; block];
        g.process(&mut l, &mut r, &p);
        assert_eq!(g.transition_phase(), TransitionPhase::Crossfade);
        let folded = &g.buffers[NodeId::Resonator.index()];
        let input = &g.buffers[NodeId::Input.index()];
        // First block of a 30 ms ramp: the opposite share is still small.
        let share = folded.right[block - 1] / input.left[block - 1];
        assert!(share > 0.0 && share < 0.1, "share {share}");
    }

    #[test]
    fn feedback_returns_after_exactly_max_block() {
        let max_block = 64;
        let control = RoutingControl::new(RoutingPreset::Custom);
        control
            .load_custom(
                &[
                    RoutingConnection::serial(NodeId::Input, NodeId::Resonator),
                    RoutingConnection::serial(NodeId::Resonator, NodeId::Shimmer),
                    RoutingConnection::serial(NodeId::Shimmer, NodeId::Output),
                    RoutingConnection::feedback(NodeId::Shimmer, NodeId::Resonator, 0.5),
                ],
                [false; NodeId::COUNT],
            )
            .unwrap();
        let mut g = RoutingGraph::new(control, SR, max_block, 1, 0.0);
        let p = params(max_block);

        // Half-size blocks: the return must still arrive 64 samples later.
        let block = 32;
        let mut out = Vec::new();
        let mut l = vec![0.0f32; block];
        let mut r = vec![0.0f32; block];
        for b in 0..4 {
            l.fill(0.0);
            r.fill(0.0);
            if b == 0 {
                l[0] = 0.5;
            }
            g.process(&mut l, &mut r, &p);
            out.extend_from_slice(&l);
        }
        assert!(out[1..64].iter().all(|v| v.abs() < 0.01), "early return");
        assert!(out[64] > 0.05, "return {}", out[64]);
        let later_peak = out[65..].iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(later_peak < out[64]);
    }

    #[test]
    fn removed_feedback_fades_then_releases() {
        let block = 256;
        let mut g = graph(RoutingPreset::ShimmerLoop, block);
        let p = params(block);
        assert_eq!(g.feedback_slots_in_use(), 1);
        g.control().load_preset_kind(RoutingPreset::Cathedral);
        run_silence(&mut g, &p, block, 2);
        assert_eq!(g.feedback_slots_in_use(), 1);
        // About 1 s is plenty for a 50 ms glide to fall below the release level.
        run_silence(&mut g, &p, block, 190);
        assert_eq!(g.feedback_slots_in_use(), 0);
    }

    #[test]
    fn bypassed_chain_has_no_tail() {
        let block = 256;
        let mut g = graph(RoutingPreset::Cathedral, block);
        let p = params(block);
        for node in [NodeId::Early, NodeId::Tail, NodeId::Wander] {
            g.control().set_module_bypass(node, true);
        }
        // Let the fades land.
        run_silence(&mut g, &p, block, 20);
        let mut l = vec![0.0f32; block];
        let mut r = vec![0.0f32; block];
        l[0] = 0.5;
        g.process(&mut l, &mut r, &p);
        run_silence(&mut g, &p, block, 4);
        l.fill(0.0);
        r.fill(0.0);
        g.process(&mut l, &mut r, &p);
        assert!(l.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn restored_node_leaves_the_fade_path() {
        let block = 256;
        let mut g = graph(RoutingPreset::Cathedral, block);
        let p = params(block);
        let tail = NodeId::Tail.index();
        g.control().set_module_bypass(NodeId::Tail, true);
        run_silence(&mut g, &p, block, 20);
        g.control().set_module_bypass(NodeId::Tail, false);
        run_silence(&mut g, &p, block, 100);
        assert_eq!(g.bypass_fade[tail].get(), 1.0);
        assert!(g.bypass_fade[tail].is_settled());
    }

    #[test]
    fn reset_silences_everything() {
        let block = 256;
        let mut g = graph(RoutingPreset::ShimmerLoop, block);
        let p = params(block);
        let mut l = vec![0.3f32; block];
        let mut r = vec![-0.3f32; block];
        for _ in 0..10 {
            g.process(&mut l, &mut r, &p);
        }
        g.reset();
        l.fill(0.0);
        r.fill(0.0);
        g.process(&mut l, &mut r, &p);
        assert!(l.iter().chain(&r).all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn inserts_only_accept_insert_slots() {
        struct Nop;
        impl StereoEffect for Nop {
            fn prepare(&mut self, _: f32, _: usize) {}
            fn process_stereo(&mut self, _: &mut [f32], _: &mut [f32]) {}
            fn reset(&mut self) {}
        }
        let mut g = graph(RoutingPreset::Cathedral, 64);
        assert!(matches!(
            g.install(NodeId::Tail, Box::new(Nop)),
            Err(EngineError::NotInsertSlot(NodeId::Tail))
        ));
        assert!(g.install(NodeId::Shimmer, Box::new(Nop)).unwrap().is_none());
        assert_eq!(g.take_inserts().len(), 1);
    }
}
