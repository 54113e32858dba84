//! Host-facing engine.
//!
//! [`ReverbEngine`] owns everything the audio thread touches: the routing
//! graph, the modulation processor, one smoother per parameter and the
//! parameter pool. [`EngineHandle`] is the control side; it shares only the
//! atomic parameter store and the two snapshot publishers with the engine.
//!
//! Each block runs, in order:
//!
//! 1. read every parameter target from its atomic,
//! 2. advance the modulation matrix on the input block,
//! 3. smooth `clamp(base + 0.5 * mod, 0, 1)` into the pool,
//! 4. run the routing graph,
//! 5. blend with the dry input by `mix`.

use std::sync::Arc;

use basilica_core::{
    ParamId, ParameterBufferPool, SmoothedParam, StereoBuffer, StereoEffect, wet_dry_mix,
};

use crate::error::EngineError;
use crate::modulation::ModulationProcessor;
use crate::nodes::{Node, NodeId};
use crate::routing::{RoutingGraph, RoutingPreset};
use crate::shared::{EngineHandle, EngineShared, sanitize_param};

/// Largest block `prepare` accepts.
pub const MAX_BLOCK_SIZE: usize = 16384;
/// Scale applied to the summed modulation offset of each parameter.
pub const MODULATION_SCALE: f32 = 0.5;

/// Construction-time settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Seed for early-reflection taps, modulation sources and gates.
    pub seed: u64,
    /// Initial input gain in dB.
    pub input_gain_db: f32,
    /// Initial routing.
    pub preset: RoutingPreset,
    /// Initial normalized parameter targets in [`ParamId::ALL`] order.
    pub params: [f32; ParamId::COUNT],
}

impl EngineSettings {
    /// Replaces the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replaces the initial preset.
    pub fn with_preset(mut self, preset: RoutingPreset) -> Self {
        self.preset = preset;
        self
    }

    /// Replaces one initial parameter.
    pub fn with_param(mut self, id: ParamId, value: f32) -> Self {
        self.params[id.index()] = value;
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            seed: 0x0ba5_11ca,
            input_gain_db: 0.0,
            preset: RoutingPreset::default(),
            params: ParamId::ALL.map(ParamId::default_value),
        }
    }
}

/// Everything allocated by `prepare`.
struct Prepared {
    sample_rate: f32,
    max_block: usize,
    channels: usize,
    graph: RoutingGraph,
    modulation: ModulationProcessor,
    smoothers: [SmoothedParam; ParamId::COUNT],
    pool: ParameterBufferPool,
    dry: StereoBuffer,
    mono: Vec<f32>,
}

impl Prepared {
    fn process_stereo(&mut self, shared: &EngineShared, left: &mut [f32], right: &mut [f32]) {
        let len = left.len();
        if len == 0 {
            return;
        }

        let offsets = *self.modulation.process(left, right, shared.modulation());
        for id in ParamId::ALL {
            let i = id.index();
            let target = (shared.param(id) + MODULATION_SCALE * offsets[i]).clamp(0.0, 1.0);
            self.smoothers[i].set_target(target);
            self.pool.fill_smoothed(id, &mut self.smoothers[i], len);
        }
        if let Some(input) = self.graph.node_mut(NodeId::Input).as_input_mut() {
            input.set_gain_db(shared.input_gain_db());
        }

        self.dry.left[..len].copy_from_slice(left);
        self.dry.right[..len].copy_from_slice(right);

        self.graph.process(left, right, &self.pool);

        let mix = self.pool.buffer(ParamId::Mix);
        for i in 0..len {
            let m = mix.get(i);
            left[i] = wet_dry_mix(self.dry.left[i], left[i], m);
            right[i] = wet_dry_mix(self.dry.right[i], right[i], m);
        }
    }

    /// Mono runs as identical stereo channels folded back to one.
    fn process_mono(&mut self, shared: &EngineShared, mono: &mut [f32]) {
        let len = mono.len();
        let mut right = core::mem::take(&mut self.mono);
        right[..len].copy_from_slice(mono);
        self.process_stereo(shared, mono, &mut right[..len]);
        for (m, r) in mono.iter_mut().zip(&right[..len]) {
            *m = 0.5 * (*m + r);
        }
        self.mono = right;
    }

    fn reset(&mut self, shared: &EngineShared) {
        self.graph.reset();
        self.modulation.reset();
        let targets = shared.params();
        for (smoother, target) in self.smoothers.iter_mut().zip(targets) {
            smoother.set_target(target);
            smoother.snap_to_target();
        }
        self.dry.clear();
        self.mono.fill(0.0);
    }
}

/// Reverb engine: the audio-thread half.
///
/// ```rust
/// use basilica_core::ParamId;
/// use basilica_reverb::{EngineSettings, ReverbEngine};
///
/// let mut engine = ReverbEngine::new(EngineSettings::default());
/// engine.prepare(48000.0, 256, 2).unwrap();
/// let handle = engine.handle();
/// handle.set_param(ParamId::Time, 0.8).unwrap();
/// handle.load_preset("shimmer-loop").unwrap();
///
/// let mut left = vec![0.0f32; 256];
/// let mut right = vec![0.0f32; 256];
/// left[0] = 1.0;
/// engine.process_stereo(&mut left, &mut right).unwrap();
/// assert!(left.iter().all(|s| s.is_finite()));
/// ```
pub struct ReverbEngine {
    shared: Arc<EngineShared>,
    seed: u64,
    prepared: Option<Box<Prepared>>,
    parked: Vec<(NodeId, Box<dyn StereoEffect>)>,
}

impl ReverbEngine {
    /// Creates an unprepared engine. Nothing audio-sized is allocated until
    /// [`prepare`](Self::prepare).
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            shared: Arc::new(EngineShared::new(
                settings.seed,
                settings.params,
                settings.input_gain_db,
                settings.preset,
            )),
            seed: settings.seed,
            prepared: None,
            parked: Vec::new(),
        }
    }

    /// New control handle sharing this engine's state.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(Arc::clone(&self.shared))
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Allocates for `sample_rate`, blocks of up to `max_block` samples and
    /// `channels` channels. May be called again to re-prepare; installed
    /// insert effects carry over and state is cleared.
    pub fn prepare(
        &mut self,
        sample_rate: f32,
        max_block: usize,
        channels: usize,
    ) -> Result<(), EngineError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        if max_block == 0 || max_block > MAX_BLOCK_SIZE {
            return Err(EngineError::InvalidBlockSize {
                size: max_block,
                max: MAX_BLOCK_SIZE,
            });
        }
        if !(1..=2).contains(&channels) {
            return Err(EngineError::UnsupportedChannels(channels));
        }

        let mut inserts = core::mem::take(&mut self.parked);
        if let Some(old) = self.prepared.as_mut() {
            inserts.extend(old.graph.take_inserts());
        }

        let mut graph = RoutingGraph::new(
            self.shared.routing().clone(),
            sample_rate,
            max_block,
            self.seed,
            self.shared.input_gain_db(),
        );
        for (node, effect) in inserts {
            if let Err(err) = graph.install(node, effect) {
                tracing::warn!("engine_prepare: dropped insert for {node}: {err}");
            }
        }

        let targets = self.shared.params();
        let smoothers = core::array::from_fn(|i| {
            SmoothedParam::with_config(targets[i], sample_rate, ParamId::ALL[i].smoothing_ms())
        });

        self.prepared = Some(Box::new(Prepared {
            sample_rate,
            max_block,
            channels,
            graph,
            modulation: ModulationProcessor::new(sample_rate, self.seed),
            smoothers,
            pool: ParameterBufferPool::new(max_block),
            dry: StereoBuffer::new(max_block),
            mono: vec![0.0; max_block],
        }));
        tracing::info!(
            "engine_prepare: {sample_rate} Hz, max block {max_block}, {channels} channel(s), preset {}",
            self.shared.routing().active_preset()
        );
        Ok(())
    }

    /// Processes one block in place. `channels` holds one slice per prepared
    /// channel, all the same length.
    ///
    /// On error the block is zeroed.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) -> Result<(), EngineError> {
        if let Err(err) = self.check_block(channels) {
            silence(channels);
            return Err(err);
        }
        let Some(prepared) = self.prepared.as_deref_mut() else {
            silence(channels);
            return Err(EngineError::NotPrepared);
        };
        match channels {
            [mono] => prepared.process_mono(&self.shared, mono),
            [left, right] => prepared.process_stereo(&self.shared, left, right),
            _ => {
                let got = channels.len();
                silence(channels);
                return Err(EngineError::ChannelMismatch {
                    expected: prepared.channels,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Stereo convenience over [`process`](Self::process).
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<(), EngineError> {
        self.process(&mut [left, right])
    }

    /// Silences every node, feedback return and modulation source and snaps
    /// every smoother. Coefficients and installed effects are kept.
    pub fn reset(&mut self) {
        if let Some(prepared) = self.prepared.as_deref_mut() {
            prepared.reset(&self.shared);
        }
    }

    // ── Insert slots ────────────────────────────────────────────────────────

    /// Installs an external effect into an insert slot. Returns the effect
    /// it replaced. Before `prepare` the effect is held and installed then.
    pub fn install_insert(
        &mut self,
        node: NodeId,
        effect: Box<dyn StereoEffect>,
    ) -> Result<Option<Box<dyn StereoEffect>>, EngineError> {
        if !node.is_insert() {
            return Err(EngineError::NotInsertSlot(node));
        }
        if let Some(prepared) = self.prepared.as_deref_mut() {
            return prepared.graph.install(node, effect);
        }
        let previous = self
            .parked
            .iter()
            .position(|(id, _)| *id == node)
            .map(|i| self.parked.swap_remove(i).1);
        self.parked.push((node, effect));
        Ok(previous)
    }

    /// Removes the effect from an insert slot, leaving it a pass-through.
    pub fn remove_insert(&mut self, node: NodeId) -> Option<Box<dyn StereoEffect>> {
        if let Some(prepared) = self.prepared.as_deref_mut() {
            return match prepared.graph.node_mut(node) {
                Node::Insert(slot) => slot.take(),
                _ => None,
            };
        }
        let i = self.parked.iter().position(|(id, _)| *id == node)?;
        Some(self.parked.swap_remove(i).1)
    }

    // ── Inspection ──────────────────────────────────────────────────────────

    /// True once `prepare` has succeeded.
    pub fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    /// Prepared sample rate.
    pub fn sample_rate(&self) -> Option<f32> {
        self.prepared.as_ref().map(|p| p.sample_rate)
    }

    /// Prepared maximum block size.
    pub fn max_block(&self) -> Option<usize> {
        self.prepared.as_ref().map(|p| p.max_block)
    }

    /// Prepared channel count.
    pub fn channels(&self) -> Option<usize> {
        self.prepared.as_ref().map(|p| p.channels)
    }

    /// The routing graph, once prepared.
    pub fn graph(&self) -> Option<&RoutingGraph> {
        self.prepared.as_ref().map(|p| &p.graph)
    }

    /// Modulation offsets produced by the last block, each in [-1, 1].
    pub fn modulation_offsets(&self) -> Option<&[f32; ParamId::COUNT]> {
        self.prepared.as_ref().map(|p| p.modulation.outputs())
    }

    /// Effective (smoothed, modulated) value of `id` at the end of the last
    /// block.
    pub fn effective_param(&self, id: ParamId) -> f32 {
        self.prepared
            .as_ref()
            .map_or_else(|| sanitize_param(id, self.shared.param(id)), |p| p.smoothers[id.index()].get())
    }

    fn check_block(&self, channels: &[&mut [f32]]) -> Result<(), EngineError> {
        let prepared = self.prepared.as_deref().ok_or(EngineError::NotPrepared)?;
        if channels.len() != prepared.channels {
            return Err(EngineError::ChannelMismatch {
                expected: prepared.channels,
                got: channels.len(),
            });
        }
        let len = channels.first().map_or(0, |c| c.len());
        if let Some(other) = channels.iter().find(|c| c.len() != len) {
            return Err(EngineError::LengthMismatch {
                left: len,
                right: other.len(),
            });
        }
        if len > prepared.max_block {
            return Err(EngineError::BlockTooLarge {
                len,
                max: prepared.max_block,
            });
        }
        Ok(())
    }
}

impl Default for ReverbEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl core::fmt::Debug for ReverbEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReverbEngine")
            .field("seed", &self.seed)
            .field("sample_rate", &self.sample_rate())
            .field("max_block", &self.max_block())
            .field("channels", &self.channels())
            .field("preset", &self.shared.routing().active_preset())
            .field("parked_inserts", &self.parked.len())
            .finish_non_exhaustive()
    }
}

fn silence(channels: &mut [&mut [f32]]) {
    for ch in channels.iter_mut() {
        ch.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(channels: usize) -> ReverbEngine {
        let mut engine = ReverbEngine::default();
        engine.prepare(48000.0, 256, channels).unwrap();
        engine
    }

    #[test]
    fn prepare_rejects_bad_config() {
        let mut engine = ReverbEngine::default();
        assert!(matches!(
            engine.prepare(f32::NAN, 256, 2),
            Err(EngineError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            engine.prepare(0.0, 256, 2),
            Err(EngineError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            engine.prepare(48000.0, 0, 2),
            Err(EngineError::InvalidBlockSize { size: 0, .. })
        ));
        assert!(matches!(
            engine.prepare(48000.0, MAX_BLOCK_SIZE + 1, 2),
            Err(EngineError::InvalidBlockSize { .. })
        ));
        assert_eq!(
            engine.prepare(48000.0, 256, 3),
            Err(EngineError::UnsupportedChannels(3))
        );
        assert!(!engine.is_prepared());
    }

    #[test]
    fn unprepared_process_zeroes_block() {
        let mut engine = ReverbEngine::default();
        let mut l = vec![0.5; 64];
        let mut r = vec![0.5; 64];
        assert_eq!(
            engine.process_stereo(&mut l, &mut r),
            Err(EngineError::NotPrepared)
        );
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
    }

    #[test]
    fn oversized_block_is_rejected_and_zeroed() {
        let mut engine = prepared(2);
        let mut l = vec![0.5; 257];
        let mut r = vec![0.5; 257];
        assert_eq!(
            engine.process_stereo(&mut l, &mut r),
            Err(EngineError::BlockTooLarge { len: 257, max: 256 })
        );
        assert!(l.iter().chain(&r).all(|&s| s == 0.0));
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let mut engine = prepared(1);
        let mut l = vec![0.5; 64];
        let mut r = vec![0.5; 64];
        assert_eq!(
            engine.process_stereo(&mut l, &mut r),
            Err(EngineError::ChannelMismatch {
                expected: 1,
                got: 2
            })
        );
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn uneven_channels_are_rejected() {
        let mut engine = prepared(2);
        let mut l = vec![0.5; 64];
        let mut r = vec![0.5; 32];
        assert_eq!(
            engine.process_stereo(&mut l, &mut r),
            Err(EngineError::LengthMismatch { left: 64, right: 32 })
        );
    }

    #[test]
    fn mono_impulse_rings() {
        let mut engine = prepared(1);
        let mut block = vec![0.0f32; 256];
        block[0] = 1.0;
        engine.process(&mut [&mut block]).unwrap();
        let mut energy = 0.0f32;
        for _ in 0..20 {
            block.fill(0.0);
            engine.process(&mut [&mut block]).unwrap();
            energy += block.iter().map(|s| s * s).sum::<f32>();
        }
        assert!(energy > 1e-6, "no tail: {energy}");
    }

    #[test]
    fn zero_mix_passes_dry() {
        let settings = EngineSettings::default().with_param(ParamId::Mix, 0.0);
        let mut engine = ReverbEngine::new(settings);
        engine.prepare(48000.0, 128, 2).unwrap();
        let input: Vec<f32> = (0..128).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let mut l = input.clone();
        let mut r = input.clone();
        engine.process_stereo(&mut l, &mut r).unwrap();
        for (out, inp) in l.iter().zip(&input) {
            assert!((out - inp).abs() < 1e-6);
        }
    }

    #[test]
    fn param_target_reaches_pool() {
        let mut engine = prepared(2);
        let handle = engine.handle();
        handle.set_param(ParamId::Width, 0.9).unwrap();
        let mut l = vec![0.0; 256];
        let mut r = vec![0.0; 256];
        for _ in 0..100 {
            engine.process_stereo(&mut l, &mut r).unwrap();
        }
        assert!((engine.effective_param(ParamId::Width) - 0.9).abs() < 1e-3);
    }

    #[test]
    fn settled_param_returns_to_constant_lane() {
        let mut engine = prepared(2);
        let handle = engine.handle();
        handle.set_param(ParamId::Time, 0.9).unwrap();
        let mut l = vec![0.0; 256];
        let mut r = vec![0.0; 256];
        engine.process_stereo(&mut l, &mut r).unwrap();
        let pool = |e: &ReverbEngine| e.prepared.as_deref().unwrap().pool.is_per_sample(ParamId::Time);
        assert!(pool(&engine));
        // About 10 s; the glide stalls in f32 well short of this.
        for _ in 0..2000 {
            engine.process_stereo(&mut l, &mut r).unwrap();
        }
        assert_eq!(engine.effective_param(ParamId::Time), 0.9);
        assert!(!pool(&engine));
        let prepared = engine.prepared.as_deref().unwrap();
        assert_eq!(prepared.pool.buffer(ParamId::Time).get(255), 0.9);
    }

    #[test]
    fn inserts_survive_reprepare() {
        struct Mute;
        impl StereoEffect for Mute {
            fn prepare(&mut self, _: f32, _: usize) {}
            fn process_stereo(&mut self, l: &mut [f32], r: &mut [f32]) {
                l.fill(0.0);
                r.fill(0.0);
            }
            fn reset(&mut self) {}
        }

        let mut engine = ReverbEngine::default();
        assert!(matches!(
            engine.install_insert(NodeId::Tail, Box::new(Mute)),
            Err(EngineError::NotInsertSlot(NodeId::Tail))
        ));
        assert!(
            engine
                .install_insert(NodeId::Shimmer, Box::new(Mute))
                .unwrap()
                .is_none()
        );
        assert!(
            engine
                .install_insert(NodeId::Shimmer, Box::new(Mute))
                .unwrap()
                .is_some()
        );
        engine.prepare(48000.0, 128, 2).unwrap();
        engine.prepare(44100.0, 64, 2).unwrap();
        assert!(engine.remove_insert(NodeId::Shimmer).is_some());
        assert!(engine.remove_insert(NodeId::Shimmer).is_none());
    }

    #[test]
    fn reset_silences_tail() {
        let mut engine = prepared(2);
        let mut l = vec![0.0f32; 256];
        let mut r = vec![0.0f32; 256];
        l[0] = 1.0;
        r[0] = 1.0;
        engine.process_stereo(&mut l, &mut r).unwrap();
        engine.reset();
        l.fill(0.0);
        r.fill(0.0);
        engine.process_stereo(&mut l, &mut r).unwrap();
        assert!(l.iter().chain(&r).all(|s| s.abs() < 1e-6));
    }
}
