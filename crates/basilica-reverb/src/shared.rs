//! State shared between the audio thread and every control handle.
//!
//! [`EngineShared`] is the bridge. Parameter targets live in a flat
//! `[AtomicU32; ParamId::COUNT]` holding `f32` bits, so a control write is a
//! single relaxed store and the audio side reads each target once per
//! block. Routing and modulation publish immutable snapshots through their
//! own `ArcSwap` stores.
//!
//! [`EngineHandle`] wraps an `Arc<EngineShared>` so it can be cloned into
//! any thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use basilica_core::ParamId;

use crate::error::EngineError;
use crate::modulation::ModulationMatrix;
use crate::nodes::{INPUT_GAIN_RANGE_DB, NodeId};
use crate::routing::{RoutingConnection, RoutingControl, RoutingPreset, RoutingSnapshot};

/// Atomic parameter store plus the routing and modulation control sides.
pub(crate) struct EngineShared {
    seed: u64,
    params: [AtomicU32; ParamId::COUNT],
    input_gain_db: AtomicU32,
    routing: RoutingControl,
    modulation: ModulationMatrix,
}

impl EngineShared {
    pub(crate) fn new(
        seed: u64,
        params: [f32; ParamId::COUNT],
        input_gain_db: f32,
        preset: RoutingPreset,
    ) -> Self {
        Self {
            seed,
            params: core::array::from_fn(|i| {
                let id = ParamId::ALL[i];
                AtomicU32::new(sanitize_param(id, params[i]).to_bits())
            }),
            input_gain_db: AtomicU32::new(sanitize_gain_db(input_gain_db).to_bits()),
            routing: RoutingControl::new(preset),
            modulation: ModulationMatrix::new(),
        }
    }

    /// Target of `id`, as last stored.
    #[inline]
    pub(crate) fn param(&self, id: ParamId) -> f32 {
        f32::from_bits(self.params[id.index()].load(Ordering::Relaxed))
    }

    /// Every target in index order.
    pub(crate) fn params(&self) -> [f32; ParamId::COUNT] {
        core::array::from_fn(|i| f32::from_bits(self.params[i].load(Ordering::Relaxed)))
    }

    pub(crate) fn store_param(&self, id: ParamId, value: f32) {
        self.params[id.index()].store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn input_gain_db(&self) -> f32 {
        f32::from_bits(self.input_gain_db.load(Ordering::Relaxed))
    }

    pub(crate) fn routing(&self) -> &RoutingControl {
        &self.routing
    }

    pub(crate) fn modulation(&self) -> &ModulationMatrix {
        &self.modulation
    }
}

/// Cloneable, `Send + Sync` control surface of a [`ReverbEngine`](crate::ReverbEngine).
///
/// Every method is safe to call while the engine is processing on another
/// thread. Writes become visible to the audio side at the next block.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    /// Seed the engine was built with.
    pub fn seed(&self) -> u64 {
        self.shared.seed
    }

    // ── Parameters ──────────────────────────────────────────────────────────

    /// Sets the normalized target of `id`, clamped to [0, 1].
    pub fn set_param(&self, id: ParamId, value: f32) -> Result<(), EngineError> {
        if !value.is_finite() {
            return Err(EngineError::NonFinite(id.name()));
        }
        self.shared.store_param(id, value.clamp(0.0, 1.0));
        Ok(())
    }

    /// Resolves `name` and sets it.
    pub fn set_param_by_name(&self, name: &str, value: f32) -> Result<(), EngineError> {
        let id = name
            .parse::<ParamId>()
            .map_err(|_| EngineError::UnknownParameter(name.to_string()))?;
        self.set_param(id, value)
    }

    /// Current normalized target of `id`, before modulation.
    pub fn param(&self, id: ParamId) -> f32 {
        self.shared.param(id)
    }

    /// Every target in [`ParamId::ALL`] order.
    pub fn params(&self) -> [f32; ParamId::COUNT] {
        self.shared.params()
    }

    /// Sets the input gain. The input stage ramps to it over 20 ms.
    pub fn set_input_gain_db(&self, gain_db: f32) -> Result<(), EngineError> {
        if !gain_db.is_finite() {
            return Err(EngineError::NonFinite("input gain"));
        }
        self.shared
            .input_gain_db
            .store(sanitize_gain_db(gain_db).to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Input gain in dB.
    pub fn input_gain_db(&self) -> f32 {
        self.shared.input_gain_db()
    }

    // ── Routing ─────────────────────────────────────────────────────────────

    /// Loads a routing preset by kebab-case name.
    pub fn load_preset(&self, name: &str) -> Result<(), EngineError> {
        self.shared.routing.load_preset(name)
    }

    /// Loads a routing preset.
    pub fn load_preset_kind(&self, preset: RoutingPreset) {
        self.shared.routing.load_preset_kind(preset);
    }

    /// Loads a preset with explicit bypass flags instead of its defaults.
    pub fn load_preset_with_bypass(
        &self,
        preset: RoutingPreset,
        bypass: [bool; NodeId::COUNT],
    ) -> Result<(), EngineError> {
        self.shared.routing.load_preset_with_bypass(preset, bypass)
    }

    /// Validates and loads a caller-supplied graph.
    pub fn load_custom(
        &self,
        connections: &[RoutingConnection],
        bypass: [bool; NodeId::COUNT],
    ) -> Result<(), EngineError> {
        self.shared.routing.load_custom(connections, bypass)
    }

    /// Bypasses or re-enables one node. The node keeps running either way.
    pub fn set_module_bypass(&self, node: NodeId, bypassed: bool) {
        self.shared.routing.set_module_bypass(node, bypassed);
    }

    /// Bypass flag of `node` in the published graph.
    pub fn is_bypassed(&self, node: NodeId) -> bool {
        self.shared.routing.is_bypassed(node)
    }

    /// Preset of the published graph.
    pub fn active_preset(&self) -> RoutingPreset {
        self.shared.routing.active_preset()
    }

    /// The published routing graph.
    pub fn routing_snapshot(&self) -> Arc<RoutingSnapshot> {
        self.shared.routing.snapshot()
    }

    // ── Modulation ──────────────────────────────────────────────────────────

    /// Modulation matrix control side.
    pub fn modulation(&self) -> &ModulationMatrix {
        self.shared.modulation()
    }
}

impl core::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("seed", &self.seed())
            .field("params", &self.params())
            .field("input_gain_db", &self.input_gain_db())
            .field("routing", &self.shared.routing)
            .finish_non_exhaustive()
    }
}

/// Non-finite values fall back to the parameter's default.
pub(crate) fn sanitize_param(id: ParamId, value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        id.default_value()
    }
}

fn sanitize_gain_db(gain_db: f32) -> f32 {
    let (lo, hi) = INPUT_GAIN_RANGE_DB;
    if gain_db.is_finite() {
        gain_db.clamp(lo, hi)
    } else {
        0.0
    }
}
