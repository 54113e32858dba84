//! Control side of the modulation matrix.
//!
//! Mutations lock a `parking_lot::Mutex`, edit the working copy and publish
//! an immutable [`ModulationSet`] through `ArcSwap`. The audio side only
//! calls [`ModulationMatrix::load`]. Every snapshot that was ever published
//! stays in a retired list until the audio side has dropped its last
//! reference, so deallocation always happens here.

use std::sync::Arc;

use arc_swap::ArcSwap;
use basilica_core::ParamId;
use parking_lot::Mutex;

use super::curve::ModulationCurve;
use super::randomize::{RandomDensity, random_connections};
use super::sources::{LFO_COUNT, LfoConfig, SOURCE_AXES, SourceKind};
use crate::error::EngineError;

/// Number of distinct `(source, axis, destination)` keys.
pub const MAX_KEYS: usize = SOURCE_AXES * ParamId::COUNT;

/// Shortest accepted smoothing time.
pub const MIN_SMOOTHING_MS: f32 = 20.0;
/// Longest accepted smoothing time.
pub const MAX_SMOOTHING_MS: f32 = 1000.0;

/// One routing from a source axis to a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationConnection {
    /// Source.
    pub source: SourceKind,
    /// Destination parameter.
    pub destination: ParamId,
    /// Source axis (x/y/z for chaos, LFO index for LFOs).
    pub axis: usize,
    /// Bipolar amount, -1..=1.
    pub depth: f32,
    /// Lag time constant, 20..=1000 ms.
    pub smoothing_ms: f32,
    /// Chance that the gate is open at each redraw.
    pub probability: f32,
    /// Disabled connections glide to zero but keep their slot.
    pub enabled: bool,
    /// Response curve.
    pub curve: ModulationCurve,
}

impl ModulationConnection {
    /// An enabled linear connection with 200 ms smoothing and an always-open
    /// gate.
    pub fn new(source: SourceKind, axis: usize, destination: ParamId, depth: f32) -> Self {
        Self {
            source,
            destination,
            axis,
            depth,
            smoothing_ms: 200.0,
            probability: 1.0,
            enabled: true,
            curve: ModulationCurve::Linear,
        }
    }

    /// Builder: smoothing time.
    #[must_use]
    pub fn with_smoothing_ms(mut self, ms: f32) -> Self {
        self.smoothing_ms = ms;
        self
    }

    /// Builder: gate probability.
    #[must_use]
    pub fn with_probability(mut self, probability: f32) -> Self {
        self.probability = probability;
        self
    }

    /// Builder: response curve.
    #[must_use]
    pub fn with_curve(mut self, curve: ModulationCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Builder: enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Dense index of `(source, axis, destination)`, below [`MAX_KEYS`].
    ///
    /// Only meaningful for validated connections.
    #[inline]
    pub fn key(&self) -> usize {
        connection_key(self.source, self.axis, self.destination)
    }

    /// Checks ranges and finiteness, clamping depth and probability.
    pub fn validated(mut self) -> Result<Self, EngineError> {
        if !self.depth.is_finite() {
            return Err(EngineError::NonFinite("depth"));
        }
        if !self.probability.is_finite() {
            return Err(EngineError::NonFinite("probability"));
        }
        if !self.smoothing_ms.is_finite() {
            return Err(EngineError::NonFinite("smoothing"));
        }
        if !(MIN_SMOOTHING_MS..=MAX_SMOOTHING_MS).contains(&self.smoothing_ms) {
            return Err(EngineError::SmoothingOutOfRange(self.smoothing_ms));
        }
        if self.axis >= self.source.axes() {
            return Err(EngineError::InvalidAxis {
                kind: self.source,
                axis: self.axis,
                axes: self.source.axes(),
            });
        }
        self.depth = self.depth.clamp(-1.0, 1.0);
        self.probability = self.probability.clamp(0.0, 1.0);
        Ok(self)
    }
}

/// Dense key for a validated `(source, axis, destination)`.
#[inline]
pub fn connection_key(source: SourceKind, axis: usize, destination: ParamId) -> usize {
    (source.axis_offset() + axis) * ParamId::COUNT + destination.index()
}

/// Immutable snapshot read by the audio side.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulationSet {
    /// Active connections, unique by key.
    pub connections: Vec<ModulationConnection>,
    /// User LFO settings.
    pub lfos: [LfoConfig; LFO_COUNT],
}

impl Default for ModulationSet {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
            lfos: core::array::from_fn(LfoConfig::factory),
        }
    }
}

struct ControlState {
    working: ModulationSet,
    retired: Vec<Arc<ModulationSet>>,
}

struct Shared {
    published: ArcSwap<ModulationSet>,
    control: Mutex<ControlState>,
}

/// Cloneable control handle to the connection set.
#[derive(Clone)]
pub struct ModulationMatrix {
    shared: Arc<Shared>,
}

impl ModulationMatrix {
    /// Empty matrix with factory LFOs.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                published: ArcSwap::from_pointee(ModulationSet::default()),
                control: Mutex::new(ControlState {
                    working: ModulationSet::default(),
                    retired: Vec::new(),
                }),
            }),
        }
    }

    // ── Audio side ──────────────────────────────────────────────────────────

    /// Current snapshot (wait-free).
    pub fn load(&self) -> arc_swap::Guard<Arc<ModulationSet>> {
        self.shared.published.load()
    }

    // ── Control side ────────────────────────────────────────────────────────

    /// Inserts `conn`, or updates the connection with the same key.
    pub fn set_connection(&self, conn: ModulationConnection) -> Result<(), EngineError> {
        let conn = conn.validated()?;
        let mut state = self.shared.control.lock();
        let key = conn.key();
        let connections = &mut state.working.connections;
        match connections.iter().position(|c| c.key() == key) {
            Some(i) => connections[i] = conn,
            None => connections.push(conn),
        }
        tracing::debug!(
            "modulation_set: {}[{}] -> {} depth={:.3} smoothing={}ms p={:.2} curve={} enabled={}",
            conn.source,
            conn.axis,
            conn.destination,
            conn.depth,
            conn.smoothing_ms,
            conn.probability,
            conn.curve,
            conn.enabled
        );
        self.publish(&mut state);
        Ok(())
    }

    /// Replaces every connection at once. Nothing is published if any
    /// connection fails validation.
    pub fn set_connections(&self, connections: &[ModulationConnection]) -> Result<(), EngineError> {
        let mut validated: Vec<ModulationConnection> = Vec::with_capacity(connections.len());
        for conn in connections {
            let conn = conn.validated()?;
            let key = conn.key();
            match validated.iter_mut().find(|c| c.key() == key) {
                Some(existing) => *existing = conn,
                None => validated.push(conn),
            }
        }
        let mut state = self.shared.control.lock();
        tracing::debug!("modulation_set: replaced with {} connections", validated.len());
        state.working.connections = validated;
        self.publish(&mut state);
        Ok(())
    }

    /// Removes the connection with this key. Returns whether one existed.
    pub fn remove_connection(&self, source: SourceKind, destination: ParamId, axis: usize) -> bool {
        if axis >= source.axes() {
            return false;
        }
        let mut state = self.shared.control.lock();
        let key = connection_key(source, axis, destination);
        let before = state.working.connections.len();
        state.working.connections.retain(|c| c.key() != key);
        let removed = state.working.connections.len() != before;
        if removed {
            tracing::debug!("modulation_remove: {source}[{axis}] -> {destination}");
            self.publish(&mut state);
        }
        removed
    }

    /// Removes every connection. LFO settings are kept.
    pub fn clear(&self) {
        let mut state = self.shared.control.lock();
        state.working.connections.clear();
        tracing::debug!("modulation_clear");
        self.publish(&mut state);
    }

    /// Copy of the current connections.
    pub fn connections(&self) -> Vec<ModulationConnection> {
        self.shared.control.lock().working.connections.clone()
    }

    /// Connection with this key, if any.
    pub fn connection(
        &self,
        source: SourceKind,
        destination: ParamId,
        axis: usize,
    ) -> Option<ModulationConnection> {
        if axis >= source.axes() {
            return None;
        }
        let key = connection_key(source, axis, destination);
        self.shared
            .control
            .lock()
            .working
            .connections
            .iter()
            .find(|c| c.key() == key)
            .copied()
    }

    /// Configures user LFO `index`. The config is sanitized first.
    pub fn set_lfo(&self, index: usize, config: LfoConfig) -> Result<(), EngineError> {
        if index >= LFO_COUNT {
            return Err(EngineError::InvalidLfo {
                index,
                count: LFO_COUNT,
            });
        }
        let config = config.sanitized();
        let mut state = self.shared.control.lock();
        state.working.lfos[index] = config;
        tracing::debug!(
            "modulation_lfo: lfo{index} shape={} rate={:.3}Hz",
            config.shape,
            config.rate_hz
        );
        self.publish(&mut state);
        Ok(())
    }

    /// Current LFO settings.
    pub fn lfos(&self) -> [LfoConfig; LFO_COUNT] {
        self.shared.control.lock().working.lfos
    }

    /// Clears, then installs a seeded random set of connections. Returns the
    /// number installed.
    pub fn randomize(&self, density: RandomDensity, seed: u64) -> usize {
        let connections = random_connections(density, seed);
        let count = connections.len();
        let mut state = self.shared.control.lock();
        state.working.connections = connections;
        tracing::debug!("modulation_randomize: {density} seed={seed} -> {count} connections");
        self.publish(&mut state);
        count
    }

    /// Snapshots still waiting for the audio side to release them.
    pub fn retired_len(&self) -> usize {
        self.shared.control.lock().retired.len()
    }

    fn publish(&self, state: &mut ControlState) {
        let next = Arc::new(state.working.clone());
        let previous = self.shared.published.swap(next);
        state.retired.push(previous);
        state.retired.retain(|snapshot| Arc::strong_count(snapshot) > 1);
    }
}

impl Default for ModulationMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ModulationMatrix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.shared.control.lock();
        f.debug_struct("ModulationMatrix")
            .field("connections", &state.working.connections.len())
            .field("retired", &state.retired.len())
            .finish()
    }
}
