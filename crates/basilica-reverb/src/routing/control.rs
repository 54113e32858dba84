//! Control side of the routing graph.
//!
//! Same shape as the modulation matrix: mutations serialize on a
//! `parking_lot::Mutex`, build a fresh [`RoutingSnapshot`] and swap it into
//! an `ArcSwap`. Replaced snapshots wait in a retired list until the audio
//! side lets go of them.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::connection::RoutingConnection;
use super::preset::RoutingPreset;
use super::snapshot::RoutingSnapshot;
use crate::error::EngineError;
use crate::nodes::NodeId;

struct Shared {
    published: ArcSwap<RoutingSnapshot>,
    retired: Mutex<Vec<Arc<RoutingSnapshot>>>,
}

/// Cloneable handle that publishes routing snapshots.
#[derive(Clone)]
pub struct RoutingControl {
    shared: Arc<Shared>,
}

impl RoutingControl {
    /// Starts on `preset`. `Custom` starts as a plain input-to-output wire.
    pub fn new(preset: RoutingPreset) -> Self {
        let initial =
            RoutingSnapshot::for_preset(preset).unwrap_or_else(|_| RoutingSnapshot::passthrough());
        Self {
            shared: Arc::new(Shared {
                published: ArcSwap::from_pointee(initial),
                retired: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current snapshot. Lock-free; the audio side calls this every block.
    #[inline]
    pub fn load(&self) -> arc_swap::Guard<Arc<RoutingSnapshot>> {
        self.shared.published.load()
    }

    /// Owned reference to the current snapshot.
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        self.shared.published.load_full()
    }

    /// Loads a preset by kebab-case name.
    pub fn load_preset(&self, name: &str) -> Result<(), EngineError> {
        let preset = name.parse::<RoutingPreset>()?;
        self.load_preset_kind(preset);
        Ok(())
    }

    /// Loads a preset. `Custom` keeps the current graph under the custom
    /// label.
    pub fn load_preset_kind(&self, preset: RoutingPreset) {
        let mut retired = self.shared.retired.lock();
        let next = if preset == RoutingPreset::Custom {
            self.snapshot().relabeled(preset)
        } else {
            match RoutingSnapshot::for_preset(preset) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::error!("routing_preset: {preset} failed validation: {err}");
                    return;
                }
            }
        };
        tracing::debug!("routing_preset: {preset}");
        self.publish(&mut retired, next);
    }

    /// Loads a preset with explicit bypass flags in a single publish.
    /// `Custom` keeps the current edges.
    pub fn load_preset_with_bypass(
        &self,
        preset: RoutingPreset,
        bypass: [bool; NodeId::COUNT],
    ) -> Result<(), EngineError> {
        let connections = if preset == RoutingPreset::Custom {
            self.snapshot().connections().to_vec()
        } else {
            preset.connections()
        };
        let snapshot = RoutingSnapshot::build(preset, &connections, bypass)?;
        let mut retired = self.shared.retired.lock();
        tracing::debug!("routing_preset: {preset} with bypass {:?}", bypassed_names(&bypass));
        self.publish(&mut retired, snapshot);
        Ok(())
    }

    /// Validates and publishes a caller-supplied graph.
    pub fn load_custom(
        &self,
        connections: &[RoutingConnection],
        bypass: [bool; NodeId::COUNT],
    ) -> Result<(), EngineError> {
        let snapshot = RoutingSnapshot::build(RoutingPreset::Custom, connections, bypass)?;
        let mut retired = self.shared.retired.lock();
        tracing::debug!(
            "routing_custom: {} edges, {} feedback",
            snapshot.connections().len(),
            snapshot.feedback().len()
        );
        self.publish(&mut retired, snapshot);
        Ok(())
    }

    /// Republishes the active graph with one bypass flag changed.
    pub fn set_module_bypass(&self, node: NodeId, bypassed: bool) {
        let mut retired = self.shared.retired.lock();
        let current = self.snapshot();
        if current.is_bypassed(node) == bypassed {
            return;
        }
        let next = current.with_bypass(node, bypassed);
        drop(current);
        tracing::debug!("routing_bypass: {node} -> {bypassed}");
        self.publish(&mut retired, next);
    }

    /// Preset of the published snapshot.
    pub fn active_preset(&self) -> RoutingPreset {
        self.load().preset()
    }

    /// Bypass flag of `node` in the published snapshot.
    pub fn is_bypassed(&self, node: NodeId) -> bool {
        self.load().is_bypassed(node)
    }

    /// Snapshots still held for the audio side.
    pub fn retired_len(&self) -> usize {
        self.shared.retired.lock().len()
    }

    fn publish(&self, retired: &mut Vec<Arc<RoutingSnapshot>>, next: RoutingSnapshot) {
        let previous = self.shared.published.swap(Arc::new(next));
        retired.push(previous);
        retired.retain(|snapshot| Arc::strong_count(snapshot) > 1);
    }
}

fn bypassed_names(bypass: &[bool; NodeId::COUNT]) -> Vec<&'static str> {
    NodeId::ALL
        .into_iter()
        .filter(|id| bypass[id.index()])
        .map(NodeId::name)
        .collect()
}

impl Default for RoutingControl {
    fn default() -> Self {
        Self::new(RoutingPreset::default())
    }
}

impl core::fmt::Debug for RoutingControl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoutingControl")
            .field("preset", &self.active_preset())
            .field("retired", &self.retired_len())
            .finish()
    }
}
