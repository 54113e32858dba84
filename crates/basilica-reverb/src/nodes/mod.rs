//! Graph nodes.
//!
//! The node set is closed: [`NodeId`] names every slot and [`Node`] is a
//! tagged union dispatched with a `match`. Only the insert slots reach
//! through a `dyn` pointer, and only when an external effect is installed.

mod early;
mod elastic;
mod input;
mod insert;
mod output;
mod wander;

use core::fmt;
use core::str::FromStr;

use basilica_core::{ParameterBufferPool, StereoEffect};

use crate::error::EngineError;
use crate::fdn::FdnCore;

pub use early::{EarlyReflections, TAP_ENERGY_LIMIT, TAPS};
pub use elastic::{ElasticHall, MAX_DEFORMATION, MODES, room_modes};
pub use input::{INPUT_GAIN_RANGE_DB, InputStage};
pub use insert::InsertSlot;
pub use output::{OUTPUT_CEILING, OutputStage};
pub use wander::Wander;

/// Graph slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    /// DC removal and input gain.
    Input,
    /// Early reflections.
    Early,
    /// The FDN tail.
    Tail,
    /// Modulated delay.
    Wander,
    /// Room-mode resonances.
    Elastic,
    /// Insert slot for a metallic resonator.
    Resonator,
    /// Insert slot for a pitch shifter.
    Shimmer,
    /// Insert slot for a saturator.
    Saturator,
    /// Air, width and ceiling.
    Output,
}

impl NodeId {
    /// Number of slots.
    pub const COUNT: usize = 9;

    /// Every slot in index order.
    pub const ALL: [NodeId; Self::COUNT] = [
        Self::Input,
        Self::Early,
        Self::Tail,
        Self::Wander,
        Self::Elastic,
        Self::Resonator,
        Self::Shimmer,
        Self::Saturator,
        Self::Output,
    ];

    /// Dense index, `0..COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Kebab-case name used in configs and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Early => "early",
            Self::Tail => "tail",
            Self::Wander => "wander",
            Self::Elastic => "elastic",
            Self::Resonator => "resonator",
            Self::Shimmer => "shimmer",
            Self::Saturator => "saturator",
            Self::Output => "output",
        }
    }

    /// True for the three external coloration slots.
    pub const fn is_insert(self) -> bool {
        matches!(self, Self::Resonator | Self::Shimmer | Self::Saturator)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| EngineError::UnknownNode(s.to_string()))
    }
}

/// One processing node.
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Node {
    /// See [`InputStage`].
    Input(InputStage),
    /// See [`EarlyReflections`].
    Early(EarlyReflections),
    /// See [`FdnCore`].
    Tail(FdnCore),
    /// See [`Wander`].
    Wander(Wander),
    /// See [`ElasticHall`].
    Elastic(ElasticHall),
    /// See [`InsertSlot`].
    Insert(InsertSlot),
    /// See [`OutputStage`].
    Output(OutputStage),
}

impl Node {
    /// Builds the node that lives in slot `id`. Allocates.
    pub fn new(id: NodeId, sample_rate: f32, max_block: usize, seed: u64, input_gain_db: f32) -> Self {
        match id {
            NodeId::Input => Self::Input(InputStage::new(sample_rate, input_gain_db)),
            NodeId::Early => Self::Early(EarlyReflections::new(sample_rate, seed)),
            NodeId::Tail => Self::Tail(FdnCore::new(sample_rate)),
            NodeId::Wander => Self::Wander(Wander::new(sample_rate)),
            NodeId::Elastic => Self::Elastic(ElasticHall::new(sample_rate)),
            NodeId::Resonator | NodeId::Shimmer | NodeId::Saturator => {
                Self::Insert(InsertSlot::new(sample_rate, max_block))
            }
            NodeId::Output => Self::Output(OutputStage::new(sample_rate)),
        }
    }

    /// Processes a stereo block in place.
    #[inline]
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ParameterBufferPool) {
        match self {
            Self::Input(n) => n.process(left, right),
            Self::Early(n) => n.process(left, right, params),
            Self::Tail(n) => n.process(left, right, params),
            Self::Wander(n) => n.process(left, right, params),
            Self::Elastic(n) => n.process(left, right, params),
            Self::Insert(n) => n.process(left, right),
            Self::Output(n) => n.process(left, right, params),
        }
    }

    /// Clears audio state, keeping configuration.
    pub fn reset(&mut self) {
        match self {
            Self::Input(n) => n.reset(),
            Self::Early(n) => n.reset(),
            Self::Tail(n) => n.reset(),
            Self::Wander(n) => n.reset(),
            Self::Elastic(n) => n.reset(),
            Self::Insert(n) => n.reset(),
            Self::Output(n) => n.reset(),
        }
    }

    /// Installs an external effect if this is an insert slot. Otherwise the
    /// effect is handed back.
    pub fn install(
        &mut self,
        effect: Box<dyn StereoEffect>,
    ) -> Result<Option<Box<dyn StereoEffect>>, Box<dyn StereoEffect>> {
        match self {
            Self::Insert(slot) => Ok(slot.install(effect)),
            _ => Err(effect),
        }
    }

    /// Input stage, if this is one.
    pub fn as_input_mut(&mut self) -> Option<&mut InputStage> {
        match self {
            Self::Input(n) => Some(n),
            _ => None,
        }
    }

    /// FDN core, if this is the tail.
    pub fn as_tail(&self) -> Option<&FdnCore> {
        match self {
            Self::Tail(n) => Some(n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for id in NodeId::ALL {
            assert_eq!(id.to_string().parse::<NodeId>().unwrap(), id);
            assert_eq!(NodeId::from_index(id.index()), Some(id));
        }
        assert!(matches!(
            "attic".parse::<NodeId>(),
            Err(EngineError::UnknownNode(_))
        ));
    }

    #[test]
    fn slots_build_matching_nodes() {
        for id in NodeId::ALL {
            let node = Node::new(id, 48000.0, 256, 1, 0.0);
            let insert = matches!(node, Node::Insert(_));
            assert_eq!(insert, id.is_insert(), "{id}");
        }
    }

    #[test]
    fn install_rejected_outside_inserts() {
        struct Nop;
        impl StereoEffect for Nop {
            fn prepare(&mut self, _: f32, _: usize) {}
            fn process_stereo(&mut self, _: &mut [f32], _: &mut [f32]) {}
            fn reset(&mut self) {}
        }
        let mut tail = Node::new(NodeId::Tail, 48000.0, 64, 0, 0.0);
        assert!(tail.install(Box::new(Nop)).is_err());
        let mut shimmer = Node::new(NodeId::Shimmer, 48000.0, 64, 0, 0.0);
        assert!(matches!(shimmer.install(Box::new(Nop)), Ok(None)));
    }
}
