//! Named routing presets.

use core::fmt;
use core::str::FromStr;

use super::connection::RoutingConnection;
use crate::error::EngineError;
use crate::nodes::NodeId;
use crate::nodes::NodeId::{Early, Elastic, Input, Output, Resonator, Shimmer, Tail, Wander};

/// Active routing: one of eight fixed graphs, or a caller-supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RoutingPreset {
    /// Classic serial chain.
    #[default]
    Cathedral,
    /// Early reflections into a resonator, no tail.
    MetallicGrain,
    /// Elastic hall feeding back into the early field.
    ElasticFeedback,
    /// Three parallel spaces summed at the output.
    ParallelSpaces,
    /// Pitch-shifted return into the tail.
    ShimmerLoop,
    /// Coloration ahead of the tail.
    InvertedChaos,
    /// Elastic walls and wander ahead of the tail.
    Breathing,
    /// Early reflections only.
    EarlyOnly,
    /// Caller-supplied graph.
    Custom,
}

impl RoutingPreset {
    /// The eight fixed presets.
    pub const NAMED: [RoutingPreset; 8] = [
        Self::Cathedral,
        Self::MetallicGrain,
        Self::ElasticFeedback,
        Self::ParallelSpaces,
        Self::ShimmerLoop,
        Self::InvertedChaos,
        Self::Breathing,
        Self::EarlyOnly,
    ];

    /// Kebab-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cathedral => "cathedral",
            Self::MetallicGrain => "metallic-grain",
            Self::ElasticFeedback => "elastic-feedback",
            Self::ParallelSpaces => "parallel-spaces",
            Self::ShimmerLoop => "shimmer-loop",
            Self::InvertedChaos => "inverted-chaos",
            Self::Breathing => "breathing",
            Self::EarlyOnly => "early-only",
            Self::Custom => "custom",
        }
    }

    /// One-line description for listings.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Cathedral => "input, early reflections, FDN tail, wander, output",
            Self::MetallicGrain => "early reflections through the resonator slot; tail bypassed",
            Self::ElasticFeedback => "elastic hall ahead of the tail, fed back into the early field",
            Self::ParallelSpaces => "tail, resonator and elastic hall in parallel",
            Self::ShimmerLoop => "tail through the shimmer slot, fed back into the tail",
            Self::InvertedChaos => "shimmer and resonator slots ahead of the tail",
            Self::Breathing => "elastic hall and wander ahead of the tail",
            Self::EarlyOnly => "early reflections only; tail bypassed",
            Self::Custom => "caller-supplied graph",
        }
    }

    /// Edges of the preset. Empty for [`Custom`](Self::Custom).
    pub fn connections(self) -> Vec<RoutingConnection> {
        let serial = RoutingConnection::serial;
        match self {
            Self::Cathedral => chain(&[Input, Early, Tail, Wander, Output]),
            Self::MetallicGrain => chain(&[Input, Early, Resonator, Output]),
            Self::ElasticFeedback => {
                let mut c = chain(&[Input, Early, Elastic, Tail, Shimmer, Output]);
                c.push(RoutingConnection::feedback(Elastic, Early, 0.3));
                c
            }
            Self::ParallelSpaces => vec![
                serial(Input, Early),
                RoutingConnection::parallel(Early, Tail, 0.4),
                RoutingConnection::parallel(Early, Resonator, 0.3),
                RoutingConnection::parallel(Early, Elastic, 0.3),
                serial(Tail, Output),
                serial(Resonator, Output),
                serial(Elastic, Output),
            ],
            Self::ShimmerLoop => {
                let mut c = chain(&[Input, Early, Tail, Shimmer, Output]);
                c.push(RoutingConnection::feedback(Shimmer, Tail, 0.4));
                c
            }
            Self::InvertedChaos => chain(&[Input, Early, Shimmer, Resonator, Tail, Output]),
            Self::Breathing => chain(&[Input, Early, Elastic, Wander, Tail, Output]),
            Self::EarlyOnly => chain(&[Input, Early, Output]),
            Self::Custom => Vec::new(),
        }
    }

    /// Bypass flags of the preset, indexed by [`NodeId::index`].
    pub fn bypass(self) -> [bool; NodeId::COUNT] {
        let mut flags = [false; NodeId::COUNT];
        if matches!(self, Self::MetallicGrain | Self::EarlyOnly) {
            flags[Tail.index()] = true;
            flags[Wander.index()] = true;
        }
        flags
    }
}

fn chain(nodes: &[NodeId]) -> Vec<RoutingConnection> {
    nodes
        .windows(2)
        .map(|pair| RoutingConnection::serial(pair[0], pair[1]))
        .collect()
}

impl fmt::Display for RoutingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoutingPreset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::Custom.name() {
            return Ok(Self::Custom);
        }
        Self::NAMED
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::UnknownPreset(s.to_string()))
    }
}
