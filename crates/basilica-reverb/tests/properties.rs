//! Property-based tests for basilica-reverb.
//!
//! Modulation boundedness across randomized connection sets, routing
//! validation over arbitrary edge lists, and engine output finiteness under
//! arbitrary parameter settings.

use basilica_core::ParamId;
use basilica_reverb::modulation::{
    ModulationConnection, ModulationCurve, ModulationMatrix, ModulationProcessor, SourceKind,
    random_connections,
};
use basilica_reverb::routing::{RoutingSnapshot, topological_order};
use basilica_reverb::{
    EngineSettings, NodeId, RandomDensity, ReverbEngine, RoutingConnection, RoutingPreset,
};
use proptest::prelude::*;

const SAMPLE_RATE: f32 = 48000.0;

fn density() -> impl Strategy<Value = RandomDensity> {
    prop::sample::select(RandomDensity::ALL.to_vec())
}

fn node() -> impl Strategy<Value = NodeId> {
    prop::sample::select(NodeId::ALL.to_vec())
}

fn curve() -> impl Strategy<Value = ModulationCurve> {
    prop::sample::select(vec![
        ModulationCurve::Linear,
        ModulationCurve::EaseIn,
        ModulationCurve::EaseOut,
        ModulationCurve::SCurve,
        ModulationCurve::Steps(4),
    ])
}

fn connection() -> impl Strategy<Value = RoutingConnection> {
    (node(), node(), 0u8..3, 0.0f32..=1.5).prop_map(|(from, to, kind, amount)| match kind {
        0 => RoutingConnection::serial(from, to),
        1 => RoutingConnection::parallel(from, to, amount),
        _ => RoutingConnection::feedback(from, to, amount),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every destination offset stays in [-1, 1] for 600 blocks, across a
    /// randomization halfway through.
    #[test]
    fn modulation_stays_bounded_across_randomize(
        first in density(),
        second in density(),
        seed in any::<u64>(),
        block in prop::sample::select(vec![32usize, 64, 256, 512]),
        level in 0.0f32..=2.0,
    ) {
        let matrix = ModulationMatrix::new();
        matrix.randomize(first, seed);
        let mut processor = ModulationProcessor::new(SAMPLE_RATE, seed);
        let mut input = vec![0.0f32; block];

        for n in 0..600usize {
            if n == 300 {
                matrix.randomize(second, seed.wrapping_add(1));
            }
            // Bursty input so the followers swing through their range.
            let amp = if (n / 20) % 2 == 0 { level } else { 0.0 };
            for (i, s) in input.iter_mut().enumerate() {
                *s = amp * libm::sinf(i as f32 * 0.37);
            }
            let out = processor.process(&input, &input, &matrix);
            for (id, v) in ParamId::ALL.iter().zip(out) {
                prop_assert!(v.is_finite(), "{id}: {v}");
                prop_assert!((-1.0..=1.0).contains(v), "{id}: {v} at block {n}");
            }
        }
    }

    /// Stacked full-depth connections on one destination still clamp.
    #[test]
    fn stacked_connections_clamp(
        depths in prop::collection::vec(-1.0f32..=1.0, 1..8),
        curve in curve(),
        seed in any::<u64>(),
    ) {
        let matrix = ModulationMatrix::new();
        let mut axis = 0usize;
        for (i, depth) in depths.iter().enumerate() {
            let source = SourceKind::ALL[i % SourceKind::ALL.len()];
            axis = (axis + 1) % source.axes();
            let conn = ModulationConnection::new(source, axis, ParamId::Warp, *depth)
                .with_curve(curve)
                .with_smoothing_ms(20.0);
            matrix.set_connection(conn).unwrap();
        }
        let mut processor = ModulationProcessor::new(SAMPLE_RATE, seed);
        let input = vec![0.9f32; 128];
        for _ in 0..200 {
            let v = processor.process(&input, &input, &matrix)[ParamId::Warp.index()];
            prop_assert!((-1.0..=1.0).contains(&v));
        }
    }

    /// Randomized sets pass validation and never repeat a key.
    #[test]
    fn random_sets_are_valid(density in density(), seed in any::<u64>()) {
        let set = random_connections(density, seed);
        let mut keys: Vec<usize> = set.iter().map(ModulationConnection::key).collect();
        keys.sort_unstable();
        keys.dedup();
        prop_assert_eq!(keys.len(), set.len());
        for conn in &set {
            prop_assert!(conn.validated().is_ok());
        }
    }

    /// Any edge list either fails validation or yields an order in which
    /// every forward edge points forward.
    #[test]
    fn validated_graphs_are_topologically_ordered(
        connections in prop::collection::vec(connection(), 0..14),
    ) {
        if let Ok(snapshot) =
            RoutingSnapshot::build(RoutingPreset::Custom, &connections, [false; NodeId::COUNT])
        {
            let order = snapshot.order();
            prop_assert_eq!(order.position(NodeId::Input), Some(0));
            for conn in snapshot.connections() {
                if conn.is_feedback() {
                    prop_assert!(conn.feedback_gain() <= 0.95);
                    continue;
                }
                let (Some(a), Some(b)) = (order.position(conn.from), order.position(conn.to)) else {
                    return Err(TestCaseError::fail(format!("{conn} not scheduled")));
                };
                prop_assert!(a < b, "{} runs after {}", conn.from, conn.to);
            }
            let recomputed = topological_order(snapshot.edges(), snapshot.present());
            prop_assert_eq!(recomputed.ok(), Some(*order));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Arbitrary parameter targets and presets never produce non-finite or
    /// out-of-ceiling output.
    #[test]
    fn engine_output_is_finite_and_bounded(
        params in prop::array::uniform11(0.0f32..=1.0),
        preset in prop::sample::select(RoutingPreset::NAMED.to_vec()),
        seed in any::<u64>(),
    ) {
        let settings = EngineSettings {
            seed,
            input_gain_db: 12.0,
            preset,
            params,
        }
        .with_param(ParamId::Mix, 1.0);
        let mut engine = ReverbEngine::new(settings);
        engine.prepare(SAMPLE_RATE, 256, 2).unwrap();
        engine.handle().modulation().randomize(RandomDensity::Dense, seed);

        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        for n in 0..200usize {
            for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
                let t = (n * 256 + i) as f32;
                *l = libm::sinf(t * 0.031) * 0.9;
                *r = libm::sinf(t * 0.017) * 0.9;
            }
            engine.process_stereo(&mut left, &mut right).unwrap();
            for s in left.iter().chain(&right) {
                prop_assert!(s.is_finite());
                prop_assert!(s.abs() <= 1.0 + 1e-6, "sample {}", s);
            }
        }
    }
}
