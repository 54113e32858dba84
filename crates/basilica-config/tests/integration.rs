//! Integration tests for basilica-config.
//!
//! Files on disk, capture of live engines, and configs driving audio.

use basilica_config::{ConfigError, EngineConfig};
use basilica_core::ParamId;
use basilica_reverb::modulation::{LfoConfig, LfoShape, ModulationConnection};
use basilica_reverb::{
    ModulationCurve, NodeId, RandomDensity, ReverbEngine, RoutingConnection, RoutingPreset,
    SourceKind,
};
use tempfile::TempDir;

/// A config saved to disk loads back unchanged.
#[test]
fn test_save_load_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("hall.toml");

    let config = EngineConfig::with_preset(RoutingPreset::ElasticFeedback)
        .with_param(ParamId::Time, 0.85)
        .with_param(ParamId::Air, 0.3);
    config.save(&path).unwrap();
    assert!(path.exists());

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

/// Loading a missing file reports the path.
#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");
    let err = EngineConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

/// Capture of a custom graph with modulation survives TOML text exactly.
#[test]
fn test_capture_survives_toml() {
    let engine = ReverbEngine::default();
    let handle = engine.handle();
    handle.set_param(ParamId::Warp, 0.37).unwrap();
    handle.set_param(ParamId::Mix, 0.61).unwrap();
    handle.set_input_gain_db(-4.5).unwrap();
    handle
        .load_custom(
            &[
                RoutingConnection::serial(NodeId::Input, NodeId::Early),
                RoutingConnection::serial(NodeId::Early, NodeId::Tail),
                RoutingConnection::parallel(NodeId::Early, NodeId::Output, 0.35),
                RoutingConnection::serial(NodeId::Tail, NodeId::Output),
                RoutingConnection::feedback(NodeId::Tail, NodeId::Early, 0.4),
            ],
            [false; NodeId::COUNT],
        )
        .unwrap();
    handle.set_module_bypass(NodeId::Early, true);

    let matrix = handle.modulation();
    matrix
        .set_connection(
            ModulationConnection::new(SourceKind::ChaosAttractor, 1, ParamId::Drift, -0.45)
                .with_curve(ModulationCurve::Steps(6))
                .with_probability(0.7)
                .with_smoothing_ms(80.0),
        )
        .unwrap();
    matrix
        .set_connection(
            ModulationConnection::new(SourceKind::AudioFollower, 0, ParamId::Bloom, 0.2)
                .with_enabled(false),
        )
        .unwrap();
    let mut lfo = LfoConfig::new(LfoShape::SkewedTriangle, 1.3);
    lfo.skew = 0.2;
    matrix.set_lfo(3, lfo).unwrap();

    let captured = EngineConfig::capture(&handle);
    let text = captured.to_toml().unwrap();
    let parsed = EngineConfig::from_toml(&text).unwrap();
    assert_eq!(parsed, captured, "TOML text:\n{text}");

    let restored = parsed.build_engine().unwrap();
    let restored_handle = restored.handle();
    assert_eq!(EngineConfig::capture(&restored_handle), captured);
    assert_eq!(restored_handle.active_preset(), RoutingPreset::Custom);
    assert!(restored_handle.is_bypassed(NodeId::Early));
    assert_eq!(restored_handle.routing_snapshot().feedback().len(), 1);
    assert_eq!(restored_handle.seed(), handle.seed());
}

/// A randomized modulation set round-trips through a file.
#[test]
fn test_randomized_modulation_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("random.toml");

    let engine = ReverbEngine::default();
    let handle = engine.handle();
    handle.modulation().randomize(RandomDensity::Dense, 99);

    let captured = EngineConfig::capture(&handle);
    captured.save(&path).unwrap();
    let loaded = EngineConfig::load(&path).unwrap();

    let target = ReverbEngine::default();
    loaded.apply(&target.handle()).unwrap();
    assert_eq!(
        target.handle().modulation().connections(),
        handle.modulation().connections()
    );
}

/// A config-built engine processes audio.
#[test]
fn test_config_engine_processes() {
    let config = EngineConfig::from_toml(
        r#"
        [routing]
        preset = "parallel-spaces"

        [params]
        mix = 1.0
        time = 0.6

        [[modulation]]
        source = "brownian"
        destination = "width"
        depth = 0.3
        "#,
    )
    .unwrap();
    let resolved = config.validate().unwrap();
    let mut engine = config.build_engine().unwrap();
    engine
        .prepare(resolved.sample_rate, resolved.max_block, 2)
        .unwrap();

    let mut left = vec![0.0f32; resolved.max_block];
    let mut right = vec![0.0f32; resolved.max_block];
    left[0] = 1.0;
    right[0] = 1.0;
    engine.process_stereo(&mut left, &mut right).unwrap();
    let mut energy = 0.0f32;
    for _ in 0..20 {
        left.fill(0.0);
        right.fill(0.0);
        engine.process_stereo(&mut left, &mut right).unwrap();
        assert!(left.iter().chain(&right).all(|s| s.is_finite()));
        energy += left.iter().map(|s| s * s).sum::<f32>();
    }
    assert!(energy > 0.0, "reverb tail should follow the impulse");
}
