//! Resolving configs against the engine and applying them.
//!
//! [`EngineConfig::validate`] turns the string-keyed document into a
//! [`ResolvedConfig`] of engine types. Nothing touches the engine until the
//! whole document has resolved, so a rejected config leaves the running
//! state as it was.

use basilica_core::ParamId;
use basilica_reverb::modulation::{LFO_COUNT, LfoConfig, LfoShape, ModulationConnection};
use basilica_reverb::{
    EngineHandle, EngineSettings, MAX_BLOCK_SIZE, ModulationCurve, NodeId, ReverbEngine,
    RoutingConnection, RoutingPreset, RoutingSnapshot, SourceKind,
};

use crate::config::{
    ConnectionEntry, EngineConfig, EngineSection, LfoEntry, ModulationEntry, RoutingSection,
};
use crate::error::ConfigError;

/// A config with every name resolved and every value checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Construction settings: seed, input gain, preset and all parameters.
    pub settings: EngineSettings,
    /// Sample rate hint.
    pub sample_rate: f32,
    /// Block size hint.
    pub max_block: usize,
    /// Explicit bypass flags, or `None` for the preset's own.
    pub bypass: Option<[bool; NodeId::COUNT]>,
    /// Custom graph edges. Empty unless the preset is `custom`.
    pub connections: Vec<RoutingConnection>,
    /// Modulation connections.
    pub modulation: Vec<ModulationConnection>,
    /// All LFO slots.
    pub lfos: [LfoConfig; LFO_COUNT],
}

impl EngineConfig {
    /// Resolves and checks the whole document.
    ///
    /// Unknown names surface as the engine's own errors. Out-of-range values
    /// are [`ConfigError::InvalidValue`] with the dotted field path.
    pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve().inspect_err(|err| {
            tracing::warn!("config_rejected: {err}");
        })
    }

    fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let engine = &self.engine;
        if engine.seed > i64::MAX as u64 {
            return Err(ConfigError::invalid(
                "engine.seed",
                format!("must be at most {}, got {}", i64::MAX, engine.seed),
            ));
        }
        if !engine.input_gain_db.is_finite() {
            return Err(ConfigError::invalid("engine.input_gain_db", "must be finite"));
        }
        if engine.sample_rate == 0 {
            return Err(ConfigError::invalid("engine.sample_rate", "must be > 0"));
        }
        if !(1..=MAX_BLOCK_SIZE).contains(&engine.max_block) {
            return Err(ConfigError::invalid(
                "engine.max_block",
                format!("must be in 1..={MAX_BLOCK_SIZE}, got {}", engine.max_block),
            ));
        }

        let mut params = ParamId::ALL.map(ParamId::default_value);
        for (name, &value) in &self.params {
            let id = name
                .parse::<ParamId>()
                .map_err(|_| basilica_reverb::EngineError::UnknownParameter(name.clone()))?;
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid(
                    format!("params.{name}"),
                    format!("must be in [0, 1], got {value}"),
                ));
            }
            params[id.index()] = value;
        }

        let preset: RoutingPreset = self.routing.preset.parse()?;
        let bypass = match &self.routing.bypass {
            Some(names) => {
                let mut flags = [false; NodeId::COUNT];
                for name in names {
                    let node: NodeId = name.parse()?;
                    flags[node.index()] = true;
                }
                Some(flags)
            }
            None => None,
        };

        let connections = self
            .connections
            .iter()
            .enumerate()
            .map(|(i, entry)| resolve_connection(i, entry))
            .collect::<Result<Vec<_>, _>>()?;
        if preset == RoutingPreset::Custom {
            RoutingSnapshot::build(
                RoutingPreset::Custom,
                &connections,
                bypass.unwrap_or_default(),
            )?;
        } else if !connections.is_empty() {
            return Err(ConfigError::invalid(
                "connection",
                format!("custom edges need preset = \"custom\", got \"{preset}\""),
            ));
        }

        let modulation = self
            .modulation
            .iter()
            .enumerate()
            .map(|(i, entry)| resolve_modulation(i, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut lfos: [LfoConfig; LFO_COUNT] = core::array::from_fn(LfoConfig::factory);
        for (i, entry) in self.lfos.iter().enumerate() {
            if entry.index >= LFO_COUNT {
                return Err(basilica_reverb::EngineError::InvalidLfo {
                    index: entry.index,
                    count: LFO_COUNT,
                }
                .into());
            }
            lfos[entry.index] = resolve_lfo(i, entry)?;
        }

        Ok(ResolvedConfig {
            settings: EngineSettings {
                seed: engine.seed,
                input_gain_db: engine.input_gain_db,
                preset,
                params,
            },
            sample_rate: engine.sample_rate as f32,
            max_block: engine.max_block,
            bypass,
            connections,
            modulation,
            lfos,
        })
    }

    /// Builds an unprepared engine in this config's state.
    pub fn build_engine(&self) -> Result<ReverbEngine, ConfigError> {
        let resolved = self.validate()?;
        let engine = ReverbEngine::new(resolved.settings);
        resolved.apply_to(&engine.handle())?;
        Ok(engine)
    }

    /// Applies the config to a running engine.
    ///
    /// Every parameter is written, so names missing from `[params]` return
    /// to their defaults. LFO slots not listed return to factory settings.
    /// The seed cannot change after construction and is ignored here.
    pub fn apply(&self, handle: &EngineHandle) -> Result<(), ConfigError> {
        self.validate()?.apply_to(handle)
    }

    /// Snapshot of an engine's control state.
    pub fn capture(handle: &EngineHandle) -> Self {
        let params = ParamId::ALL
            .iter()
            .zip(handle.params())
            .map(|(id, value)| (id.name().to_string(), value))
            .collect();

        let snapshot = handle.routing_snapshot();
        let bypass = NodeId::ALL
            .into_iter()
            .filter(|&node| snapshot.is_bypassed(node))
            .map(|node| node.name().to_string())
            .collect();
        let connections = if snapshot.preset() == RoutingPreset::Custom {
            snapshot.connections().iter().map(ConnectionEntry::from).collect()
        } else {
            Vec::new()
        };

        let matrix = handle.modulation();
        Self {
            engine: EngineSection {
                seed: handle.seed(),
                input_gain_db: handle.input_gain_db(),
                ..EngineSection::default()
            },
            routing: RoutingSection {
                preset: snapshot.preset().name().to_string(),
                bypass: Some(bypass),
            },
            params,
            modulation: matrix.connections().iter().map(ModulationEntry::from).collect(),
            lfos: matrix
                .lfos()
                .iter()
                .enumerate()
                .map(|(i, lfo)| LfoEntry::new(i, lfo))
                .collect(),
            connections,
        }
    }
}

impl ResolvedConfig {
    /// Writes this state through `handle`.
    pub fn apply_to(&self, handle: &EngineHandle) -> Result<(), ConfigError> {
        for id in ParamId::ALL {
            handle.set_param(id, self.settings.params[id.index()])?;
        }
        handle.set_input_gain_db(self.settings.input_gain_db)?;

        match (self.settings.preset, self.bypass) {
            (RoutingPreset::Custom, bypass) => {
                handle.load_custom(&self.connections, bypass.unwrap_or_default())?;
            }
            (preset, Some(bypass)) => handle.load_preset_with_bypass(preset, bypass)?,
            (preset, None) => handle.load_preset_kind(preset),
        }

        let matrix = handle.modulation();
        matrix.set_connections(&self.modulation)?;
        for (index, lfo) in self.lfos.iter().enumerate() {
            matrix.set_lfo(index, *lfo)?;
        }

        tracing::info!(
            "config_apply: preset={} {} modulation connections",
            self.settings.preset,
            self.modulation.len()
        );
        Ok(())
    }
}

fn resolve_connection(i: usize, entry: &ConnectionEntry) -> Result<RoutingConnection, ConfigError> {
    let from: NodeId = entry.from.parse()?;
    let to: NodeId = entry.to.parse()?;
    match entry.kind.as_str() {
        "serial" => Ok(RoutingConnection::serial(from, to)),
        "parallel" => {
            let blend = entry.blend.ok_or_else(|| {
                ConfigError::invalid(format!("connection[{i}].blend"), "required for parallel")
            })?;
            Ok(RoutingConnection::parallel(from, to, blend))
        }
        "feedback" => {
            let gain = entry.gain.ok_or_else(|| {
                ConfigError::invalid(format!("connection[{i}].gain"), "required for feedback")
            })?;
            Ok(RoutingConnection::feedback(from, to, gain))
        }
        "crossfeed" => {
            let amount = entry.amount.ok_or_else(|| {
                ConfigError::invalid(format!("connection[{i}].amount"), "required for crossfeed")
            })?;
            Ok(RoutingConnection::crossfeed(from, to, amount))
        }
        other => Err(ConfigError::invalid(
            format!("connection[{i}].kind"),
            format!("expected serial, parallel, feedback or crossfeed, got '{other}'"),
        )),
    }
}

fn resolve_modulation(
    i: usize,
    entry: &ModulationEntry,
) -> Result<ModulationConnection, ConfigError> {
    let source: SourceKind = entry.source.parse()?;
    let destination = entry
        .destination
        .parse::<ParamId>()
        .map_err(|_| basilica_reverb::EngineError::UnknownParameter(entry.destination.clone()))?;
    let curve: ModulationCurve = entry.curve.parse().map_err(|bad: String| {
        ConfigError::invalid(
            format!("modulation[{i}].curve"),
            format!("unknown curve '{bad}'"),
        )
    })?;
    if !(-1.0..=1.0).contains(&entry.depth) {
        return Err(ConfigError::invalid(
            format!("modulation[{i}].depth"),
            format!("must be in [-1, 1], got {}", entry.depth),
        ));
    }
    if !(0.0..=1.0).contains(&entry.probability) {
        return Err(ConfigError::invalid(
            format!("modulation[{i}].probability"),
            format!("must be in [0, 1], got {}", entry.probability),
        ));
    }
    let conn = ModulationConnection::new(source, entry.axis, destination, entry.depth)
        .with_smoothing_ms(entry.smoothing_ms)
        .with_probability(entry.probability)
        .with_curve(curve)
        .with_enabled(entry.enabled);
    Ok(conn.validated()?)
}

fn resolve_lfo(i: usize, entry: &LfoEntry) -> Result<LfoConfig, ConfigError> {
    let shape: LfoShape = entry.shape.parse().map_err(|bad: String| {
        ConfigError::invalid(format!("lfo[{i}].shape"), format!("unknown shape '{bad}'"))
    })?;
    if !(LfoConfig::MIN_RATE_HZ..=LfoConfig::MAX_RATE_HZ).contains(&entry.rate_hz) {
        return Err(ConfigError::invalid(
            format!("lfo[{i}].rate_hz"),
            format!(
                "must be in {}..={} Hz, got {}",
                LfoConfig::MIN_RATE_HZ,
                LfoConfig::MAX_RATE_HZ,
                entry.rate_hz
            ),
        ));
    }
    Ok(LfoConfig {
        shape,
        rate_hz: entry.rate_hz,
        pulse_width: entry.pulse_width,
        skew: entry.skew,
        phase_offset: entry.phase_offset,
    }
    .sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basilica_reverb::EngineError;

    fn parse(toml: &str) -> EngineConfig {
        EngineConfig::from_toml(toml).unwrap()
    }

    #[test]
    fn default_config_resolves_to_default_settings() {
        let resolved = EngineConfig::default().validate().unwrap();
        assert_eq!(resolved.settings, EngineSettings::default());
        assert_eq!(resolved.bypass, None);
        assert_eq!(resolved.lfos[2], LfoConfig::factory(2));
    }

    #[test]
    fn unknown_names_use_engine_errors() {
        let err = parse("[routing]\npreset = \"hall\"").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Engine(EngineError::UnknownPreset(_))));

        let err = parse("[params]\nsize = 0.5").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Engine(EngineError::UnknownParameter(_))));

        let err = parse("[routing]\nbypass = [\"reverb\"]").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Engine(EngineError::UnknownNode(_))));

        let err = parse(
            "[[modulation]]\nsource = \"noise\"\ndestination = \"time\"\ndepth = 0.1",
        )
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Engine(EngineError::UnknownSource(_))));
    }

    #[test]
    fn out_of_range_param_names_field() {
        let err = parse("[params]\ntime = 1.5").validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "params.time")
        );
    }

    #[test]
    fn engine_section_is_checked() {
        let err = parse("[engine]\nmax_block = 0").validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "engine.max_block")
        );
        let err = parse("[engine]\nsample_rate = 0").validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "engine.sample_rate")
        );
    }

    #[test]
    fn connections_require_custom_preset() {
        let err = parse("[[connection]]\nfrom = \"input\"\nto = \"output\"")
            .validate()
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "connection")
        );
    }

    #[test]
    fn custom_graph_is_validated() {
        let err = parse(
            r#"
            [routing]
            preset = "custom"

            [[connection]]
            from = "input"
            to = "tail"
            "#,
        )
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Engine(EngineError::OutputUnreachable)));
    }

    #[test]
    fn parallel_without_blend_is_rejected() {
        let err = parse(
            r#"
            [routing]
            preset = "custom"

            [[connection]]
            from = "input"
            to = "output"
            kind = "parallel"
            "#,
        )
        .validate()
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "connection[0].blend")
        );
    }

    #[test]
    fn crossfeed_connection_resolves() {
        let config = parse(
            r#"
            [routing]
            preset = "custom"

            [[connection]]
            from = "input"
            to = "tail"
            kind = "crossfeed"
            amount = 0.4

            [[connection]]
            from = "tail"
            to = "output"
            "#,
        );
        let resolved = config.validate().unwrap();
        assert_eq!(resolved.connections[0].crossfeed_amount(), 0.4);

        let missing = parse(
            "[routing]\npreset = \"custom\"\n[[connection]]\nfrom = \"input\"\nto = \"output\"\nkind = \"crossfeed\"",
        )
        .validate()
        .unwrap_err();
        assert!(
            matches!(missing, ConfigError::InvalidValue { ref field, .. } if field == "connection[0].amount")
        );
    }

    #[test]
    fn modulation_axis_is_checked() {
        let err = parse(
            "[[modulation]]\nsource = \"brownian\"\naxis = 1\ndestination = \"time\"\ndepth = 0.1",
        )
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Engine(EngineError::InvalidAxis { .. })));
    }

    #[test]
    fn lfo_index_out_of_range() {
        let err = parse("[[lfo]]\nindex = 4\nshape = \"sine\"\nrate_hz = 1.0")
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Engine(EngineError::InvalidLfo { index: 4, count: 4 })
        ));
    }

    #[test]
    fn rejected_config_leaves_engine_untouched() {
        let engine = ReverbEngine::default();
        let handle = engine.handle();
        handle.set_param(ParamId::Time, 0.2).unwrap();

        let bad = parse("[params]\ntime = 0.9\nwarp = 2.0");
        assert!(bad.apply(&handle).is_err());
        assert_eq!(handle.param(ParamId::Time), 0.2);
    }

    #[test]
    fn apply_sets_everything() {
        let config = parse(
            r#"
            [engine]
            input_gain_db = -6.0

            [routing]
            preset = "breathing"
            bypass = ["wander"]

            [params]
            mass = 0.9

            [[modulation]]
            source = "lfo"
            axis = 2
            destination = "width"
            depth = 0.5

            [[lfo]]
            index = 2
            shape = "square"
            rate_hz = 3.0
            pulse_width = 0.25
            "#,
        );
        let engine = config.build_engine().unwrap();
        let handle = engine.handle();
        assert_eq!(handle.param(ParamId::Mass), 0.9);
        assert_eq!(handle.param(ParamId::Time), ParamId::Time.default_value());
        assert_eq!(handle.input_gain_db(), -6.0);
        assert_eq!(handle.active_preset(), RoutingPreset::Breathing);
        assert!(handle.is_bypassed(NodeId::Wander));
        assert!(!handle.is_bypassed(NodeId::Elastic));

        let conns = handle.modulation().connections();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].source, SourceKind::Lfo);
        assert_eq!(conns[0].destination, ParamId::Width);

        let lfos = handle.modulation().lfos();
        assert_eq!(lfos[2].shape, LfoShape::Square);
        assert_eq!(lfos[2].pulse_width, 0.25);
        assert_eq!(lfos[0], LfoConfig::factory(0));
    }

    #[test]
    fn capture_then_apply_restores_state() {
        let source = ReverbEngine::default();
        let src = source.handle();
        src.set_param(ParamId::Drift, 0.7).unwrap();
        src.load_custom(
            &[
                RoutingConnection::serial(NodeId::Input, NodeId::Early),
                RoutingConnection::parallel(NodeId::Early, NodeId::Output, 0.6),
            ],
            [false; NodeId::COUNT],
        )
        .unwrap();
        src.modulation().randomize(basilica_reverb::RandomDensity::Normal, 11);

        let captured = EngineConfig::capture(&src);
        let target = ReverbEngine::default();
        captured.apply(&target.handle()).unwrap();

        assert_eq!(EngineConfig::capture(&target.handle()), captured);
    }
}
