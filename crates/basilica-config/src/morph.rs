//! Blending four configs into one.

use basilica_core::ParamId;
use basilica_reverb::morph::{Corner, PresetMorpher};

use crate::config::EngineConfig;
use crate::error::ConfigError;

impl EngineConfig {
    /// Blends four configs at `(x, y)` on the unit square.
    ///
    /// `corners` follow [`Corner::ALL`]: top-left, top-right, bottom-left,
    /// bottom-right. Parameters and input gain are blended bilinearly.
    /// Everything that cannot be blended (seed, routing, modulation, LFOs,
    /// processing hints) comes from the corner with the largest weight; on
    /// a tie the earlier corner wins. Every corner must validate.
    pub fn morph(corners: [&EngineConfig; 4], x: f32, y: f32) -> Result<EngineConfig, ConfigError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ConfigError::invalid("morph", "position must be finite"));
        }
        let mut resolved = Vec::with_capacity(4);
        for (corner, config) in Corner::ALL.into_iter().zip(corners) {
            let r = config.validate().map_err(|err| {
                ConfigError::invalid(format!("morph.{corner}"), err.to_string())
            })?;
            resolved.push(r);
        }

        let mut morpher = PresetMorpher::default();
        for (corner, r) in Corner::ALL.into_iter().zip(&resolved) {
            morpher.set_corner(corner, r.settings.params);
        }
        morpher.set_position(x, y)?;
        let weights = morpher.weights();

        let dominant = weights
            .iter()
            .enumerate()
            .fold(0, |best, (i, &w)| if w > weights[best] { i } else { best });

        let mut blended = corners[dominant].clone();
        blended.params = ParamId::ALL
            .into_iter()
            .zip(morpher.params())
            .map(|(id, value)| (id.name().to_string(), value))
            .collect();
        blended.engine.input_gain_db = resolved
            .iter()
            .zip(weights)
            .map(|(r, w)| r.settings.input_gain_db * w)
            .sum();

        tracing::debug!(
            "config_morph: x={:.3} y={:.3} structure from {}",
            morpher.position().0,
            morpher.position().1,
            Corner::ALL[dominant]
        );
        Ok(blended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basilica_reverb::RoutingPreset;

    fn corner(preset: RoutingPreset, time: f32, gain_db: f32) -> EngineConfig {
        let mut config = EngineConfig::with_preset(preset).with_param(ParamId::Time, time);
        config.engine.input_gain_db = gain_db;
        config
    }

    fn four() -> [EngineConfig; 4] {
        [
            corner(RoutingPreset::Cathedral, 0.0, 0.0),
            corner(RoutingPreset::ShimmerLoop, 0.4, -6.0),
            corner(RoutingPreset::Breathing, 0.8, -12.0),
            corner(RoutingPreset::EarlyOnly, 1.0, 6.0),
        ]
    }

    #[test]
    fn corner_position_returns_that_corner() {
        let configs = four();
        let refs = [&configs[0], &configs[1], &configs[2], &configs[3]];
        let out = EngineConfig::morph(refs, 1.0, 1.0).unwrap();
        assert_eq!(out.routing.preset, "early-only");
        assert_eq!(out.params["time"], 1.0);
        assert_eq!(out.engine.input_gain_db, 6.0);
    }

    #[test]
    fn center_averages_params_and_takes_first_structure() {
        let configs = four();
        let refs = [&configs[0], &configs[1], &configs[2], &configs[3]];
        let out = EngineConfig::morph(refs, 0.5, 0.5).unwrap();
        assert!((out.params["time"] - 0.55).abs() < 1e-6);
        assert!((out.engine.input_gain_db + 3.0).abs() < 1e-5);
        assert_eq!(out.routing.preset, "cathedral");
        assert_eq!(out.params.len(), ParamId::COUNT);
        let mix = out.params["mix"];
        assert!(
            (mix - ParamId::Mix.default_value()).abs() < 1e-6,
            "unset params blend their defaults, got {mix}"
        );
        out.validate().unwrap();
    }

    #[test]
    fn structure_follows_the_heaviest_corner() {
        let configs = four();
        let refs = [&configs[0], &configs[1], &configs[2], &configs[3]];
        let out = EngineConfig::morph(refs, 0.8, 0.3).unwrap();
        assert_eq!(out.routing.preset, "shimmer-loop");
    }

    #[test]
    fn invalid_corner_is_named() {
        let mut configs = four();
        configs[2].params.insert("time".into(), 3.0);
        let refs = [&configs[0], &configs[1], &configs[2], &configs[3]];
        let err = EngineConfig::morph(refs, 0.5, 0.5).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "morph.bottom-left"),
            "got {err:?}"
        );
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let config = EngineConfig::default();
        let refs = [&config; 4];
        assert!(EngineConfig::morph(refs, f32::NAN, 0.0).is_err());
    }
}
