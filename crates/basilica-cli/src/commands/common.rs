//! Shared CLI helpers used across multiple commands.

use std::path::{Path, PathBuf};

use anyhow::Context;
use basilica_config::EngineConfig;
use basilica_reverb::ReverbEngine;
use clap::Args;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use indicatif::ProgressBar;

/// Engine selection flags shared by `render` and `impulse`.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Engine config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Routing preset, overriding the config
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Parameter override (e.g. "time=0.8"), repeatable
    #[arg(long, value_parser = parse_key_val, number_of_values = 1)]
    pub param: Vec<(String, String)>,

    /// Processing block size, overriding the config
    #[arg(long)]
    pub block_size: Option<usize>,
}

impl EngineArgs {
    /// Loads the config file (or defaults) and applies the overrides.
    pub fn config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(preset) = &self.preset {
            config.routing.preset.clone_from(preset);
            config.routing.bypass = None;
            config.connections.clear();
        }
        for (name, value) in &self.param {
            let value: f32 = value
                .parse()
                .with_context(|| format!("parameter '{name}': '{value}' is not a number"))?;
            config.params.insert(name.clone(), value);
        }
        if let Some(block_size) = self.block_size {
            config.engine.max_block = block_size;
        }
        Ok(config)
    }
}

/// Parse a `key=value` string for clap's `value_parser`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("Invalid parameter format: '{s}' (expected key=value)"))
}

/// Builds and prepares a stereo engine from `config`.
pub fn prepared_engine(
    config: &EngineConfig,
    sample_rate: u32,
) -> anyhow::Result<(ReverbEngine, usize)> {
    let mut config = config.clone();
    config.engine.sample_rate = sample_rate;
    let resolved = config.validate()?;
    let mut engine = config.build_engine()?;
    engine.prepare(resolved.sample_rate, resolved.max_block, 2)?;
    tracing::debug!(
        "cli_engine: preset={} sample_rate={} block={}",
        config.routing.preset,
        sample_rate,
        resolved.max_block
    );
    Ok((engine, resolved.max_block))
}

/// Runs `left`/`right` through `engine` in place, block by block.
pub fn render_in_place(
    engine: &mut ReverbEngine,
    left: &mut [f32],
    right: &mut [f32],
    block_size: usize,
    progress: Option<&ProgressBar>,
) -> anyhow::Result<()> {
    for (l, r) in left.chunks_mut(block_size).zip(right.chunks_mut(block_size)) {
        engine.process_stereo(l, r)?;
        if let Some(pb) = progress {
            pb.inc(l.len() as u64);
        }
    }
    Ok(())
}

/// Reads a WAV file as two channels. Mono is duplicated; channels past the
/// second are dropped.
pub fn read_wav_stereo(path: &Path) -> anyhow::Result<(Vec<f32>, Vec<f32>, u32)> {
    let reader =
        WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
    };

    let frames = samples.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in samples.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(frame.get(1).copied().unwrap_or(frame[0]));
    }
    Ok((left, right, spec.sample_rate))
}

/// Writes a stereo WAV file. 32 bits is float; 16 and 24 are integer PCM.
pub fn write_wav_stereo(
    path: &Path,
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
    bits_per_sample: u16,
) -> anyhow::Result<()> {
    if !matches!(bits_per_sample, 16 | 24 | 32) {
        anyhow::bail!("unsupported bit depth {bits_per_sample} (expected 16, 24 or 32)");
    }
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample,
        sample_format: if bits_per_sample == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;

    if bits_per_sample == 32 {
        for (&l, &r) in left.iter().zip(right) {
            writer.write_sample(l)?;
            writer.write_sample(r)?;
        }
    } else {
        let max_val = (1i32 << (bits_per_sample - 1)) as f32;
        let quantize = |s: f32| (s * max_val).clamp(-max_val, max_val - 1.0) as i32;
        for (&l, &r) in left.iter().zip(right) {
            writer.write_sample(quantize(l))?;
            writer.write_sample(quantize(r))?;
        }
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_val_parses() {
        assert_eq!(
            parse_key_val("time = 0.8"),
            Ok(("time".to_string(), "0.8".to_string()))
        );
        assert!(parse_key_val("time").is_err());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let args = EngineArgs {
            config: None,
            preset: Some("early-only".into()),
            param: vec![("mix".into(), "0.25".into())],
            block_size: Some(128),
        };
        let config = args.config().unwrap();
        assert_eq!(config.routing.preset, "early-only");
        assert_eq!(config.params["mix"], 0.25);
        assert_eq!(config.engine.max_block, 128);
    }

    #[test]
    fn non_numeric_param_is_an_error() {
        let args = EngineArgs {
            config: None,
            preset: None,
            param: vec![("mix".into(), "loud".into())],
            block_size: None,
        };
        assert!(args.config().is_err());
    }

    #[test]
    fn wav_roundtrip_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.wav");
        let left = vec![0.5, -0.25, 0.0];
        let right = vec![-0.5, 0.25, 1.0];
        write_wav_stereo(&path, &left, &right, 44100, 32).unwrap();
        let (l, r, sr) = read_wav_stereo(&path).unwrap();
        assert_eq!((l, r, sr), (left, right, 44100));
    }
}
