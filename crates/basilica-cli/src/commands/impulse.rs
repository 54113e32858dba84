//! Impulse response rendering and RT60 measurement.

use std::path::PathBuf;

use basilica_core::ParamId;
use basilica_reverb::ReverbEngine;
use clap::Args;

use super::common::{EngineArgs, prepared_engine, render_in_place, write_wav_stereo};
use crate::analysis::{Rt60Estimate, estimate_rt60, linear_to_db, peak};

#[derive(Args)]
pub struct ImpulseArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Sample rate, overriding the config
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Length of the rendered response in seconds
    #[arg(short, long, default_value = "8.0")]
    duration: f32,

    /// Write the response to this WAV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

/// Stereo impulse response of a prepared engine.
pub fn render_impulse(
    engine: &mut ReverbEngine,
    block_size: usize,
    frames: usize,
) -> anyhow::Result<(Vec<f32>, Vec<f32>)> {
    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];
    if let (Some(l), Some(r)) = (left.first_mut(), right.first_mut()) {
        *l = 1.0;
        *r = 1.0;
    }
    render_in_place(engine, &mut left, &mut right, block_size, None)?;
    Ok((left, right))
}

pub fn run(args: ImpulseArgs) -> anyhow::Result<()> {
    if !(args.duration.is_finite() && args.duration > 0.0) {
        anyhow::bail!("--duration must be a positive number of seconds");
    }

    let config = args.engine.config()?;
    let sample_rate = args.sample_rate.unwrap_or(config.engine.sample_rate);
    let (mut engine, block_size) = prepared_engine(&config, sample_rate)?;
    let handle = engine.handle();

    let frames = (args.duration * sample_rate as f32).round() as usize;
    let (left, right) = render_impulse(&mut engine, block_size, frames)?;
    let mono: Vec<f32> = left
        .iter()
        .zip(&right)
        .map(|(l, r)| 0.5 * (l + r))
        .collect();

    println!("Impulse response: {}", handle.active_preset());
    println!(
        "  {} Hz, {:.2}s, block {}, time={:.2} mix={:.2}",
        sample_rate,
        args.duration,
        block_size,
        handle.param(ParamId::Time),
        handle.param(ParamId::Mix)
    );
    println!("  Peak: {:.1} dB", linear_to_db(peak(&mono)));

    match estimate_rt60(&mono, sample_rate as f32) {
        Some(estimate) => print_estimate(&estimate),
        None => println!("  RT60: not measurable (decay under 25 dB in the rendered length)"),
    }

    if let Some(path) = &args.output {
        write_wav_stereo(path, &left, &right, sample_rate, args.bit_depth)?;
        println!("\nWrote {}", path.display());
    }
    Ok(())
}

fn print_estimate(estimate: &Rt60Estimate) {
    let fmt = |t: Option<f32>| t.map_or_else(|| "n/a".to_string(), |t| format!("{t:.3}s"));
    println!("  RT60: {:.3}s (r = {:.3})", estimate.rt60_seconds, estimate.correlation);
    println!("    T30: {}", fmt(estimate.t30_seconds));
    println!("    T20: {}", fmt(estimate.t20_seconds));
    println!("    EDT: {}", fmt(estimate.edt_seconds));
}
