//! File-based reverb rendering.

use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::common::{EngineArgs, prepared_engine, read_wav_stereo, render_in_place, write_wav_stereo};
use crate::analysis::{linear_to_db, peak, rms};

#[derive(Args)]
pub struct RenderArgs {
    /// Input WAV file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file (always stereo)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Seconds of silence appended so the tail can ring out
    #[arg(long, default_value = "4.0")]
    tail: f32,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if !(args.tail.is_finite() && args.tail >= 0.0) {
        anyhow::bail!("--tail must be a non-negative number of seconds");
    }

    println!("Reading {}...", args.input.display());
    let (mut left, mut right, sample_rate) = read_wav_stereo(&args.input)?;
    let input_frames = left.len();
    println!(
        "  {} frames, {} Hz, {:.2}s",
        input_frames,
        sample_rate,
        input_frames as f32 / sample_rate as f32
    );

    let config = args.engine.config()?;
    let (mut engine, block_size) = prepared_engine(&config, sample_rate)?;
    let handle = engine.handle();
    println!(
        "Routing: {}, {} modulation connection(s)",
        handle.active_preset(),
        handle.modulation().connections().len()
    );

    let tail_frames = (args.tail * sample_rate as f32).round() as usize;
    left.resize(input_frames + tail_frames, 0.0);
    right.resize(input_frames + tail_frames, 0.0);
    let input_rms = rms(&left[..input_frames]).max(rms(&right[..input_frames]));
    let input_peak = peak(&left[..input_frames]).max(peak(&right[..input_frames]));

    let pb = ProgressBar::new(left.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    render_in_place(&mut engine, &mut left, &mut right, block_size, Some(&pb))?;
    pb.finish_with_message("done");

    let output_rms = rms(&left).max(rms(&right));
    let output_peak = peak(&left).max(peak(&right));
    println!("\nStats:");
    println!(
        "  Input:  RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(input_rms),
        linear_to_db(input_peak)
    );
    println!(
        "  Output: RMS {:.1} dB, Peak {:.1} dB",
        linear_to_db(output_rms),
        linear_to_db(output_peak)
    );

    println!("\nWriting {}...", args.output.display());
    write_wav_stereo(&args.output, &left, &right, sample_rate, args.bit_depth)?;
    println!("Done!");
    Ok(())
}
