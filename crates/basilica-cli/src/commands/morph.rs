//! Four-corner config morphing.

use std::path::PathBuf;

use anyhow::Context;
use basilica_config::EngineConfig;
use clap::Args;

#[derive(Args)]
pub struct MorphArgs {
    /// Corner configs: top-left, top-right, bottom-left, bottom-right
    #[arg(num_args = 4, required = true, value_names = ["TL", "TR", "BL", "BR"])]
    corners: Vec<PathBuf>,

    /// Horizontal position, 0 (left) to 1 (right)
    #[arg(short, long, default_value = "0.5")]
    x: f32,

    /// Vertical position, 0 (top) to 1 (bottom)
    #[arg(short, long, default_value = "0.5")]
    y: f32,

    /// Write the config here instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Loads the four corner files and blends them at `(x, y)`.
pub fn morphed_config(paths: &[PathBuf], x: f32, y: f32) -> anyhow::Result<EngineConfig> {
    let [tl, tr, bl, br] = paths else {
        anyhow::bail!("expected 4 corner configs, got {}", paths.len());
    };
    let load = |path: &PathBuf| {
        EngineConfig::load(path).with_context(|| format!("loading corner {}", path.display()))
    };
    let corners = [load(tl)?, load(tr)?, load(bl)?, load(br)?];
    let morphed = EngineConfig::morph(
        [&corners[0], &corners[1], &corners[2], &corners[3]],
        x,
        y,
    )?;
    Ok(morphed)
}

pub fn run(args: MorphArgs) -> anyhow::Result<()> {
    let config = morphed_config(&args.corners, args.x, args.y)?;
    match &args.output {
        Some(path) => {
            config.save(path)?;
            println!(
                "Wrote morph at ({:.2}, {:.2}) to {}",
                args.x.clamp(0.0, 1.0),
                args.y.clamp(0.0, 1.0),
                path.display()
            );
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
