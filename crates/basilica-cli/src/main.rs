//! Basilica CLI - offline rendering and analysis for the basilica reverb.

mod analysis;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "basilica")]
#[command(author, version, about = "Basilica reverb engine CLI", long_about = None)]
struct Cli {
    /// Log control-path events (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a WAV file through the reverb
    Render(commands::render::RenderArgs),

    /// Render an impulse response and measure RT60
    Impulse(commands::impulse::ImpulseArgs),

    /// List routing presets
    Presets(commands::presets::PresetsArgs),

    /// Print a randomized modulation set as TOML
    Randomize(commands::randomize::RandomizeArgs),

    /// Blend four config files at a point on a square
    Morph(commands::morph::MorphArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Impulse(args) => commands::impulse::run(args),
        Commands::Presets(args) => commands::presets::run(args),
        Commands::Randomize(args) => commands::randomize::run(args),
        Commands::Morph(args) => commands::morph::run(args),
    }
}
