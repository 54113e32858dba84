//! Routing preset listing.

use basilica_config::{ConnectionEntry, EngineConfig};
use basilica_reverb::{NodeId, RoutingConnection, RoutingPreset};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    command: Option<PresetsCommand>,
}

#[derive(Subcommand)]
enum PresetsCommand {
    /// List the named routing presets (default)
    List,

    /// Show the edges and bypass flags of a preset
    Show {
        /// Preset name
        name: String,

        /// Print as an engine config TOML instead
        #[arg(long)]
        toml: bool,
    },
}

pub fn run(args: PresetsArgs) -> anyhow::Result<()> {
    match args.command.unwrap_or(PresetsCommand::List) {
        PresetsCommand::List => {
            list_presets();
            Ok(())
        }
        PresetsCommand::Show { name, toml } => show_preset(&name, toml),
    }
}

fn list_presets() {
    println!("Routing Presets:");
    println!("================");
    for preset in RoutingPreset::NAMED {
        println!("  {:18} - {}", preset.name(), preset.description());
    }
    println!();
    println!("  Show one with: basilica presets show <name>");
}

fn show_preset(name: &str, as_toml: bool) -> anyhow::Result<()> {
    let preset: RoutingPreset = name.parse()?;
    if preset == RoutingPreset::Custom {
        anyhow::bail!("'custom' has no fixed graph; describe one with [[connection]] in a config");
    }

    if as_toml {
        print!("{}", EngineConfig::with_preset(preset).to_toml()?);
        return Ok(());
    }

    println!("{}", preset.name());
    println!("{}", "=".repeat(preset.name().len()));
    println!("{}\n", preset.description());
    println!("Connections:");
    for conn in preset.connections() {
        println!("  {}", describe(&conn));
    }

    let bypass = preset.bypass();
    let bypassed: Vec<&str> = NodeId::ALL
        .into_iter()
        .filter(|node| bypass[node.index()])
        .map(NodeId::name)
        .collect();
    if !bypassed.is_empty() {
        println!("\nBypassed: {}", bypassed.join(", "));
    }
    Ok(())
}

fn describe(conn: &RoutingConnection) -> String {
    let entry = ConnectionEntry::from(conn);
    let arrow = format!("{:>9} -> {:<9}", entry.from, entry.to);
    match (entry.blend, entry.gain, entry.amount) {
        (Some(blend), _, _) => format!("{arrow} {} blend={blend:.2}", entry.kind),
        (_, Some(gain), _) => format!("{arrow} {} gain={gain:.2}", entry.kind),
        (_, _, Some(amount)) => format!("{arrow} {} amount={amount:.2}", entry.kind),
        _ => format!("{arrow} {}", entry.kind),
    }
}
