//! Randomized modulation sets.

use std::path::PathBuf;

use basilica_config::{EngineConfig, ModulationEntry};
use basilica_reverb::RandomDensity;
use basilica_reverb::modulation::random_connections;
use clap::Args;

#[derive(Args)]
pub struct RandomizeArgs {
    /// Density: sparse, normal or dense
    #[arg(short, long, default_value = "normal", value_parser = parse_density)]
    density: RandomDensity,

    /// Seed; the same seed and density give the same set
    #[arg(short, long, default_value = "1")]
    seed: u64,

    /// Routing preset to put in the config
    #[arg(short, long)]
    preset: Option<String>,

    /// Write the config here instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_density(s: &str) -> Result<RandomDensity, String> {
    s.parse()
        .map_err(|bad| format!("unknown density '{bad}' (expected sparse, normal or dense)"))
}

/// Config holding a seeded random modulation set.
pub fn randomized_config(density: RandomDensity, seed: u64, preset: Option<&str>) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(preset) = preset {
        config.routing.preset = preset.to_string();
    }
    config.modulation = random_connections(density, seed)
        .iter()
        .map(ModulationEntry::from)
        .collect();
    config
}

pub fn run(args: RandomizeArgs) -> anyhow::Result<()> {
    let config = randomized_config(args.density, args.seed, args.preset.as_deref());
    config.validate()?;

    match &args.output {
        Some(path) => {
            config.save(path)?;
            println!(
                "Wrote {} modulation connection(s) to {}",
                config.modulation.len(),
                path.display()
            );
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_config() {
        let a = randomized_config(RandomDensity::Dense, 5, None);
        let b = randomized_config(RandomDensity::Dense, 5, None);
        assert_eq!(a, b);
        let (lo, hi) = RandomDensity::Dense.count_range();
        assert!((lo..=hi).contains(&a.modulation.len()));
    }

    #[test]
    fn output_validates_and_parses_back() {
        let config = randomized_config(RandomDensity::Sparse, 77, Some("breathing"));
        config.validate().unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn density_parser_rejects_unknown() {
        assert_eq!(parse_density("DENSE"), Ok(RandomDensity::Dense));
        assert!(parse_density("thick").is_err());
    }
}
