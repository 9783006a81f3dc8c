//! Config Commands

use anyhow::Result;
use clap::Subcommand;
use std::path::Path;

use shotdiff_engine::SnapshotConfig;

use crate::output::{print_success, OutputFormat};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn execute(cmd: ConfigCommands, config: &SnapshotConfig, path: &Path, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Show => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            OutputFormat::Yaml => println!("{}", serde_yaml::to_string(config)?),
            OutputFormat::Table | OutputFormat::Plain => {
                println!("snapshots_dir: {}", config.snapshots_dir.display());
                println!("update: {}", config.update);
                println!("tolerance: {}", config.tolerance);
                println!("comparator.channel_tolerance: {}", config.comparator.channel_tolerance);
                println!("comparator.error_color: {:?}", config.comparator.error_color);
                println!(
                    "comparator.large_image_threshold: {}",
                    config
                        .comparator
                        .large_image_threshold
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "off".to_string())
                );
            }
        },

        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            SnapshotConfig::default().save(path)?;
            print_success(&format!("Wrote default configuration to {}", path.display()));
        }
    }

    Ok(())
}
