//! Shotdiff CLI - Main Entry Point
//!
//! Evaluates captured images against stored baselines, resolves snapshot
//! paths and stitches review images from the command line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{check, config, paths, stitch};
use shotdiff_engine::SnapshotConfig;

/// Shotdiff - visual regression snapshots
#[derive(Parser)]
#[command(name = "shotdiff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "shotdiff.toml", global = true, env = "SHOTDIFF_CONFIG")]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a candidate image against its baseline
    Check(check::CheckArgs),

    /// Show baseline and diff-output paths for an identifier
    Paths(paths::PathsArgs),

    /// Stitch baseline, candidate and diff into one review image
    Stitch(stitch::StitchArgs),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut snapshot_config = SnapshotConfig::load(&cli.config)?;
    snapshot_config.apply_env();
    snapshot_config.validate()?;

    match cli.command {
        Commands::Check(args) => {
            if !check::execute(args, &snapshot_config, cli.format).await? {
                std::process::exit(1);
            }
        }
        Commands::Paths(args) => paths::execute(args, &snapshot_config, cli.format),
        Commands::Stitch(args) => stitch::execute(args).await?,
        Commands::Config(cmd) => config::execute(cmd, &snapshot_config, &cli.config, cli.format)?,
    }

    Ok(())
}
