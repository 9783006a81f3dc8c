//! Stitch Command

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use shotdiff_engine::ImageStitcher;

use crate::output::print_success;

#[derive(Args, Debug)]
pub struct StitchArgs {
    /// Baseline PNG
    #[arg(long)]
    pub baseline: PathBuf,

    /// Candidate PNG
    #[arg(long)]
    pub candidate: PathBuf,

    /// Diff PNG
    #[arg(long)]
    pub diff: PathBuf,

    /// Where to write the composite
    #[arg(short, long)]
    pub output: PathBuf,
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

pub async fn execute(args: StitchArgs) -> Result<()> {
    let baseline = read(&args.baseline).await?;
    let diff = read(&args.diff).await?;
    let candidate = read(&args.candidate).await?;

    let composite = ImageStitcher::new().stitch(&baseline, &diff, &candidate).await?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&args.output, &composite)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_success(&format!("Composite written to {}", args.output.display()));
    Ok(())
}
