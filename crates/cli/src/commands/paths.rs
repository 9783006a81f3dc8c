//! Paths Command

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use shotdiff_engine::{SnapshotConfig, SnapshotPaths};

use crate::output::{print_item, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct PathsArgs {
    /// Snapshot identifier
    #[arg(short, long)]
    pub identifier: String,

    /// Snapshots directory (overrides config)
    #[arg(long)]
    pub snapshots_dir: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct PathsDisplay {
    pub identifier: String,
    pub baseline: PathBuf,
    pub diff_output: PathBuf,
    pub baseline_exists: bool,
}

impl TableDisplay for PathsDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Identifier", "Baseline", "Diff Output", "Exists"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.identifier.clone(),
            self.baseline.display().to_string(),
            self.diff_output.display().to_string(),
            if self.baseline_exists { "yes" } else { "no" }.to_string(),
        ]
    }
}

pub fn execute(args: PathsArgs, config: &SnapshotConfig, format: OutputFormat) {
    let dir = args.snapshots_dir.unwrap_or_else(|| config.snapshots_dir.clone());
    let paths = SnapshotPaths::new(&dir, &args.identifier);
    let baseline_exists = paths.baseline.exists();

    print_item(
        &PathsDisplay {
            identifier: args.identifier,
            baseline: paths.baseline,
            diff_output: paths.diff_output,
            baseline_exists,
        },
        format,
    );
}
