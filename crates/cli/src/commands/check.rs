//! Check Command

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use shotdiff_engine::{
    assess, RgbaComparator, SnapshotConfig, SnapshotEngine, SnapshotOutcome, SnapshotPaths, SnapshotRequest,
    Verdict,
};

use crate::output::{print_error, print_item, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Snapshot identifier (baseline file is <identifier>-snap.png)
    #[arg(short, long)]
    pub identifier: String,

    /// Newly captured PNG to evaluate
    #[arg(short, long)]
    pub candidate: PathBuf,

    /// Snapshots directory (overrides config)
    #[arg(long)]
    pub snapshots_dir: Option<PathBuf>,

    /// Overwrite the baseline instead of comparing
    #[arg(short, long)]
    pub update: bool,

    /// Allowed mismatch percentage (overrides config)
    #[arg(short, long)]
    pub tolerance: Option<f64>,

    /// Abort evaluation after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Serialize)]
pub struct CheckDisplay {
    pub identifier: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub baseline: String,
}

impl TableDisplay for CheckDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Identifier", "Result", "Mismatch %", "Baseline", "Diff"]
    }

    fn row(&self) -> Vec<String> {
        let (result, mismatch, diff) = match &self.verdict {
            Verdict::Added => ("added", String::new(), String::new()),
            Verdict::Updated => ("updated", String::new(), String::new()),
            Verdict::Matched { mismatch_percentage } => {
                ("matched", format!("{:.2}", mismatch_percentage), String::new())
            }
            Verdict::Failed {
                mismatch_percentage,
                diff_output_path,
                ..
            } => (
                "failed",
                format!("{:.2}", mismatch_percentage),
                diff_output_path.display().to_string(),
            ),
        };
        vec![
            self.identifier.clone(),
            result.to_string(),
            mismatch,
            self.baseline.clone(),
            diff,
        ]
    }
}

/// Returns whether the snapshot passed
pub async fn execute(args: CheckArgs, config: &SnapshotConfig, format: OutputFormat) -> Result<bool> {
    let candidate = tokio::fs::read(&args.candidate)
        .await
        .with_context(|| format!("Failed to read candidate {}", args.candidate.display()))?;

    let tolerance = args.tolerance.unwrap_or(config.tolerance);
    let request = SnapshotRequest::new(
        candidate,
        args.identifier.clone(),
        args.snapshots_dir.unwrap_or_else(|| config.snapshots_dir.clone()),
    )
    .with_update(args.update || config.update)
    .with_tolerance(tolerance);

    debug!(
        identifier = %request.identifier,
        update = request.update,
        tolerance,
        "Checking candidate {}",
        args.candidate.display()
    );
    let engine = SnapshotEngine::new(RgbaComparator::new(config.comparator.clone()));
    let outcome = match args.timeout_secs {
        Some(secs) => engine.evaluate_with_timeout(&request, Duration::from_secs(secs)).await?,
        None => engine.evaluate(&request).await?,
    };

    let verdict = assess(&outcome, tolerance);
    if let (Verdict::Failed { mismatch_percentage, diff_output_path, .. }, SnapshotOutcome::Compared(diff)) =
        (&verdict, &outcome)
    {
        tokio::fs::write(diff_output_path, diff.review_image())
            .await
            .with_context(|| format!("Failed to write diff to {}", diff_output_path.display()))?;
        warn!("Snapshot {} failed, review image at {}", args.identifier, diff_output_path.display());
        print_error(&format!(
            "Expected image to match or be a close match to snapshot. \
             mismatch percentage {} > {}. See diff for details: {}",
            mismatch_percentage,
            tolerance,
            diff_output_path.display()
        ));
    }

    let passed = verdict.passed();
    let baseline = SnapshotPaths::new(&request.snapshots_dir, &request.identifier)
        .baseline
        .display()
        .to_string();
    print_item(
        &CheckDisplay {
            identifier: args.identifier,
            verdict,
            baseline,
        },
        format,
    );

    Ok(passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn write_png(path: &std::path::Path, red_patch: bool) {
        let mut img = RgbaImage::from_pixel(40, 20, Rgba([255, 255, 255, 255]));
        if red_patch {
            for y in 0..10 {
                for x in 0..10 {
                    img.put_pixel(x, y, Rgba([255, 0, 0, 255]));
                }
            }
        }
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageOutputFormat::Png).unwrap();
        std::fs::write(path, out.into_inner()).unwrap();
    }

    fn args(candidate: PathBuf, snapshots_dir: PathBuf) -> CheckArgs {
        CheckArgs {
            identifier: "button-hover".to_string(),
            candidate,
            snapshots_dir: Some(snapshots_dir),
            update: false,
            tolerance: None,
            timeout_secs: Some(30),
        }
    }

    #[tokio::test]
    async fn test_execute_adds_then_fails_with_diff_written() {
        let tmp = TempDir::new().unwrap();
        let snaps = tmp.path().join("snaps");
        let candidate = tmp.path().join("candidate.png");
        let config = SnapshotConfig::default();

        write_png(&candidate, false);
        let passed = execute(args(candidate.clone(), snaps.clone()), &config, OutputFormat::Json)
            .await
            .unwrap();
        assert!(passed);
        assert!(snaps.join("button-hover-snap.png").exists());

        write_png(&candidate, true);
        let passed = execute(args(candidate, snaps.clone()), &config, OutputFormat::Json)
            .await
            .unwrap();
        assert!(!passed);

        let diff = image::open(snaps.join("__diff_output__/button-hover-diff.png")).unwrap();
        assert_eq!((diff.width(), diff.height()), (40, 60));
    }

    #[test]
    fn test_failed_row_shows_diff_path() {
        let display = CheckDisplay {
            identifier: "button-hover".to_string(),
            verdict: Verdict::Failed {
                mismatch_percentage: 0.25,
                tolerance: 0.1,
                diff_output_path: PathBuf::from("s/__diff_output__/button-hover-diff.png"),
            },
            baseline: "s/button-hover-snap.png".to_string(),
        };
        assert_eq!(
            display.row(),
            vec![
                "button-hover",
                "failed",
                "0.25",
                "s/button-hover-snap.png",
                "s/__diff_output__/button-hover-diff.png"
            ]
        );
    }

    #[test]
    fn test_json_carries_verdict_tag() {
        let display = CheckDisplay {
            identifier: "foo".to_string(),
            verdict: Verdict::Added,
            baseline: "s/foo-snap.png".to_string(),
        };
        let json = serde_json::to_value(&display).unwrap();
        assert_eq!(json["verdict"], "added");
        assert_eq!(json["identifier"], "foo");
    }
}
