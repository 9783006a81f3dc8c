//! Caller-side pass/fail policy
//!
//! The engine reports quantitative comparison data and leaves the verdict to
//! the caller. [`assess`] is that verdict as a pure function;
//! [`ImageSnapshotMatcher`] wraps it with identifier numbering, tallies and
//! writing the review image when an assertion fails.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::comparator::PixelComparator;
use crate::error::{SnapshotError, SnapshotResult};
use crate::lifecycle::SnapshotEngine;
use crate::types::{SnapshotOutcome, SnapshotRequest};

pub const SNAPSHOTS_DIR_NAME: &str = "__image_snapshots__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Added,
    Updated,
    Matched {
        mismatch_percentage: f64,
    },
    Failed {
        mismatch_percentage: f64,
        tolerance: f64,
        diff_output_path: PathBuf,
    },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        !matches!(self, Verdict::Failed { .. })
    }
}

/// Map an outcome to pass/fail against the caller's tolerance.
pub fn assess(outcome: &SnapshotOutcome, tolerance: f64) -> Verdict {
    match outcome {
        SnapshotOutcome::Added => Verdict::Added,
        SnapshotOutcome::Updated => Verdict::Updated,
        SnapshotOutcome::Compared(diff) => {
            let mismatch_percentage = diff.details.mismatch_percentage;
            if mismatch_percentage > tolerance {
                Verdict::Failed {
                    mismatch_percentage,
                    tolerance,
                    diff_output_path: diff.details.diff_output_path.clone(),
                }
            } else {
                Verdict::Matched { mismatch_percentage }
            }
        }
    }
}

/// Per-call options for [`ImageSnapshotMatcher::match_image`]
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Use this identifier instead of deriving one from the test
    pub custom_identifier: Option<String>,

    /// Allowed mismatch percentage
    pub tolerance: f64,

    pub test_path: PathBuf,
    pub test_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchTally {
    pub added: usize,
    pub updated: usize,
    pub matched: usize,
    pub failed: usize,
}

/// Run state for a set of image assertions.
pub struct ImageSnapshotMatcher<C: PixelComparator> {
    engine: SnapshotEngine<C>,
    update: bool,
    counters: HashMap<String, u32>,
    tally: MatchTally,
}

impl<C: PixelComparator> ImageSnapshotMatcher<C> {
    pub fn new(engine: SnapshotEngine<C>, update: bool) -> Self {
        Self {
            engine,
            update,
            counters: HashMap::new(),
            tally: MatchTally::default(),
        }
    }

    pub fn tally(&self) -> MatchTally {
        self.tally
    }

    /// Next identifier for an assertion in `test_name`, numbered per test from 1.
    pub fn snapshot_identifier(&mut self, test_path: &Path, test_name: &str) -> String {
        let counter = self.counters.entry(test_name.to_string()).or_insert(0);
        *counter += 1;

        let file = test_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        dashify(&format!("{}-{}-{}", file, test_name, counter)).replacen('_', "-", 1)
    }

    /// `<dir of test file>/__image_snapshots__`
    pub fn snapshots_dir_for(test_path: &Path) -> PathBuf {
        test_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(SNAPSHOTS_DIR_NAME)
    }

    /// Evaluate `candidate` and turn a failed verdict into an error.
    ///
    /// On failure the review image is written to the diff-output path before
    /// [`SnapshotError::Mismatch`] is returned.
    pub async fn match_image(&mut self, candidate: Vec<u8>, options: &MatchOptions) -> SnapshotResult<Verdict> {
        let identifier = match &options.custom_identifier {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self.snapshot_identifier(&options.test_path, &options.test_name),
        };
        let snapshots_dir = Self::snapshots_dir_for(&options.test_path);

        let request = SnapshotRequest::new(candidate, identifier.clone(), snapshots_dir)
            .with_update(self.update)
            .with_tolerance(options.tolerance);
        let outcome = self.engine.evaluate(&request).await?;
        let verdict = assess(&outcome, options.tolerance);

        match &verdict {
            Verdict::Added => self.tally.added += 1,
            Verdict::Updated => self.tally.updated += 1,
            Verdict::Matched { .. } => self.tally.matched += 1,
            Verdict::Failed {
                mismatch_percentage,
                tolerance,
                diff_output_path,
            } => {
                self.tally.failed += 1;
                if let Some(diff) = outcome.diff() {
                    fs::write(diff_output_path, diff.review_image())
                        .await
                        .map_err(|e| SnapshotError::io(diff_output_path, e))?;
                    info!("Wrote review image to {}", diff_output_path.display());
                }
                warn!(
                    "Snapshot '{}' differs by {}% (tolerance {}%)",
                    identifier, mismatch_percentage, tolerance
                );
                return Err(SnapshotError::Mismatch {
                    identifier,
                    mismatch_percentage: *mismatch_percentage,
                    tolerance: *tolerance,
                    diff_output_path: diff_output_path.clone(),
                });
            }
        }

        Ok(verdict)
    }
}

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid regex"));
static EDGE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-+|-+$").expect("valid regex"));

/// Kebab-case a test description for use in file names.
///
/// Runs of dashes are kept as they are, and underscores are word characters
/// and survive.
pub fn dashify(input: &str) -> String {
    let spaced = CAMEL_BOUNDARY.replace_all(input.trim(), "$1-$2");
    let replaced: String = spaced
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || ('\u{C0}'..='\u{17E}').contains(&c) {
                c
            } else {
                '-'
            }
        })
        .collect();
    EDGE_DASHES.replace_all(&replaced, "").to_lowercase()
}
