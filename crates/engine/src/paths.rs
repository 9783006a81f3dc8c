//! Baseline and diff-output path resolution
//!
//! Layout on disk, kept stable for existing snapshot stores:
//!
//! ```text
//! <snapshots_dir>/<identifier>-snap.png
//! <snapshots_dir>/__diff_output__/<identifier>-diff.png
//! ```

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{SnapshotError, SnapshotResult};

pub const DIFF_OUTPUT_DIR: &str = "__diff_output__";
pub const BASELINE_SUFFIX: &str = "-snap.png";
pub const DIFF_SUFFIX: &str = "-diff.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub baseline: PathBuf,
    pub diff_output: PathBuf,
}

impl SnapshotPaths {
    /// Pure path derivation, touches nothing on disk
    pub fn new(snapshots_dir: impl AsRef<Path>, identifier: &str) -> Self {
        let dir = snapshots_dir.as_ref();
        Self {
            baseline: dir.join(format!("{}{}", identifier, BASELINE_SUFFIX)),
            diff_output: dir
                .join(DIFF_OUTPUT_DIR)
                .join(format!("{}{}", identifier, DIFF_SUFFIX)),
        }
    }

    /// Derive the paths and make sure the diff-output directory exists.
    pub async fn resolve(snapshots_dir: impl AsRef<Path>, identifier: &str) -> SnapshotResult<Self> {
        let paths = Self::new(snapshots_dir, identifier);
        let output_dir = paths.diff_output_dir();
        fs::create_dir_all(output_dir)
            .await
            .map_err(|e| SnapshotError::io(output_dir, e))?;

        debug!(
            baseline = %paths.baseline.display(),
            diff_output = %paths.diff_output.display(),
            "Resolved snapshot paths"
        );
        Ok(paths)
    }

    pub fn diff_output_dir(&self) -> &Path {
        self.diff_output.parent().unwrap_or_else(|| Path::new(DIFF_OUTPUT_DIR))
    }

    /// Directory holding the baseline
    pub fn snapshots_dir(&self) -> &Path {
        self.baseline.parent().unwrap_or_else(|| Path::new("."))
    }

    pub async fn baseline_exists(&self) -> SnapshotResult<bool> {
        fs::try_exists(&self.baseline)
            .await
            .map_err(|e| SnapshotError::io(&self.baseline, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_layout() {
        let paths = SnapshotPaths::new("tests/__image_snapshots__", "foo");
        assert_eq!(
            paths.baseline,
            PathBuf::from("tests/__image_snapshots__/foo-snap.png")
        );
        assert_eq!(
            paths.diff_output,
            PathBuf::from("tests/__image_snapshots__/__diff_output__/foo-diff.png")
        );
        assert_eq!(paths.snapshots_dir(), Path::new("tests/__image_snapshots__"));
    }

    #[tokio::test]
    async fn test_resolve_creates_diff_dir_idempotently() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("snaps");

        let first = SnapshotPaths::resolve(&dir, "button-hover").await.unwrap();
        assert!(dir.join(DIFF_OUTPUT_DIR).is_dir());

        let second = SnapshotPaths::resolve(&dir, "button-hover").await.unwrap();
        assert_eq!(first, second);
        assert!(!second.baseline_exists().await.unwrap());
    }
}
