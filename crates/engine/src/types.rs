//! Request, comparison and outcome types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Input to a single snapshot evaluation.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    /// Encoded (PNG) bytes of the newly captured image
    pub candidate: Vec<u8>,

    /// Unique per logical assertion, used to name the baseline file
    pub identifier: String,

    /// Directory holding `<identifier>-snap.png` baselines
    pub snapshots_dir: PathBuf,

    /// Permit overwriting the baseline instead of only comparing
    pub update: bool,

    /// Maximum acceptable mismatch percentage (0 - 100)
    pub tolerance: f64,
}

impl SnapshotRequest {
    pub fn new(
        candidate: Vec<u8>,
        identifier: impl Into<String>,
        snapshots_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            candidate,
            identifier: identifier.into(),
            snapshots_dir: snapshots_dir.into(),
            update: false,
            tolerance: 0.0,
        }
    }

    pub fn with_update(mut self, update: bool) -> Self {
        self.update = update;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Per-axis dimension delta, baseline minus candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionDifference {
    pub width: i64,
    pub height: i64,
}

/// Bounding box of differing pixels.
///
/// With no mismatch the box stays degenerate: `top`/`left` at the canvas
/// height/width and `bottom`/`right` at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffBounds {
    pub top: u32,
    pub left: u32,
    pub bottom: u32,
    pub right: u32,
}

impl DiffBounds {
    pub fn is_empty(&self) -> bool {
        self.top > self.bottom || self.left > self.right
    }
}

/// What a [`PixelComparator`](crate::comparator::PixelComparator) reports.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub is_same_dimensions: bool,
    pub dimension_difference: DimensionDifference,
    pub mismatch_percentage: f64,
    pub diff_bounds: DiffBounds,
    pub analysis_time: Duration,

    /// PNG-encoded diff image
    pub diff_image: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffDetails {
    pub is_same_dimensions: bool,
    pub dimension_difference: DimensionDifference,
    pub mismatch_percentage: f64,
    pub diff_bounds: DiffBounds,
    #[serde(rename = "analysis_time_ms", with = "duration_ms")]
    pub analysis_time: Duration,
    pub baseline_path: PathBuf,
    pub diff_output_path: PathBuf,

    /// Caller tolerance recorded for reporting; never consulted by the comparator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specified_tolerance: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Diff {
    pub details: DiffDetails,

    /// PNG diff image exactly as the comparator produced it
    pub raw_diff_image: Vec<u8>,

    /// Stitched baseline / candidate / diff review image. `None` when no
    /// stitching was performed.
    pub composite_image: Option<Vec<u8>>,
}

impl Diff {
    /// The image a reviewer should look at: the composite when present,
    /// otherwise the raw diff.
    pub fn review_image(&self) -> &[u8] {
        self.composite_image.as_deref().unwrap_or(&self.raw_diff_image)
    }
}

/// Result of [`SnapshotEngine::evaluate`](crate::lifecycle::SnapshotEngine::evaluate).
#[derive(Debug, Clone)]
pub enum SnapshotOutcome {
    /// No baseline existed; the candidate was written as the new baseline
    Added,

    /// Update mode; the baseline was written, overwritten or confirmed
    Updated,

    /// Baseline and candidate compared without update mode
    Compared(Diff),
}

impl SnapshotOutcome {
    pub fn diff(&self) -> Option<&Diff> {
        match self {
            SnapshotOutcome::Compared(diff) => Some(diff),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SnapshotOutcome::Added => "added",
            SnapshotOutcome::Updated => "updated",
            SnapshotOutcome::Compared(_) => "compared",
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> DiffDetails {
        DiffDetails {
            is_same_dimensions: true,
            dimension_difference: DimensionDifference::default(),
            mismatch_percentage: 0.25,
            diff_bounds: DiffBounds { top: 10, left: 20, bottom: 14, right: 29 },
            analysis_time: Duration::from_millis(42),
            baseline_path: PathBuf::from("snaps/a-snap.png"),
            diff_output_path: PathBuf::from("snaps/__diff_output__/a-diff.png"),
            specified_tolerance: None,
        }
    }

    #[test]
    fn test_details_serialize_analysis_time_as_millis() {
        let json = serde_json::to_value(details()).unwrap();
        assert_eq!(json["analysis_time_ms"], 42);
        assert!(json.get("specified_tolerance").is_none());

        let back: DiffDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details());
    }

    #[test]
    fn test_review_image_prefers_composite() {
        let mut diff = Diff {
            details: details(),
            raw_diff_image: vec![1, 2, 3],
            composite_image: None,
        };
        assert_eq!(diff.review_image(), &[1, 2, 3]);

        diff.composite_image = Some(vec![9]);
        assert_eq!(diff.review_image(), &[9]);
    }

    #[test]
    fn test_degenerate_bounds_are_empty() {
        let bounds = DiffBounds { top: 100, left: 200, bottom: 0, right: 0 };
        assert!(bounds.is_empty());
        assert!(!details().diff_bounds.is_empty());
    }

    #[test]
    fn test_only_compared_carries_diff() {
        assert!(SnapshotOutcome::Added.diff().is_none());
        assert!(SnapshotOutcome::Updated.diff().is_none());
        assert_eq!(SnapshotOutcome::Updated.label(), "updated");
    }
}
