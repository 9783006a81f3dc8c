//! Baseline lifecycle decisions
//!
//! [`SnapshotEngine::evaluate`] resolves one request into exactly one
//! [`SnapshotOutcome`]:
//!
//! | baseline | update | action                                   | outcome    |
//! |----------|--------|------------------------------------------|------------|
//! | missing  | no     | write candidate as baseline              | `Added`    |
//! | missing  | yes    | write candidate as baseline              | `Updated`  |
//! | present  | no     | compare, stitch review image             | `Compared` |
//! | present  | yes    | compare, overwrite only above tolerance  | `Updated`  |
//!
//! Baseline writes complete before `evaluate` returns. Nothing serialises
//! concurrent evaluations of the same identifier: parallel workers racing on
//! one baseline get last-writer-wins, so callers must keep identifiers
//! unique across workers.

use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, instrument};

use crate::comparator::{PixelComparator, RgbaComparator};
use crate::config::validate_tolerance;
use crate::error::{SnapshotError, SnapshotResult};
use crate::paths::SnapshotPaths;
use crate::stitch::ImageStitcher;
use crate::types::{Comparison, Diff, DiffDetails, SnapshotOutcome, SnapshotRequest};

pub struct SnapshotEngine<C = RgbaComparator> {
    comparator: C,
    stitcher: ImageStitcher,
}

impl Default for SnapshotEngine<RgbaComparator> {
    fn default() -> Self {
        Self::new(RgbaComparator::default())
    }
}

impl<C: PixelComparator> SnapshotEngine<C> {
    pub fn new(comparator: C) -> Self {
        Self {
            comparator,
            stitcher: ImageStitcher::new(),
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Evaluate a candidate against its baseline.
    #[instrument(
        skip(self, request),
        fields(identifier = %request.identifier, update = request.update)
    )]
    pub async fn evaluate(&self, request: &SnapshotRequest) -> SnapshotResult<SnapshotOutcome> {
        validate_tolerance(request.tolerance)?;
        let paths = SnapshotPaths::resolve(&request.snapshots_dir, &request.identifier).await?;

        if !paths.baseline_exists().await? {
            write_baseline(&paths, &request.candidate).await?;
            return Ok(if request.update {
                // first write is reported as an update when update mode is on
                SnapshotOutcome::Updated
            } else {
                SnapshotOutcome::Added
            });
        }

        let comparison = self.run_comparator(&paths.baseline, request).await?;

        if request.update {
            if comparison.mismatch_percentage <= request.tolerance {
                debug!(
                    "Baseline within tolerance ({} <= {}), leaving it untouched",
                    comparison.mismatch_percentage, request.tolerance
                );
            } else {
                write_baseline(&paths, &request.candidate).await?;
            }
            return Ok(SnapshotOutcome::Updated);
        }

        let baseline = fs::read(&paths.baseline)
            .await
            .map_err(|e| SnapshotError::io(&paths.baseline, e))?;
        let composite = self
            .stitcher
            .stitch(&baseline, &comparison.diff_image, &request.candidate)
            .await?;

        Ok(SnapshotOutcome::Compared(build_diff(
            comparison,
            paths,
            request.tolerance,
            composite,
        )))
    }

    /// [`evaluate`](Self::evaluate) bounded by a caller-chosen timeout.
    pub async fn evaluate_with_timeout(
        &self,
        request: &SnapshotRequest,
        limit: Duration,
    ) -> SnapshotResult<SnapshotOutcome> {
        tokio::time::timeout(limit, self.evaluate(request))
            .await
            .map_err(|_| SnapshotError::Timeout { limit })?
    }

    async fn run_comparator(&self, baseline: &Path, request: &SnapshotRequest) -> SnapshotResult<Comparison> {
        match self.comparator.compare(baseline, &request.candidate).await {
            Ok(comparison) => {
                debug!(
                    mismatch = comparison.mismatch_percentage,
                    same_dimensions = comparison.is_same_dimensions,
                    "Diffing complete in {:?}",
                    comparison.analysis_time
                );
                Ok(comparison)
            }
            Err(e) => {
                error!(
                    "Comparator failed to produce a diff for {}; this usually means the \
                     baseline cannot be opened or decoded: {}",
                    baseline.display(),
                    e
                );
                Err(e)
            }
        }
    }
}

fn build_diff(comparison: Comparison, paths: SnapshotPaths, tolerance: f64, composite: Vec<u8>) -> Diff {
    let details = DiffDetails {
        is_same_dimensions: comparison.is_same_dimensions,
        dimension_difference: comparison.dimension_difference,
        mismatch_percentage: comparison.mismatch_percentage,
        diff_bounds: comparison.diff_bounds,
        analysis_time: comparison.analysis_time,
        baseline_path: paths.baseline,
        diff_output_path: paths.diff_output,
        specified_tolerance: (tolerance != 0.0).then_some(tolerance),
    };
    Diff {
        details,
        raw_diff_image: comparison.diff_image,
        composite_image: Some(composite),
    }
}

async fn write_baseline(paths: &SnapshotPaths, candidate: &[u8]) -> SnapshotResult<()> {
    let dir = paths.snapshots_dir();
    fs::create_dir_all(dir)
        .await
        .map_err(|e| SnapshotError::io(dir, e))?;
    fs::write(&paths.baseline, candidate)
        .await
        .map_err(|e| SnapshotError::io(&paths.baseline, e))?;
    info!("Wrote baseline {} ({} bytes)", paths.baseline.display(), candidate.len());
    Ok(())
}
