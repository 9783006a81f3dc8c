//! Pixel comparison
//!
//! The engine consumes comparison through the [`PixelComparator`] trait and
//! treats each call as a single-shot operation: it is awaited once and never
//! retried. [`RgbaComparator`] is the bundled implementation.

use async_trait::async_trait;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::{debug, trace};

use crate::config::ComparatorConfig;
use crate::error::{SnapshotError, SnapshotResult};
use crate::types::{Comparison, DiffBounds, DimensionDifference};

/// Row/column stride skipped when sampling large images
const LARGE_IMAGE_SKIP: u32 = 6;

#[async_trait]
pub trait PixelComparator: Send + Sync {
    /// Compare the baseline stored at `baseline_path` with encoded candidate bytes.
    async fn compare(&self, baseline_path: &Path, candidate: &[u8]) -> SnapshotResult<Comparison>;
}

/// Per-channel RGBA comparator producing a "movement" style diff image.
#[derive(Debug, Clone, Default)]
pub struct RgbaComparator {
    config: ComparatorConfig,
}

impl RgbaComparator {
    pub fn new(config: ComparatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparatorConfig {
        &self.config
    }
}

#[async_trait]
impl PixelComparator for RgbaComparator {
    async fn compare(&self, baseline_path: &Path, candidate: &[u8]) -> SnapshotResult<Comparison> {
        let baseline = fs::read(baseline_path)
            .await
            .map_err(|e| SnapshotError::Comparator(format!(
                "cannot open {}: {}", baseline_path.display(), e
            )))?;
        let candidate = candidate.to_vec();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || compare_encoded(&baseline, &candidate, &config)).await?
    }
}

fn compare_encoded(baseline: &[u8], candidate: &[u8], config: &ComparatorConfig) -> SnapshotResult<Comparison> {
    let baseline = image::load_from_memory(baseline)
        .map_err(|e| SnapshotError::Comparator(format!("cannot decode baseline: {}", e)))?
        .to_rgba8();
    let candidate = image::load_from_memory(candidate)
        .map_err(|e| SnapshotError::Comparator(format!("cannot decode candidate: {}", e)))?
        .to_rgba8();

    let (diff, mut comparison) = compare_pixels(&baseline, &candidate, config);

    let mut encoded = Cursor::new(Vec::new());
    diff.write_to(&mut encoded, ImageOutputFormat::Png)
        .map_err(SnapshotError::ImageEncode)?;
    comparison.diff_image = encoded.into_inner();
    trace!("Encoded diff image, {} bytes", comparison.diff_image.len());

    Ok(comparison)
}

/// Pixel pass over the union canvas of both images. The returned
/// [`Comparison`] has an empty `diff_image`; the caller encodes the image.
pub fn compare_pixels(
    baseline: &RgbaImage,
    candidate: &RgbaImage,
    config: &ComparatorConfig,
) -> (RgbaImage, Comparison) {
    let start = Instant::now();

    let width = baseline.width().max(candidate.width());
    let height = baseline.height().max(candidate.height());
    let sampled = config
        .large_image_threshold
        .map(|t| width > t || height > t)
        .unwrap_or(false);

    let mut diff = RgbaImage::new(width, height);
    let mut bounds = DiffBounds {
        top: height,
        left: width,
        bottom: 0,
        right: 0,
    };
    let mut mismatched = 0u64;

    for y in 0..height {
        for x in 0..width {
            if sampled && (y % LARGE_IMAGE_SKIP == 0 || x % LARGE_IMAGE_SKIP == 0) {
                // not counted, but still drawn
                if let Some(px) = pixel_at(baseline, x, y).or_else(|| pixel_at(candidate, x, y)) {
                    diff.put_pixel(x, y, *px);
                }
                continue;
            }

            let a = pixel_at(baseline, x, y);
            let b = pixel_at(candidate, x, y);

            let src = match (a, b) {
                (Some(a), Some(b)) if channels_similar(a, b, config.channel_tolerance) => {
                    diff.put_pixel(x, y, *a);
                    continue;
                }
                (_, Some(src)) | (Some(src), None) => *src,
                // inside the canvas but covered by neither image
                (None, None) => Rgba([0, 0, 0, 0]),
            };

            mismatched += 1;
            bounds.top = bounds.top.min(y);
            bounds.left = bounds.left.min(x);
            bounds.bottom = bounds.bottom.max(y);
            bounds.right = bounds.right.max(x);
            diff.put_pixel(x, y, movement_pixel(&src, config.error_color));
        }
    }

    let total = width as u64 * height as u64;
    let mismatch_percentage = if total == 0 {
        0.0
    } else {
        mismatched as f64 / total as f64 * 100.0
    };

    let dimension_difference = DimensionDifference {
        width: baseline.width() as i64 - candidate.width() as i64,
        height: baseline.height() as i64 - candidate.height() as i64,
    };

    debug!(
        mismatched,
        total,
        sampled,
        "Compared {}x{} canvas: {:.4}% mismatch",
        width, height, mismatch_percentage
    );

    let comparison = Comparison {
        is_same_dimensions: dimension_difference == DimensionDifference::default(),
        dimension_difference,
        mismatch_percentage,
        diff_bounds: bounds,
        analysis_time: start.elapsed(),
        diff_image: Vec::new(),
    };
    (diff, comparison)
}

fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Option<&Rgba<u8>> {
    if x < img.width() && y < img.height() {
        Some(img.get_pixel(x, y))
    } else {
        None
    }
}

fn channels_similar(a: &Rgba<u8>, b: &Rgba<u8>, tolerance: u8) -> bool {
    a.0.iter()
        .zip(b.0.iter())
        .all(|(&ca, &cb)| ca.abs_diff(cb) <= tolerance)
}

/// Blend the error colour with the source pixel so moved content stays
/// recognisable in the diff.
fn movement_pixel(src: &Rgba<u8>, error: [u8; 3]) -> Rgba<u8> {
    let blend = |c: u8, e: u8| -> u8 {
        let c = c as f64;
        let e = e as f64;
        ((c * (e / 255.0) + e) / 2.0).round() as u8
    };
    Rgba([
        blend(src[0], error[0]),
        blend(src[1], error[1]),
        blend(src[2], error[2]),
        255,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn test_identical_images_have_no_mismatch() {
        let img = solid(20, 10, [255, 255, 255, 255]);
        let (_, cmp) = compare_pixels(&img, &img, &ComparatorConfig::default());

        assert_eq!(cmp.mismatch_percentage, 0.0);
        assert!(cmp.is_same_dimensions);
        assert!(cmp.diff_bounds.is_empty());
        assert_eq!(cmp.diff_bounds, DiffBounds { top: 10, left: 20, bottom: 0, right: 0 });
    }

    #[test]
    fn test_patch_mismatch_and_bounds() {
        let baseline = solid(200, 100, [255, 255, 255, 255]);
        let mut candidate = baseline.clone();
        for y in 40..45 {
            for x in 60..70 {
                candidate.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }

        let (diff, cmp) = compare_pixels(&baseline, &candidate, &ComparatorConfig::default());

        assert!((cmp.mismatch_percentage - 0.25).abs() < 1e-9);
        assert_eq!(cmp.diff_bounds, DiffBounds { top: 40, left: 60, bottom: 44, right: 69 });
        // movement blend of red over magenta
        assert_eq!(diff.get_pixel(60, 40), &Rgba([255, 0, 128, 255]));
        assert_eq!(diff.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_small_differences_within_channel_tolerance() {
        let baseline = solid(4, 4, [100, 100, 100, 255]);
        let candidate = solid(4, 4, [116, 84, 100, 255]);
        let (_, cmp) = compare_pixels(&baseline, &candidate, &ComparatorConfig::default());
        assert_eq!(cmp.mismatch_percentage, 0.0);

        let strict = ComparatorConfig {
            channel_tolerance: 0,
            ..Default::default()
        };
        let (_, cmp) = compare_pixels(&baseline, &candidate, &strict);
        assert_eq!(cmp.mismatch_percentage, 100.0);
    }

    #[test]
    fn test_dimension_difference_counts_uncovered_pixels() {
        let baseline = solid(10, 10, [0, 0, 0, 255]);
        let candidate = solid(10, 5, [0, 0, 0, 255]);
        let (diff, cmp) = compare_pixels(&baseline, &candidate, &ComparatorConfig::default());

        assert!(!cmp.is_same_dimensions);
        assert_eq!(cmp.dimension_difference, DimensionDifference { width: 0, height: 5 });
        assert_eq!(cmp.mismatch_percentage, 50.0);
        assert_eq!(cmp.diff_bounds, DiffBounds { top: 5, left: 0, bottom: 9, right: 9 });
        assert_eq!(diff.dimensions(), (10, 10));
    }

    #[test]
    fn test_canvas_corner_outside_both_images_mismatches() {
        let baseline = solid(4, 2, [0, 0, 0, 255]);
        let candidate = solid(2, 4, [0, 0, 0, 255]);
        let (diff, cmp) = compare_pixels(&baseline, &candidate, &ComparatorConfig::default());

        // 4 matching pixels in the overlap, 12 mismatched on the 4 x 4 canvas
        assert_eq!(cmp.mismatch_percentage, 75.0);
        assert_eq!(cmp.dimension_difference, DimensionDifference { width: 2, height: -2 });
        assert_eq!(diff.get_pixel(3, 3), &Rgba([128, 0, 128, 255]));
    }

    #[test]
    fn test_large_images_are_sampled() {
        let baseline = solid(12, 12, [0, 0, 0, 255]);
        let candidate = solid(12, 12, [255, 255, 255, 255]);
        let config = ComparatorConfig {
            large_image_threshold: Some(10),
            ..Default::default()
        };
        let (diff, cmp) = compare_pixels(&baseline, &candidate, &config);

        // rows/columns 0 and 6 are skipped: 10 x 10 of 144 compared
        assert!((cmp.mismatch_percentage - 100.0 / 144.0 * 100.0).abs() < 1e-9);
        // skipped lines carry the baseline through instead of leaving holes
        assert_eq!(diff.get_pixel(0, 3), &Rgba([0, 0, 0, 255]));
        assert_eq!(diff.get_pixel(6, 6), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_sampled_lines_outside_baseline_show_candidate() {
        let baseline = solid(12, 6, [0, 0, 0, 255]);
        let candidate = solid(12, 12, [255, 255, 255, 255]);
        let config = ComparatorConfig {
            large_image_threshold: Some(10),
            ..Default::default()
        };
        let (diff, _) = compare_pixels(&baseline, &candidate, &config);

        assert_eq!(diff.get_pixel(0, 9), &Rgba([255, 255, 255, 255]));
        assert_eq!(diff.get_pixel(3, 6), &Rgba([255, 255, 255, 255]));
        assert!(diff.pixels().all(|px| px[3] == 255));
    }

    #[test]
    fn test_empty_canvas() {
        let empty = RgbaImage::new(0, 0);
        let (_, cmp) = compare_pixels(&empty, &empty, &ComparatorConfig::default());
        assert_eq!(cmp.mismatch_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_missing_baseline_is_comparator_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = RgbaComparator::default()
            .compare(&tmp.path().join("missing-snap.png"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Comparator(_)));
    }

    #[tokio::test]
    async fn test_undecodable_candidate_is_comparator_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a-snap.png");
        solid(2, 2, [0, 0, 0, 255]).save(&path).unwrap();

        let err = RgbaComparator::default()
            .compare(&path, b"not a png")
            .await
            .unwrap_err();
        assert!(matches!(err, SnapshotError::Comparator(msg) if msg.contains("candidate")));
    }
}
