//! Review-image stitching
//!
//! Baseline, candidate and diff are laid out side by side in that order.
//! When the widest image is wider than every image is tall the three are
//! stacked vertically, otherwise they are placed in a row. Images keep their
//! natural size and are anchored at the top-left corner of their slot.

use image::{imageops, ImageOutputFormat, RgbaImage};
use serde::Serialize;
use std::io::Cursor;
use tracing::{debug, trace};

use crate::error::{SnapshotError, SnapshotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Canvas size and slot offsets for a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchLayout {
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
    pub baseline_offset: (u32, u32),
    pub candidate_offset: (u32, u32),
    pub diff_offset: (u32, u32),
}

impl StitchLayout {
    /// Dimensions are `(width, height)`.
    pub fn compute(baseline: (u32, u32), candidate: (u32, u32), diff: (u32, u32)) -> Self {
        let dims = [baseline, candidate, diff];
        let max_width = dims.iter().map(|d| d.0).max().unwrap_or(0);

        if dims.iter().all(|d| max_width > d.1) {
            StitchLayout {
                orientation: Orientation::Vertical,
                width: max_width,
                height: baseline.1 + candidate.1 + diff.1,
                baseline_offset: (0, 0),
                candidate_offset: (0, baseline.1),
                diff_offset: (0, baseline.1 + candidate.1),
            }
        } else {
            StitchLayout {
                orientation: Orientation::Horizontal,
                width: baseline.0 + candidate.0 + diff.0,
                height: dims.iter().map(|d| d.1).max().unwrap_or(0),
                baseline_offset: (0, 0),
                candidate_offset: (baseline.0, 0),
                diff_offset: (baseline.0 + candidate.0, 0),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageStitcher;

impl ImageStitcher {
    pub fn new() -> Self {
        Self
    }

    /// Build the PNG composite from encoded baseline, diff and candidate images.
    pub async fn stitch(&self, baseline: &[u8], diff: &[u8], candidate: &[u8]) -> SnapshotResult<Vec<u8>> {
        // decoded one after another: baseline, diff, candidate
        let baseline = decode("baseline", baseline).await?;
        let diff = decode("diff", diff).await?;
        let candidate = decode("candidate", candidate).await?;

        tokio::task::spawn_blocking(move || {
            let composite = compose(&baseline, &candidate, &diff);
            encode_png(&composite)
        })
        .await?
    }
}

/// Decode one encoded image into an owned RGBA buffer.
pub async fn decode(label: &'static str, bytes: &[u8]) -> SnapshotResult<RgbaImage> {
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map(|img| img.to_rgba8())
            .map_err(|source| SnapshotError::ImageDecode { image: label, source })
    })
    .await?
}

/// Draw the three images onto one canvas following [`StitchLayout`].
pub fn compose(baseline: &RgbaImage, candidate: &RgbaImage, diff: &RgbaImage) -> RgbaImage {
    let layout = StitchLayout::compute(
        baseline.dimensions(),
        candidate.dimensions(),
        diff.dimensions(),
    );
    debug!(
        orientation = ?layout.orientation,
        "Stitching composite {}x{}", layout.width, layout.height
    );

    let mut canvas = RgbaImage::new(layout.width, layout.height);
    for (img, (x, y)) in [
        (baseline, layout.baseline_offset),
        (candidate, layout.candidate_offset),
        (diff, layout.diff_offset),
    ] {
        imageops::overlay(&mut canvas, img, x as i64, y as i64);
    }
    canvas
}

fn encode_png(img: &RgbaImage) -> SnapshotResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png)
        .map_err(SnapshotError::ImageEncode)?;
    let out = out.into_inner();
    trace!("Encoded composite, {} bytes", out.len());
    Ok(out)
}
