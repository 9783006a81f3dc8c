//! Error types for snapshot evaluation

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Pixel comparator failed: {0}")]
    Comparator(String),

    #[error("Failed to decode {image} image: {source}")]
    ImageDecode {
        image: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image: {0}")]
    ImageEncode(#[source] image::ImageError),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot evaluation timed out after {limit:?}")]
    Timeout { limit: std::time::Duration },

    #[error(
        "Expected image to match or be a close match to snapshot.\n\
         mismatch percentage {mismatch_percentage} > {tolerance}\n\
         See diff for details: {}",
        .diff_output_path.display()
    )]
    Mismatch {
        identifier: String,
        mismatch_percentage: f64,
        tolerance: f64,
        diff_output_path: PathBuf,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
