//! Snapshot configuration
//!
//! The engine never reads configuration on its own; callers load a
//! [`SnapshotConfig`] and pass its values into each request.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SnapshotError, SnapshotResult};

/// Environment switch enabling update mode
pub const UPDATE_ENV: &str = "SHOTDIFF_UPDATE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory holding baselines
    pub snapshots_dir: PathBuf,

    /// Overwrite baselines instead of comparing
    pub update: bool,

    /// Allowed mismatch percentage (0 - 100)
    pub tolerance: f64,

    /// Settings for the bundled comparator
    pub comparator: ComparatorConfig,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshots_dir: PathBuf::from("__image_snapshots__"),
            update: false,
            tolerance: 0.0,
            comparator: ComparatorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Largest per-channel difference still treated as equal
    pub channel_tolerance: u8,

    /// RGB colour blended into mismatched pixels of the diff image
    pub error_color: [u8; 3],

    /// Sample instead of scanning every pixel above this width or height
    pub large_image_threshold: Option<u32>,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            channel_tolerance: 16,
            error_color: [255, 0, 255],
            large_image_threshold: Some(600),
        }
    }
}

impl SnapshotConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> SnapshotResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> SnapshotResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SnapshotError::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| SnapshotError::io(path, e))
    }

    pub fn validate(&self) -> SnapshotResult<()> {
        validate_tolerance(self.tolerance)
    }

    /// Turn on update mode when [`UPDATE_ENV`] asks for it
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(UPDATE_ENV) {
            self.update = update_requested(&value);
        }
    }
}

fn update_requested(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "all")
}

/// Tolerance is a percentage; NaN and infinities fall outside the range.
pub(crate) fn validate_tolerance(tolerance: f64) -> SnapshotResult<()> {
    if !(0.0..=100.0).contains(&tolerance) {
        return Err(SnapshotError::InvalidConfig(format!(
            "tolerance must be between 0 and 100, got {}",
            tolerance
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = SnapshotConfig::default();
        assert_eq!(config.tolerance, 0.0);
        assert!(!config.update);
        assert_eq!(config.comparator.error_color, [255, 0, 255]);
        assert_eq!(config.comparator.large_image_threshold, Some(600));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = SnapshotConfig::load(&tmp.path().join("shotdiff.toml")).unwrap();
        assert_eq!(config.snapshots_dir, PathBuf::from("__image_snapshots__"));
    }

    #[test]
    fn test_save_then_load_partial_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/shotdiff.toml");
        SnapshotConfig {
            tolerance: 0.5,
            ..Default::default()
        }
        .save(&path)
        .unwrap();
        assert_eq!(SnapshotConfig::load(&path).unwrap().tolerance, 0.5);

        std::fs::write(&path, "update = true\n[comparator]\nchannel_tolerance = 4\n").unwrap();
        let config = SnapshotConfig::load(&path).unwrap();
        assert!(config.update);
        assert_eq!(config.comparator.channel_tolerance, 4);
        assert_eq!(config.comparator.error_color, [255, 0, 255]);
    }

    #[test]
    fn test_out_of_range_tolerance_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("shotdiff.toml");
        std::fs::write(&path, "tolerance = 120.0\n").unwrap();
        assert!(matches!(
            SnapshotConfig::load(&path),
            Err(SnapshotError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_non_finite_tolerance_rejected() {
        for tolerance in [f64::NAN, f64::INFINITY, -0.5] {
            let config = SnapshotConfig {
                tolerance,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(SnapshotError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_update_env_values() {
        assert!(update_requested("all"));
        assert!(update_requested(" TRUE "));
        assert!(update_requested("1"));
        assert!(!update_requested("none"));
        assert!(!update_requested(""));
    }
}
