//! Shotdiff snapshot engine
//!
//! Decides whether a freshly captured image matches its stored baseline and
//! manages that baseline's lifecycle:
//!
//! ```text
//! SnapshotPaths::resolve ──► baseline exists? ──no──► write baseline ──► Added / Updated
//!                                  │
//!                                 yes
//!                                  ▼
//!                        PixelComparator::compare
//!                                  │
//!                 ┌────── update ──┴── no update ──────┐
//!                 ▼                                     ▼
//!   overwrite if above tolerance        ImageStitcher::stitch ──► Compared(Diff)
//!            ──► Updated
//! ```
//!
//! Pass/fail for `Compared` outcomes is decided by the caller, see
//! [`matcher::assess`].

pub mod comparator;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod matcher;
pub mod paths;
pub mod stitch;
pub mod types;

pub use comparator::{PixelComparator, RgbaComparator};
pub use config::{ComparatorConfig, SnapshotConfig};
pub use error::{SnapshotError, SnapshotResult};
pub use lifecycle::SnapshotEngine;
pub use matcher::{assess, ImageSnapshotMatcher, MatchOptions, Verdict};
pub use paths::SnapshotPaths;
pub use stitch::{ImageStitcher, Orientation, StitchLayout};
pub use types::{Comparison, Diff, DiffBounds, DiffDetails, DimensionDifference, SnapshotOutcome, SnapshotRequest};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
