//! CLI Commands

pub mod check;
pub mod config;
pub mod paths;
pub mod stitch;
