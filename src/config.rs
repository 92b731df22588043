// src/config.rs

//! Configuration loading utilities.
//!
//! Convenience functions for loading engine configuration and seed data
//! from the storage directory.

use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{MountainCoordinates, ScrapeConfig, SelectorPolicy};

/// Load and validate engine configuration.
///
/// A missing or unreadable file falls back to defaults; invalid values do not.
pub fn load_config(path: &Path) -> Result<ScrapeConfig> {
    let config = ScrapeConfig::load_or_default(path);
    config.validate()?;
    Ok(config)
}

/// Load the coordinates used for avalanche runs.
pub fn load_mountains(path: &Path) -> Result<Vec<MountainCoordinates>> {
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::config(format!("Failed to read mountains from {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a single policy document from any path.
pub fn load_policy_file(path: &Path) -> Result<SelectorPolicy> {
    let content = fs::read_to_string(path)?;
    SelectorPolicy::from_json(&content)
}
