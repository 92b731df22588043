// src/models/mod.rs

//! Domain models for the scraping engine.
//!
//! This module contains all data structures used throughout the engine,
//! organized by their primary purpose.

mod avalanche;
mod conditions;
mod config;
pub(crate) mod policy;
mod selectors;

// Re-export all public types
pub use avalanche::{AvalancheDangerLevel, AvalancheForecast, AvalancheRating, MountainCoordinates};
pub use conditions::{ConditionsReading, ResortConditionRecord, ScrapeStatus, TerrainReading};
pub use config::{AvalancheConfig, BatchConfig, BrowserConfig, ScrapeConfig, TimeoutConfig};
pub use policy::{ConditionsSelectors, SelectorPolicy, TerrainSelectors};
pub use selectors::AvalancheSelectors;
