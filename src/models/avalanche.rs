// src/models/avalanche.rs

//! Backcountry avalanche forecast models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Location used to build the forecast page address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MountainCoordinates {
    pub mountain_id: u32,
    pub lat: f64,
    pub lon: f64,
}

/// Danger level at one elevation band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvalancheRating {
    /// 0 (no rating) through 5 (extreme)
    pub level: u8,
    pub rating: String,
}

impl AvalancheRating {
    pub const NO_RATING: &'static str = "No Rating";

    pub fn none() -> Self {
        Self {
            level: 0,
            rating: Self::NO_RATING.to_string(),
        }
    }
}

impl Default for AvalancheRating {
    fn default() -> Self {
        Self::none()
    }
}

/// Danger ratings for one forecast day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvalancheDangerLevel {
    pub date: String,
    pub above_treeline: AvalancheRating,
    pub near_treeline: AvalancheRating,
    pub below_treeline: AvalancheRating,
}

impl AvalancheDangerLevel {
    /// Highest level across the three bands.
    pub fn max_level(&self) -> u8 {
        self.above_treeline
            .level
            .max(self.near_treeline.level)
            .max(self.below_treeline.level)
    }
}

/// Complete forecast for a mountain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvalancheForecast {
    pub mountain_id: u32,
    pub avalanche_summary: String,
    pub issue_date: String,
    /// Maximum level across the nearest day's bands
    pub overall_danger_level: u8,
    /// Today and tomorrow
    pub danger_levels: [AvalancheDangerLevel; 2],
    pub forecast_url: String,
    pub updated_at: DateTime<Utc>,
}
