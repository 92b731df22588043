// src/models/conditions.rs

//! Resort condition readings and the records handed to persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeFailure;
use crate::models::SelectorPolicy;

/// Snow data read from the conditions page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionsReading {
    /// Base depth in inches
    pub base_depth: u32,
    pub snow_past_24h: u32,
    pub snow_past_48h: u32,
    pub snow_past_week: Option<u32>,
    pub season_total: Option<u32>,
    /// Surface type in title case ("Packed Powder")
    pub snowpack: Option<String>,
}

/// Lift and run counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainReading {
    pub runs_open: u32,
    pub lifts_open: u32,
}

/// Canonical output of one resort scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResortConditionRecord {
    pub mountain_id: u32,
    pub display_name: String,
    pub base_depth: u32,
    pub snow_past_24h: u32,
    pub snow_past_48h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snow_past_week: Option<u32>,
    #[serde(default, rename = "snow_total", skip_serializing_if = "Option::is_none")]
    pub season_total: Option<u32>,
    #[serde(default, rename = "snow_type", skip_serializing_if = "Option::is_none")]
    pub snowpack: Option<String>,
    pub lifts_open: u32,
    pub runs_open: u32,
    pub updated_at: DateTime<Utc>,
}

impl ResortConditionRecord {
    /// Merge both readings into the record for a policy.
    pub fn assemble(
        policy: &SelectorPolicy,
        conditions: ConditionsReading,
        terrain: TerrainReading,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            mountain_id: policy.id,
            display_name: policy.name.clone(),
            base_depth: conditions.base_depth,
            snow_past_24h: conditions.snow_past_24h,
            snow_past_48h: conditions.snow_past_48h,
            snow_past_week: conditions.snow_past_week,
            season_total: conditions.season_total,
            snowpack: conditions.snowpack,
            lifts_open: terrain.lifts_open,
            runs_open: terrain.runs_open,
            updated_at: captured_at,
        }
    }
}

/// Outcome row for the scraping status log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeStatus {
    pub display_name: String,
    pub success: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub retryable: bool,
    pub time: DateTime<Utc>,
}

impl ScrapeStatus {
    pub fn succeeded(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            success: true,
            error: String::new(),
            retryable: false,
            time: Utc::now(),
        }
    }
}

impl From<&ScrapeFailure> for ScrapeStatus {
    fn from(failure: &ScrapeFailure) -> Self {
        Self {
            display_name: failure.mountain_name.clone(),
            success: false,
            error: failure.error.to_string(),
            retryable: failure.is_retryable(),
            time: Utc::now(),
        }
    }
}
