// src/models/selectors.rs

//! CSS selectors for scraping the avalanche forecast page.

use serde::{Deserialize, Serialize};

/// CSS selectors for the forecast page.
///
/// Defaults target the Colorado Avalanche Information Center layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvalancheSelectors {
    /// Container that appears once the page's scripts have rendered
    pub container: String,

    /// First summary paragraph (required)
    pub summary_one: String,

    /// Second summary paragraph (often absent)
    pub summary_two: String,

    pub issue_date: String,

    pub day_one: String,
    pub day_two: String,

    pub above_treeline_day_one: String,
    pub near_treeline_day_one: String,
    pub below_treeline_day_one: String,

    pub above_treeline_day_two: String,
    pub near_treeline_day_two: String,
    pub below_treeline_day_two: String,
}

const FORECAST_GRID: &str = "div.mt-4:nth-child(1) > div:nth-child(1)";

/// Rating cell for a day column and an elevation row.
///
/// Day one puts the rating in the second cell of each row, day two in the first.
fn treeline_cell(day: usize, band: usize) -> String {
    let cell = if day == 1 { 2 } else { 1 };
    format!(
        "{FORECAST_GRID} > div:nth-child({day}) > div:nth-child(2) > div:nth-child({band}) \
         > div:nth-child({cell}) > p:nth-child(1) > b:nth-child(1)"
    )
}

fn day_label(day: usize) -> String {
    format!("{FORECAST_GRID} > div:nth-child({day}) > div:nth-child(1) > div:nth-child(1)")
}

impl Default for AvalancheSelectors {
    fn default() -> Self {
        Self {
            container: ".sm\\:pt-4".to_string(),
            summary_one: ".sm\\:pt-4 > p:nth-child(1)".to_string(),
            summary_two: ".sm\\:pt-4 > p:nth-child(2)".to_string(),
            issue_date: "span.whitespace-nowrap:nth-child(3)".to_string(),
            day_one: day_label(1),
            day_two: day_label(2),
            above_treeline_day_one: treeline_cell(1, 1),
            near_treeline_day_one: treeline_cell(1, 2),
            below_treeline_day_one: treeline_cell(1, 3),
            above_treeline_day_two: treeline_cell(2, 1),
            near_treeline_day_two: treeline_cell(2, 2),
            below_treeline_day_two: treeline_cell(2, 3),
        }
    }
}
