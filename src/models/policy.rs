// src/models/policy.rs

//! Per-site scraping policy.
//!
//! A policy is the only thing that varies between resorts: it names the pages,
//! the CSS selectors to read, and the flags that pick a terrain strategy. The
//! JSON keys follow the documents stored alongside each resort
//! (`separateURLs`, `conditionsURL`, `terrain.countLifts`, ...). An empty
//! selector string means the field does not apply to that site.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::is_page_url;

/// Declarative scraping configuration for one resort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorPolicy {
    /// Mountain id used as the upsert key
    pub id: u32,

    /// Display name (also the policy document name)
    pub name: String,

    /// End-of-season cutoff (`YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<String>,

    /// Conditions and terrain live on different pages
    #[serde(default, rename = "separateURLs")]
    pub separate_urls: bool,

    /// Element that must be clicked before terrain data appears
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_selector: Option<String>,

    #[serde(rename = "conditionsURL")]
    pub conditions_url: String,

    #[serde(default, rename = "terrainURL")]
    pub terrain_url: String,

    pub conditions: ConditionsSelectors,

    pub terrain: TerrainSelectors,
}

/// Selectors for the snow conditions block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionsSelectors {
    /// Container repeated once per conditions block
    pub conditions_selector: String,
    pub base_depth_selector: String,
    #[serde(default)]
    pub snowpack_selector: String,
    #[serde(default)]
    pub season_total_selector: String,
    pub snow24_selector: String,
    pub snow48_selector: String,
    #[serde(default, rename = "snow7DaySelector")]
    pub snow7_day_selector: String,
    /// Element to wait for before reading anything
    #[serde(default)]
    pub wait_for_selector: String,
}

/// Selectors and flags for lift/run status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainSelectors {
    #[serde(default)]
    pub terrain_selector: String,
    #[serde(default)]
    pub runs_open_selector: String,
    #[serde(default)]
    pub lifts_open_selector: String,
    /// Count matching status elements instead of reading a number
    #[serde(default)]
    pub count_lifts: bool,
    /// Click every run toggle before counting open runs
    #[serde(default)]
    pub run_click_interaction: bool,
    #[serde(default)]
    pub run_click_selector: String,
    #[serde(default)]
    pub lift_status_selector: String,
    #[serde(default)]
    pub run_status_selector: String,
}

fn is_set(selector: &str) -> bool {
    !selector.trim().is_empty()
}

impl ConditionsSelectors {
    fn named(&self) -> [(&'static str, &str); 8] {
        [
            ("conditions.conditionsSelector", &self.conditions_selector),
            ("conditions.baseDepthSelector", &self.base_depth_selector),
            ("conditions.snowpackSelector", &self.snowpack_selector),
            ("conditions.seasonTotalSelector", &self.season_total_selector),
            ("conditions.snow24Selector", &self.snow24_selector),
            ("conditions.snow48Selector", &self.snow48_selector),
            ("conditions.snow7DaySelector", &self.snow7_day_selector),
            ("conditions.waitForSelector", &self.wait_for_selector),
        ]
    }
}

impl TerrainSelectors {
    fn named(&self) -> [(&'static str, &str); 6] {
        [
            ("terrain.terrainSelector", &self.terrain_selector),
            ("terrain.runsOpenSelector", &self.runs_open_selector),
            ("terrain.liftsOpenSelector", &self.lifts_open_selector),
            ("terrain.runClickSelector", &self.run_click_selector),
            ("terrain.liftStatusSelector", &self.lift_status_selector),
            ("terrain.runStatusSelector", &self.run_status_selector),
        ]
    }
}

impl SelectorPolicy {
    /// Parse a policy document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The click-to-reveal selector, if the site needs one.
    pub fn click_selector(&self) -> Option<&str> {
        self.click_selector.as_deref().filter(|s| is_set(s))
    }

    /// Parsed end-of-season date, if present and well-formed.
    pub fn closing_date(&self) -> Option<NaiveDate> {
        let raw = self.closing_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                log::warn!("Ignoring closing date '{}' for {}: {}", raw, self.name, e);
                None
            }
        }
    }

    /// Whether the season has ended as of `today`.
    pub fn is_closed_for_season(&self, today: NaiveDate) -> bool {
        self.closing_date().is_some_and(|closing| today > closing)
    }

    /// Reject policies that cannot be executed.
    ///
    /// Runs before a browser is launched so broken policies fail fast and
    /// are never retried.
    pub fn validate(&self) -> Result<()> {
        let fail = |message: &str| Err(AppError::config(format!("{}: {}", self.name, message)));

        if self.name.trim().is_empty() {
            return Err(AppError::config("policy name is empty"));
        }
        if !is_page_url(&self.conditions_url) {
            return fail("conditionsURL must be an absolute http(s) URL");
        }

        let conditions = &self.conditions;
        if !is_set(&conditions.conditions_selector) {
            return fail("conditions.conditionsSelector is empty");
        }
        if !is_set(&conditions.base_depth_selector) {
            return fail("conditions.baseDepthSelector is empty");
        }
        if !is_set(&conditions.snow24_selector) {
            return fail("conditions.snow24Selector is empty");
        }
        if !is_set(&conditions.snow48_selector) {
            return fail("conditions.snow48Selector is empty");
        }

        if self.separate_urls && !is_page_url(&self.terrain_url) {
            return fail("separateURLs is set but terrainURL is not an absolute http(s) URL");
        }

        let terrain = &self.terrain;
        if self.click_selector().is_some() {
            if !is_set(&terrain.terrain_selector) {
                return fail("clickSelector requires terrain.terrainSelector");
            }
            if !is_set(&terrain.lift_status_selector) || !is_set(&terrain.run_status_selector) {
                return fail("clickSelector requires liftStatusSelector and runStatusSelector");
            }
        } else if terrain.count_lifts {
            if !is_set(&terrain.lift_status_selector) {
                return fail("countLifts requires terrain.liftStatusSelector");
            }
            if !is_set(&terrain.run_status_selector) {
                return fail("countLifts requires terrain.runStatusSelector");
            }
            if terrain.run_click_interaction && !is_set(&terrain.run_click_selector) {
                return fail("runClickInteraction requires terrain.runClickSelector");
            }
        } else {
            if !is_set(&terrain.terrain_selector) {
                return fail("terrain.terrainSelector is empty");
            }
            if !is_set(&terrain.runs_open_selector) || !is_set(&terrain.lifts_open_selector) {
                return fail("runsOpenSelector and liftsOpenSelector are required");
            }
        }

        let click = self.click_selector().map(|s| ("clickSelector", s));
        let named = self.conditions.named().into_iter().chain(terrain.named()).chain(click);
        for (key, selector) in named.filter(|(_, s)| is_set(s)) {
            if let Err(e) = scraper::Selector::parse(selector) {
                return fail(&format!("{key} '{selector}' is not a valid CSS selector ({e:?})"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAME_PAGE_READ: &str = r##"{
        "id": 3,
        "name": "copper-mountain",
        "separateURLs": false,
        "conditionsURL": "https://resort.test/report",
        "terrainURL": "https://resort.test/terrain",
        "conditions": {
            "conditionsSelector": ".report",
            "baseDepthSelector": ".base",
            "snowpackSelector": ".surface",
            "seasonTotalSelector": "",
            "snow24Selector": ".snow24",
            "snow48Selector": ".snow48",
            "snow7DaySelector": ""
        },
        "terrain": {
            "terrainSelector": ".terrain",
            "runsOpenSelector": ".runs",
            "liftsOpenSelector": ".lifts"
        }
    }"##;

    pub(crate) fn same_page_read() -> SelectorPolicy {
        SelectorPolicy::from_json(SAME_PAGE_READ).unwrap()
    }

    #[test]
    fn test_parse_camel_case_document() {
        let policy = same_page_read();
        assert_eq!(policy.id, 3);
        assert_eq!(policy.conditions_url, "https://resort.test/report");
        assert_eq!(policy.conditions.snow24_selector, ".snow24");
        assert!(policy.conditions.snow7_day_selector.is_empty());
        assert!(!policy.terrain.count_lifts);
        assert!(policy.click_selector().is_none());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_blank_click_selector_is_none() {
        let mut policy = same_page_read();
        policy.click_selector = Some("  ".to_string());
        assert!(policy.click_selector().is_none());
    }

    #[test]
    fn test_validate_rejects_separate_without_terrain_url() {
        let mut policy = same_page_read();
        policy.separate_urls = true;
        policy.terrain_url.clear();
        assert!(matches!(
            policy.validate(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_counting_without_status_selectors() {
        let mut policy = same_page_read();
        policy.terrain.count_lifts = true;
        assert!(policy.validate().is_err());

        policy.terrain.lift_status_selector = ".lift.open".to_string();
        policy.terrain.run_status_selector = ".run.open".to_string();
        assert!(policy.validate().is_ok());

        policy.terrain.run_click_interaction = true;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_malformed_selectors() {
        let mut policy = same_page_read();
        policy.terrain.run_status_selector = "li[[".to_string();
        let err = policy.validate().unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(err.to_string().contains("terrain.runStatusSelector"));
        assert!(!err.is_retryable());

        let mut policy = same_page_read();
        policy.conditions.snow7_day_selector = ".snow7 >".to_string();
        assert!(matches!(policy.validate(), Err(AppError::Configuration(_))));

        let mut policy = same_page_read();
        policy.click_selector = Some("button:".to_string());
        policy.terrain.lift_status_selector = ".lift.open".to_string();
        policy.terrain.run_status_selector = ".run.open".to_string();
        assert!(matches!(policy.validate(), Err(AppError::Configuration(_))));

        policy.click_selector = Some("button.show-terrain".to_string());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_required_conditions() {
        let mut policy = same_page_read();
        policy.conditions.base_depth_selector.clear();
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_closing_date() {
        let mut policy = same_page_read();
        let april = NaiveDate::from_ymd_opt(2025, 4, 20).unwrap();
        assert!(!policy.is_closed_for_season(april));

        policy.closing_date = Some("2025-04-13".to_string());
        assert!(policy.is_closed_for_season(april));
        assert!(!policy.is_closed_for_season(NaiveDate::from_ymd_opt(2025, 4, 13).unwrap()));

        policy.closing_date = Some("mid April".to_string());
        assert!(!policy.is_closed_for_season(april));
    }
}
