// src/services/conditions.rs

//! Snow conditions extraction.

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::Result;
use crate::models::{ConditionsReading, SelectorPolicy, TimeoutConfig};
use crate::services::FieldExtractor;
use crate::utils::text::{optional_integer, required_integer, title_case};

/// Raw text gathered from the conditions blocks.
#[derive(Debug, Default)]
struct RawConditions {
    base_depth: String,
    snow_24: String,
    snow_48: String,
    snow_7_day: String,
    season_total: String,
    snowpack: String,
}

impl RawConditions {
    /// Keep the latest non-empty value, so later blocks win.
    fn merge(slot: &mut String, text: Option<String>) {
        if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
            *slot = text;
        }
    }

    fn normalize(self) -> Result<ConditionsReading> {
        let snowpack = title_case(&self.snowpack);
        Ok(ConditionsReading {
            base_depth: required_integer(&self.base_depth, "base depth")?,
            snow_past_24h: required_integer(&self.snow_24, "24 hour snowfall")?,
            snow_past_48h: required_integer(&self.snow_48, "48 hour snowfall")?,
            snow_past_week: optional_integer(&self.snow_7_day),
            season_total: optional_integer(&self.season_total),
            snowpack: (!snowpack.is_empty()).then_some(snowpack),
        })
    }
}

/// Reads the conditions page the session is currently on.
pub struct ConditionsResolver<'a, D: BrowserDriver> {
    session: &'a BrowserSession<D>,
    policy: &'a SelectorPolicy,
    timeouts: &'a TimeoutConfig,
}

impl<'a, D: BrowserDriver> ConditionsResolver<'a, D> {
    pub fn new(
        session: &'a BrowserSession<D>,
        policy: &'a SelectorPolicy,
        timeouts: &'a TimeoutConfig,
    ) -> Self {
        Self {
            session,
            policy,
            timeouts,
        }
    }

    /// Extract and normalize every conditions field.
    ///
    /// Sites that repeat the block (per elevation band, per area) are read
    /// block by block; a later block overrides values from earlier ones.
    pub async fn resolve(&self) -> Result<ConditionsReading> {
        let selectors = &self.policy.conditions;
        let extractor = FieldExtractor::new(self.session);

        self.session
            .wait_visible(&selectors.conditions_selector)
            .await?;
        let nodes = extractor
            .nodes(&selectors.conditions_selector, None)
            .await?;
        log::debug!(
            "{}: found {} conditions block(s)",
            self.policy.name,
            nodes.len()
        );

        if !selectors.wait_for_selector.trim().is_empty() {
            self.session
                .wait_ready(&selectors.wait_for_selector)
                .await?;
        }

        let short_wait = self.timeouts.short_wait();
        let mut raw = RawConditions::default();
        for node in &nodes {
            let snowpack = extractor
                .extract_optional_text(&selectors.snowpack_selector, Some(node), short_wait)
                .await;
            let season_total = extractor
                .extract_optional_text(&selectors.season_total_selector, Some(node), short_wait)
                .await;
            let snow_7_day = extractor
                .extract_optional_text(&selectors.snow7_day_selector, Some(node), short_wait)
                .await;
            RawConditions::merge(&mut raw.snowpack, snowpack);
            RawConditions::merge(&mut raw.season_total, season_total);
            RawConditions::merge(&mut raw.snow_7_day, snow_7_day);

            // Some sites fill the depth in after the rest of the block renders.
            self.session
                .wait_ready(&selectors.base_depth_selector)
                .await?;
            let base_depth = extractor
                .extract_text(&selectors.base_depth_selector, Some(node))
                .await?;
            let snow_24 = extractor
                .extract_text(&selectors.snow24_selector, Some(node))
                .await?;
            let snow_48 = extractor
                .extract_text(&selectors.snow48_selector, Some(node))
                .await?;
            RawConditions::merge(&mut raw.base_depth, Some(base_depth));
            RawConditions::merge(&mut raw.snow_24, Some(snow_24));
            RawConditions::merge(&mut raw.snow_48, Some(snow_48));
        }

        raw.normalize()
    }
}
