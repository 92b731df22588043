// src/services/avalanche.rs

//! Avalanche forecast extraction.

use chrono::Utc;

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::Result;
use crate::models::{
    AvalancheConfig, AvalancheDangerLevel, AvalancheForecast, AvalancheRating, MountainCoordinates,
    TimeoutConfig,
};
use crate::services::FieldExtractor;
use crate::utils::text::digits_only;

/// Highest level on the North American danger scale.
const MAX_DANGER_LEVEL: u8 = 5;

/// Parses a tree line rating such as "3-Considerable".
///
/// Text without a hyphen, or without a label after it, carries no rating.
pub fn parse_tree_line_data(text: &str) -> AvalancheRating {
    let Some((level, label)) = text.trim().split_once('-') else {
        return AvalancheRating::none();
    };

    let level = digits_only(level)
        .parse::<u8>()
        .map(|level| level.min(MAX_DANGER_LEVEL))
        .unwrap_or(0);
    let label = label.trim();
    if label.is_empty() {
        return AvalancheRating {
            level,
            rating: AvalancheRating::NO_RATING.to_string(),
        };
    }

    AvalancheRating {
        level,
        rating: label.to_string(),
    }
}

/// Joins the summary paragraphs the way the forecast is displayed.
fn join_summary(first: String, second: Option<String>) -> String {
    match second.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        Some(second) => format!("{first}<br><br>{second}"),
        None => first,
    }
}

/// Reads a forecast page through a session.
pub struct AvalancheResolver<'a, D: BrowserDriver> {
    session: &'a BrowserSession<D>,
    config: &'a AvalancheConfig,
    timeouts: &'a TimeoutConfig,
}

impl<'a, D: BrowserDriver> AvalancheResolver<'a, D> {
    pub fn new(
        session: &'a BrowserSession<D>,
        config: &'a AvalancheConfig,
        timeouts: &'a TimeoutConfig,
    ) -> Self {
        Self {
            session,
            config,
            timeouts,
        }
    }

    /// Load the forecast for a location and read both days.
    pub async fn resolve(&self, mountain: &MountainCoordinates) -> Result<AvalancheForecast> {
        let selectors = &self.config.selectors;
        let extractor = FieldExtractor::new(self.session);
        let forecast_url = self.config.forecast_url(mountain.lat, mountain.lon);

        log::info!("Navigating to {}", forecast_url);
        self.session.navigate(&forecast_url).await?;
        self.session.wait_visible(&selectors.container).await?;
        log::debug!("Forecast container visible for mountain {}", mountain.mountain_id);

        let summary_one = extractor.extract_inner_html(&selectors.summary_one).await?;
        let summary_two = extractor
            .extract_optional_inner_html(&selectors.summary_two, self.timeouts.optional())
            .await;

        let issue_date = self.soft_text(&selectors.issue_date).await;
        let day_one = AvalancheDangerLevel {
            date: self.soft_text(&selectors.day_one).await,
            above_treeline: self.rating(&selectors.above_treeline_day_one).await,
            near_treeline: self.rating(&selectors.near_treeline_day_one).await,
            below_treeline: self.rating(&selectors.below_treeline_day_one).await,
        };
        let day_two = AvalancheDangerLevel {
            date: self.soft_text(&selectors.day_two).await,
            above_treeline: self.rating(&selectors.above_treeline_day_two).await,
            near_treeline: self.rating(&selectors.near_treeline_day_two).await,
            below_treeline: self.rating(&selectors.below_treeline_day_two).await,
        };

        Ok(AvalancheForecast {
            mountain_id: mountain.mountain_id,
            avalanche_summary: join_summary(summary_one, summary_two),
            issue_date,
            overall_danger_level: day_one.max_level(),
            danger_levels: [day_one, day_two],
            forecast_url,
            updated_at: Utc::now(),
        })
    }

    /// Text that may be missing from the forecast; missing reads as empty.
    async fn soft_text(&self, selector: &str) -> String {
        let text = FieldExtractor::new(self.session)
            .extract_optional_text(selector, None, self.timeouts.avalanche_field())
            .await;
        if text.is_none() {
            log::warn!("Forecast field '{}' not found", selector);
        }
        text.unwrap_or_default()
    }

    async fn rating(&self, selector: &str) -> AvalancheRating {
        parse_tree_line_data(&self.soft_text(selector).await)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::browser::{FixtureDriver, FixtureSite};
    use crate::error::AppError;
    use crate::models::AvalancheSelectors;

    const FORECAST_URL: &str = "https://avy.test/?lat=39.501400&lng=-106.151600";

    fn config() -> AvalancheConfig {
        AvalancheConfig {
            url_template: "https://avy.test/?lat={lat}&lng={lon}".to_string(),
            selectors: AvalancheSelectors {
                container: ".forecast".to_string(),
                summary_one: ".forecast > p.one".to_string(),
                summary_two: ".forecast > p.two".to_string(),
                issue_date: ".issued".to_string(),
                day_one: ".d1 .label".to_string(),
                day_two: ".d2 .label".to_string(),
                above_treeline_day_one: ".d1 .atl".to_string(),
                near_treeline_day_one: ".d1 .ntl".to_string(),
                below_treeline_day_one: ".d1 .btl".to_string(),
                above_treeline_day_two: ".d2 .atl".to_string(),
                near_treeline_day_two: ".d2 .ntl".to_string(),
                below_treeline_day_two: ".d2 .btl".to_string(),
            },
        }
    }

    fn mountain() -> MountainCoordinates {
        MountainCoordinates {
            mountain_id: 7,
            lat: 39.5014,
            lon: -106.1516,
        }
    }

    fn page(summary_two: &str) -> String {
        format!(
            r#"<html><body>
            <div class="forecast"><p class="one">Wind slabs <b>remain</b>.</p>{summary_two}</div>
            <span class="issued">Issued Mon, Jan 6</span>
            <div class="d1"><div class="label">Monday</div>
                <b class="atl">2-Moderate</b><b class="ntl">3-Considerable</b><b class="btl">1-Low</b></div>
            <div class="d2"><div class="label">Tuesday</div>
                <b class="atl">2-Moderate</b><b class="ntl">2-Moderate</b></div>
            </body></html>"#
        )
    }

    async fn forecast(html: &str) -> Result<AvalancheForecast> {
        let driver: FixtureDriver = FixtureSite::new().page(FORECAST_URL, html).build();
        let session = BrowserSession::open(driver, Duration::from_secs(120), Duration::from_millis(100));
        let config = config();
        let timeouts = TimeoutConfig::default();
        AvalancheResolver::new(&session, &config, &timeouts)
            .resolve(&mountain())
            .await
    }

    #[test]
    fn test_parse_tree_line_data() {
        let rating = parse_tree_line_data("3-Considerable");
        assert_eq!(rating.level, 3);
        assert_eq!(rating.rating, "Considerable");

        assert_eq!(parse_tree_line_data(""), AvalancheRating::none());
        assert_eq!(parse_tree_line_data("NoHyphen"), AvalancheRating::none());
        assert_eq!(parse_tree_line_data("  4 - High ").level, 4);
        assert_eq!(parse_tree_line_data("x-Moderate").level, 0);
        assert_eq!(parse_tree_line_data("2-").rating, AvalancheRating::NO_RATING);
        assert_eq!(parse_tree_line_data("9-Off Scale").level, MAX_DANGER_LEVEL);
    }

    #[test]
    fn test_join_summary() {
        assert_eq!(join_summary("a".into(), Some("b".into())), "a<br><br>b");
        assert_eq!(join_summary("a".into(), Some("  ".into())), "a");
        assert_eq!(join_summary("a".into(), None), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_forecast() {
        let forecast = forecast(&page(r#"<p class="two">Avoid steep slopes.</p>"#))
            .await
            .unwrap();

        assert_eq!(forecast.mountain_id, 7);
        assert_eq!(forecast.forecast_url, FORECAST_URL);
        assert_eq!(
            forecast.avalanche_summary,
            "Wind slabs <b>remain</b>.<br><br>Avoid steep slopes."
        );
        assert_eq!(forecast.issue_date, "Issued Mon, Jan 6");
        assert_eq!(forecast.overall_danger_level, 3);

        let [today, tomorrow] = &forecast.danger_levels;
        assert_eq!(today.date, "Monday");
        assert_eq!(today.below_treeline.rating, "Low");
        assert_eq!(tomorrow.date, "Tuesday");
        assert_eq!(tomorrow.below_treeline, AvalancheRating::none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_paragraph_is_optional() {
        let forecast = forecast(&page("")).await.unwrap();
        assert_eq!(forecast.avalanche_summary, "Wind slabs <b>remain</b>.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_container_fails() {
        let err = forecast("<html><body></body></html>").await.unwrap_err();
        assert!(matches!(err, AppError::SelectorNotFound { .. }));
    }
}
