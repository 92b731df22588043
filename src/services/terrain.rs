// src/services/terrain.rs

//! Lift and run status extraction.
//!
//! The policy flags pick exactly one [`TerrainStrategy`] per run. Counting
//! strategies take the number of matching "open" elements; read strategies
//! take the numerator of text such as "12/24" or "30 of 40".

use std::fmt;

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::{AppError, Result};
use crate::models::{SelectorPolicy, TerrainReading, TimeoutConfig};
use crate::services::FieldExtractor;
use crate::utils::text::to_integer;

/// How lift and run numbers are obtained for a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainStrategy {
    /// Click `clickSelector`, then count status elements in each terrain block
    ClickThenCount,
    /// Navigate to `terrainURL`, then count status elements
    SeparatePageCount,
    /// Navigate to `terrainURL`, then read the open counts as text
    SeparatePageRead,
    /// Count status elements on the conditions page
    SamePageCount,
    /// Read the open counts as text on the conditions page
    SamePageRead,
}

impl TerrainStrategy {
    pub fn select(policy: &SelectorPolicy) -> Self {
        if policy.click_selector().is_some() {
            return Self::ClickThenCount;
        }
        match (policy.separate_urls, policy.terrain.count_lifts) {
            (true, true) => Self::SeparatePageCount,
            (true, false) => Self::SeparatePageRead,
            (false, true) => Self::SamePageCount,
            (false, false) => Self::SamePageRead,
        }
    }

    /// Whether the strategy loads `terrainURL` first.
    pub fn navigates(self) -> bool {
        matches!(self, Self::SeparatePageCount | Self::SeparatePageRead)
    }
}

impl fmt::Display for TerrainStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ClickThenCount => "click-then-count",
            Self::SeparatePageCount => "separate-page-count",
            Self::SeparatePageRead => "separate-page-read",
            Self::SamePageCount => "same-page-count",
            Self::SamePageRead => "same-page-read",
        };
        f.write_str(name)
    }
}

/// Produces a [`TerrainReading`] once conditions have been read.
pub struct TerrainResolver<'a, D: BrowserDriver> {
    session: &'a BrowserSession<D>,
    policy: &'a SelectorPolicy,
    timeouts: &'a TimeoutConfig,
}

impl<'a, D: BrowserDriver> TerrainResolver<'a, D> {
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

    pub fn strategy(&self) -> TerrainStrategy {
        TerrainStrategy::select(self.policy)
    }

    /// Run the policy's strategy against the session.
    pub async fn resolve(&self) -> Result<TerrainReading> {
        let strategy = self.strategy();
        log::debug!("{}: terrain strategy {}", self.policy.name, strategy);

        if strategy.navigates() {
            self.session.navigate(&self.policy.terrain_url).await?;
        }

        match strategy {
            TerrainStrategy::ClickThenCount => self.click_then_count().await,
            TerrainStrategy::SeparatePageCount | TerrainStrategy::SamePageCount => {
                self.count_open().await
            }
            TerrainStrategy::SeparatePageRead | TerrainStrategy::SamePageRead => {
                self.read_open().await
            }
        }
    }

    async fn click_then_count(&self) -> Result<TerrainReading> {
        let terrain = &self.policy.terrain;
        let extractor = FieldExtractor::new(self.session);

        if let Some(selector) = self.policy.click_selector() {
            self.session.click(selector).await?;
        }
        self.session.wait_visible(&terrain.terrain_selector).await?;

        let mut reading = TerrainReading::default();
        for node in extractor.nodes(&terrain.terrain_selector, None).await? {
            let lifts = extractor
                .count(&terrain.lift_status_selector, Some(&node))
                .await?;
            let runs = extractor
                .count(&terrain.run_status_selector, Some(&node))
                .await?;
            reading.lifts_open += saturate(lifts);
            reading.runs_open += saturate(runs);
        }
        Ok(reading)
    }

    async fn count_open(&self) -> Result<TerrainReading> {
        let terrain = &self.policy.terrain;
        let extractor = FieldExtractor::new(self.session);

        let precondition = if terrain.lifts_open_selector.trim().is_empty() {
            &terrain.lift_status_selector
        } else {
            &terrain.lifts_open_selector
        };
        let lifts_ready = self
            .session
            .within(self.timeouts.short_wait())
            .wait_ready(precondition)
            .await;

        let lifts_open = match &lifts_ready {
            Ok(()) => extractor.count(&terrain.lift_status_selector, None).await?,
            Err(e) => {
                log::info!("{}: no open lifts found ({})", self.policy.name, e);
                0
            }
        };

        if !terrain.run_click_interaction {
            if lifts_ready.is_err() {
                // Nothing open yet, usually before the season starts.
                return Ok(TerrainReading::default());
            }
            let runs_open = extractor.count(&terrain.run_status_selector, None).await?;
            return Ok(TerrainReading {
                runs_open: saturate(runs_open),
                lifts_open: saturate(lifts_open),
            });
        }

        // Toggles are clicked even when no open lift was found. On a site whose
        // layout changed this can count runs that are not open.
        let rendered = self
            .session
            .within(self.timeouts.short_wait())
            .wait_ready(&terrain.run_click_selector)
            .await;
        match rendered {
            Err(AppError::SelectorNotFound { .. }) | Ok(()) => {}
            Err(e) => return Err(e),
        }
        let toggles = extractor.nodes(&terrain.run_click_selector, None).await?;
        if toggles.is_empty() {
            return Err(AppError::config(format!(
                "{}: no elements match runClickSelector '{}'",
                self.policy.name, terrain.run_click_selector
            )));
        }
        log::debug!("{}: clicking {} run toggle(s)", self.policy.name, toggles.len());
        for toggle in &toggles {
            self.session
                .click_node(toggle, &terrain.run_click_selector)
                .await?;
        }

        let runs_open = extractor.count(&terrain.run_status_selector, None).await?;
        Ok(TerrainReading {
            runs_open: saturate(runs_open),
            lifts_open: saturate(lifts_open),
        })
    }

    async fn read_open(&self) -> Result<TerrainReading> {
        let terrain = &self.policy.terrain;
        let extractor = FieldExtractor::new(self.session);
        let short_wait = self.timeouts.short_wait();

        self.session.wait_visible(&terrain.terrain_selector).await?;
        let nodes = extractor.nodes(&terrain.terrain_selector, None).await?;

        let mut runs_text = String::new();
        let mut lifts_text = String::new();
        for node in &nodes {
            let runs = extractor
                .extract_optional_text(&terrain.runs_open_selector, Some(node), short_wait)
                .await;
            let lifts = extractor
                .extract_optional_text(&terrain.lifts_open_selector, Some(node), short_wait)
                .await;
            if let Some(text) = runs.filter(|t| !t.is_empty()) {
                runs_text = text;
            }
            if let Some(text) = lifts.filter(|t| !t.is_empty()) {
                lifts_text = text;
            }
        }

        if runs_text.is_empty() || lifts_text.is_empty() {
            log::warn!(
                "{}: terrain text missing (runs '{}', lifts '{}'), using 0",
                self.policy.name,
                runs_text,
                lifts_text
            );
        }

        Ok(TerrainReading {
            runs_open: to_integer(&runs_text),
            lifts_open: to_integer(&lifts_text),
        })
    }
}

fn saturate(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::browser::{FixtureDriver, FixtureSite};
    use crate::models::policy::tests::same_page_read;

    const REPORT_URL: &str = "https://resort.test/report";
    const TERRAIN_URL: &str = "https://resort.test/terrain";

    const REPORT: &str = r#"<html><body>
        <div class="report"><span class="base">48"</span></div>
        <div class="terrain">
            <span class="lifts">12/24 lifts</span>
            <span class="runs">30 of 40 runs</span>
        </div>
    </body></html>"#;

    fn counting_policy() -> SelectorPolicy {
        let mut policy = same_page_read();
        policy.terrain.count_lifts = true;
        policy.terrain.lifts_open_selector.clear();
        policy.terrain.lift_status_selector = "li.lift.open".to_string();
        policy.terrain.run_status_selector = "li.run.open".to_string();
        policy
    }

    fn toggle_page(lifts: &str, runs: &str) -> String {
        format!(
            r#"<html><body><div class="areas"><button class="expand">North</button><button class="expand">South</button></div><ul class="lift-list">{lifts}</ul><ul class="run-list">{runs}</ul></body></html>"#
        )
    }

    async fn session_at(site: &FixtureSite, url: &str) -> BrowserSession<FixtureDriver> {
        let session =
            BrowserSession::open(site.build(), Duration::from_secs(60), Duration::from_millis(100));
        session.navigate(url).await.unwrap();
        session
    }

    async fn resolve(
        session: &BrowserSession<FixtureDriver>,
        policy: &SelectorPolicy,
    ) -> Result<TerrainReading> {
        TerrainResolver::new(session, policy, &TimeoutConfig::default())
            .resolve()
            .await
    }

    #[test]
    fn test_strategy_selection() {
        let mut policy = same_page_read();
        assert_eq!(TerrainStrategy::select(&policy), TerrainStrategy::SamePageRead);

        policy.terrain.count_lifts = true;
        assert_eq!(TerrainStrategy::select(&policy), TerrainStrategy::SamePageCount);

        policy.separate_urls = true;
        assert_eq!(TerrainStrategy::select(&policy), TerrainStrategy::SeparatePageCount);

        policy.terrain.count_lifts = false;
        assert_eq!(TerrainStrategy::select(&policy), TerrainStrategy::SeparatePageRead);

        policy.click_selector = Some("  ".to_string());
        assert_eq!(TerrainStrategy::select(&policy), TerrainStrategy::SeparatePageRead);

        policy.click_selector = Some(".show".to_string());
        let strategy = TerrainStrategy::select(&policy);
        assert_eq!(strategy, TerrainStrategy::ClickThenCount);
        assert!(!strategy.navigates());
        assert_eq!(strategy.to_string(), "click-then-count");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_page_read_never_visits_terrain_url() {
        let site = FixtureSite::new()
            .page(REPORT_URL, REPORT)
            .page(TERRAIN_URL, "<html><body></body></html>");
        let session = session_at(&site, REPORT_URL).await;
        let policy = same_page_read();

        let reading = resolve(&session, &policy).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 30, lifts_open: 12 });
        assert_eq!(site.visits(), vec![REPORT_URL.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_page_read_navigates() {
        let site = FixtureSite::new()
            .page(REPORT_URL, "<html><body></body></html>")
            .page(TERRAIN_URL, REPORT);
        let session = session_at(&site, REPORT_URL).await;
        let mut policy = same_page_read();
        policy.separate_urls = true;

        let reading = resolve(&session, &policy).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 30, lifts_open: 12 });
        assert_eq!(site.visits(), vec![REPORT_URL.to_string(), TERRAIN_URL.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_terrain_text_reads_zero() {
        let html = r#"<html><body><div class="terrain"><span class="runs">7</span></div></body></html>"#;
        let site = FixtureSite::new().page(REPORT_URL, html);
        let session = session_at(&site, REPORT_URL).await;

        let reading = resolve(&session, &same_page_read()).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 7, lifts_open: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_page_count() {
        let html = r#"<html><body><ul>
            <li class="lift open">A</li><li class="lift open">B</li><li class="lift closed">C</li>
            <li class="run open">1</li><li class="run closed">2</li>
        </ul></body></html>"#;
        let site = FixtureSite::new().page(REPORT_URL, html);
        let session = session_at(&site, REPORT_URL).await;

        let reading = resolve(&session, &counting_policy()).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 1, lifts_open: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_resort_counts_zero() {
        let html = r#"<html><body><ul><li class="lift closed">A</li></ul></body></html>"#;
        let site = FixtureSite::new().page(REPORT_URL, html);
        let session = session_at(&site, REPORT_URL).await;

        let started = tokio::time::Instant::now();
        let reading = resolve(&session, &counting_policy()).await.unwrap();
        assert_eq!(reading, TerrainReading::default());
        assert!(started.elapsed() <= Duration::from_millis(1_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_click_interaction_counts_revealed_runs() {
        let lifts = r#"<li class="lift open">A</li><li class="lift open">B</li><li class="lift closed">C</li>"#;
        let runs = r#"<li class="run open">1</li><li class="run open">2</li><li class="run open">3</li><li class="run closed">4</li>"#;
        let site = FixtureSite::new()
            .page(REPORT_URL, toggle_page(lifts, ""))
            .on_click("button.expand", toggle_page(lifts, runs));
        let session = session_at(&site, REPORT_URL).await;
        let mut policy = counting_policy();
        policy.terrain.run_click_interaction = true;
        policy.terrain.run_click_selector = "button.expand".to_string();

        let reading = resolve(&session, &policy).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 3, lifts_open: 2 });
        assert_eq!(site.clicks(), vec!["button.expand".to_string(); 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_click_without_open_lifts_still_clicks() {
        let runs = r#"<li class="run open">1</li>"#;
        let site = FixtureSite::new()
            .page(REPORT_URL, toggle_page("", ""))
            .on_click("button.expand", toggle_page("", runs));
        let session = session_at(&site, REPORT_URL).await;
        let mut policy = counting_policy();
        policy.terrain.run_click_interaction = true;
        policy.terrain.run_click_selector = "button.expand".to_string();

        let reading = resolve(&session, &policy).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 1, lifts_open: 0 });
        assert_eq!(site.clicks().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_toggles_rendered_late_are_clicked() {
        let lifts = r#"<li class="lift open">A</li><li class="lift open">B</li>"#;
        let runs = r#"<li class="run open">1</li><li class="run open">2</li><li class="run closed">3</li>"#;
        let loading = format!(
            r#"<html><body><button class="load">Runs</button><ul class="lift-list">{lifts}</ul></body></html>"#
        );
        let site = FixtureSite::new()
            .page(REPORT_URL, loading)
            .on_click("button.load", toggle_page(lifts, ""))
            .on_click("button.expand", toggle_page(lifts, runs));
        let session = session_at(&site, REPORT_URL).await;
        let mut policy = counting_policy();
        policy.terrain.run_click_interaction = true;
        policy.terrain.run_click_selector = "button.expand".to_string();

        let page_script = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            session.click("button.load").await.unwrap();
        };
        let (reading, ()) = tokio::join!(resolve(&session, &policy), page_script);

        assert_eq!(reading.unwrap(), TerrainReading { runs_open: 2, lifts_open: 2 });
        assert_eq!(
            site.clicks(),
            vec![
                "button.load".to_string(),
                "button.expand".to_string(),
                "button.expand".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_toggles_is_configuration_error() {
        let html = r#"<html><body><ul><li class="lift open">A</li></ul></body></html>"#;
        let site = FixtureSite::new().page(REPORT_URL, html);
        let session = session_at(&site, REPORT_URL).await;
        let mut policy = counting_policy();
        policy.terrain.run_click_interaction = true;
        policy.terrain.run_click_selector = "button.expand".to_string();

        let started = tokio::time::Instant::now();
        let err = resolve(&session, &policy).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        assert!(!err.is_retryable());
        assert!(started.elapsed() >= TimeoutConfig::default().short_wait());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_then_count_per_block() {
        let before = r#"<html><body><button class="show-terrain">Terrain</button><div class="terrain" hidden></div></body></html>"#;
        let after = r#"<html><body><button class="show-terrain">Terrain</button><div class="terrain"><li class="lift open">A</li><li class="run open">1</li></div><div class="terrain"><li class="lift open">B</li><li class="run open">2</li><li class="run closed">3</li></div></body></html>"#;
        let site = FixtureSite::new()
            .page(REPORT_URL, before)
            .on_click(".show-terrain", after);
        let session = session_at(&site, REPORT_URL).await;
        let mut policy = counting_policy();
        policy.click_selector = Some(".show-terrain".to_string());

        let reading = resolve(&session, &policy).await.unwrap();
        assert_eq!(reading, TerrainReading { runs_open: 2, lifts_open: 2 });
        assert_eq!(site.clicks(), vec!["button.show-terrain".to_string()]);
    }
}
