// src/services/extractor.rs

//! Field extraction from policy selectors.
//!
//! An empty selector means the field does not apply to the site and yields
//! empty text without touching the page. That keeps "not configured" apart
//! from "configured but missing", which is an error.

use std::time::Duration;

use crate::browser::{BrowserDriver, BrowserSession};
use crate::error::Result;

/// Reads text and counts elements through a session.
pub struct FieldExtractor<'a, D: BrowserDriver> {
    session: &'a BrowserSession<D>,
}

fn is_configured(selector: &str) -> bool {
    !selector.trim().is_empty()
}

impl<'a, D: BrowserDriver> FieldExtractor<'a, D> {
    pub fn new(session: &'a BrowserSession<D>) -> Self {
        Self { session }
    }

    /// Text of the first match, relative to `scope` when given.
    pub async fn extract_text(&self, selector: &str, scope: Option<&D::Node>) -> Result<String> {
        if !is_configured(selector) {
            return Ok(String::new());
        }
        self.session.read_text(selector, scope).await
    }

    /// Like [`Self::extract_text`], but gives up after `timeout` and returns
    /// `None` instead of an error.
    pub async fn extract_optional_text(
        &self,
        selector: &str,
        scope: Option<&D::Node>,
        timeout: Duration,
    ) -> Option<String> {
        if !is_configured(selector) {
            return None;
        }
        match self.session.within(timeout).read_text(selector, scope).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("Optional field '{}' not read: {}", selector, e);
                None
            }
        }
    }

    /// Inner HTML of the first match.
    pub async fn extract_inner_html(&self, selector: &str) -> Result<String> {
        if !is_configured(selector) {
            return Ok(String::new());
        }
        self.session.read_inner_html(selector).await
    }

    /// Inner HTML that may legitimately be missing.
    pub async fn extract_optional_inner_html(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Option<String> {
        if !is_configured(selector) {
            return None;
        }
        match self.session.within(timeout).read_inner_html(selector).await {
            Ok(html) => Some(html),
            Err(e) => {
                log::debug!("Optional block '{}' not read: {}", selector, e);
                None
            }
        }
    }

    /// Every current match, relative to `scope` when given.
    pub async fn nodes(&self, selector: &str, scope: Option<&D::Node>) -> Result<Vec<D::Node>> {
        if !is_configured(selector) {
            return Ok(Vec::new());
        }
        self.session.query_nodes(selector, scope).await
    }

    /// Number of current matches, relative to `scope` when given.
    pub async fn count(&self, selector: &str, scope: Option<&D::Node>) -> Result<usize> {
        Ok(self.nodes(selector, scope).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::FixtureSite;

    const PAGE: &str = r#"<html><body>
        <section class="band"><b class="depth">40"</b></section>
        <section class="band"><b class="depth">55"</b><i class="new">3"</i></section>
    </body></html>"#;

    async fn session() -> BrowserSession<crate::browser::FixtureDriver> {
        let driver = FixtureSite::new().page("https://resort.test/", PAGE).build();
        let session =
            BrowserSession::open(driver, Duration::from_secs(30), Duration::from_millis(100));
        session.navigate("https://resort.test/").await.unwrap();
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_selector_is_not_applicable() {
        let session = session().await;
        let extractor = FieldExtractor::new(&session);
        assert_eq!(extractor.extract_text("", None).await.unwrap(), "");
        assert_eq!(extractor.extract_text("  ", None).await.unwrap(), "");
        assert_eq!(extractor.count("", None).await.unwrap(), 0);
        assert!(
            extractor
                .extract_optional_text("", None, Duration::from_secs(1))
                .await
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_scoped_extraction() {
        let session = session().await;
        let extractor = FieldExtractor::new(&session);
        let bands = extractor.nodes(".band", None).await.unwrap();
        assert_eq!(bands.len(), 2);
        assert_eq!(
            extractor.extract_text(".depth", Some(&bands[1])).await.unwrap(),
            "55\""
        );
        assert_eq!(extractor.count(".new", Some(&bands[0])).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_text_absent() {
        let session = session().await;
        let extractor = FieldExtractor::new(&session);
        let bands = extractor.nodes(".band", None).await.unwrap();
        let missing = extractor
            .extract_optional_text(".new", Some(&bands[0]), Duration::from_secs(1))
            .await;
        assert!(missing.is_none());
        let present = extractor
            .extract_optional_text(".new", Some(&bands[1]), Duration::from_secs(1))
            .await;
        assert_eq!(present.as_deref(), Some("3\""));
    }
}
