//! Engine configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::AvalancheSelectors;

/// Root engine configuration, passed explicitly into the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Browser session settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Deadlines for whole runs and for elements that may be absent
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Multi-site run settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Avalanche forecast source
    #[serde(default)]
    pub avalanche: AvalancheConfig,
}

impl ScrapeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.browser.poll_interval_ms == 0 {
            return Err(AppError::config("browser.poll_interval_ms must be > 0"));
        }
        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            return Err(AppError::config("browser viewport must be non-zero"));
        }
        if self.timeouts.resort_secs == 0 || self.timeouts.avalanche_secs == 0 {
            return Err(AppError::config("run timeouts must be > 0"));
        }
        if self.timeouts.short_wait_ms == 0 || self.timeouts.optional_ms == 0 {
            return Err(AppError::config("short wait timeouts must be > 0"));
        }
        if self.batch.max_concurrent == 0 {
            return Err(AppError::config("batch.max_concurrent must be > 0"));
        }
        let template = &self.avalanche.url_template;
        if !template.contains("{lat}") || !template.contains("{lon}") {
            return Err(AppError::config(
                "avalanche.url_template must contain {lat} and {lon}",
            ));
        }
        Ok(())
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "defaults::viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "defaults::viewport_height")]
    pub viewport_height: u32,

    /// Interval between checks while waiting for a selector
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "defaults::headless")]
    pub headless: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl BrowserConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            viewport_width: defaults::viewport_width(),
            viewport_height: defaults::viewport_height(),
            poll_interval_ms: defaults::poll_interval(),
            headless: defaults::headless(),
            user_agent: None,
        }
    }
}

/// Deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Whole resort conditions run
    #[serde(default = "defaults::resort")]
    pub resort_secs: u64,

    /// Whole avalanche forecast run
    #[serde(default = "defaults::avalanche")]
    pub avalanche_secs: u64,

    /// Terrain waits that are allowed to fail (closed resort, missing text)
    #[serde(default = "defaults::short_wait")]
    pub short_wait_ms: u64,

    /// Elements whose absence is normal (second summary paragraph)
    #[serde(default = "defaults::optional")]
    pub optional_ms: u64,

    /// Forecast fields read after the forecast container is visible
    #[serde(default = "defaults::avalanche_field")]
    pub avalanche_field_ms: u64,
}

impl TimeoutConfig {
    pub fn resort(&self) -> Duration {
        Duration::from_secs(self.resort_secs)
    }
    pub fn avalanche(&self) -> Duration {
        Duration::from_secs(self.avalanche_secs)
    }
    pub fn short_wait(&self) -> Duration {
        Duration::from_millis(self.short_wait_ms)
    }
    pub fn optional(&self) -> Duration {
        Duration::from_millis(self.optional_ms)
    }
    pub fn avalanche_field(&self) -> Duration {
        Duration::from_millis(self.avalanche_field_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            resort_secs: defaults::resort(),
            avalanche_secs: defaults::avalanche(),
            short_wait_ms: defaults::short_wait(),
            optional_ms: defaults::optional(),
            avalanche_field_ms: defaults::avalanche_field(),
        }
    }
}

/// Multi-site run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum sites scraped at once (one browser each)
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Avalanche forecast source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvalancheConfig {
    /// Page address with `{lat}` and `{lon}` placeholders
    #[serde(default = "defaults::url_template")]
    pub url_template: String,

    #[serde(default)]
    pub selectors: AvalancheSelectors,
}

impl AvalancheConfig {
    /// Forecast page address for a location, coordinates to six decimals.
    pub fn forecast_url(&self, lat: f64, lon: f64) -> String {
        self.url_template
            .replace("{lat}", &format!("{lat:.6}"))
            .replace("{lon}", &format!("{lon:.6}"))
    }
}

impl Default for AvalancheConfig {
    fn default() -> Self {
        Self {
            url_template: defaults::url_template(),
            selectors: AvalancheSelectors::default(),
        }
    }
}

mod defaults {
    // Browser defaults
    pub fn viewport_width() -> u32 {
        1200
    }
    pub fn viewport_height() -> u32 {
        1000
    }
    pub fn poll_interval() -> u64 {
        100
    }
    pub fn headless() -> bool {
        true
    }

    // Timeout defaults
    pub fn resort() -> u64 {
        180
    }
    pub fn avalanche() -> u64 {
        120
    }
    pub fn short_wait() -> u64 {
        1_000
    }
    pub fn optional() -> u64 {
        2_000
    }
    pub fn avalanche_field() -> u64 {
        5_000
    }

    // Batch defaults
    pub fn max_concurrent() -> usize {
        4
    }

    // Avalanche defaults
    pub fn url_template() -> String {
        "https://avalanche.state.co.us/?lat={lat}&lng={lon}".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(ScrapeConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = ScrapeConfig::default();
        config.batch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_template_without_placeholders() {
        let mut config = ScrapeConfig::default();
        config.avalanche.url_template = "https://avalanche.state.co.us/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ScrapeConfig = toml::from_str(
            r#"
            [timeouts]
            resort_secs = 60

            [avalanche.selectors]
            container = "main"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeouts.resort(), Duration::from_secs(60));
        assert_eq!(config.timeouts.avalanche(), Duration::from_secs(120));
        assert_eq!(config.browser.viewport_width, 1200);
        assert_eq!(config.avalanche.selectors.container, "main");
        assert_eq!(
            config.avalanche.selectors.summary_one,
            AvalancheSelectors::default().summary_one
        );
    }

    #[test]
    fn forecast_url_uses_six_decimals() {
        let config = AvalancheConfig::default();
        assert_eq!(
            config.forecast_url(39.5, -106.15),
            "https://avalanche.state.co.us/?lat=39.500000&lng=-106.150000"
        );
    }
}
