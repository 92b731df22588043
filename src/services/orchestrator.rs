// src/services/orchestrator.rs

//! End-to-end runs for a single site.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::browser::{BrowserSession, DriverFactory};
use crate::error::{AppError, Result, ScrapeFailure};
use crate::models::{
    AvalancheForecast, MountainCoordinates, ResortConditionRecord, ScrapeConfig, SelectorPolicy,
};
use crate::services::{AvalancheResolver, ConditionsResolver, TerrainResolver};
use crate::utils::get_domain;

/// Runs scrapes with one fresh browser per call.
pub struct ScrapeOrchestrator<F: DriverFactory> {
    config: Arc<ScrapeConfig>,
    factory: F,
}

/// Fail with [`AppError::DeadlineExceeded`] if `work` outlives `timeout`.
async fn with_deadline<T>(timeout: Duration, work: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, work)
        .await
        .unwrap_or(Err(AppError::DeadlineExceeded {
            seconds: timeout.as_secs(),
        }))
}

impl<F: DriverFactory> ScrapeOrchestrator<F> {
    pub fn new(config: Arc<ScrapeConfig>, factory: F) -> Self {
        Self { config, factory }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    async fn open_session(&self, timeout: Duration) -> Result<BrowserSession<F::Driver>> {
        let driver = with_deadline(timeout, self.factory.launch()).await?;
        Ok(BrowserSession::open(
            driver,
            timeout,
            self.config.browser.poll_interval(),
        ))
    }

    /// Scrape conditions and terrain for one resort.
    ///
    /// The browser is closed whether or not extraction succeeds, and a failed
    /// run never yields a partial record.
    pub async fn run(
        &self,
        policy: &SelectorPolicy,
    ) -> std::result::Result<ResortConditionRecord, ScrapeFailure> {
        let fail = |error: AppError| ScrapeFailure::new(policy.name.clone(), policy.id, error);

        policy.validate().map_err(fail)?;

        let timeout = self.config.timeouts.resort();
        let session = self.open_session(timeout).await.map_err(fail)?;
        log::info!(
            "Scraping {} ({})",
            policy.name,
            get_domain(&policy.conditions_url).unwrap_or_default()
        );

        let outcome = with_deadline(timeout, self.extract(&session, policy)).await;
        if let Err(e) = session.close().await {
            log::warn!("Failed to close browser for {}: {}", policy.name, e);
        }

        match outcome {
            Ok(record) => {
                log::info!(
                    "{}: base {}\", {} lifts, {} runs open",
                    policy.name,
                    record.base_depth,
                    record.lifts_open,
                    record.runs_open
                );
                Ok(record)
            }
            Err(e) => {
                log::warn!("{}: scrape failed: {}", policy.name, e);
                Err(fail(e))
            }
        }
    }

    async fn extract(
        &self,
        session: &BrowserSession<F::Driver>,
        policy: &SelectorPolicy,
    ) -> Result<ResortConditionRecord> {
        let timeouts = &self.config.timeouts;

        session.navigate(&policy.conditions_url).await?;
        let conditions = ConditionsResolver::new(session, policy, timeouts)
            .resolve()
            .await?;
        let terrain = TerrainResolver::new(session, policy, timeouts)
            .resolve()
            .await?;

        Ok(ResortConditionRecord::assemble(
            policy,
            conditions,
            terrain,
            Utc::now(),
        ))
    }

    /// Scrape the avalanche forecast for one location.
    pub async fn forecast(
        &self,
        mountain: &MountainCoordinates,
    ) -> std::result::Result<AvalancheForecast, ScrapeFailure> {
        let fail = |error: AppError| {
            ScrapeFailure::new(
                format!("mountain {}", mountain.mountain_id),
                mountain.mountain_id,
                error,
            )
        };

        let timeout = self.config.timeouts.avalanche();
        let session = self.open_session(timeout).await.map_err(fail)?;

        let resolver =
            AvalancheResolver::new(&session, &self.config.avalanche, &self.config.timeouts);
        let outcome = with_deadline(timeout, resolver.resolve(mountain)).await;
        if let Err(e) = session.close().await {
            log::warn!(
                "Failed to close browser for mountain {}: {}",
                mountain.mountain_id,
                e
            );
        }

        match outcome {
            Ok(forecast) => {
                log::info!(
                    "Scraped avalanche forecast for mountain {} (danger {})",
                    mountain.mountain_id,
                    forecast.overall_danger_level
                );
                Ok(forecast)
            }
            Err(e) => Err(fail(e)),
        }
    }
}
