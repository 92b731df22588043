// src/pipeline/batch.rs

//! Multi-site runs with bounded concurrency.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use crate::browser::DriverFactory;
use crate::error::ScrapeFailure;
use crate::models::{MountainCoordinates, ScrapeStatus, SelectorPolicy};
use crate::services::ScrapeOrchestrator;
use crate::storage::ConditionsStore;

/// Summary of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failures the task layer may retry
    pub retryable: usize,
    /// Policies past their closing date
    pub skipped: usize,
    /// Results that could not be persisted
    pub store_errors: usize,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.store_errors == 0
    }

    fn record_failure(&mut self, failure: &ScrapeFailure) {
        self.failed += 1;
        if failure.is_retryable() {
            self.retryable += 1;
        }
    }
}

async fn log_status(store: &dyn ConditionsStore, status: ScrapeStatus, outcome: &mut BatchOutcome) {
    if let Err(e) = store.insert_status(&status).await {
        outcome.store_errors += 1;
        log::error!("Failed to log status for {}: {}", status.display_name, e);
    }
}

/// Scrape every open resort and persist the results.
///
/// Successful records are upserted; every run, successful or not, leaves a
/// status row. Policies whose season ended before `today` are skipped.
pub async fn run_resort_batch<F: DriverFactory>(
    orchestrator: &ScrapeOrchestrator<F>,
    store: &dyn ConditionsStore,
    policies: &[SelectorPolicy],
    today: NaiveDate,
) -> BatchOutcome {
    let concurrency = orchestrator.config().batch.max_concurrent.max(1);
    let mut outcome = BatchOutcome {
        total: policies.len(),
        ..BatchOutcome::default()
    };

    let open: Vec<&SelectorPolicy> = policies
        .iter()
        .filter(|policy| {
            let closed = policy.is_closed_for_season(today);
            if closed {
                log::info!("Skipping {}: season closed", policy.name);
            }
            !closed
        })
        .collect();
    outcome.skipped = outcome.total - open.len();

    let mut runs = stream::iter(open)
        .map(|policy| async move { (policy, orchestrator.run(policy).await) })
        .buffer_unordered(concurrency);

    while let Some((policy, result)) = runs.next().await {
        match result {
            Ok(record) => match store.upsert_conditions(&record).await {
                Ok(()) => {
                    outcome.succeeded += 1;
                    log_status(store, ScrapeStatus::succeeded(&policy.name), &mut outcome).await;
                }
                Err(e) => {
                    outcome.store_errors += 1;
                    log::error!("Failed to save conditions for {}: {}", policy.name, e);
                }
            },
            Err(failure) => {
                outcome.record_failure(&failure);
                log_status(store, ScrapeStatus::from(&failure), &mut outcome).await;
            }
        }
    }

    log::info!(
        "Resort batch: {} succeeded, {} failed ({} retryable), {} skipped",
        outcome.succeeded,
        outcome.failed,
        outcome.retryable,
        outcome.skipped
    );
    outcome
}

/// Scrape the avalanche forecast for every mountain and persist the results.
pub async fn run_avalanche_batch<F: DriverFactory>(
    orchestrator: &ScrapeOrchestrator<F>,
    store: &dyn ConditionsStore,
    mountains: &[MountainCoordinates],
) -> BatchOutcome {
    let concurrency = orchestrator.config().batch.max_concurrent.max(1);
    let mut outcome = BatchOutcome {
        total: mountains.len(),
        ..BatchOutcome::default()
    };

    let mut runs = stream::iter(mountains)
        .map(|mountain| orchestrator.forecast(mountain))
        .buffer_unordered(concurrency);

    while let Some(result) = runs.next().await {
        match result {
            Ok(forecast) => match store.upsert_forecast(&forecast).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.store_errors += 1;
                    log::error!(
                        "Failed to save forecast for mountain {}: {}",
                        forecast.mountain_id,
                        e
                    );
                }
            },
            Err(failure) => {
                log::warn!("{}", failure);
                outcome.record_failure(&failure);
                log_status(store, ScrapeStatus::from(&failure), &mut outcome).await;
            }
        }
    }

    log::info!(
        "Avalanche batch: {} succeeded, {} failed",
        outcome.succeeded,
        outcome.failed
    );
    outcome
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::browser::FixtureSite;
    use crate::models::ScrapeConfig;
    use crate::models::policy::tests::same_page_read;
    use crate::storage::LocalStorage;

    const REPORT: &str = r#"<html><body>
        <div class="report"><span class="base">30</span><span class="snow24">2</span><span class="snow48">4</span></div>
        <div class="terrain"><span class="lifts">5 / 9</span><span class="runs">40 of 120</span></div>
    </body></html>"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn policy(id: u32, name: &str, url: &str) -> SelectorPolicy {
        let mut policy = same_page_read();
        policy.id = id;
        policy.name = name.to_string();
        policy.conditions_url = url.to_string();
        policy
    }

    #[tokio::test(start_paused = true)]
    async fn test_resort_batch_persists_and_logs() {
        let site = FixtureSite::new()
            .page("https://a.test/report", REPORT)
            .page("https://b.test/report", "<html><body>down</body></html>");
        let orchestrator = ScrapeOrchestrator::new(Arc::new(ScrapeConfig::default()), site.clone());
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        let mut closed = policy(3, "closed", "https://c.test/report");
        closed.closing_date = Some("2025-04-20".to_string());
        let policies = vec![
            policy(1, "alpha", "https://a.test/report"),
            policy(2, "bravo", "https://b.test/report"),
            closed,
        ];

        let outcome = run_resort_batch(&orchestrator, &storage, &policies, today()).await;
        assert_eq!(
            outcome,
            BatchOutcome {
                total: 3,
                succeeded: 1,
                failed: 1,
                retryable: 1,
                skipped: 1,
                store_errors: 0,
            }
        );
        assert!(!outcome.all_succeeded());

        let records = storage.load_conditions().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].display_name, "alpha");
        assert_eq!(records[0].lifts_open, 5);
        assert_eq!(records[0].runs_open, 40);

        let statuses = storage.load_status().await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().any(|s| s.display_name == "bravo" && !s.success));
        assert_eq!(site.sessions(), (2, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_avalanche_batch_counts_failures() {
        let site = FixtureSite::new();
        let orchestrator = ScrapeOrchestrator::new(Arc::new(ScrapeConfig::default()), site);
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let mountains = [MountainCoordinates {
            mountain_id: 9,
            lat: 39.6,
            lon: -105.9,
        }];

        let outcome = run_avalanche_batch(&orchestrator, &storage, &mountains).await;
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.failed, 1);
        assert!(storage.load_forecasts().await.unwrap().is_empty());
        assert_eq!(storage.load_status().await.unwrap()[0].display_name, "mountain 9");
    }
}
