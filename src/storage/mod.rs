//! Storage abstractions for scrape results.
//!
//! Records are upserted by mountain id, so re-running a site replaces its
//! previous row. Status rows are append-only.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml            # Engine configuration
//! ├── mountains.json         # Coordinates for avalanche runs
//! ├── policies/              # One selector policy per resort
//! │   └── <name>.json
//! ├── conditions.json        # Latest record per mountain
//! ├── avalanche.json         # Latest forecast per mountain
//! └── scraping_status.json   # Run log
//! ```

pub mod local;
pub mod policies;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AvalancheForecast, ResortConditionRecord, ScrapeStatus};

// Re-export for convenience
pub use local::LocalStorage;
pub use policies::PolicyDirectory;

/// Persistence and status logging for scrape results.
#[async_trait]
pub trait ConditionsStore: Send + Sync {
    /// Insert or replace the record for its mountain id.
    async fn upsert_conditions(&self, record: &ResortConditionRecord) -> Result<()>;

    /// Insert or replace the forecast for its mountain id.
    async fn upsert_forecast(&self, forecast: &AvalancheForecast) -> Result<()>;

    /// Append a run outcome to the status log.
    async fn insert_status(&self, status: &ScrapeStatus) -> Result<()>;
}
