//! Local filesystem storage implementation.
//!
//! Each collection is a single JSON file rewritten atomically (temp file, then
//! rename). Writes are serialized through a lock so concurrent upserts from a
//! batch never lose each other's rows.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{AvalancheForecast, ResortConditionRecord, ScrapeStatus};
use crate::storage::ConditionsStore;

const CONDITIONS_KEY: &str = "conditions.json";
const AVALANCHE_KEY: &str = "avalanche.json";
const STATUS_KEY: &str = "scraping_status.json";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Replace the row for `id` in a keyed collection.
    async fn upsert<T: Serialize + DeserializeOwned + Clone>(
        &self,
        key: &str,
        id: u32,
        row: &T,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows: BTreeMap<u32, T> = self.read_json(key).await?.unwrap_or_default();
        rows.insert(id, row.clone());
        self.write_json(key, &rows).await?;
        log::debug!("Upserted mountain {} into {}", id, key);
        Ok(())
    }

    /// Latest record per mountain, ordered by mountain id.
    pub async fn load_conditions(&self) -> Result<Vec<ResortConditionRecord>> {
        let rows: BTreeMap<u32, ResortConditionRecord> =
            self.read_json(CONDITIONS_KEY).await?.unwrap_or_default();
        Ok(rows.into_values().collect())
    }

    /// Latest forecast per mountain, ordered by mountain id.
    pub async fn load_forecasts(&self) -> Result<Vec<AvalancheForecast>> {
        let rows: BTreeMap<u32, AvalancheForecast> =
            self.read_json(AVALANCHE_KEY).await?.unwrap_or_default();
        Ok(rows.into_values().collect())
    }

    /// Every status row, oldest first.
    pub async fn load_status(&self) -> Result<Vec<ScrapeStatus>> {
        Ok(self.read_json(STATUS_KEY).await?.unwrap_or_default())
    }
}

#[async_trait]
impl ConditionsStore for LocalStorage {
    async fn upsert_conditions(&self, record: &ResortConditionRecord) -> Result<()> {
        self.upsert(CONDITIONS_KEY, record.mountain_id, record).await
    }

    async fn upsert_forecast(&self, forecast: &AvalancheForecast) -> Result<()> {
        self.upsert(AVALANCHE_KEY, forecast.mountain_id, forecast)
            .await
    }

    async fn insert_status(&self, status: &ScrapeStatus) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows: Vec<ScrapeStatus> = self.read_json(STATUS_KEY).await?.unwrap_or_default();
        rows.push(status.clone());
        self.write_json(STATUS_KEY, &rows).await
    }
}
