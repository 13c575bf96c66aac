//! Bounded, durable history of past analyses.
//!
//! The whole collection lives as one JSON array under a single storage key,
//! newest first. Every mutation is a read-modify-write of that blob; there is
//! no locking, so two processes writing at once can lose an update.

use thiserror::Error;

use crate::storage::{Storage, StorageError};
use crate::{AnalysisRecord, AnalysisResult, Clock, SystemClock};

/// Storage key the collection is persisted under.
pub const DEFAULT_HISTORY_KEY: &str = "healthcheck-history";

/// Default bound on the number of stored records.
pub const DEFAULT_MAX_HISTORY_ITEMS: usize = 3;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub key: String,
    pub max_items: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_HISTORY_KEY.to_string(),
            max_items: DEFAULT_MAX_HISTORY_ITEMS,
        }
    }
}

pub struct HistoryStore<S, C = SystemClock> {
    storage: S,
    config: HistoryConfig,
    clock: C,
}

impl<S: Storage> HistoryStore<S> {
    pub fn new(storage: S, config: HistoryConfig) -> Self {
        Self::with_clock(storage, config, SystemClock)
    }
}

impl<S: Storage, C: Clock> HistoryStore<S, C> {
    /// A `max_items` of zero is raised to one so an insert always keeps the
    /// record it returns.
    pub fn with_clock(storage: S, mut config: HistoryConfig, clock: C) -> Self {
        config.max_items = config.max_items.max(1);
        Self {
            storage,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// All records in stored order (newest first).
    ///
    /// Never fails: a missing key, an unreadable backend or a corrupted blob
    /// all read as an empty history.
    pub fn get_all(&self) -> Vec<AnalysisRecord> {
        let raw = match self.storage.get_item(&self.config.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %self.config.key, error = %e, "failed to read history");
                return Vec::new();
            }
        };
        if raw.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(key = %self.config.key, error = %e, "history is corrupted, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn get_by_id(&self, id: i64) -> Option<AnalysisRecord> {
        self.get_all().into_iter().find(|r| r.id == id)
    }

    /// Record a new analysis at the front of the history, evicting the oldest
    /// entries beyond the configured bound.
    pub fn insert(
        &self,
        file_name: &str,
        result: AnalysisResult,
    ) -> Result<AnalysisRecord, HistoryError> {
        let mut records = self.get_all();
        let timestamp = self.clock.now();

        // Ids come from the wall clock; keep them unique and increasing even
        // when two inserts land in the same millisecond.
        let mut id = timestamp.timestamp_millis();
        if let Some(max) = records.iter().map(|r| r.id).max()
            && id <= max
        {
            id = max + 1;
        }

        let record = AnalysisRecord {
            id,
            file_name: file_name.to_string(),
            timestamp,
            result,
        };
        records.insert(0, record.clone());
        records.truncate(self.config.max_items);

        self.persist(&records).inspect_err(|e| {
            tracing::error!(file_name, error = %e, "failed to save analysis to history");
        })?;
        tracing::info!(id, file_name, count = records.len(), "saved analysis to history");
        Ok(record)
    }

    /// Remove one record. Removing an id that is not stored succeeds and
    /// leaves storage untouched.
    pub fn delete_by_id(&self, id: i64) -> Result<(), HistoryError> {
        let records = self.get_all();
        let before = records.len();
        let filtered: Vec<AnalysisRecord> = records.into_iter().filter(|r| r.id != id).collect();
        if filtered.len() == before {
            tracing::debug!(id, "delete of unknown history id");
            return Ok(());
        }
        self.persist(&filtered).inspect_err(|e| {
            tracing::error!(id, error = %e, "failed to delete history item");
        })
    }

    /// Drop the whole collection, including the storage key itself.
    pub fn clear_all(&self) -> Result<(), HistoryError> {
        self.storage
            .remove_item(&self.config.key)
            .map_err(HistoryError::from)
            .inspect_err(|e| tracing::error!(error = %e, "failed to clear history"))
    }

    pub fn count(&self) -> usize {
        self.get_all().len()
    }

    fn persist(&self, records: &[AnalysisRecord]) -> Result<(), HistoryError> {
        let json = serde_json::to_string(records)?;
        self.storage.set_item(&self.config.key, &json)?;
        Ok(())
    }
}
