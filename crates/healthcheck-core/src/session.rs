//! Hand-off of a result to the results view through session storage.
//!
//! The upload flow and the history view both stage a result here before
//! navigating; the results view reads it back once. The `fromHistory` marker
//! is consumed on that read so a later upload in the same session is saved
//! to history again.

use crate::AnalysisResult;
use crate::storage::{Storage, StorageError};

pub const KEY_ANALYSIS_RESULT: &str = "analysisResult";
pub const KEY_FILE_NAME: &str = "fileName";
pub const KEY_FROM_HISTORY: &str = "fromHistory";
pub const KEY_PROCESSING_TIME: &str = "processingTime";
pub const KEY_NUM_PAGES: &str = "numPages";
pub const KEY_FILE_SIZE: &str = "fileSize";

/// Upload statistics shown above the results, when known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub processing_secs: Option<f64>,
    pub pages: Option<u32>,
    pub file_size_mb: Option<f64>,
}

impl ProcessingStats {
    pub fn is_empty(&self) -> bool {
        self.processing_secs.is_none() && self.pages.is_none() && self.file_size_mb.is_none()
    }
}

/// What the results view gets back from the session.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedResult {
    pub result: AnalysisResult,
    pub file_name: Option<String>,
    pub from_history: bool,
    pub stats: ProcessingStats,
}

pub struct SessionStage<S> {
    storage: S,
}

impl<S: Storage> SessionStage<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Stage a freshly analysed result.
    pub fn stage_upload(
        &self,
        file_name: &str,
        result: &AnalysisResult,
        stats: &ProcessingStats,
    ) -> Result<(), StorageError> {
        self.write_result(file_name, result)?;
        self.storage.remove_item(KEY_FROM_HISTORY)?;
        self.write_opt(KEY_PROCESSING_TIME, stats.processing_secs.map(|s| format!("{s:.2}")))?;
        self.write_opt(KEY_NUM_PAGES, stats.pages.map(|p| p.to_string()))?;
        self.write_opt(KEY_FILE_SIZE, stats.file_size_mb.map(|mb| format!("{mb:.2}")))?;
        Ok(())
    }

    /// Stage a result reopened from history. The results view must not save
    /// it again.
    pub fn stage_from_history(
        &self,
        file_name: &str,
        result: &AnalysisResult,
    ) -> Result<(), StorageError> {
        self.write_result(file_name, result)?;
        for key in [KEY_PROCESSING_TIME, KEY_NUM_PAGES, KEY_FILE_SIZE] {
            self.storage.remove_item(key)?;
        }
        self.storage.set_item(KEY_FROM_HISTORY, "true")
    }

    /// Read the staged result. Clears the one-shot `fromHistory` marker.
    ///
    /// `Ok(None)` when nothing is staged. A staged payload that does not
    /// parse is an error.
    pub fn take(&self) -> Result<Option<StagedResult>, SessionError> {
        let Some(raw) = self.storage.get_item(KEY_ANALYSIS_RESULT)? else {
            return Ok(None);
        };
        let from_history = self.storage.get_item(KEY_FROM_HISTORY)?.is_some();
        self.storage.remove_item(KEY_FROM_HISTORY)?;

        let result: AnalysisResult = serde_json::from_str(&raw)?;
        let file_name = self.storage.get_item(KEY_FILE_NAME)?;
        let stats = ProcessingStats {
            processing_secs: self.read_parsed(KEY_PROCESSING_TIME)?,
            pages: self.read_parsed(KEY_NUM_PAGES)?,
            file_size_mb: self.read_parsed(KEY_FILE_SIZE)?,
        };
        Ok(Some(StagedResult {
            result,
            file_name,
            from_history,
            stats,
        }))
    }

    fn write_result(&self, file_name: &str, result: &AnalysisResult) -> Result<(), StorageError> {
        // Serializing a struct of optional strings cannot fail.
        let json = serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string());
        self.storage.set_item(KEY_ANALYSIS_RESULT, &json)?;
        self.storage.set_item(KEY_FILE_NAME, file_name)
    }

    fn write_opt(&self, key: &str, value: Option<String>) -> Result<(), StorageError> {
        match value {
            Some(v) => self.storage.set_item(key, &v),
            None => self.storage.remove_item(key),
        }
    }

    fn read_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, StorageError> {
        Ok(self
            .storage
            .get_item(key)?
            .and_then(|v| v.trim().parse().ok()))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("staged result is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            resumen_ejecutivo: Some("Resumen".into()),
            interpretacion_conceptos: None,
            resultados_simplificados: Some("Simple".into()),
        }
    }

    #[test]
    fn nothing_staged() {
        let session = SessionStage::new(MemoryStorage::new());
        assert!(session.take().unwrap().is_none());
    }

    #[test]
    fn upload_stage_round_trips_with_stats() {
        let session = SessionStage::new(MemoryStorage::new());
        let stats = ProcessingStats {
            processing_secs: Some(3.5),
            pages: Some(2),
            file_size_mb: Some(0.25),
        };
        session.stage_upload("lab.pdf", &sample(), &stats).unwrap();

        let staged = session.take().unwrap().unwrap();
        assert_eq!(staged.result, sample());
        assert_eq!(staged.file_name.as_deref(), Some("lab.pdf"));
        assert!(!staged.from_history);
        assert_eq!(staged.stats, stats);
    }

    #[test]
    fn from_history_flag_is_one_shot() {
        let session = SessionStage::new(MemoryStorage::new());
        session.stage_from_history("old.pdf", &sample()).unwrap();

        let first = session.take().unwrap().unwrap();
        assert!(first.from_history);
        assert!(first.stats.is_empty());

        let second = session.take().unwrap().unwrap();
        assert!(!second.from_history);
    }

    #[test]
    fn upload_after_history_view_is_not_flagged() {
        let storage = MemoryStorage::new();
        let session = SessionStage::new(&storage);
        session.stage_from_history("old.pdf", &sample()).unwrap();
        session
            .stage_upload("new.pdf", &sample(), &ProcessingStats::default())
            .unwrap();

        let staged = session.take().unwrap().unwrap();
        assert!(!staged.from_history);
        assert_eq!(staged.file_name.as_deref(), Some("new.pdf"));
    }

    #[test]
    fn unparsable_payload_is_an_error() {
        let storage = MemoryStorage::new();
        storage.set_item(KEY_ANALYSIS_RESULT, "not json").unwrap();
        let session = SessionStage::new(&storage);
        assert!(matches!(session.take(), Err(SessionError::Parse(_))));
    }
}
