use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod client;
pub mod config_file;
pub mod dates;
pub mod history;
pub mod results;
pub mod session;
pub mod storage;
pub mod text_utils;
pub mod view;

// Re-export for convenience
pub use client::{AnalysisClient, ApiError, UploadOutcome};
pub use history::{DEFAULT_HISTORY_KEY, DEFAULT_MAX_HISTORY_ITEMS, HistoryConfig, HistoryError, HistoryStore};
pub use results::{ResultsError, ResultsPage, open_results};
pub use session::{ProcessingStats, SessionError, SessionStage, StagedResult};
pub use storage::{MemoryStorage, SqliteStorage, Storage, StorageError};
pub use view::{ActionOutcome, HistoryCard, HistoryController, HistoryPage, Interaction, Navigation, SortOrder};

/// The AI interpretation returned by the analysis endpoint.
///
/// Every field may be missing; the server omits sections it could not
/// produce and older history entries predate the summary field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumen_ejecutivo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretacion_conceptos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resultados_simplificados: Option<String>,
}

impl AnalysisResult {
    /// Executive summary, `None` when absent or blank.
    pub fn summary(&self) -> Option<&str> {
        non_blank(&self.resumen_ejecutivo)
    }

    /// Technical interpretation, `None` when absent or blank.
    pub fn interpretation(&self) -> Option<&str> {
        non_blank(&self.interpretacion_conceptos)
    }

    /// Patient-facing explanation, `None` when absent or blank.
    pub fn simplified(&self) -> Option<&str> {
        non_blank(&self.resultados_simplificados)
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// One persisted analysis in the local history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: i64,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
    pub result: AnalysisResult,
}

/// Source of wall-clock time for record ids and timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Resolved runtime configuration (CLI flags > env vars > config file > defaults).
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analysis API, without the endpoint path.
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Uploads above this size are rejected before any network call.
    pub max_upload_bytes: u64,
    /// SQLite file holding the durable key/value storage.
    pub storage_path: PathBuf,
    pub history: HistoryConfig,
    pub default_sort: SortOrder,
    pub export_dir: PathBuf,
    /// Optional decorative icon for the PDF notice box.
    pub warning_icon: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|d| d.join("healthcheck"))
            .unwrap_or_else(|| PathBuf::from(".healthcheck"));
        Self {
            api_base_url: client::DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(client::DEFAULT_TIMEOUT_SECS),
            max_upload_bytes: client::DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            storage_path: data_dir.join("storage.db"),
            history: HistoryConfig::default(),
            default_sort: SortOrder::default(),
            export_dir: PathBuf::from("."),
            warning_icon: dirs::config_dir().map(|d| d.join("healthcheck").join("warning.png")),
        }
    }
}

impl Config {
    /// Layer a loaded config file over the defaults.
    pub fn from_file(file: &config_file::ConfigFile) -> Self {
        let mut config = Self::default();
        if let Some(api) = &file.api {
            if let Some(url) = &api.base_url {
                config.api_base_url = url.trim_end_matches('/').to_string();
            }
            if let Some(secs) = api.timeout_secs {
                config.request_timeout = Duration::from_secs(secs);
            }
            if let Some(mb) = api.max_file_size_mb {
                config.max_upload_bytes = mb * 1024 * 1024;
            }
        }
        if let Some(history) = &file.history {
            if let Some(path) = &history.storage_path {
                config.storage_path = PathBuf::from(path);
            }
            if let Some(key) = &history.key {
                config.history.key = key.clone();
            }
            if let Some(max) = history.max_items {
                config.history.max_items = max.max(1);
            }
        }
        if let Some(export) = &file.export {
            if let Some(dir) = &export.output_dir {
                config.export_dir = PathBuf::from(dir);
            }
            if let Some(icon) = &export.warning_icon {
                config.warning_icon = if icon.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(icon))
                };
            }
        }
        if let Some(display) = &file.display
            && let Some(sort) = &display.default_sort
        {
            match sort.parse() {
                Ok(order) => config.default_sort = order,
                Err(e) => tracing::warn!(value = %sort, error = %e, "ignoring invalid default_sort"),
            }
        }
        config
    }

    /// Apply `HEALTHCHECK_*` environment overrides.
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var("HEALTHCHECK_API_URL") {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(max) = std::env::var("HEALTHCHECK_MAX_HISTORY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.history.max_items = max.max(1);
        }
        if let Ok(dir) = std::env::var("HEALTHCHECK_DATA_DIR") {
            self.storage_path = PathBuf::from(dir).join("storage.db");
        }
        if let Ok(dir) = std::env::var("HEALTHCHECK_EXPORT_DIR") {
            self.export_dir = PathBuf::from(dir);
        }
        self
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::Clock;

    /// A clock that only moves when told to.
    pub struct ManualClock {
        now: Cell<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Cell::new(Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()),
            }
        }

        pub fn advance_secs(&self, secs: i64) {
            self.now.set(self.now.get() + Duration::seconds(secs));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }
    }

    impl Clock for &ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.now.get()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_fields_use_original_json_names() {
        let json = r#"{"resumenEjecutivo":"ok","interpretacionConceptos":"tech"}"#;
        let parsed: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.summary(), Some("ok"));
        assert_eq!(parsed.interpretation(), Some("tech"));
        assert!(parsed.resultados_simplificados.is_none());

        let back = serde_json::to_string(&parsed).unwrap();
        assert!(back.contains("\"resumenEjecutivo\""));
        assert!(!back.contains("resultadosSimplificados"));
    }

    #[test]
    fn blank_fields_count_as_absent() {
        let result = AnalysisResult {
            resumen_ejecutivo: Some("   ".into()),
            ..Default::default()
        };
        assert!(result.summary().is_none());
    }

    #[test]
    fn config_from_file_overrides_defaults() {
        let file: config_file::ConfigFile = toml::from_str(
            "[api]\nbase_url = \"http://example.test:9000/\"\n\n[history]\nmax_items = 10\n\n[display]\ndefault_sort = \"date-desc\"\n",
        )
        .unwrap();
        let config = Config::from_file(&file);
        assert_eq!(config.api_base_url, "http://example.test:9000");
        assert_eq!(config.history.max_items, 10);
        assert_eq!(config.default_sort, SortOrder::DateDesc);
    }

    #[test]
    fn config_clamps_zero_max_items() {
        let file: config_file::ConfigFile = toml::from_str("[history]\nmax_items = 0\n").unwrap();
        assert_eq!(Config::from_file(&file).history.max_items, 1);
    }
}
