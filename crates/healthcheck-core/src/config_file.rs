use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".healthcheck.toml";

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub history: Option<HistoryFileConfig>,
    pub export: Option<ExportConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_file_size_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFileConfig {
    pub storage_path: Option<String>,
    pub key: Option<String>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_dir: Option<String>,
    /// Empty string disables the icon.
    pub warning_icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub default_sort: Option<String>,
    pub color: Option<bool>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Platform config directory path: `<config_dir>/healthcheck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("healthcheck").join("config.toml"))
}

/// Load config by cascading CWD `.healthcheck.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(LOCAL_CONFIG_FILE));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// `overlay`'s field when set, otherwise `base`'s.
fn pick<S, T: Clone>(
    base: &Option<S>,
    overlay: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            base_url: pick(&base.api, &overlay.api, |a| a.base_url.clone()),
            timeout_secs: pick(&base.api, &overlay.api, |a| a.timeout_secs),
            max_file_size_mb: pick(&base.api, &overlay.api, |a| a.max_file_size_mb),
        }),
        history: Some(HistoryFileConfig {
            storage_path: pick(&base.history, &overlay.history, |h| h.storage_path.clone()),
            key: pick(&base.history, &overlay.history, |h| h.key.clone()),
            max_items: pick(&base.history, &overlay.history, |h| h.max_items),
        }),
        export: Some(ExportConfig {
            output_dir: pick(&base.export, &overlay.export, |e| e.output_dir.clone()),
            warning_icon: pick(&base.export, &overlay.export, |e| e.warning_icon.clone()),
        }),
        display: Some(DisplayConfig {
            default_sort: pick(&base.display, &overlay.display, |d| d.default_sort.clone()),
            color: pick(&base.display, &overlay.display, |d| d.color),
        }),
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to_path(config, &path)?;
    Ok(path)
}

pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// A fully populated file describing the built-in defaults, for `config init`.
pub fn starter_config() -> ConfigFile {
    snapshot(&crate::Config::default(), true)
}

/// Express a resolved [`Config`](crate::Config) as a complete file.
pub fn snapshot(config: &crate::Config, color: bool) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            base_url: Some(config.api_base_url.clone()),
            timeout_secs: Some(config.request_timeout.as_secs()),
            max_file_size_mb: Some(config.max_upload_bytes / (1024 * 1024)),
        }),
        history: Some(HistoryFileConfig {
            storage_path: Some(config.storage_path.display().to_string()),
            key: Some(config.history.key.clone()),
            max_items: Some(config.history.max_items),
        }),
        export: Some(ExportConfig {
            output_dir: Some(config.export_dir.display().to_string()),
            warning_icon: Some(
                config
                    .warning_icon
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
        }),
        display: Some(DisplayConfig {
            default_sort: Some(config.default_sort.to_string()),
            color: Some(color),
        }),
    }
}
