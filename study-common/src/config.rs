//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file. Resolution order for the
//! file location and for individual overridable keys:
//! 1. Command-line argument (highest priority, applied by binaries)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not fatal: a warning is logged and defaults apply.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the config file
pub const ENV_CONFIG: &str = "STUDY_CONFIG";
/// Environment variable overriding `storage.base_url`
pub const ENV_BASE_URL: &str = "STUDY_BASE_URL";
/// Environment variable overriding `database_path`
pub const ENV_DATABASE: &str = "STUDY_DATABASE";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct StudyConfig {
    /// SQLite database file (store service and client-local identity)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP port for the store service
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the store service, for remote clients; defaults to the
    /// local service on `port`
    #[serde(default)]
    pub store_url: Option<String>,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Condition catalog entries
    #[serde(default = "default_conditions")]
    pub conditions: Vec<ConditionEntry>,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub assignment: AssignmentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where media resources live
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base network location, e.g. `https://project.example.co`
    #[serde(default)]
    pub base_url: String,

    /// Logical bucket/namespace under the base location
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

/// One catalog entry as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionEntry {
    pub id: String,
    /// Object path inside the bucket
    pub object_path: String,
}

/// Playback timing
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Deadline for leaving Loading before a timeout failure
    #[serde(default = "default_loading_timeout_ms")]
    pub loading_timeout_ms: u64,

    /// Delay between the end signal and the completion record
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Re-entrancy window for like/cart toggles
    #[serde(default = "default_toggle_window_ms")]
    pub toggle_window_ms: u64,
}

/// Which sessions count toward a condition's load-balancing tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountBasis {
    /// Sessions that reached questionnaire-complete
    #[default]
    Completed,
    /// Every session with an assigned condition, finished or not
    Exposed,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignmentConfig {
    #[serde(default)]
    pub count_basis: CountBasis,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("study").join("study.db"))
        .unwrap_or_else(|| PathBuf::from("./study_data/study.db"))
}

fn default_port() -> u16 {
    5780
}

fn default_bucket() -> String {
    "study3-videos".to_string()
}

fn default_conditions() -> Vec<ConditionEntry> {
    [
        ("P306_C", "hls/P306-C/index.m3u8"),
        ("P306_M", "hls/P306-M/index.m3u8"),
        ("P312_C", "hls/P312-C/index.m3u8"),
        ("P318_C", "hls/P318-M/index.m3u8"),
    ]
    .into_iter()
    .map(|(id, path)| ConditionEntry {
        id: id.to_string(),
        object_path: path.to_string(),
    })
    .collect()
}

fn default_loading_timeout_ms() -> u64 {
    30_000
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_toggle_window_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bucket: default_bucket(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            loading_timeout_ms: default_loading_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            toggle_window_ms: default_toggle_window_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            port: default_port(),
            store_url: None,
            storage: StorageConfig::default(),
            conditions: default_conditions(),
            playback: PlaybackConfig::default(),
            assignment: AssignmentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl StudyConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Resolve and load configuration
    ///
    /// `cli_path` wins over `STUDY_CONFIG`, which wins over the platform config
    /// directory. An explicitly named file that does not parse is an error; a
    /// file that is simply absent falls back to defaults. Environment
    /// overrides are applied last.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                info!("Loaded config file: {}", path.display());
                Self::from_toml_str(&content)?
            }
            Some(path) => {
                warn!(
                    "Config file not found at {}, using built-in defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                warn!("No config file location available, using built-in defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Where remote clients reach the store service
    pub fn store_base_url(&self) -> String {
        match &self.store_url {
            Some(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => format!("http://127.0.0.1:{}", self.port),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            self.storage.base_url = base_url;
        }
        if let Ok(db) = std::env::var(ENV_DATABASE) {
            self.database_path = PathBuf::from(db);
        }
    }
}

/// Config file location per the resolution order
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|d| d.join("study").join("study.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudyConfig::default();
        assert_eq!(config.playback.loading_timeout_ms, 30_000);
        assert_eq!(config.playback.settle_delay_ms, 500);
        assert_eq!(config.playback.toggle_window_ms, 100);
        assert_eq!(config.assignment.count_basis, CountBasis::Completed);
        assert_eq!(config.storage.bucket, "study3-videos");
        assert_eq!(config.conditions.len(), 4);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = StudyConfig::from_toml_str(
            r#"
            port = 6000

            [storage]
            base_url = "https://media.example.org"

            [playback]
            settle_delay_ms = 250

            [assignment]
            count_basis = "exposed"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 6000);
        assert_eq!(config.storage.base_url, "https://media.example.org");
        assert_eq!(config.storage.bucket, "study3-videos");
        assert_eq!(config.playback.settle_delay_ms, 250);
        assert_eq!(config.playback.loading_timeout_ms, 30_000);
        assert_eq!(config.assignment.count_basis, CountBasis::Exposed);
        assert_eq!(config.conditions.len(), 4);
    }

    #[test]
    fn test_conditions_from_toml() {
        let config = StudyConfig::from_toml_str(
            r#"
            [[conditions]]
            id = "A"
            object_path = "a.mp4"

            [[conditions]]
            id = "B"
            object_path = "b.mp4"
            "#,
        )
        .unwrap();

        let ids: Vec<_> = config.conditions.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = StudyConfig::from_toml_str("port = \"not a number\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_store_base_url() {
        let config = StudyConfig::from_toml_str("port = 6001").unwrap();
        assert_eq!(config.store_base_url(), "http://127.0.0.1:6001");

        let config =
            StudyConfig::from_toml_str(r#"store_url = "https://store.example.org/""#).unwrap();
        assert_eq!(config.store_base_url(), "https://store.example.org/");
    }

    #[test]
    fn test_cli_path_wins() {
        let path = resolve_config_path(Some(Path::new("/tmp/explicit.toml")));
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }
}
