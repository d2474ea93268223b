//! Application configuration loaded once from `config.yaml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default name of the configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data: DataConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source directory settings (`data.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path segments joined into the source directory.
    pub path: Vec<String>,
    /// Match the `.xlsx` extension regardless of case.
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: String,
}

/// Store settings (`database.*`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub name: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Spreadsheet header names for the two loaded columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub date: String,
    pub delta: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            date: "Rep_dt".to_string(),
            delta: "Delta".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file, truncated at startup. `None` logs to stderr.
    pub file: Option<String>,
    /// Default filter directive, e.g. `info` or `delta_lag=debug`.
    pub level: Option<String>,
}

fn default_quarantine_dir() -> String {
    "problem_files".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data.path.is_empty() {
            return Err(ConfigError::Invalid("data.path must have at least one segment".into()));
        }
        if self.data.quarantine_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("data.quarantine_dir must not be empty".into()));
        }
        if !is_supported_backend(&self.database.kind) {
            return Err(ConfigError::Invalid(format!(
                "unsupported database.type '{}' (expected 'sqlite')",
                self.database.kind
            )));
        }
        if self.database.name.trim().is_empty() {
            return Err(ConfigError::Invalid("database.name must not be empty".into()));
        }
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid("schedule.interval_secs must be positive".into()));
        }
        Ok(())
    }

    /// Source directory: `data.path` segments joined under the working directory.
    pub fn source_dir(&self) -> PathBuf {
        self.data.path.iter().fold(PathBuf::from("."), |acc, seg| acc.join(seg))
    }

    /// Store location: `database.path` joined with `database.name`.
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.database.path).join(&self.database.name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }
}

/// Backend tags accepted for `database.type`.
pub fn is_supported_backend(kind: &str) -> bool {
    matches!(kind.trim().to_ascii_lowercase().as_str(), "sqlite" | "sqlite3")
}
