//! Runtime configuration
//!
//! Configuration is resolved in three layers: built-in defaults, an optional
//! TOML file, then `TIDALCORE_*` environment variables. Unparseable numeric
//! environment values are ignored and the previous layer's value is kept.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default retention cap for backup artifacts
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Default upload size limit (50 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TidalConfig {
    pub database: DatabaseSettings,
    pub backup: BackupSettings,
    pub upload: UploadSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tidalcore.db"),
        }
    }
}

/// Where artifacts live and how many are kept
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupSettings {
    pub directory: PathBuf,
    pub max_backups: usize,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("backups"),
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }
}

/// Boundary checks applied to uploaded dumps before they reach the engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UploadSettings {
    pub max_bytes: u64,
    pub allowed_extension: String,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_extension: ".sql".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl TidalConfig {
    /// Resolve configuration from defaults, an optional file, and the process environment
    ///
    /// A missing file is not an error: defaults and environment still apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => Self::load_from_file(path)?,
            Some(path) => {
                tracing::debug!(path = ?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file without environment overrides
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn load_from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TIDALCORE_*` overrides obtained through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TIDALCORE_DB_PATH") {
            self.database.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TIDALCORE_BACKUP_DIR") {
            self.backup.directory = PathBuf::from(v);
        }
        if let Some(v) = lookup("TIDALCORE_MAX_BACKUPS")
            && let Ok(max) = v.parse::<usize>()
        {
            self.backup.max_backups = max;
        }
        if let Some(v) = lookup("TIDALCORE_MAX_UPLOAD_BYTES")
            && let Ok(max) = v.parse::<u64>()
        {
            self.upload.max_bytes = max;
        }
        if let Some(v) = lookup("TIDALCORE_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("TIDALCORE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("TIDALCORE_LOG_FORMAT") {
            match v.to_ascii_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "pretty" => self.logging.format = LogFormat::Pretty,
                other => tracing::warn!(value = %other, "Ignoring unknown TIDALCORE_LOG_FORMAT"),
            }
        }
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backup.max_backups == 0 {
            return Err(ConfigError::Invalid(
                "backup.max_backups must be at least 1".to_string(),
            ));
        }

        if self.upload.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "upload.max_bytes must be at least 1".to_string(),
            ));
        }

        if !self.upload.allowed_extension.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "upload.allowed_extension must start with '.', got '{}'",
                self.upload.allowed_extension
            )));
        }

        if self.backup.max_backups > DEFAULT_MAX_BACKUPS {
            tracing::warn!(
                max_backups = self.backup.max_backups,
                "Retention cap raised above the default"
            );
        }

        Ok(())
    }
}
