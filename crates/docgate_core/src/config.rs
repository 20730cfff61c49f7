//! Runtime configuration for embedding hosts and the CLI.
//!
//! Values come from `DOCGATE_*` environment variables with defaults suited
//! to a local database file. Malformed values are rejected instead of being
//! replaced by defaults.

use crate::db::{open_db_with_busy_timeout, DbResult, DEFAULT_BUSY_TIMEOUT};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "DOCGATE_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "DOCGATE_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "DOCGATE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DOCGATE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "docgate.sqlite3";

/// SQLite stores the busy timeout as a C `int` of milliseconds.
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("`{key}` must be a non-negative integer, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },
    #[error("`{key}` must be at most {max}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        max: u64,
    },
    #[error("`{0}` is set but empty")]
    EmptyValue(&'static str),
}

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// SQLite database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file; created and migrated on first open.
    pub path: PathBuf,
    /// How long a connection waits on a locked database.
    pub busy_timeout_ms: u64,
}

/// File logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: PathBuf::from(DEFAULT_DB_FILE_NAME),
                busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            },
            logging: LoggingConfig {
                level: default_log_level().to_string(),
                dir: None,
            },
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = non_empty(&lookup, ENV_DB_PATH)? {
            config.database.path = PathBuf::from(path);
        }
        if let Some(value) = non_empty(&lookup, ENV_BUSY_TIMEOUT_MS)? {
            let millis: u64 = value.parse().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_BUSY_TIMEOUT_MS,
                value,
            })?;
            if millis > MAX_BUSY_TIMEOUT_MS {
                return Err(ConfigError::OutOfRange {
                    key: ENV_BUSY_TIMEOUT_MS,
                    value: millis,
                    max: MAX_BUSY_TIMEOUT_MS,
                });
            }
            config.database.busy_timeout_ms = millis;
        }
        if let Some(level) = non_empty(&lookup, ENV_LOG_LEVEL)? {
            config.logging.level = level;
        }
        if let Some(dir) = non_empty(&lookup, ENV_LOG_DIR)? {
            config.logging.dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

impl DatabaseConfig {
    /// Busy timeout, capped at what SQLite can store.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.min(MAX_BUSY_TIMEOUT_MS))
    }

    /// Opens and migrates the configured database.
    pub fn open(&self) -> DbResult<Connection> {
        open_db_with_busy_timeout(&self.path, self.busy_timeout())
    }
}

impl LoggingConfig {
    /// Starts file logging when a directory is configured.
    ///
    /// Returns whether logging is active afterwards.
    pub fn init(&self) -> Result<bool, LoggingError> {
        match &self.dir {
            Some(dir) => init_logging(&self.level, dir).map(|()| true),
            None => Ok(false),
        }
    }
}

fn non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue(key)),
        Some(value) => Ok(Some(value.trim().to_string())),
    }
}
