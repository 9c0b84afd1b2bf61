//! Runtime configuration, read from the environment.

use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_DB_PATH: &str = ".taskflow/state.db";
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Extra attempts after an optimistic-lock conflict.
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Config {
    /// Reads `TASKFLOW_DB` and `TASKFLOW_MAX_RETRIES`, falling back to defaults.
    ///
    /// # Errors
    /// Returns `InvalidValue` if `TASKFLOW_MAX_RETRIES` is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_path = lookup("TASKFLOW_DB").map_or(defaults.db_path, PathBuf::from);

        let max_retries = match lookup("TASKFLOW_MAX_RETRIES") {
            Some(raw) => raw.trim().parse().map_err(|e| {
                ConfigError::InvalidValue("TASKFLOW_MAX_RETRIES".to_string(), format!("{e}"))
            })?,
            None => defaults.max_retries,
        };

        Ok(Self {
            db_path,
            max_retries,
        })
    }
}
