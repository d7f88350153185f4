//! Beacon configuration.
//!
//! Read from an optional TOML file; CLI flags override individual fields.
//!
//! ```toml
//! period = "10s"
//! run_for = "5m"
//! ledger_path = "./ledger.json"
//! log_filter = "commit_beacon=debug"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::DEFAULT_PERIOD_SECS;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`BeaconConfig`].
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Beacon settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BeaconConfig {
    /// Round period.
    #[serde(deserialize_with = "de_duration")]
    pub period: Duration,

    /// How long to run before stopping. `None` runs until interrupted.
    #[serde(deserialize_with = "de_opt_duration")]
    pub run_for: Option<Duration>,

    /// JSON ledger file. `None` keeps commitments in memory.
    pub ledger_path: Option<PathBuf>,

    /// Default tracing filter, overridden by `RUST_LOG`.
    pub log_filter: String,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(DEFAULT_PERIOD_SECS),
            run_for: None,
            ledger_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl BeaconConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Set the round period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Set the run duration.
    pub fn with_run_for(mut self, run_for: Duration) -> Self {
        self.run_for = Some(run_for);
        self
    }

    /// Set the ledger file.
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = Some(path.into());
        self
    }

    /// Set the default log filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::Invalid("period must be non-zero".into()));
        }
        if self.run_for.map_or(false, |d| d.is_zero()) {
            return Err(ConfigError::Invalid("run_for must be non-zero".into()));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log_filter must not be empty".into()));
        }
        Ok(())
    }
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

fn de_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    de_duration(deserializer).map(Some)
}
