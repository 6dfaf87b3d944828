//! Supervisor configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Background sweep configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SweepConfig {
    /// Whether the periodic liveness sweep is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between sweep passes.
    #[serde(default = "default_sweep_interval")]
    pub interval_seconds: u32,
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u32 {
    60
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_seconds: default_sweep_interval(),
        }
    }
}

/// Supervisor configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SupervisorConfig {
    /// Path to the `SQLite` database file.
    pub db_path: PathBuf,
    /// Expected seconds between agent check-ins.
    #[serde(default = "default_check_in_interval")]
    pub check_in_interval_seconds: u32,
    /// Missed intervals tolerated before a session is considered stale.
    #[serde(default = "default_missed_threshold")]
    pub missed_check_in_threshold: u32,
    /// Seconds a caller should wait before retrying a pending decision.
    #[serde(default = "default_pending_backoff")]
    pub pending_backoff_seconds: u32,
    /// Periodic liveness sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Directory for the append-only audit log; disabled when absent.
    #[serde(default)]
    pub audit_log_dir: Option<PathBuf>,
}

fn default_check_in_interval() -> u32 {
    1800
}

fn default_missed_threshold() -> u32 {
    2
}

fn default_pending_backoff() -> u32 {
    30
}

impl SupervisorConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Seconds of silence beyond which a session is stale.
    ///
    /// This is the check-in interval multiplied by the missed threshold,
    /// saturating rather than wrapping on absurd configurations.
    #[must_use]
    pub fn stale_after_seconds(&self) -> i64 {
        i64::from(self.check_in_interval_seconds) * i64::from(self.missed_check_in_threshold)
    }

    fn validate(&self) -> Result<()> {
        if self.check_in_interval_seconds == 0 {
            return Err(AppError::Config(
                "check_in_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.missed_check_in_threshold == 0 {
            return Err(AppError::Config(
                "missed_check_in_threshold must be greater than zero".into(),
            ));
        }

        if self.pending_backoff_seconds == 0 {
            return Err(AppError::Config(
                "pending_backoff_seconds must be greater than zero".into(),
            ));
        }

        if self.sweep.interval_seconds == 0 {
            return Err(AppError::Config(
                "sweep.interval_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
