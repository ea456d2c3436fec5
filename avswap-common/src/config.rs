//! Bootstrap configuration
//!
//! Loaded once from TOML when the engine is created. Missing files are not an
//! error: a warning is logged and built-in defaults apply. A file that exists
//! but cannot be parsed or fails validation is reported as `Error::Config`.
//!
//! # Config File Resolution
//!
//! 1. Explicit path from the host
//! 2. `AVSWAP_CONFIG` environment variable
//! 3. `<config_dir>/avswap/config.toml`
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "AVSWAP_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct TomlConfig {
    /// Path to the SQLite track database (defaults to the data directory)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Synchronization tuning
    #[serde(default)]
    pub sync: SyncSettings,

    /// Content identity detection cadence
    #[serde(default)]
    pub identity: IdentitySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synchronization tuning for the shadow audio reconciler
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyncSettings {
    /// Drift (seconds) above which the shadow audio is snapped to the video
    #[serde(default = "default_drift_tolerance_s")]
    pub drift_tolerance_s: f64,

    /// Periodic reconciliation interval while the video is playing
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    /// Consecutive rejected play attempts before a `PlaybackBlocked` notice
    #[serde(default = "default_rejection_notice_threshold")]
    pub rejection_notice_threshold: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            drift_tolerance_s: default_drift_tolerance_s(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            rejection_notice_threshold: default_rejection_notice_threshold(),
        }
    }
}

impl SyncSettings {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }
}

/// Content identity polling
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IdentitySettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl IdentitySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_drift_tolerance_s() -> f64 {
    0.25
}

fn default_reconcile_interval_ms() -> u64 {
    250
}

fn default_rejection_notice_threshold() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    700
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from a TOML string and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load configuration, degrading to defaults when no file exists
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file location available, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Database path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    fn validate(&self) -> Result<()> {
        if !(self.sync.drift_tolerance_s.is_finite() && self.sync.drift_tolerance_s > 0.0) {
            return Err(Error::Config(format!(
                "sync.drift_tolerance_s must be a positive number, got {}",
                self.sync.drift_tolerance_s
            )));
        }
        if self.sync.reconcile_interval_ms == 0 {
            return Err(Error::Config(
                "sync.reconcile_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.identity.poll_interval_ms == 0 {
            return Err(Error::Config(
                "identity.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locate the config file following the resolution order above
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("avswap").join("config.toml"))
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("avswap"))
        .unwrap_or_else(|| PathBuf::from("./avswap_data"))
        .join("avswap.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.sync.drift_tolerance_s, 0.25);
        assert_eq!(config.sync.reconcile_interval_ms, 250);
        assert_eq!(config.identity.poll_interval_ms, 700);
        assert_eq!(config.logging.level, "info");
        assert!(config.database_path().ends_with("avswap.db"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [sync]
            drift_tolerance_s = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.drift_tolerance_s, 0.5);
        assert_eq!(config.sync.reconcile_interval_ms, 250);
        assert_eq!(config.identity, IdentitySettings::default());
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        let result = TomlConfig::from_toml_str("[sync]\ndrift_tolerance_s = 0.0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let result = TomlConfig::from_toml_str("[identity]\npoll_interval_ms = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[sync\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
