//! Configuration loading, validation, and management for tabsweep.
//!
//! Loads configuration from `~/.tabsweep/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tabsweep_core::{Settings, ThresholdUnit};

/// The root configuration structure.
///
/// Maps directly to `~/.tabsweep/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Initial settings snapshot, used until a settings store publishes one
    #[serde(default)]
    pub settings: Settings,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Remaining delays shorter than this are treated as already due
    #[serde(default = "default_min_timer_delay_ms")]
    pub min_timer_delay_ms: u64,

    /// Delay before reordering a window after a tab closed in it
    #[serde(default = "default_reorder_debounce_ms")]
    pub reorder_debounce_ms: u64,

    #[serde(default = "RetryConfig::eviction")]
    pub eviction_retry: RetryConfig,

    #[serde(default = "RetryConfig::reorder")]
    pub reorder_retry: RetryConfig,
}

fn default_min_timer_delay_ms() -> u64 {
    1000
}
fn default_reorder_debounce_ms() -> u64 {
    300
}

impl EngineConfig {
    pub fn min_timer_delay(&self) -> Duration {
        Duration::from_millis(self.min_timer_delay_ms)
    }

    pub fn reorder_debounce(&self) -> Duration {
        Duration::from_millis(self.reorder_debounce_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_timer_delay_ms: default_min_timer_delay_ms(),
            reorder_debounce_ms: default_reorder_debounce_ms(),
            eviction_retry: RetryConfig::eviction(),
            reorder_retry: RetryConfig::reorder(),
        }
    }
}

/// Bounded fixed-delay retry on a locked tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl RetryConfig {
    /// Closing a tab: 5 attempts.
    pub fn eviction() -> Self {
        Self {
            max_attempts: 5,
            delay_ms: 200,
        }
    }

    /// Moving a tab: more attempts, since a reorder is usually triggered
    /// while the user is still dragging.
    pub fn reorder() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 200,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.tabsweep/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `TABSWEEP_AUTO_ARCHIVE` (`true` / `false`)
    /// - `TABSWEEP_THRESHOLD` (`30m`, `12h`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".tabsweep")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Apply overrides from a key lookup (the process environment in
    /// [`AppConfig::load`]).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup("TABSWEEP_AUTO_ARCHIVE") {
            self.settings.auto_archive = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "TABSWEEP_AUTO_ARCHIVE: expected a boolean, got '{other}'"
                    )));
                }
            };
        }

        if let Some(raw) = lookup("TABSWEEP_THRESHOLD") {
            let (threshold, unit) = parse_threshold(&raw)?;
            self.settings.threshold = threshold;
            self.settings.unit = unit;
        }

        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.threshold == 0 {
            return Err(ConfigError::ValidationError(
                "settings.threshold must be at least 1".into(),
            ));
        }

        if self.engine.eviction_retry.max_attempts == 0
            || self.engine.reorder_retry.max_attempts == 0
        {
            return Err(ConfigError::ValidationError(
                "retry max_attempts must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml()
    }
}

/// Parse a threshold like `45m` or `12h`.
pub fn parse_threshold(raw: &str) -> Result<(u32, ThresholdUnit), ConfigError> {
    let raw = raw.trim();
    let invalid = || {
        ConfigError::ValidationError(format!(
            "invalid threshold '{raw}' (expected e.g. 30m or 12h)"
        ))
    };

    let (digits, unit) = match raw.char_indices().last() {
        Some((i, 'm')) => (&raw[..i], ThresholdUnit::Minutes),
        Some((i, 'h')) => (&raw[..i], ThresholdUnit::Hours),
        _ => return Err(invalid()),
    };
    let value: u32 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }
    Ok((value, unit))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
