//! The user-facing settings snapshot and the store that supplies it.
//!
//! A [`Settings`] value is immutable once published; a change replaces it
//! wholesale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Unit of the inactivity threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    Minutes,
    #[default]
    Hours,
}

impl ThresholdUnit {
    pub fn millis(self) -> u64 {
        match self {
            ThresholdUnit::Minutes => 60_000,
            ThresholdUnit::Hours => 3_600_000,
        }
    }
}

impl std::fmt::Display for ThresholdUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdUnit::Minutes => write!(f, "minutes"),
            ThresholdUnit::Hours => write!(f, "hours"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Archive inactive tabs automatically
    #[serde(default = "default_true")]
    pub auto_archive: bool,

    /// Inactivity threshold, in `unit`
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    #[serde(default)]
    pub unit: ThresholdUnit,

    /// Also archive tabs in private windows
    #[serde(default)]
    pub include_private: bool,

    /// Keep ungrouped tabs after grouped ones
    #[serde(default = "default_true")]
    pub reorder_groups: bool,
}

fn default_true() -> bool {
    true
}
fn default_threshold() -> u32 {
    12
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_archive: true,
            threshold: default_threshold(),
            unit: ThresholdUnit::default(),
            include_private: false,
            reorder_groups: true,
        }
    }
}

impl Settings {
    /// The inactivity threshold in milliseconds.
    pub fn threshold_ms(&self) -> u64 {
        u64::from(self.threshold) * self.unit.millis()
    }
}

/// Supplies the current settings. Changes are published separately as
/// [`crate::LifecycleEvent::SettingsChanged`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// `Ok(None)` means nothing has been stored yet.
    async fn get_settings(&self) -> Result<Option<Settings>, SettingsError>;
}
