//! Error types for the tabsweep domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum.

use thiserror::Error;

/// Failures reported by a [`crate::ResourceManager`].
///
/// The three variants are the three ways the engine reacts to a failed call:
/// clean up quietly, retry shortly, or log and abort the current operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The tab or window vanished between observation and action.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The target is mid user interaction (e.g. a tab being dragged).
    #[error("resource is locked: {0}")]
    Locked(String),

    #[error("unexpected resource failure: {0}")]
    Unexpected(String),
}

impl ResourceError {
    pub fn entity_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: format!("tab {id}"),
        }
    }

    pub fn container_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what: format!("window {id}"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure is worth retrying after a short delay.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum TimerError {
    #[error("timer service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}
