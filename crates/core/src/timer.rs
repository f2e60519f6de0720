//! Timer service trait and the timer-name codec.
//!
//! Eviction timers are named, one-shot and singleton per name. The name is
//! the only link between a fired timer and its tab, so the codec below must
//! stay a bijection on valid ids.

use std::time::Duration;

use async_trait::async_trait;

use crate::entity::EntityId;
use crate::error::TimerError;

/// Prefix shared by every eviction timer.
pub const TIMER_PREFIX: &str = "archiveTimer_tab_";

/// Name of the eviction timer for `id`.
pub fn timer_name(id: EntityId) -> String {
    format!("{TIMER_PREFIX}{}", id.0)
}

/// Inverse of [`timer_name`]. Returns `None` for foreign or malformed names.
///
/// Only the canonical decimal rendering is accepted ("+7" and "007" are
/// rejected), so no two names map to the same id.
pub fn parse_timer_name(name: &str) -> Option<EntityId> {
    let digits = name.strip_prefix(TIMER_PREFIX)?;
    let value: i64 = digits.parse().ok()?;
    let id = EntityId(value);
    (id.is_valid() && value.to_string() == digits).then_some(id)
}

/// A facility for named one-shot timers.
///
/// Firing is reported out of band, as a
/// [`crate::LifecycleEvent::TimerFired`] carrying the name.
#[async_trait]
pub trait TimerService: Send + Sync {
    /// Create a timer firing after `delay`. An existing timer with the same
    /// name is replaced.
    async fn create_timer(&self, name: &str, delay: Duration) -> Result<(), TimerError>;

    /// Cancel a timer. Returns whether one existed.
    async fn clear_timer(&self, name: &str) -> Result<bool, TimerError>;

    /// Names of all outstanding timers.
    async fn list_timers(&self) -> Result<Vec<String>, TimerError>;
}
