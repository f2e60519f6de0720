//! Expiration scheduler: one named eviction timer per inactive tab.
//!
//! Arming always clears first, so repeated or overlapping arms for the same
//! tab leave exactly one timer, carrying the delay of the last arm.

use std::time::Duration;

use tabsweep_core::{Entity, EntityId, parse_timer_name, timer_name};
use tracing::{debug, warn};

use crate::eligibility::{IneligibleReason, Verdict, evaluate};
use crate::engine::Engine;
use crate::eviction::EvictionOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmOutcome {
    /// Unconfigured, disabled, invalid id, or the tab could not be fetched
    Skipped,
    /// The tab is effectively active; any timer was cleared
    Disarmed,
    Ineligible(IneligibleReason),
    Armed { delay: Duration },
    /// Already due, evicted on the spot
    EvictedNow(EvictionOutcome),
    Failed(String),
}

impl Engine {
    /// (Re)arm the eviction timer for `id`.
    ///
    /// Uses `snapshot` when given, otherwise fetches the tab.
    pub async fn arm(&self, id: EntityId, snapshot: Option<Entity>) -> ArmOutcome {
        let Some(settings) = self.settings().await else {
            return ArmOutcome::Skipped;
        };
        if !settings.auto_archive || !id.is_valid() {
            return ArmOutcome::Skipped;
        }

        self.disarm(id).await;

        let entity = match snapshot {
            Some(entity) => entity,
            None => match self.resources.get_entity(id).await {
                Ok(entity) => entity,
                Err(e) if e.is_not_found() => {
                    debug!(entity = %id, "Tab gone before arming");
                    return ArmOutcome::Skipped;
                }
                Err(e) => {
                    warn!(entity = %id, error = %e, "Failed to fetch tab for arming");
                    return ArmOutcome::Skipped;
                }
            },
        };

        let active = self.is_effectively_active(&entity).await;
        if active {
            return ArmOutcome::Disarmed;
        }

        let last_active = self.ledger.last_active(id).await;
        match evaluate(&entity, last_active, &settings, active, self.now()) {
            Verdict::Ineligible(reason) => {
                debug!(entity = %id, %reason, "Not arming");
                ArmOutcome::Ineligible(reason)
            }
            Verdict::Due => ArmOutcome::EvictedNow(self.evict(id, Some(entity)).await),
            Verdict::Pending { remaining_ms } => {
                let delay = Duration::from_millis(remaining_ms);
                if delay < self.config.min_timer_delay() {
                    return ArmOutcome::EvictedNow(self.evict(id, Some(entity)).await);
                }
                self.create_timer(id, delay).await
            }
        }
    }

    async fn create_timer(&self, id: EntityId, delay: Duration) -> ArmOutcome {
        let name = timer_name(id);
        let _gate = self.timer_gate.lock().await;
        if let Err(e) = self.timers.clear_timer(&name).await {
            warn!(entity = %id, error = %e, "Failed to clear timer before arming");
        }
        match self.timers.create_timer(&name, delay).await {
            Ok(()) => {
                debug!(entity = %id, delay_ms = delay.as_millis() as u64, "Eviction timer armed");
                ArmOutcome::Armed { delay }
            }
            Err(e) => {
                warn!(entity = %id, error = %e, "Failed to create eviction timer");
                ArmOutcome::Failed(e.to_string())
            }
        }
    }

    /// Cancel the eviction timer for `id`, if any. Returns whether one existed.
    pub async fn disarm(&self, id: EntityId) -> bool {
        let name = timer_name(id);
        let _gate = self.timer_gate.lock().await;
        match self.timers.clear_timer(&name).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(entity = %id, error = %e, "Failed to clear eviction timer");
                false
            }
        }
    }

    /// Cancel every outstanding eviction timer. Foreign timers are left alone.
    pub async fn clear_all_timers(&self) -> usize {
        let names = match self.timers.list_timers().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list timers");
                return 0;
            }
        };
        let mut cleared = 0;
        for id in names.iter().filter_map(|n| parse_timer_name(n)) {
            if self.disarm(id).await {
                cleared += 1;
            }
        }
        cleared
    }

    /// Mark a tab as used now and cancel its countdown.
    pub async fn touch_and_disarm(&self, id: EntityId) {
        self.ledger.touch(id, self.now()).await;
        self.disarm(id).await;
    }
}
