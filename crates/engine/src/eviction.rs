//! Eviction executor: closes a tab whose timer fired.
//!
//! A fired timer is only a trigger: eligibility is re-checked against the
//! tab's current state and ledger entry before anything is closed. Whatever
//! happens, the tab's ledger entry and timer are gone afterwards.

use std::time::Duration;

use tabsweep_core::{Entity, EntityId};
use tracing::{debug, info, warn};

use crate::eligibility::{Verdict, evaluate};
use crate::engine::Engine;
use crate::retry::{RetryError, retry_transient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictionOutcome {
    /// Settings not loaded; nothing was touched
    Skipped,
    Removed,
    /// State changed since the timer was armed
    NoLongerEligible,
    /// The tab no longer exists
    Gone,
    Failed(String),
}

impl Engine {
    /// Re-validate and close tab `id`. Uses `snapshot` when given, otherwise
    /// fetches the tab.
    pub async fn evict(&self, id: EntityId, snapshot: Option<Entity>) -> EvictionOutcome {
        if self.settings().await.is_none() {
            return EvictionOutcome::Skipped;
        }

        let outcome = self.try_evict(id, snapshot).await;

        // No ledger entry or timer may outlive an attempt
        self.ledger.forget(id).await;
        self.disarm(id).await;

        outcome
    }

    async fn try_evict(&self, id: EntityId, snapshot: Option<Entity>) -> EvictionOutcome {
        let Some(settings) = self.settings().await else {
            return EvictionOutcome::Skipped;
        };

        let entity = match snapshot {
            Some(entity) => entity,
            None => match self.resources.get_entity(id).await {
                Ok(entity) => entity,
                Err(e) if e.is_not_found() => {
                    debug!(entity = %id, "Tab already gone");
                    return EvictionOutcome::Gone;
                }
                Err(e) => {
                    warn!(entity = %id, error = %e, "Failed to fetch tab for eviction");
                    return EvictionOutcome::Failed(e.to_string());
                }
            },
        };

        let active = self.is_effectively_active(&entity).await;
        let last_active = self.ledger.last_active(id).await;
        let verdict = evaluate(&entity, last_active, &settings, active, self.now());
        if !self.is_due(verdict) {
            debug!(entity = %id, ?verdict, "Tab no longer eligible for archiving");
            return EvictionOutcome::NoLongerEligible;
        }

        let resources = &self.resources;
        let removal = retry_transient(self.eviction_policy(), "remove", move || {
            resources.remove_entity(id)
        })
        .await;
        match removal {
            Ok(()) => {
                info!(entity = %id, container = %entity.container, "Archived inactive tab");
                EvictionOutcome::Removed
            }
            Err(e) if e.is_not_found() => {
                debug!(entity = %id, "Tab closed while archiving");
                EvictionOutcome::Gone
            }
            Err(e @ RetryError::Exhausted { .. }) => {
                warn!(entity = %id, error = %e, "Giving up archiving locked tab");
                EvictionOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!(entity = %id, error = %e, "Failed to archive tab");
                EvictionOutcome::Failed(e.to_string())
            }
        }
    }

    /// Due, or close enough that no timer could meaningfully fire later.
    pub(crate) fn is_due(&self, verdict: Verdict) -> bool {
        match verdict {
            Verdict::Due => true,
            Verdict::Pending { remaining_ms } => {
                Duration::from_millis(remaining_ms) < self.config.min_timer_delay()
            }
            Verdict::Ineligible(_) => false,
        }
    }
}
