//! Reconciliation scan: rebuild ledger, timer and order state from the
//! resource manager's current truth.
//!
//! Runs at startup, after every settings change and whenever events were
//! lost. It does not depend on event history and can be re-run at any time:
//! a second pass with no intervening events changes nothing.

use std::collections::HashSet;

use tabsweep_core::{ContainerId, EntityFilter, EntityId, parse_timer_name};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::eviction::EvictionOutcome;
use crate::scheduler::ArmOutcome;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileReport {
    /// Tabs seen
    pub entities: usize,
    /// Effectively active tabs touched and disarmed
    pub active: usize,
    /// Tabs whose countdown started now, having no ledger entry
    pub started: usize,
    pub armed: usize,
    /// Tabs already past their threshold, closed during the scan
    pub evicted: Vec<EntityId>,
    /// Ledger entries for tabs that no longer exist
    pub forgotten: Vec<EntityId>,
    /// Eviction timers for tabs that no longer exist
    pub orphan_timers: Vec<EntityId>,
    /// Tabs moved to restore group ordering
    pub moved: usize,
}

impl Engine {
    pub async fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if self.settings().await.is_none() {
            debug!("Settings not loaded, skipping reconciliation");
            return report;
        }

        let entities = match self.resources.list_entities(EntityFilter::all()).await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(error = %e, "Failed to list tabs, skipping reconciliation");
                return report;
            }
        };
        let containers: Vec<ContainerId> = match self.resources.list_containers().await {
            Ok(containers) => containers.into_iter().map(|c| c.id).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list windows, reordering only those with tabs");
                let mut ids: Vec<ContainerId> = entities.iter().map(|e| e.container).collect();
                ids.sort();
                ids.dedup();
                ids
            }
        };
        let focused = match self.resources.focused_container().await {
            Ok(focused) => focused,
            Err(e) => {
                debug!(error = %e, "Focus lookup failed, treating every tab as inactive");
                None
            }
        };
        report.entities = entities.len();

        let live: HashSet<EntityId> = entities.iter().map(|e| e.id).collect();
        report.forgotten = self.ledger.forget_missing(&live).await;
        report.orphan_timers = self.clear_orphan_timers(&live).await;

        for entity in entities {
            let id = entity.id;
            if entity.active && focused == Some(entity.container) {
                self.touch_and_disarm(id).await;
                report.active += 1;
                continue;
            }

            if self.ledger.touch_if_absent(id, self.now()).await {
                report.started += 1;
            }
            match self.arm(id, Some(entity)).await {
                ArmOutcome::Armed { .. } => report.armed += 1,
                ArmOutcome::EvictedNow(EvictionOutcome::Removed) => report.evicted.push(id),
                _ => {}
            }
        }

        for container in containers {
            report.moved += self.reorder(container).await.moved.len();
        }

        info!(
            entities = report.entities,
            active = report.active,
            started = report.started,
            armed = report.armed,
            evicted = report.evicted.len(),
            forgotten = report.forgotten.len(),
            orphan_timers = report.orphan_timers.len(),
            moved = report.moved,
            "Reconciliation complete"
        );
        report
    }

    async fn clear_orphan_timers(&self, live: &HashSet<EntityId>) -> Vec<EntityId> {
        let names = match self.timers.list_timers().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Failed to list timers");
                return Vec::new();
            }
        };
        let mut orphans = Vec::new();
        for id in names.iter().filter_map(|n| parse_timer_name(n)) {
            if !live.contains(&id) && self.disarm(id).await {
                orphans.push(id);
            }
        }
        orphans.sort();
        orphans
    }
}
