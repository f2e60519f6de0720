//! Activity ledger: last-active timestamp per tab.
//!
//! Presence of an entry is meaningful: a tab without one has unknown history
//! and is never archived. Entries appear the first time a tab is observed and
//! vanish when the tab is destroyed or after an eviction attempt.

use std::collections::{HashMap, HashSet};

use tabsweep_core::EntityId;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct ActivityLedger {
    entries: RwLock<HashMap<EntityId, i64>>,
}

impl ActivityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as active at `now`. Ignores the sentinel id.
    pub async fn touch(&self, id: EntityId, now: i64) {
        if !id.is_valid() {
            return;
        }
        self.entries.write().await.insert(id, now);
    }

    /// Start a countdown for `id` unless one is already running.
    /// Returns whether an entry was created.
    pub async fn touch_if_absent(&self, id: EntityId, now: i64) -> bool {
        if !id.is_valid() {
            return false;
        }
        let mut entries = self.entries.write().await;
        if entries.contains_key(&id) {
            return false;
        }
        entries.insert(id, now);
        true
    }

    pub async fn forget(&self, id: EntityId) -> bool {
        self.entries.write().await.remove(&id).is_some()
    }

    pub async fn last_active(&self, id: EntityId) -> Option<i64> {
        self.entries.read().await.get(&id).copied()
    }

    pub async fn contains(&self, id: EntityId) -> bool {
        self.entries.read().await.contains_key(&id)
    }

    /// Forget every id not in `live`. Returns the forgotten ids.
    pub async fn forget_missing(&self, live: &HashSet<EntityId>) -> Vec<EntityId> {
        let mut entries = self.entries.write().await;
        let stale: Vec<EntityId> = entries.keys().filter(|id| !live.contains(id)).copied().collect();
        for id in &stale {
            entries.remove(id);
        }
        stale
    }

    /// All entries, sorted by id.
    pub async fn entries(&self) -> Vec<(EntityId, i64)> {
        let mut entries: Vec<(EntityId, i64)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(id, ts)| (*id, *ts))
            .collect();
        entries.sort();
        entries
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
