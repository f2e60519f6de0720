//! Container reorder engine: ungrouped tabs never precede grouped ones.
//!
//! Each pass re-derives the violators from the window's current order, so
//! partial failures are repaired by the next pass instead of accumulating.
//! Pinned tabs are never moved.

use std::sync::Arc;

use tabsweep_core::{ContainerId, Entity, EntityFilter, EntityId};
use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::retry::retry_transient;

/// The moves needed to restore the ordering invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    /// Index every violator is moved to, one after another
    pub target: usize,
    /// Ungrouped tabs sitting before the last grouped tab, in window order
    pub violators: Vec<EntityId>,
}

/// Compute the moves for one window. `None` when nothing has to move,
/// including when the window has no grouped tabs at all.
pub fn plan_reorder(entities: &[Entity]) -> Option<ReorderPlan> {
    let boundary = entities
        .iter()
        .filter(|e| !e.pinned && e.is_grouped())
        .map(|e| e.index)
        .max()?;

    let mut violators: Vec<&Entity> = entities
        .iter()
        .filter(|e| !e.pinned && !e.is_grouped() && e.index < boundary)
        .collect();
    if violators.is_empty() {
        return None;
    }
    violators.sort_by_key(|e| e.index);

    // Assumes the resource manager removes a tab before inserting it and
    // clamps the target to the window end. Each move shifts the last group
    // left by one, so the same target lands every violator just after the
    // groups. Ungrouped tabs already past the boundary may end up after the
    // moved ones ([g, u1, g, u3] becomes [g, g, u3, u1]); only
    // grouped-before-ungrouped is kept, not the ungrouped tabs' relative order.
    Some(ReorderPlan {
        target: boundary + 1,
        violators: violators.into_iter().map(|e| e.id).collect(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderReport {
    pub moved: Vec<EntityId>,
    /// Tabs that stayed put: still locked after every retry, or failed
    pub skipped: Vec<EntityId>,
}

impl Engine {
    /// Restore the grouped-before-ungrouped order of one window.
    pub async fn reorder(&self, container: ContainerId) -> ReorderReport {
        let mut report = ReorderReport::default();
        match self.settings().await {
            Some(settings) if settings.reorder_groups => {}
            _ => return report,
        }

        let entities = match self
            .resources
            .list_entities(EntityFilter::in_container(container))
            .await
        {
            Ok(entities) => entities,
            Err(e) if e.is_not_found() => {
                debug!(container = %container, "Window gone before reorder");
                return report;
            }
            Err(e) => {
                warn!(container = %container, error = %e, "Failed to list tabs for reorder");
                return report;
            }
        };

        let Some(plan) = plan_reorder(&entities) else {
            return report;
        };

        let resources = &self.resources;
        for id in plan.violators {
            let target = plan.target;
            let moved = retry_transient(self.reorder_policy(), "move", move || {
                resources.move_entity(id, target)
            })
            .await;
            match moved {
                Ok(()) => report.moved.push(id),
                Err(e) if e.is_not_found() => {
                    debug!(entity = %id, "Tab closed during reorder");
                }
                Err(e) => {
                    warn!(entity = %id, container = %container, error = %e, "Skipping tab in reorder");
                    report.skipped.push(id);
                }
            }
        }

        if !report.moved.is_empty() {
            info!(
                container = %container,
                moved = report.moved.len(),
                skipped = report.skipped.len(),
                "Moved ungrouped tabs after groups"
            );
        }
        report
    }

    /// Reorder `container` after the debounce delay. Requests arriving while
    /// one is pending for the same window are dropped. Returns whether a new
    /// reorder was scheduled.
    pub async fn schedule_reorder(&self, container: ContainerId) -> bool {
        if !self.pending_reorders.lock().await.insert(container) {
            debug!(container = %container, "Reorder already pending");
            return false;
        }

        let engine = self.clone();
        let pending = Arc::clone(&self.pending_reorders);
        let delay = self.config.reorder_debounce();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.lock().await.remove(&container);
            engine.reorder(container).await;
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::time::Duration;
    use tabsweep_core::{GroupId, Settings};
    use tabsweep_runtime::TabSpec;

    fn tab(id: i64, index: usize, group: Option<i64>, pinned: bool) -> Entity {
        Entity {
            id: EntityId(id),
            container: ContainerId(1),
            index,
            pinned,
            group: group.map(GroupId),
            private: false,
            active: false,
            title: String::new(),
        }
    }

    #[test]
    fn plan_moves_ungrouped_past_last_group() {
        let entities = vec![tab(1, 0, Some(9), false), tab(2, 1, None, false), tab(3, 2, Some(9), false)];
        assert_eq!(
            plan_reorder(&entities),
            Some(ReorderPlan {
                target: 3,
                violators: vec![EntityId(2)]
            })
        );
    }

    #[test]
    fn plan_is_empty_without_groups() {
        let entities = vec![tab(1, 0, None, false), tab(2, 1, None, false)];
        assert_eq!(plan_reorder(&entities), None);
    }

    #[test]
    fn plan_ignores_pinned_and_trailing_tabs() {
        let entities = vec![
            tab(1, 0, None, true),
            tab(5, 3, None, false),
            tab(2, 1, None, false),
            tab(3, 2, Some(4), false),
            tab(4, 4, None, false),
        ];
        let plan = plan_reorder(&entities).unwrap();
        assert_eq!(plan.target, 3);
        assert_eq!(plan.violators, vec![EntityId(2)]);
    }

    #[test]
    fn plan_sorts_violators_by_position() {
        let entities = vec![
            tab(7, 1, None, false),
            tab(6, 0, None, false),
            tab(8, 2, Some(1), false),
        ];
        assert_eq!(plan_reorder(&entities).unwrap().violators, vec![EntityId(6), EntityId(7)]);
    }

    #[tokio::test]
    async fn grouped_ungrouped_grouped_becomes_grouped_first() {
        let h = Harness::new(minutes(60)).await;
        let (container, ids) = h
            .window(vec![TabSpec::grouped("g1", 1), TabSpec::titled("u"), TabSpec::grouped("g2", 1)])
            .await;

        let report = h.engine.reorder(container).await;

        assert_eq!(report.moved, vec![ids[1]]);
        assert_eq!(h.workspace.calls().await.moves, vec![(ids[1], 3)]);
        assert_eq!(h.workspace.order(container).await, vec![ids[0], ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn several_violators_keep_relative_order() {
        let h = Harness::new(minutes(60)).await;
        let (container, ids) = h
            .window(vec![
                TabSpec::pinned("p"),
                TabSpec::titled("u1"),
                TabSpec::titled("u2"),
                TabSpec::grouped("g1", 1),
                TabSpec::grouped("g2", 2),
            ])
            .await;

        h.engine.reorder(container).await;

        assert_eq!(
            h.workspace.order(container).await,
            vec![ids[0], ids[3], ids[4], ids[1], ids[2]]
        );
        // Already ordered: a second pass moves nothing
        assert!(h.engine.reorder(container).await.moved.is_empty());
    }

    #[tokio::test]
    async fn trailing_ungrouped_tab_may_precede_moved_one() {
        let h = Harness::new(minutes(60)).await;
        let (container, ids) = h
            .window(vec![
                TabSpec::grouped("g1", 1),
                TabSpec::titled("u1"),
                TabSpec::grouped("g2", 1),
                TabSpec::titled("u3"),
            ])
            .await;

        let report = h.engine.reorder(container).await;

        assert_eq!(report.moved, vec![ids[1]]);
        assert_eq!(
            h.workspace.order(container).await,
            vec![ids[0], ids[2], ids[3], ids[1]]
        );
        assert!(h.engine.reorder(container).await.moved.is_empty());
    }

    #[tokio::test]
    async fn no_groups_no_moves() {
        let h = Harness::new(minutes(60)).await;
        let (container, _) = h
            .window(vec![TabSpec::titled("b"), TabSpec::pinned("p"), TabSpec::titled("a")])
            .await;

        assert_eq!(h.engine.reorder(container).await, ReorderReport::default());
        assert!(h.workspace.calls().await.moves.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_tab_is_skipped_and_pass_continues() {
        let h = Harness::new(minutes(60)).await;
        let (container, ids) = h
            .window(vec![TabSpec::titled("u1"), TabSpec::titled("u2"), TabSpec::grouped("g", 1)])
            .await;
        h.workspace.lock_entity(ids[0], 100).await;

        let report = h.engine.reorder(container).await;

        assert_eq!(report.skipped, vec![ids[0]]);
        assert_eq!(report.moved, vec![ids[1]]);
        let attempts = h.workspace.calls().await.moves.iter().filter(|(id, _)| *id == ids[0]).count();
        assert_eq!(attempts, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn move_retries_through_a_drag() {
        let h = Harness::new(minutes(60)).await;
        let (container, ids) = h
            .window(vec![TabSpec::titled("u"), TabSpec::grouped("g", 1)])
            .await;
        h.workspace.lock_entity(ids[0], 7).await;

        assert_eq!(h.engine.reorder(container).await.moved, vec![ids[0]]);
        assert_eq!(h.workspace.order(container).await, vec![ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn disabled_reordering_does_nothing() {
        let h = Harness::new(Settings {
            reorder_groups: false,
            ..minutes(60)
        })
        .await;
        let (container, _) = h
            .window(vec![TabSpec::titled("u"), TabSpec::grouped("g", 1)])
            .await;

        assert_eq!(h.engine.reorder(container).await, ReorderReport::default());
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_reorders_coalesce() {
        let h = Harness::new(minutes(60)).await;
        let (container, ids) = h
            .window(vec![TabSpec::titled("u"), TabSpec::grouped("g", 1)])
            .await;

        assert!(h.engine.schedule_reorder(container).await);
        assert!(!h.engine.schedule_reorder(container).await);
        assert!(h.workspace.calls().await.moves.is_empty());

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.workspace.calls().await.moves.len(), 1);
        assert_eq!(h.workspace.order(container).await, vec![ids[1], ids[0]]);
        assert!(h.engine.schedule_reorder(container).await);
    }
}
