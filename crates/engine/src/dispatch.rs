//! Event dispatcher: routes lifecycle events to engine operations.
//!
//! Routing is split in two: [`plan`] is a pure mapping from an event to the
//! [`Action`]s it calls for, and [`Engine::execute`] performs one action
//! against live state. Every action re-validates at the point of use, so a
//! plan built from a stale event is still safe to run.

use std::sync::Arc;

use tabsweep_core::{
    ContainerId, Entity, EntityFilter, EntityId, LifecycleEvent, Settings, parse_timer_name,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::engine::Engine;

/// One side-effecting step the engine takes in response to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A tab appeared: start tracking it
    Observe(Entity),
    /// A tab's attributes changed: touch it if active, otherwise rearm
    Refresh(Entity),
    /// The tab just became the selection of its window
    Activate(EntityId),
    /// Rearm every tab of a window except `except`
    ArmContainer {
        container: ContainerId,
        except: Option<EntityId>,
    },
    /// Nothing has focus: rearm every tab
    ArmAll,
    /// `container` gained focus: touch its active tab, rearm the rest
    FocusContainer(ContainerId),
    Disarm(EntityId),
    Forget(EntityId),
    Reorder(ContainerId),
    ReorderDebounced(ContainerId),
    Evict(EntityId),
    ReplaceSettings(Option<Settings>),
    ClearTimers,
    Reconcile,
}

/// The actions `event` calls for, in execution order.
pub fn plan(event: &LifecycleEvent) -> Vec<Action> {
    use Action::*;

    match event {
        LifecycleEvent::EntityCreated { entity } => {
            vec![Observe(entity.clone()), Reorder(entity.container)]
        }
        LifecycleEvent::EntityUpdated { entity, change } => {
            // Refresh rearms an inactive tab, which covers load completion
            let mut actions = vec![Refresh(entity.clone())];
            if change.affects_order() {
                actions.push(Reorder(entity.container));
            }
            actions
        }
        LifecycleEvent::EntityActivated { id, container } => vec![
            Activate(*id),
            ArmContainer {
                container: *container,
                except: Some(*id),
            },
        ],
        LifecycleEvent::EntityMoved { container, .. } => vec![Reorder(*container)],
        LifecycleEvent::EntityRemoved {
            id,
            container,
            container_closing,
        } => {
            let mut actions = vec![Disarm(*id), Forget(*id)];
            if !container_closing {
                actions.push(ReorderDebounced(*container));
            }
            actions
        }
        LifecycleEvent::ContainerUpdated { container } => vec![Reorder(*container)],
        LifecycleEvent::FocusChanged { container: None } => vec![ArmAll],
        LifecycleEvent::FocusChanged {
            container: Some(container),
        } => vec![FocusContainer(*container)],
        LifecycleEvent::TimerFired { name } => match parse_timer_name(name) {
            Some(id) => vec![Evict(id)],
            None => Vec::new(),
        },
        LifecycleEvent::SettingsChanged { settings } => {
            vec![ReplaceSettings(settings.clone()), ClearTimers, Reconcile]
        }
    }
}

impl Engine {
    /// React to one lifecycle event.
    pub async fn handle(&self, event: &LifecycleEvent) {
        let configures = matches!(event, LifecycleEvent::SettingsChanged { .. });
        if !configures && self.settings().await.is_none() {
            debug!(?event, "Settings not loaded, ignoring event");
            return;
        }
        for action in plan(event) {
            self.execute(action).await;
        }
    }

    pub async fn execute(&self, action: Action) {
        match action {
            Action::Observe(entity) => self.observe(entity).await,
            Action::Refresh(entity) => self.refresh(entity).await,
            Action::Activate(id) => self.touch_and_disarm(id).await,
            Action::ArmContainer { container, except } => {
                for entity in self.entities(EntityFilter::in_container(container)).await {
                    if Some(entity.id) != except {
                        self.arm(entity.id, Some(entity)).await;
                    }
                }
            }
            Action::ArmAll | Action::FocusContainer(_) => {
                // Only the focused window can hold an effectively active tab,
                // so one sweep over every tab serves both cases
                for entity in self.entities(EntityFilter::all()).await {
                    self.refresh(entity).await;
                }
            }
            Action::Disarm(id) => {
                self.disarm(id).await;
            }
            Action::Forget(id) => {
                self.ledger.forget(id).await;
            }
            Action::Reorder(container) => {
                self.reorder(container).await;
            }
            Action::ReorderDebounced(container) => {
                self.schedule_reorder(container).await;
            }
            Action::Evict(id) => {
                let outcome = self.evict(id, None).await;
                debug!(entity = %id, ?outcome, "Eviction timer handled");
            }
            Action::ReplaceSettings(settings) => self.replace_settings(settings).await,
            Action::ClearTimers => {
                let cleared = self.clear_all_timers().await;
                debug!(cleared, "Cleared eviction timers");
            }
            Action::Reconcile => {
                self.reconcile().await;
            }
        }
    }

    async fn observe(&self, entity: Entity) {
        if self.is_effectively_active(&entity).await {
            self.touch_and_disarm(entity.id).await;
        } else {
            self.ledger.touch_if_absent(entity.id, self.now()).await;
            self.arm(entity.id, Some(entity)).await;
        }
    }

    async fn refresh(&self, entity: Entity) {
        if self.is_effectively_active(&entity).await {
            self.touch_and_disarm(entity.id).await;
        } else {
            self.arm(entity.id, Some(entity)).await;
        }
    }

    /// Tabs matching `filter`; empty when the listing fails.
    pub(crate) async fn entities(&self, filter: EntityFilter) -> Vec<Entity> {
        match self.resources.list_entities(filter).await {
            Ok(entities) => entities,
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "Nothing to list");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to list tabs");
                Vec::new()
            }
        }
    }

    /// Load settings, run the startup scan, then process events until the
    /// bus closes.
    pub async fn start(&self, events: broadcast::Receiver<Arc<LifecycleEvent>>) {
        info!(resources = self.resources.name(), "Engine starting");
        if self.load_settings().await {
            self.reconcile().await;
        }
        self.run(events).await;
    }

    /// Process events one at a time. Missed events are recovered with a full
    /// scan.
    pub async fn run(&self, mut events: broadcast::Receiver<Arc<LifecycleEvent>>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle(&event).await,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Event receiver lagged, reconciling");
                    if self.settings().await.is_some() {
                        self.reconcile().await;
                    }
                }
                Err(RecvError::Closed) => {
                    info!("Event bus closed, engine stopping");
                    break;
                }
            }
        }
    }
}
