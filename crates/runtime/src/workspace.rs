//! In-memory workspace: a browser stand-in for tests and simulation.
//!
//! Holds windows with ordered tabs, tracks focus, and publishes a
//! [`LifecycleEvent`] for every mutation the way a browser would notify an
//! extension. Transient locks can be injected per tab to exercise retries.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabsweep_core::{
    Container, ContainerId, Entity, EntityChange, EntityFilter, EntityId, EventBus, GroupId,
    LifecycleEvent, ResourceError, ResourceManager,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Attributes of a tab to open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSpec {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub pinned: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,

    #[serde(default)]
    pub active: bool,
}

impl TabSpec {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn grouped(title: &str, group: i64) -> Self {
        Self {
            title: title.into(),
            group: Some(GroupId(group)),
            ..Self::default()
        }
    }

    pub fn pinned(title: &str) -> Self {
        Self {
            title: title.into(),
            pinned: true,
            ..Self::default()
        }
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }
}

/// A window described in a scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub focused: bool,

    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub tabs: Vec<TabSpec>,
}

/// A whole workspace described declaratively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub windows: Vec<WindowSpec>,
}

/// Every remove/move attempt the workspace has seen, failed ones included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub removes: Vec<EntityId>,
    pub moves: Vec<(EntityId, usize)>,
}

#[derive(Debug, Clone)]
struct Tab {
    id: EntityId,
    title: String,
    pinned: bool,
    group: Option<GroupId>,
    active: bool,
}

#[derive(Debug, Clone)]
struct Window {
    id: ContainerId,
    private: bool,
    tabs: Vec<Tab>,
}

#[derive(Debug, Default)]
struct State {
    windows: Vec<Window>,
    focused: Option<ContainerId>,
    next_tab: i64,
    next_window: i64,
    /// Remaining `Locked` failures per tab
    locks: HashMap<EntityId, u32>,
    /// Tabs whose remove/move always fails unexpectedly
    broken: HashSet<EntityId>,
    calls: CallLog,
}

impl State {
    fn window(&self, id: ContainerId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn window_mut(&mut self, id: ContainerId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    /// (window position, tab position) of a tab.
    fn locate(&self, id: EntityId) -> Option<(usize, usize)> {
        self.windows.iter().enumerate().find_map(|(w, window)| {
            window
                .tabs
                .iter()
                .position(|t| t.id == id)
                .map(|t| (w, t))
        })
    }

    fn snapshot(&self, id: EntityId) -> Option<Entity> {
        let (w, t) = self.locate(id)?;
        Some(to_entity(&self.windows[w], t))
    }

    /// Fail the call if a lock or breakage was injected for `id`.
    fn check_interference(&mut self, id: EntityId) -> Result<(), ResourceError> {
        if self.broken.contains(&id) {
            return Err(ResourceError::Unexpected(format!("tab {id} is broken")));
        }
        if let Some(remaining) = self.locks.get_mut(&id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ResourceError::Locked(
                    "Tabs cannot be edited right now (user may be dragging a tab).".into(),
                ));
            }
        }
        Ok(())
    }
}

fn to_entity(window: &Window, index: usize) -> Entity {
    let tab = &window.tabs[index];
    Entity {
        id: tab.id,
        container: window.id,
        index,
        pinned: tab.pinned,
        group: tab.group,
        private: window.private,
        active: tab.active,
        title: tab.title.clone(),
    }
}

/// A browser model held entirely in memory.
pub struct InMemoryWorkspace {
    state: RwLock<State>,
    bus: EventBus,
}

impl InMemoryWorkspace {
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: RwLock::new(State {
                next_tab: 1,
                next_window: 1,
                ..State::default()
            }),
            bus,
        }
    }

    /// Build a workspace from a scenario without publishing any events.
    pub fn from_scenario(scenario: &Scenario, bus: EventBus) -> Self {
        let mut state = State {
            next_tab: 1,
            next_window: 1,
            ..State::default()
        };
        for spec in &scenario.windows {
            let id = ContainerId(state.next_window);
            state.next_window += 1;
            let mut window = Window {
                id,
                private: spec.private,
                tabs: Vec::new(),
            };
            for tab in &spec.tabs {
                window.tabs.push(Tab {
                    id: EntityId(state.next_tab),
                    title: tab.title.clone(),
                    pinned: tab.pinned,
                    group: tab.group,
                    active: tab.active,
                });
                state.next_tab += 1;
            }
            state.windows.push(window);
            if spec.focused {
                state.focused = Some(id);
            }
        }

        Self {
            state: RwLock::new(state),
            bus,
        }
    }

    /// Open a new, unfocused window.
    pub async fn open_container(&self, private: bool) -> ContainerId {
        let mut state = self.state.write().await;
        let id = ContainerId(state.next_window);
        state.next_window += 1;
        state.windows.push(Window {
            id,
            private,
            tabs: Vec::new(),
        });
        id
    }

    /// Append a tab to a window.
    pub async fn open_entity(
        &self,
        container: ContainerId,
        spec: TabSpec,
    ) -> Result<EntityId, ResourceError> {
        let mut state = self.state.write().await;
        let id = EntityId(state.next_tab);
        let window = state
            .window_mut(container)
            .ok_or_else(|| ResourceError::container_not_found(container))?;
        if spec.active {
            window.tabs.iter_mut().for_each(|t| t.active = false);
        }
        window.tabs.push(Tab {
            id,
            title: spec.title,
            pinned: spec.pinned,
            group: spec.group,
            active: spec.active,
        });
        let entity = to_entity(window, window.tabs.len() - 1);
        state.next_tab += 1;
        drop(state);

        debug!(entity = %id, container = %container, "Opened tab");
        self.bus.publish(LifecycleEvent::EntityCreated { entity });
        if spec.active {
            self.bus
                .publish(LifecycleEvent::EntityActivated { id, container });
        }
        Ok(id)
    }

    /// Make a tab the selection of its window.
    pub async fn activate(&self, id: EntityId) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        let (w, t) = state
            .locate(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))?;
        let window = &mut state.windows[w];
        for (i, tab) in window.tabs.iter_mut().enumerate() {
            tab.active = i == t;
        }
        let container = window.id;
        drop(state);

        self.bus
            .publish(LifecycleEvent::EntityActivated { id, container });
        Ok(())
    }

    /// Put a tab into a group, or take it out with `None`.
    pub async fn set_group(
        &self,
        id: EntityId,
        group: Option<GroupId>,
    ) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        let (w, t) = state
            .locate(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))?;
        state.windows[w].tabs[t].group = group;
        let entity = to_entity(&state.windows[w], t);
        drop(state);

        self.bus.publish(LifecycleEvent::EntityUpdated {
            entity,
            change: EntityChange {
                group: true,
                ..EntityChange::default()
            },
        });
        Ok(())
    }

    /// Pin or unpin a tab. Pinned tabs are kept at the front of the window.
    pub async fn set_pinned(&self, id: EntityId, pinned: bool) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        let (w, t) = state
            .locate(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))?;
        let window = &mut state.windows[w];
        let mut tab = window.tabs.remove(t);
        tab.pinned = pinned;
        let pinned_count = window.tabs.iter().filter(|t| t.pinned).count();
        window.tabs.insert(pinned_count.min(window.tabs.len()), tab);
        let index = window
            .tabs
            .iter()
            .position(|t| t.id == id)
            .unwrap_or_default();
        let entity = to_entity(window, index);
        drop(state);

        self.bus.publish(LifecycleEvent::EntityUpdated {
            entity,
            change: EntityChange {
                pinned: true,
                ..EntityChange::default()
            },
        });
        Ok(())
    }

    /// Report that a tab finished loading.
    pub async fn finish_loading(&self, id: EntityId) -> Result<(), ResourceError> {
        let entity = self
            .state
            .read()
            .await
            .snapshot(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))?;
        self.bus.publish(LifecycleEvent::EntityUpdated {
            entity,
            change: EntityChange {
                load_complete: true,
                ..EntityChange::default()
            },
        });
        Ok(())
    }

    /// Give focus to a window, or to nothing.
    pub async fn focus(&self, container: Option<ContainerId>) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        if let Some(id) = container {
            state
                .window(id)
                .ok_or_else(|| ResourceError::container_not_found(id))?;
        }
        state.focused = container;
        drop(state);

        self.bus.publish(LifecycleEvent::FocusChanged { container });
        Ok(())
    }

    /// Close a window and every tab in it.
    pub async fn close_container(&self, container: ContainerId) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        let position = state
            .windows
            .iter()
            .position(|w| w.id == container)
            .ok_or_else(|| ResourceError::container_not_found(container))?;
        let window = state.windows.remove(position);
        let lost_focus = state.focused == Some(container);
        if lost_focus {
            state.focused = None;
        }
        drop(state);

        for tab in window.tabs {
            self.bus.publish(LifecycleEvent::EntityRemoved {
                id: tab.id,
                container,
                container_closing: true,
            });
        }
        if lost_focus {
            self.bus
                .publish(LifecycleEvent::FocusChanged { container: None });
        }
        Ok(())
    }

    /// Make the next `failures` remove/move calls on `id` fail as locked.
    pub async fn lock_entity(&self, id: EntityId, failures: u32) {
        self.state.write().await.locks.insert(id, failures);
    }

    /// Make every remove/move call on `id` fail unexpectedly.
    pub async fn break_entity(&self, id: EntityId) {
        self.state.write().await.broken.insert(id);
    }

    pub async fn calls(&self) -> CallLog {
        self.state.read().await.calls.clone()
    }

    /// Tab ids of a window, in order.
    pub async fn order(&self, container: ContainerId) -> Vec<EntityId> {
        self.state
            .read()
            .await
            .window(container)
            .map(|w| w.tabs.iter().map(|t| t.id).collect())
            .unwrap_or_default()
    }

    pub async fn contains(&self, id: EntityId) -> bool {
        self.state.read().await.locate(id).is_some()
    }
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

#[async_trait]
impl ResourceManager for InMemoryWorkspace {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list_entities(&self, filter: EntityFilter) -> Result<Vec<Entity>, ResourceError> {
        let state = self.state.read().await;
        if let Some(container) = filter.container {
            state
                .window(container)
                .ok_or_else(|| ResourceError::container_not_found(container))?;
        }
        Ok(state
            .windows
            .iter()
            .flat_map(|w| (0..w.tabs.len()).map(move |i| to_entity(w, i)))
            .filter(|e| filter.matches(e))
            .collect())
    }

    async fn get_entity(&self, id: EntityId) -> Result<Entity, ResourceError> {
        self.state
            .read()
            .await
            .snapshot(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))
    }

    async fn remove_entity(&self, id: EntityId) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        state.calls.removes.push(id);
        let (w, t) = state
            .locate(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))?;
        state.check_interference(id)?;

        let window = &mut state.windows[w];
        let removed = window.tabs.remove(t);
        let container = window.id;
        // Closing the selected tab selects its right neighbour (or the new last tab)
        let promoted = if removed.active && !window.tabs.is_empty() {
            let next = t.min(window.tabs.len() - 1);
            window.tabs[next].active = true;
            Some(window.tabs[next].id)
        } else {
            None
        };
        drop(state);

        self.bus.publish(LifecycleEvent::EntityRemoved {
            id,
            container,
            container_closing: false,
        });
        if let Some(next) = promoted {
            self.bus.publish(LifecycleEvent::EntityActivated {
                id: next,
                container,
            });
        }
        Ok(())
    }

    async fn move_entity(&self, id: EntityId, index: usize) -> Result<(), ResourceError> {
        let mut state = self.state.write().await;
        state.calls.moves.push((id, index));
        let (w, t) = state
            .locate(id)
            .ok_or_else(|| ResourceError::entity_not_found(id))?;
        state.check_interference(id)?;

        let window = &mut state.windows[w];
        let tab = window.tabs.remove(t);
        // Out-of-range targets land at the end, as in browsers
        let target = index.min(window.tabs.len());
        window.tabs.insert(target, tab);
        let container = window.id;
        drop(state);

        self.bus
            .publish(LifecycleEvent::EntityMoved { id, container });
        Ok(())
    }

    async fn list_containers(&self) -> Result<Vec<Container>, ResourceError> {
        let state = self.state.read().await;
        Ok(state
            .windows
            .iter()
            .map(|w| Container {
                id: w.id,
                focused: state.focused == Some(w.id),
                private: w.private,
            })
            .collect())
    }

    async fn focused_container(&self) -> Result<Option<ContainerId>, ResourceError> {
        Ok(self.state.read().await.focused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn window_with(workspace: &InMemoryWorkspace, tabs: Vec<TabSpec>) -> (ContainerId, Vec<EntityId>) {
        let container = workspace.open_container(false).await;
        let mut ids = Vec::new();
        for tab in tabs {
            ids.push(workspace.open_entity(container, tab).await.unwrap());
        }
        (container, ids)
    }

    #[tokio::test]
    async fn open_and_list_in_order() {
        let workspace = InMemoryWorkspace::default();
        let (container, ids) = window_with(
            &workspace,
            vec![TabSpec::titled("a"), TabSpec::titled("b").active()],
        )
        .await;

        let entities = workspace
            .list_entities(EntityFilter::in_container(container))
            .await
            .unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].id, ids[1]);
        assert_eq!(entities[1].index, 1);
        assert!(entities[1].active);
        assert!(!entities[0].active);
    }

    #[tokio::test]
    async fn move_past_the_end_lands_last() {
        let workspace = InMemoryWorkspace::default();
        let (container, ids) = window_with(
            &workspace,
            vec![
                TabSpec::grouped("g1", 1),
                TabSpec::titled("u"),
                TabSpec::grouped("g2", 1),
            ],
        )
        .await;

        workspace.move_entity(ids[1], 3).await.unwrap();
        assert_eq!(workspace.order(container).await, vec![ids[0], ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn injected_lock_fails_then_clears() {
        let workspace = InMemoryWorkspace::default();
        let (_, ids) = window_with(&workspace, vec![TabSpec::titled("a")]).await;
        workspace.lock_entity(ids[0], 2).await;

        assert!(workspace.remove_entity(ids[0]).await.unwrap_err().is_transient());
        assert!(workspace.remove_entity(ids[0]).await.unwrap_err().is_transient());
        workspace.remove_entity(ids[0]).await.unwrap();
        assert!(!workspace.contains(ids[0]).await);
        assert_eq!(workspace.calls().await.removes.len(), 3);
    }

    #[tokio::test]
    async fn missing_tab_is_not_found() {
        let workspace = InMemoryWorkspace::default();
        let err = workspace.get_entity(EntityId(99)).await.unwrap_err();
        assert!(err.is_not_found());
        let err = workspace.remove_entity(EntityId(99)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn removing_active_tab_activates_neighbour() {
        let bus = EventBus::new(64);
        let workspace = InMemoryWorkspace::new(bus.clone());
        let (container, ids) =
            window_with(&workspace, vec![TabSpec::titled("a"), TabSpec::titled("b").active()]).await;
        let mut rx = bus.subscribe();

        workspace.remove_entity(ids[1]).await.unwrap();

        let removed = rx.recv().await.unwrap();
        assert!(matches!(
            removed.as_ref(),
            LifecycleEvent::EntityRemoved { container_closing: false, .. }
        ));
        let activated = rx.recv().await.unwrap();
        assert_eq!(
            activated.as_ref(),
            &LifecycleEvent::EntityActivated { id: ids[0], container }
        );
    }

    #[tokio::test]
    async fn pinning_moves_tab_to_front() {
        let workspace = InMemoryWorkspace::default();
        let (container, ids) = window_with(
            &workspace,
            vec![TabSpec::pinned("p"), TabSpec::titled("a"), TabSpec::titled("b")],
        )
        .await;

        workspace.set_pinned(ids[2], true).await.unwrap();
        assert_eq!(workspace.order(container).await, vec![ids[0], ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn closing_focused_window_drops_focus() {
        let workspace = InMemoryWorkspace::default();
        let (container, _) = window_with(&workspace, vec![TabSpec::titled("a")]).await;
        workspace.focus(Some(container)).await.unwrap();
        assert_eq!(workspace.focused_container().await.unwrap(), Some(container));

        workspace.close_container(container).await.unwrap();
        assert_eq!(workspace.focused_container().await.unwrap(), None);
        assert!(workspace.list_containers().await.unwrap().is_empty());
    }

    #[test]
    fn scenario_builds_windows() {
        let scenario = Scenario {
            windows: vec![WindowSpec {
                focused: true,
                private: true,
                tabs: vec![TabSpec::titled("a").active(), TabSpec::grouped("b", 4)],
            }],
        };
        let workspace = InMemoryWorkspace::from_scenario(&scenario, EventBus::default());
        let state = workspace.state.try_read().unwrap();
        assert_eq!(state.focused, Some(ContainerId(1)));
        let entity = state.snapshot(EntityId(2)).unwrap();
        assert!(entity.private);
        assert_eq!(entity.group, Some(GroupId(4)));
    }
}
