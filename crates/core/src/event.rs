//! Lifecycle events: everything the engine reacts to.
//!
//! Tab and window notifications, fired timers and settings changes all flow
//! through one broadcast [`EventBus`], so the engine sees them in a single
//! ordered stream.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::entity::{ContainerId, Entity, EntityId};
use crate::settings::Settings;

/// What an update notification says changed on a tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityChange {
    #[serde(default)]
    pub pinned: bool,

    /// Group membership changed
    #[serde(default)]
    pub group: bool,

    /// The tab finished loading
    #[serde(default)]
    pub load_complete: bool,
}

impl EntityChange {
    /// Pinning or grouping changed, so window order may be violated.
    pub fn affects_order(&self) -> bool {
        self.pinned || self.group
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    EntityCreated {
        entity: Entity,
    },

    EntityUpdated {
        entity: Entity,
        change: EntityChange,
    },

    /// The selected tab of a window changed
    EntityActivated {
        id: EntityId,
        container: ContainerId,
    },

    /// A tab moved within or into `container`
    EntityMoved {
        id: EntityId,
        container: ContainerId,
    },

    EntityRemoved {
        id: EntityId,
        container: ContainerId,
        /// The whole window is closing
        container_closing: bool,
    },

    /// A tab group inside the window changed
    ContainerUpdated {
        container: ContainerId,
    },

    /// Input focus moved; `None` means no window has focus
    FocusChanged {
        container: Option<ContainerId>,
    },

    TimerFired {
        name: String,
    },

    /// `None` means the stored settings were removed
    SettingsChanged {
        settings: Option<Settings>,
    },
}

/// A broadcast-based event bus for lifecycle events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. A slow consumer
/// observes `RecvError::Lagged` rather than blocking publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<LifecycleEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LifecycleEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
