//! ResourceManager trait: the abstraction over the browser's tab API.
//!
//! Implementations: in-memory workspace (tests, simulation), and whatever
//! bridge talks to a real browser. Every call is a round trip; callers must
//! expect the answer to be stale by the time they act on it.

use async_trait::async_trait;

use crate::entity::{Container, ContainerId, Entity, EntityFilter, EntityId};
use crate::error::ResourceError;

#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// List tabs matching the filter, in window order.
    async fn list_entities(&self, filter: EntityFilter) -> Result<Vec<Entity>, ResourceError>;

    /// Fetch one tab. Fails with [`ResourceError::NotFound`] once it is gone.
    async fn get_entity(&self, id: EntityId) -> Result<Entity, ResourceError>;

    /// Close a tab.
    async fn remove_entity(&self, id: EntityId) -> Result<(), ResourceError>;

    /// Move a tab to `index` within its window.
    async fn move_entity(&self, id: EntityId, index: usize) -> Result<(), ResourceError>;

    /// List all open windows.
    async fn list_containers(&self) -> Result<Vec<Container>, ResourceError>;

    /// The window holding input focus, if any.
    async fn focused_container(&self) -> Result<Option<ContainerId>, ResourceError>;
}
