//! Tabs and windows as the engine sees them.
//!
//! These are read-only views. The [`crate::ResourceManager`] is the source of
//! truth; the engine fetches a fresh [`Entity`] whenever it needs to act.

use serde::{Deserialize, Serialize};

/// Identifier of a tab. Stable for the tab's lifetime.
///
/// Negative values are the "no tab" sentinel used by browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// The sentinel meaning "no tab".
    pub const NONE: EntityId = EntityId(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub i64);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a tab group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tab snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,

    /// The window holding this tab
    pub container: ContainerId,

    /// Position within the window, counting pinned tabs
    pub index: usize,

    #[serde(default)]
    pub pinned: bool,

    /// Tab group membership; `None` means ungrouped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,

    /// Opened in a private (incognito) window
    #[serde(default)]
    pub private: bool,

    /// Selected tab of its window
    #[serde(default)]
    pub active: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
}

impl Entity {
    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }
}

/// A window snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,

    /// Holds input focus
    #[serde(default)]
    pub focused: bool,

    #[serde(default)]
    pub private: bool,
}

/// Narrows [`crate::ResourceManager::list_entities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityFilter {
    pub container: Option<ContainerId>,
}

impl EntityFilter {
    /// Every tab in every window.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn in_container(container: ContainerId) -> Self {
        Self {
            container: Some(container),
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.container.is_none_or(|c| c == entity.container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_invalid() {
        assert!(!EntityId::NONE.is_valid());
        assert!(EntityId(0).is_valid());
    }

    #[test]
    fn entity_defaults_when_deserializing() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": 3, "container": 1, "index": 0}"#).unwrap();
        assert_eq!(entity.id, EntityId(3));
        assert!(!entity.pinned);
        assert!(!entity.is_grouped());
        assert!(entity.title.is_empty());
    }

    #[test]
    fn filter_matches_container() {
        let entity: Entity =
            serde_json::from_str(r#"{"id": 3, "container": 1, "index": 0}"#).unwrap();
        assert!(EntityFilter::all().matches(&entity));
        assert!(EntityFilter::in_container(ContainerId(1)).matches(&entity));
        assert!(!EntityFilter::in_container(ContainerId(2)).matches(&entity));
    }
}
