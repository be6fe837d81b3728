//! Container components.

use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Identifier of a container hosting one map instance.
///
/// Opaque to the registry. Unique among currently mounted containers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    /// Create a new container id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Marks an entity as a container that hosts a map.
///
/// Adding this component is the "container inserted" signal; removing it (or
/// despawning the entity) is the "container removed" signal.
///
/// # Example
///
/// ```rust,no_run
/// # use bevy::prelude::*;
/// # use bevy_mapsync_core::prelude::MapContainer;
/// fn spawn_map(mut commands: Commands) {
///     commands.spawn(MapContainer::new("species-map").with_class("leaflet-map"));
/// }
/// ```
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct MapContainer {
    /// Container identifier used as the registry key.
    pub id: ContainerId,
    /// Class names used by [`ContainerSelector::Class`].
    pub classes: Vec<String>,
}

impl MapContainer {
    /// Create a container with no classes.
    pub fn new(id: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            classes: Vec::new(),
        }
    }

    /// Add a class name.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Whether this container carries `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Which containers the watcher manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerSelector {
    /// Every `MapContainer`.
    Any,
    /// Only containers carrying this class.
    Class(String),
}

impl Default for ContainerSelector {
    fn default() -> Self {
        Self::Class("leaflet-map".to_string())
    }
}

impl ContainerSelector {
    /// Whether `container` is selected.
    pub fn matches(&self, container: &MapContainer) -> bool {
        match self {
            Self::Any => true,
            Self::Class(class) => container.has_class(class),
        }
    }
}
