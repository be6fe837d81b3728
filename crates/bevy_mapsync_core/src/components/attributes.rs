//! Data attributes carried by a container (pull model).

use std::collections::BTreeMap;

use bevy::prelude::*;

/// `data-*` style attributes attached to a container.
///
/// In pull mode the map state is parsed from these attributes on mount and
/// re-parsed whenever the component changes.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MapAttributes(pub BTreeMap<String, String>);

impl MapAttributes {
    /// Builder-style attribute insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Set an attribute, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}
