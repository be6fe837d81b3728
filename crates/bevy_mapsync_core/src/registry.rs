//! The map registry: which containers have live map instances, and what is
//! attached to each.

use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::backend::{LayerHandle, MapBackend, MapHandle, MapOptions};
use crate::components::ContainerId;
use crate::error::MapsyncError;
use crate::state::{LayerDescriptor, MapState};
use crate::tandem::PropagationFlag;

/// An overlay layer attached to a live map.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedLayer {
    pub descriptor: LayerDescriptor,
    pub handle: LayerHandle,
}

/// A live map instance and its layer set.
#[derive(Debug)]
pub struct MapEntry {
    pub(crate) map: MapHandle,
    /// Bottom to top.
    pub(crate) layers: Vec<AttachedLayer>,
    pub(crate) applied: Option<MapState>,
}

impl MapEntry {
    pub fn map(&self) -> MapHandle {
        self.map
    }

    /// Attached overlays, bottom to top.
    pub fn layers(&self) -> &[AttachedLayer] {
        &self.layers
    }

    /// The last state successfully applied to this map.
    pub fn applied_state(&self) -> Option<&MapState> {
        self.applied.as_ref()
    }
}

/// Registry of live map instances keyed by container.
///
/// The only owner of the [`MapBackend`]: creating and destroying entries are
/// the only operations that allocate or release backend maps. Everything else
/// goes through [`MapRegistry::apply`].
///
/// # Example
///
/// ```rust
/// # use bevy_mapsync_core::prelude::*;
/// let mut registry = MapRegistry::new(HeadlessBackend::default());
/// let id = ContainerId::from("m1");
/// registry.create(&id, &MapOptions::default()).unwrap();
/// assert!(registry.contains(&id));
/// registry.destroy(&id);
/// assert!(registry.is_empty());
/// ```
#[derive(Resource)]
pub struct MapRegistry {
    pub(crate) backend: Box<dyn MapBackend>,
    pub(crate) entries: HashMap<ContainerId, MapEntry>,
    /// Containers whose map creation failed; left alone until re-inserted.
    unmanaged: HashSet<ContainerId>,
    pub(crate) propagation: PropagationFlag,
}

impl MapRegistry {
    pub fn new(backend: impl MapBackend) -> Self {
        Self::from_boxed(Box::new(backend))
    }

    pub fn from_boxed(backend: Box<dyn MapBackend>) -> Self {
        Self {
            backend,
            entries: HashMap::new(),
            unmanaged: HashSet::new(),
            propagation: PropagationFlag::default(),
        }
    }

    /// Create a map for `id`.
    ///
    /// Returns `Ok(false)` without touching the backend if `id` is already
    /// registered. On backend failure no entry is created and `id` is marked
    /// unmanaged.
    pub fn create(&mut self, id: &ContainerId, options: &MapOptions) -> Result<bool, MapsyncError> {
        if self.entries.contains_key(id) {
            return Ok(false);
        }
        match self.backend.create_map(id, options) {
            Ok(map) => {
                self.unmanaged.remove(id);
                self.entries.insert(
                    id.clone(),
                    MapEntry {
                        map,
                        layers: Vec::new(),
                        applied: None,
                    },
                );
                Ok(true)
            }
            Err(err) => {
                self.unmanaged.insert(id.clone());
                Err(err.into())
            }
        }
    }

    /// Release the map for `id` and all its layers.
    ///
    /// Returns `false` if `id` was not registered.
    pub fn destroy(&mut self, id: &ContainerId) -> bool {
        self.unmanaged.remove(id);
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        for layer in entry.layers.iter().rev() {
            self.backend.remove_layer(entry.map, layer.handle);
        }
        self.backend.remove_map(entry.map);
        true
    }

    pub fn get(&self, id: &ContainerId) -> Option<&MapEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered container ids, sorted.
    pub fn ids(&self) -> Vec<ContainerId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether map creation failed for `id` since its container was inserted.
    pub fn is_unmanaged(&self, id: &ContainerId) -> bool {
        self.unmanaged.contains(id)
    }

    /// Clear the unmanaged mark, e.g. because the container was re-inserted.
    pub fn forget_unmanaged(&mut self, id: &ContainerId) {
        self.unmanaged.remove(id);
    }

    pub(crate) fn retain_unmanaged(&mut self, mut keep: impl FnMut(&ContainerId) -> bool) {
        self.unmanaged.retain(|id| keep(id));
    }

    pub fn backend(&self) -> &dyn MapBackend {
        self.backend.as_ref()
    }

    /// Destroy every entry.
    pub fn teardown(&mut self) {
        for id in self.ids() {
            self.destroy(&id);
        }
        self.unmanaged.clear();
    }
}

/// Latest state pushed by the application per container.
///
/// Consulted when a container mounts in push mode. Kept for unmounted
/// containers too, so state pushed before mount is applied on mount.
#[derive(Resource, Debug, Default)]
pub struct PushedStates(HashMap<ContainerId, MapState>);

impl PushedStates {
    pub fn insert(&mut self, id: ContainerId, state: MapState) -> Option<MapState> {
        self.0.insert(id, state)
    }

    pub fn remove(&mut self, id: &ContainerId) -> Option<MapState> {
        self.0.remove(id)
    }

    pub fn get(&self, id: &ContainerId) -> Option<&MapState> {
        self.0.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use crate::state::WmsLayer;

    #[test]
    fn test_create_is_idempotent() {
        let backend = HeadlessBackend::default();
        let probe = backend.probe();
        let mut registry = MapRegistry::new(backend);
        let id = ContainerId::from("m1");

        assert!(registry.create(&id, &MapOptions::default()).unwrap());
        assert!(!registry.create(&id, &MapOptions::default()).unwrap());
        assert_eq!(probe.created(&id), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_destroy_releases_layers_and_map() {
        let backend = HeadlessBackend::default();
        let probe = backend.probe();
        let mut registry = MapRegistry::new(backend);
        let id = ContainerId::from("m1");
        registry.create(&id, &MapOptions::default()).unwrap();
        registry
            .apply(&id, &MapState::empty().with_layer(WmsLayer::new("https://x/wms", ["bio1"])))
            .unwrap();

        assert!(registry.destroy(&id));
        assert!(!registry.destroy(&id));
        assert!(registry.get(&id).is_none());
        assert!(probe.mounted().is_empty());
        assert_eq!(probe.removed(&id), 1);
    }

    #[test]
    fn test_failed_create_leaves_container_unmanaged() {
        let backend = HeadlessBackend::default();
        let probe = backend.probe();
        probe.fail_create("broken");
        let mut registry = MapRegistry::new(backend);
        let id = ContainerId::from("broken");

        let err = registry.create(&id, &MapOptions::default()).unwrap_err();
        assert!(matches!(err, MapsyncError::Backend(_)));
        assert!(!registry.contains(&id));
        assert!(registry.is_unmanaged(&id));

        probe.allow_create(&id);
        assert!(registry.create(&id, &MapOptions::default()).unwrap());
        assert!(!registry.is_unmanaged(&id));
    }

    #[test]
    fn test_teardown_destroys_everything() {
        let backend = HeadlessBackend::default();
        let probe = backend.probe();
        let mut registry = MapRegistry::new(backend);
        for id in ["a", "b", "c"] {
            registry.create(&id.into(), &MapOptions::default()).unwrap();
        }
        registry.teardown();
        assert!(registry.is_empty());
        assert!(probe.mounted().is_empty());
    }
}
