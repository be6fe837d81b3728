//! Reconciling a live map with a desired [`MapState`].

use std::collections::HashSet;

use bevy::prelude::*;

use crate::backend::{BackendError, MapBackend, MapHandle};
use crate::components::ContainerId;
use crate::error::MapsyncError;
use crate::registry::{AttachedLayer, MapRegistry};
use crate::state::{LayerDescriptor, LayerKey, MapState};

/// What an [`apply`](MapRegistry::apply) call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyChanges {
    pub added: usize,
    pub removed: usize,
    pub restyled: usize,
    pub reordered: bool,
    pub view_changed: bool,
    pub bounds_fitted: bool,
}

impl ApplyChanges {
    /// Whether the backend was left untouched.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of [`MapRegistry::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyReport {
    /// No map is registered for the target container.
    Dropped,
    /// The state was applied.
    Applied(ApplyChanges),
}

impl MapRegistry {
    /// Bring the map in `id` to `state`, touching only what differs.
    ///
    /// - Layers missing from `state` are attached first, in descriptor order.
    /// - GeoJSON layers whose style alone changed are restyled in place.
    /// - Layers absent from `state` are detached only once every attach and
    ///   restyle has succeeded. If the resulting stack order differs from the
    ///   descriptors, layers are brought to the front one by one so the last
    ///   descriptor ends up on top.
    /// - A view is set only when it differs from the map's current view. Bounds
    ///   are fitted only when no view is given and they differ from the bounds
    ///   last fitted, so each apply moves the map at most once.
    /// - A state with no layers clears the overlays and ignores view and bounds.
    ///
    /// The map instance itself is never recreated. An invalid `state` is
    /// rejected before anything is touched, even for an unmounted `id`. If a
    /// layer fails to attach or restyle, the map is put back exactly as it was
    /// and the previously applied state stays recorded. If only the final move
    /// fails, the new layers stay and are recorded with the previous view.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use bevy_mapsync_core::prelude::*;
    /// let mut registry = MapRegistry::new(HeadlessBackend::default());
    /// let id = ContainerId::from("m1");
    /// let state = MapState::empty().with_layer(WmsLayer::new("https://x/wms", ["bio1"]));
    ///
    /// // Not mounted yet: dropped.
    /// assert_eq!(registry.apply(&id, &state).unwrap(), ApplyReport::Dropped);
    ///
    /// registry.create(&id, &MapOptions::default()).unwrap();
    /// let ApplyReport::Applied(changes) = registry.apply(&id, &state).unwrap() else {
    ///     unreachable!();
    /// };
    /// assert_eq!(changes.added, 1);
    ///
    /// // Same state again: nothing to do.
    /// let ApplyReport::Applied(changes) = registry.apply(&id, &state).unwrap() else {
    ///     unreachable!();
    /// };
    /// assert!(changes.is_noop());
    /// ```
    pub fn apply(&mut self, id: &ContainerId, state: &MapState) -> Result<ApplyReport, MapsyncError> {
        state.validate()?;

        let Some(entry) = self.entries.get_mut(id) else {
            debug!("Dropping map state for unmounted container '{}'", id);
            return Ok(ApplyReport::Dropped);
        };
        let backend = self.backend.as_mut();
        let map = entry.map;
        let mut changes = ApplyChanges::default();

        if state.layers.is_empty() {
            for layer in entry.layers.drain(..).rev() {
                backend.remove_layer(map, layer.handle);
                changes.removed += 1;
            }
            entry.applied = Some(state.clone());
            return Ok(ApplyReport::Applied(changes));
        }

        // Attach. Nothing already displayed is touched until every new layer is in.
        let mut attached: Vec<AttachedLayer> = Vec::new();
        for descriptor in &state.layers {
            let key = descriptor.key();
            if entry.layers.iter().any(|layer| layer.descriptor.key() == key) {
                continue;
            }
            match backend.add_layer(map, descriptor) {
                Ok(handle) => attached.push(AttachedLayer {
                    descriptor: descriptor.clone(),
                    handle,
                }),
                Err(err) => {
                    warn!(
                        "Failed to attach layer to map in '{}', rolling back {} layer(s): {}",
                        id,
                        attached.len(),
                        err
                    );
                    detach_all(backend, map, &attached);
                    return Err(err.into());
                }
            }
        }

        // Restyle
        let mut restyled: Vec<(usize, LayerDescriptor)> = Vec::new();
        for (index, layer) in entry.layers.iter().enumerate() {
            let key = layer.descriptor.key();
            let Some(desired) = state.layers.iter().find(|d| d.key() == key) else {
                continue;
            };
            let Some(style) = desired.style() else {
                continue;
            };
            if layer.descriptor.style() == Some(style) {
                continue;
            }
            if let Err(err) = backend.set_layer_style(map, layer.handle, style) {
                warn!(
                    "Failed to restyle layer of map in '{}', rolling back: {}",
                    id, err
                );
                for (index, _) in restyled.iter().rev() {
                    let Some(previous) = entry.layers.get(*index) else {
                        continue;
                    };
                    if let Some(style) = previous.descriptor.style() {
                        if let Err(err) = backend.set_layer_style(map, previous.handle, style) {
                            warn!("Failed to restore layer style of map in '{}': {}", id, err);
                        }
                    }
                }
                detach_all(backend, map, &attached);
                return Err(err.into());
            }
            restyled.push((index, desired.clone()));
        }

        // Commit: only infallible backend calls from here on.
        changes.restyled = restyled.len();
        for (index, desired) in restyled {
            if let Some(layer) = entry.layers.get_mut(index) {
                layer.descriptor = desired;
            }
        }

        let wanted: HashSet<LayerKey> = state.layers.iter().map(LayerDescriptor::key).collect();
        entry.layers.retain(|layer| {
            let keep = wanted.contains(&layer.descriptor.key());
            if !keep {
                backend.remove_layer(map, layer.handle);
                changes.removed += 1;
            }
            keep
        });
        changes.added = attached.len();
        entry.layers.extend(attached);

        // Order
        let in_order = entry
            .layers
            .iter()
            .map(|layer| layer.descriptor.key())
            .eq(state.layers.iter().map(LayerDescriptor::key));
        if !in_order {
            let mut ordered = Vec::with_capacity(entry.layers.len());
            for descriptor in &state.layers {
                let key = descriptor.key();
                if let Some(index) = entry.layers.iter().position(|layer| layer.descriptor.key() == key) {
                    let layer = entry.layers.swap_remove(index);
                    backend.bring_to_front(map, layer.handle);
                    ordered.push(layer);
                }
            }
            entry.layers = ordered;
            changes.reordered = true;
        }

        if let Err(err) = place_view(backend, map, state, entry.applied.as_ref(), &mut changes) {
            let previous = entry.applied.take().unwrap_or_default();
            entry.applied = Some(MapState {
                view: previous.view,
                bounds: previous.bounds,
                layers: state.layers.clone(),
            });
            return Err(err.into());
        }

        entry.applied = Some(state.clone());
        Ok(ApplyReport::Applied(changes))
    }
}

fn detach_all(backend: &mut dyn MapBackend, map: MapHandle, layers: &[AttachedLayer]) {
    for layer in layers.iter().rev() {
        backend.remove_layer(map, layer.handle);
    }
}

/// Move the map to the state's view, or fit its bounds when no view is given.
///
/// Bounds are refitted only when they differ from the bounds last fitted.
fn place_view(
    backend: &mut dyn MapBackend,
    map: MapHandle,
    state: &MapState,
    previous: Option<&MapState>,
    changes: &mut ApplyChanges,
) -> Result<(), BackendError> {
    match (state.view, state.bounds) {
        (Some(view), _) => {
            if backend.view(map) != Some(view) {
                backend.set_view(map, view)?;
                changes.view_changed = true;
            }
        }
        (None, Some(bounds)) => {
            let fitted = previous
                .filter(|previous| previous.view.is_none())
                .and_then(|previous| previous.bounds);
            if fitted != Some(bounds) {
                backend.fit_bounds(map, bounds)?;
                changes.bounds_fitted = true;
            }
        }
        (None, None) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::{HeadlessBackend, HeadlessProbe, MapOptions};
    use crate::error::InvalidState;
    use crate::state::{Bounds, GeoJsonLayer, MapView, TileLayer, WmsLayer};
    use crate::style::StyleRule;

    fn mounted(ids: &[&str]) -> (MapRegistry, HeadlessProbe) {
        let features = vec![
            json!({"name": "s1", "sp1": 1, "sp2": -1}).as_object().cloned().unwrap(),
            json!({"name": "s2", "sp1": 2, "sp2": 0}).as_object().cloned().unwrap(),
        ];
        let backend = HeadlessBackend::default().with_dataset("sites", features);
        let probe = backend.probe();
        let mut registry = MapRegistry::new(backend);
        for id in ids {
            registry.create(&ContainerId::from(*id), &MapOptions::default()).unwrap();
        }
        (registry, probe)
    }

    fn wms(name: &str) -> WmsLayer {
        WmsLayer::new("https://maps.example.org/wms", [name])
    }

    fn applied(report: ApplyReport) -> ApplyChanges {
        match report {
            ApplyReport::Applied(changes) => changes,
            ApplyReport::Dropped => panic!("state was dropped"),
        }
    }

    #[test]
    fn test_stale_target_is_dropped() {
        let (mut registry, probe) = mounted(&[]);
        let report = registry
            .apply(&"gone".into(), &MapState::empty().with_layer(wms("bio1")))
            .unwrap();
        assert_eq!(report, ApplyReport::Dropped);
        assert!(probe.mounted().is_empty());
    }

    #[test]
    fn test_invalid_state_touches_nothing() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let good = MapState::empty().with_layer(wms("bio1"));
        registry.apply(&id, &good).unwrap();

        let bad = MapState::empty().with_layer(wms("bio2")).with_layer(wms("bio2"));
        let err = registry.apply(&id, &bad).unwrap_err();
        assert!(matches!(
            err,
            MapsyncError::InvalidState(InvalidState::DuplicateLayer { index: 1, first: 0 })
        ));
        assert_eq!(probe.layers(&id), vec![LayerDescriptor::from(wms("bio1"))]);
        assert_eq!(registry.get(&id).unwrap().applied_state(), Some(&good));

        // Also rejected, not dropped, for an unmounted container.
        assert!(registry.apply(&"elsewhere".into(), &bad).is_err());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let state = MapState::empty()
            .with_view(MapView::new(10.0, 20.0, 4.0))
            .with_bounds(Bounds::from_bbox([-10.0, -5.0, 10.0, 5.0]))
            .with_layer(wms("bio1"))
            .with_layer(TileLayer::openstreetmap());

        let first = applied(registry.apply(&id, &state).unwrap());
        assert_eq!(first.added, 2);
        assert!(first.view_changed);

        let second = applied(registry.apply(&id, &state).unwrap());
        assert!(second.is_noop());
        assert_eq!(probe.set_view_calls(&id), 1);
        assert_eq!(probe.layers(&id).len(), 2);
    }

    #[test]
    fn test_empty_layers_clear_and_ignore_view() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        registry
            .apply(&id, &MapState::empty().with_layer(wms("bio1")).with_layer(wms("bio2")))
            .unwrap();

        let cleared = MapState::empty().with_view(MapView::new(45.0, 45.0, 9.0));
        let changes = applied(registry.apply(&id, &cleared).unwrap());
        assert_eq!(changes.removed, 2);
        assert!(!changes.view_changed);
        assert!(probe.layers(&id).is_empty());
        assert_eq!(probe.view(&id), Some(MapView::default()));
        assert_eq!(registry.get(&id).unwrap().applied_state(), Some(&cleared));
    }

    #[test]
    fn test_replacing_one_layer_keeps_the_other() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        registry
            .apply(&id, &MapState::empty().with_layer(wms("bio1")).with_layer(wms("bio2")))
            .unwrap();
        let kept = registry.get(&id).unwrap().layers()[0].handle;

        let changes = applied(
            registry
                .apply(&id, &MapState::empty().with_layer(wms("bio1")).with_layer(wms("bio3")))
                .unwrap(),
        );
        assert_eq!((changes.added, changes.removed), (1, 1));
        assert!(!changes.reordered);
        assert_eq!(registry.get(&id).unwrap().layers()[0].handle, kept);
        assert_eq!(
            probe.layers(&id),
            vec![wms("bio1").into(), LayerDescriptor::from(wms("bio3"))]
        );
        assert_eq!(probe.created(&id), 1);
    }

    #[test]
    fn test_reorder_brings_layers_to_front() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        registry
            .apply(&id, &MapState::empty().with_layer(wms("a")).with_layer(wms("b")))
            .unwrap();

        let changes = applied(
            registry
                .apply(&id, &MapState::empty().with_layer(wms("b")).with_layer(wms("a")))
                .unwrap(),
        );
        assert!(changes.reordered);
        assert_eq!((changes.added, changes.removed), (0, 0));
        assert_eq!(
            probe.layers(&id),
            vec![wms("b").into(), LayerDescriptor::from(wms("a"))]
        );
        assert_eq!(probe.created(&id), 1);
    }

    #[test]
    fn test_style_change_restyles_in_place() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let layer = |column: &str| {
            GeoJsonLayer::new("sites", StyleRule::Classified { column: column.into() })
        };
        registry.apply(&id, &MapState::empty().with_layer(layer("sp1"))).unwrap();
        let handle = registry.get(&id).unwrap().layers()[0].handle;
        assert_eq!(probe.feature_styles(&id, 0)[0].fill_color.as_deref(), Some("blue"));

        let changes = applied(registry.apply(&id, &MapState::empty().with_layer(layer("sp2"))).unwrap());
        assert_eq!(changes.restyled, 1);
        assert_eq!((changes.added, changes.removed), (0, 0));
        assert_eq!(registry.get(&id).unwrap().layers()[0].handle, handle);
        assert_eq!(probe.feature_styles(&id, 0)[0].fill_color.as_deref(), Some("red"));
    }

    #[test]
    fn test_failed_attach_rolls_back() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let before = MapState::empty().with_layer(wms("bio1"));
        registry.apply(&id, &before).unwrap();

        let broken = MapState::empty()
            .with_layer(wms("bio1"))
            .with_layer(wms("bio2"))
            .with_layer(GeoJsonLayer::new("no-such-dataset", StyleRule::Uniform { color: "red".into() }));
        let err = registry.apply(&id, &broken).unwrap_err();
        assert!(matches!(err, MapsyncError::Backend(_)));
        assert_eq!(probe.layers(&id), vec![LayerDescriptor::from(wms("bio1"))]);
        assert_eq!(registry.get(&id).unwrap().layers().len(), 1);
        assert_eq!(registry.get(&id).unwrap().applied_state(), Some(&before));
    }

    #[test]
    fn test_failed_attach_keeps_layers_it_would_remove() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let before = MapState::empty().with_layer(wms("bio0"));
        registry.apply(&id, &before).unwrap();

        let broken = MapState::empty()
            .with_layer(wms("bio1"))
            .with_layer(GeoJsonLayer::new("missing", StyleRule::Uniform { color: "red".into() }));
        assert!(registry.apply(&id, &broken).is_err());

        assert_eq!(probe.layers(&id), vec![LayerDescriptor::from(wms("bio0"))]);
        let entry = registry.get(&id).unwrap();
        assert_eq!(entry.layers().len(), 1);
        assert_eq!(entry.layers()[0].descriptor, LayerDescriptor::from(wms("bio0")));
        assert_eq!(entry.applied_state(), Some(&before));
    }

    #[test]
    fn test_view_wins_over_bounds_with_a_single_move() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let bounds = Bounds::from_bbox([0.0, 0.0, 10.0, 10.0]);
        let view = MapView::new(40.0, 40.0, 6.0);
        let both = MapState::empty()
            .with_view(view)
            .with_bounds(bounds)
            .with_layer(wms("bio1"));

        let changes = applied(registry.apply(&id, &both).unwrap());
        assert!(changes.view_changed);
        assert!(!changes.bounds_fitted);
        assert_eq!(probe.pending_events(), 1);
        assert_eq!(probe.fit_bounds_calls(&id), 0);
        assert_eq!(probe.view(&id), Some(view));

        // Dropping the view fits the bounds that were never fitted.
        let changes = applied(
            registry
                .apply(&id, &MapState::empty().with_bounds(bounds).with_layer(wms("bio1")))
                .unwrap(),
        );
        assert!(changes.bounds_fitted);
        assert_eq!(probe.fit_bounds_calls(&id), 1);
    }

    #[test]
    fn test_failed_move_records_layers_with_previous_view() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        probe.fail_set_view("m1");

        let state = MapState::empty()
            .with_view(MapView::new(5.0, 5.0, 5.0))
            .with_layer(wms("bio1"));
        assert!(registry.apply(&id, &state).is_err());

        assert_eq!(probe.layers(&id), vec![LayerDescriptor::from(wms("bio1"))]);
        assert_eq!(
            registry.get(&id).unwrap().applied_state(),
            Some(&MapState::empty().with_layer(wms("bio1")))
        );
    }

    #[test]
    fn test_bounds_refit_only_when_changed() {
        let (mut registry, probe) = mounted(&["m1"]);
        let id = ContainerId::from("m1");
        let a = Bounds::from_bbox([0.0, 0.0, 10.0, 10.0]);
        let b = Bounds::from_bbox([0.0, 0.0, 20.0, 20.0]);
        let state = |bounds| MapState::empty().with_bounds(bounds).with_layer(wms("bio1"));

        registry.apply(&id, &state(a)).unwrap();
        registry.apply(&id, &state(a)).unwrap();
        assert_eq!(probe.fit_bounds_calls(&id), 1);
        registry.apply(&id, &state(b)).unwrap();
        assert_eq!(probe.fit_bounds_calls(&id), 2);
    }
}
