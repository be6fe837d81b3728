//! In-memory map backend.
//!
//! Keeps map instances, layers and views in plain collections and exposes them
//! through a [`HeadlessProbe`]. Useful for tests, demos and anywhere no real
//! map library is available.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::backend::{
    BackendError, BackendEvent, LayerHandle, MapBackend, MapHandle, MapOptions,
};
use crate::components::ContainerId;
use crate::state::{Bounds, LatLng, LayerDescriptor, MapView};
use crate::style::{FeatureStyle, StatRanges, StyleRule};

/// A GeoJSON dataset reduced to the feature properties styling needs.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub features: Vec<Map<String, Value>>,
    pub ranges: StatRanges,
}

impl Dataset {
    pub fn new(features: Vec<Map<String, Value>>) -> Self {
        let ranges = StatRanges::from_features(&features);
        Self { features, ranges }
    }
}

#[derive(Debug)]
struct HeadlessLayer {
    handle: LayerHandle,
    descriptor: LayerDescriptor,
    feature_styles: Vec<FeatureStyle>,
}

#[derive(Debug)]
struct HeadlessMap {
    container: ContainerId,
    options: MapOptions,
    view: MapView,
    /// Bottom to top.
    layers: Vec<HeadlessLayer>,
    set_view_calls: usize,
    fit_bounds_calls: usize,
}

#[derive(Debug, Default)]
struct HeadlessState {
    next_handle: u64,
    maps: BTreeMap<MapHandle, HeadlessMap>,
    events: VecDeque<BackendEvent>,
    datasets: HashMap<String, Dataset>,
    failing_creates: HashSet<ContainerId>,
    failing_views: HashSet<ContainerId>,
    created: HashMap<ContainerId, usize>,
    removed: HashMap<ContainerId, usize>,
}

impl HeadlessState {
    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn map_for(&self, container: &ContainerId) -> Option<&HeadlessMap> {
        self.maps.values().find(|map| &map.container == container)
    }

    fn map_for_mut(&mut self, container: &ContainerId) -> Option<&mut HeadlessMap> {
        self.maps.values_mut().find(|map| &map.container == container)
    }

    fn styles_for(&self, descriptor: &LayerDescriptor) -> Result<Vec<FeatureStyle>, BackendError> {
        let LayerDescriptor::GeoJson(geojson) = descriptor else {
            return Ok(Vec::new());
        };
        let dataset = self
            .datasets
            .get(&geojson.source)
            .ok_or_else(|| BackendError::UnknownSource(geojson.source.clone()))?;
        Ok(resolve_styles(dataset, &geojson.style, |props| geojson.shows_feature(props)))
    }
}

fn resolve_styles(
    dataset: &Dataset,
    style: &StyleRule,
    shows: impl Fn(&Map<String, Value>) -> bool,
) -> Vec<FeatureStyle> {
    dataset
        .features
        .iter()
        .filter(|&props| shows(props))
        .map(|props| style.resolve(props, &dataset.ranges))
        .collect()
}

fn center_of(bounds: &Bounds) -> LatLng {
    LatLng::new(
        (bounds.south_west.lat + bounds.north_east.lat) / 2.0,
        (bounds.south_west.lng + bounds.north_east.lng) / 2.0,
    )
}

/// A [`MapBackend`] that keeps all state in memory.
///
/// # Example
///
/// ```rust
/// # use bevy_mapsync_core::backend::HeadlessBackend;
/// let backend = HeadlessBackend::default();
/// let probe = backend.probe();
/// assert!(probe.mounted().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessBackend {
    /// Register a named GeoJSON dataset (feature properties only).
    pub fn with_dataset(self, name: impl Into<String>, features: Vec<Map<String, Value>>) -> Self {
        self.lock().datasets.insert(name.into(), Dataset::new(features));
        self
    }

    /// A handle for inspecting and driving this backend from outside.
    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MapBackend for HeadlessBackend {
    fn create_map(
        &mut self,
        container: &ContainerId,
        options: &MapOptions,
    ) -> Result<MapHandle, BackendError> {
        let mut state = self.lock();
        if state.failing_creates.contains(container) {
            return Err(BackendError::Library(format!(
                "cannot initialize map in '{container}'"
            )));
        }
        if state.map_for(container).is_some() {
            return Err(BackendError::ContainerInUse(container.clone()));
        }

        let mut view = options.initial_view;
        if let Some(bounds) = &options.fit_bounds {
            view.center = center_of(bounds);
        }

        let handle = MapHandle(state.next_handle());
        state.maps.insert(
            handle,
            HeadlessMap {
                container: container.clone(),
                options: options.clone(),
                view,
                layers: Vec::new(),
                set_view_calls: 0,
                fit_bounds_calls: 0,
            },
        );
        *state.created.entry(container.clone()).or_default() += 1;
        Ok(handle)
    }

    fn remove_map(&mut self, map: MapHandle) {
        let mut state = self.lock();
        if let Some(removed) = state.maps.remove(&map) {
            *state.removed.entry(removed.container).or_default() += 1;
        }
    }

    fn add_layer(
        &mut self,
        map: MapHandle,
        layer: &LayerDescriptor,
    ) -> Result<LayerHandle, BackendError> {
        let mut state = self.lock();
        if !state.maps.contains_key(&map) {
            return Err(BackendError::UnknownMap(map));
        }
        let feature_styles = state.styles_for(layer)?;
        let handle = LayerHandle(state.next_handle());
        let entry = state.maps.get_mut(&map).ok_or(BackendError::UnknownMap(map))?;
        entry.layers.push(HeadlessLayer {
            handle,
            descriptor: layer.clone(),
            feature_styles,
        });
        Ok(handle)
    }

    fn remove_layer(&mut self, map: MapHandle, layer: LayerHandle) {
        if let Some(entry) = self.lock().maps.get_mut(&map) {
            entry.layers.retain(|l| l.handle != layer);
        }
    }

    fn set_layer_style(
        &mut self,
        map: MapHandle,
        layer: LayerHandle,
        style: &StyleRule,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        let state = &mut *state;
        let entry = state.maps.get_mut(&map).ok_or(BackendError::UnknownMap(map))?;
        let Some(target) = entry.layers.iter_mut().find(|l| l.handle == layer) else {
            return Ok(());
        };
        if let LayerDescriptor::GeoJson(geojson) = &mut target.descriptor {
            let dataset = state
                .datasets
                .get(&geojson.source)
                .ok_or_else(|| BackendError::UnknownSource(geojson.source.clone()))?;
            geojson.style = style.clone();
            target.feature_styles = resolve_styles(dataset, style, |props| geojson.shows_feature(props));
        }
        Ok(())
    }

    fn bring_to_front(&mut self, map: MapHandle, layer: LayerHandle) {
        if let Some(entry) = self.lock().maps.get_mut(&map) {
            if let Some(index) = entry.layers.iter().position(|l| l.handle == layer) {
                let moved = entry.layers.remove(index);
                entry.layers.push(moved);
            }
        }
    }

    fn view(&self, map: MapHandle) -> Option<MapView> {
        self.lock().maps.get(&map).map(|entry| entry.view)
    }

    fn set_view(&mut self, map: MapHandle, view: MapView) -> Result<(), BackendError> {
        let mut state = self.lock();
        let entry = state.maps.get_mut(&map).ok_or(BackendError::UnknownMap(map))?;
        let container = entry.container.clone();
        if state.failing_views.contains(&container) {
            return Err(BackendError::Library(format!(
                "cannot move map in '{container}'"
            )));
        }
        let entry = state.maps.get_mut(&map).ok_or(BackendError::UnknownMap(map))?;
        entry.view = view;
        entry.set_view_calls += 1;
        state.events.push_back(BackendEvent::Moved { container, view });
        Ok(())
    }

    fn fit_bounds(&mut self, map: MapHandle, bounds: Bounds) -> Result<(), BackendError> {
        let mut state = self.lock();
        let entry = state.maps.get_mut(&map).ok_or(BackendError::UnknownMap(map))?;
        entry.view.center = center_of(&bounds);
        entry.fit_bounds_calls += 1;
        let event = BackendEvent::Moved {
            container: entry.container.clone(),
            view: entry.view,
        };
        state.events.push_back(event);
        Ok(())
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.lock().events.pop_front()
    }
}

/// Inspection and simulation handle for a [`HeadlessBackend`].
///
/// Shares state with the backend it came from, so it keeps working after the
/// backend has been moved into the registry.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<HeadlessState>>,
}

impl HeadlessProbe {
    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Containers with a live map, sorted.
    pub fn mounted(&self) -> Vec<ContainerId> {
        let mut ids: Vec<_> = self.lock().maps.values().map(|m| m.container.clone()).collect();
        ids.sort();
        ids
    }

    /// Overlay layers of a container's map, bottom to top.
    pub fn layers(&self, container: &ContainerId) -> Vec<LayerDescriptor> {
        self.lock()
            .map_for(container)
            .map(|map| map.layers.iter().map(|l| l.descriptor.clone()).collect())
            .unwrap_or_default()
    }

    pub fn view(&self, container: &ContainerId) -> Option<MapView> {
        self.lock().map_for(container).map(|map| map.view)
    }

    pub fn options(&self, container: &ContainerId) -> Option<MapOptions> {
        self.lock().map_for(container).map(|map| map.options.clone())
    }

    /// Number of programmatic `set_view` calls on the container's current map.
    pub fn set_view_calls(&self, container: &ContainerId) -> usize {
        self.lock().map_for(container).map_or(0, |map| map.set_view_calls)
    }

    pub fn fit_bounds_calls(&self, container: &ContainerId) -> usize {
        self.lock().map_for(container).map_or(0, |map| map.fit_bounds_calls)
    }

    /// How many maps were ever created for a container.
    pub fn created(&self, container: &ContainerId) -> usize {
        self.lock().created.get(container).copied().unwrap_or(0)
    }

    /// How many maps were ever removed for a container.
    pub fn removed(&self, container: &ContainerId) -> usize {
        self.lock().removed.get(container).copied().unwrap_or(0)
    }

    /// Resolved styles of the visible features of a layer.
    pub fn feature_styles(&self, container: &ContainerId, layer_index: usize) -> Vec<FeatureStyle> {
        self.lock()
            .map_for(container)
            .and_then(|map| map.layers.get(layer_index))
            .map(|layer| layer.feature_styles.clone())
            .unwrap_or_default()
    }

    pub fn pending_events(&self) -> usize {
        self.lock().events.len()
    }

    /// Pan/zoom a map as a user would.
    pub fn simulate_move(&self, container: &ContainerId, view: MapView) {
        let mut state = self.lock();
        if let Some(map) = state.map_for_mut(container) {
            map.view = view;
            state.events.push_back(BackendEvent::Moved {
                container: container.clone(),
                view,
            });
        }
    }

    /// Complete a draw-and-select on a map.
    pub fn simulate_selection(&self, container: &ContainerId, sites: Vec<String>) {
        let mut state = self.lock();
        if state.map_for(container).is_some() {
            state.events.push_back(BackendEvent::SelectionDrawn {
                container: container.clone(),
                sites,
            });
        }
    }

    /// Make map creation fail for a container.
    pub fn fail_create(&self, container: impl Into<ContainerId>) {
        self.lock().failing_creates.insert(container.into());
    }

    /// Undo [`fail_create`](Self::fail_create).
    pub fn allow_create(&self, container: &ContainerId) {
        self.lock().failing_creates.remove(container);
    }

    /// Make `set_view` fail for a container.
    pub fn fail_set_view(&self, container: impl Into<ContainerId>) {
        self.lock().failing_views.insert(container.into());
    }
}
