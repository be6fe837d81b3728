//! The seam to the imperative map library.
//!
//! The registry drives a [`MapBackend`]; it never renders, fetches tiles or
//! runs geometry itself. A [`HeadlessBackend`] keeps everything in memory.

pub mod headless;

use thiserror::Error;

use crate::components::ContainerId;
use crate::state::{Bounds, LayerDescriptor, MapView, TileLayer};
use crate::style::StyleRule;

pub use headless::{HeadlessBackend, HeadlessProbe};

/// Opaque handle to a map instance owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapHandle(pub u64);

/// Opaque handle to an overlay layer owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerHandle(pub u64);

/// Coordinate reference system of a map instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crs {
    /// Web Mercator.
    #[default]
    Epsg3857,
    /// Plate carrée, as used by most WMS endpoints.
    Epsg4326,
}

/// Options used when a map instance is created.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub crs: Crs,
    /// View set right after creation.
    pub initial_view: MapView,
    /// Fit these bounds after creation (overrides `initial_view`).
    pub fit_bounds: Option<Bounds>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub world_copy_jump: bool,
    /// Base tile layers drawn under every overlay. Not part of the layer set.
    pub base_layers: Vec<TileLayer>,
    /// Install the draw control used by draw-and-select.
    pub draw_tools: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            crs: Crs::default(),
            initial_view: MapView::default(),
            fit_bounds: None,
            min_zoom: None,
            max_zoom: None,
            world_copy_jump: false,
            base_layers: Vec::new(),
            draw_tools: false,
        }
    }
}

/// Something the map library reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// A map finished moving (pan or zoom), from user input or from
    /// [`MapBackend::set_view`] / [`MapBackend::fit_bounds`].
    Moved {
        container: ContainerId,
        view: MapView,
    },
    /// The user completed a draw-and-select; `sites` are the point features
    /// inside the drawn shape.
    SelectionDrawn {
        container: ContainerId,
        sites: Vec<String>,
    },
}

/// Failures reported by a map backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("map container '{0}' is already initialized")]
    ContainerInUse(ContainerId),

    #[error("unknown map handle {0:?}")]
    UnknownMap(MapHandle),

    #[error("layer source '{0}' is not available")]
    UnknownSource(String),

    #[error("map library error: {0}")]
    Library(String),
}

/// The imperative map library.
///
/// Implementations must report a [`BackendEvent::Moved`] through
/// [`poll_event`](Self::poll_event) whenever a view changes, including changes
/// made by [`set_view`](Self::set_view) and [`fit_bounds`](Self::fit_bounds),
/// the way a map library fires its move-end event.
pub trait MapBackend: Send + Sync + 'static {
    /// Create a map bound to `container`.
    fn create_map(
        &mut self,
        container: &ContainerId,
        options: &MapOptions,
    ) -> Result<MapHandle, BackendError>;

    /// Release a map and everything attached to it.
    fn remove_map(&mut self, map: MapHandle);

    /// Attach a layer on top of the current layers.
    fn add_layer(
        &mut self,
        map: MapHandle,
        layer: &LayerDescriptor,
    ) -> Result<LayerHandle, BackendError>;

    /// Detach a layer.
    fn remove_layer(&mut self, map: MapHandle, layer: LayerHandle);

    /// Restyle an attached GeoJSON layer in place.
    fn set_layer_style(
        &mut self,
        map: MapHandle,
        layer: LayerHandle,
        style: &StyleRule,
    ) -> Result<(), BackendError>;

    /// Move a layer above every other layer.
    fn bring_to_front(&mut self, map: MapHandle, layer: LayerHandle);

    /// Current view, `None` for an unknown map.
    fn view(&self, map: MapHandle) -> Option<MapView>;

    /// Set the view without animation.
    fn set_view(&mut self, map: MapHandle, view: MapView) -> Result<(), BackendError>;

    /// Fit the view to `bounds`.
    fn fit_bounds(&mut self, map: MapHandle, bounds: Bounds) -> Result<(), BackendError>;

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<BackendEvent>;
}
