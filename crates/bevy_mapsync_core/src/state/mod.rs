//! Declarative map state: view, bounds and overlay layers.

pub mod attributes;
pub mod layer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidState, MapsyncError};

pub use attributes::{AttributeNames, WatchedValues};
pub use layer::{GeoJsonLayer, LayerDescriptor, LayerKey, TileLayer, WmsLayer};

/// A geographic coordinate.
///
/// Serialized as a `[lat, lng]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite() && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lng]
    }
}

/// Center and zoom of a map instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
}

impl MapView {
    pub const fn new(lat: f64, lng: f64, zoom: f64) -> Self {
        Self {
            center: LatLng::new(lat, lng),
            zoom,
        }
    }

    /// Check the view is something a map library can display.
    pub fn validate(&self) -> Result<(), InvalidState> {
        if !self.center.is_valid() {
            return Err(InvalidState::CenterOutOfRange {
                lat: self.center.lat,
                lng: self.center.lng,
            });
        }
        if !self.zoom.is_finite() || self.zoom < 0.0 {
            return Err(InvalidState::InvalidZoom(self.zoom));
        }
        Ok(())
    }
}

impl Default for MapView {
    /// The view every map starts with: `[0, 0]` at zoom 1.
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// A south-west / north-east bounding box.
///
/// Serialized as `[[south, west], [north, east]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub const fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Convert a GeoJSON bbox (`[min_x, min_y, max_x, max_y]`, lng/lat order).
    pub fn from_bbox([min_x, min_y, max_x, max_y]: [f64; 4]) -> Self {
        Self {
            south_west: LatLng::new(min_y, min_x),
            north_east: LatLng::new(max_y, max_x),
        }
    }

    pub fn validate(&self) -> Result<(), InvalidState> {
        let ordered = self.south_west.lat <= self.north_east.lat
            && self.south_west.lng <= self.north_east.lng;
        if self.south_west.is_valid() && self.north_east.is_valid() && ordered {
            Ok(())
        } else {
            Err(InvalidState::InvalidBounds)
        }
    }
}

impl From<[[f64; 2]; 2]> for Bounds {
    fn from([sw, ne]: [[f64; 2]; 2]) -> Self {
        Self::new(sw.into(), ne.into())
    }
}

impl From<Bounds> for [[f64; 2]; 2] {
    fn from(value: Bounds) -> Self {
        [value.south_west.into(), value.north_east.into()]
    }
}

/// What a container should display.
///
/// Layers are ordered bottom to top: later descriptors draw above earlier ones.
///
/// # Example
///
/// ```rust
/// # use bevy_mapsync_core::state::MapState;
/// let state = MapState::from_json(
///     r#"{"view": {"center": [0, 0], "zoom": 1},
///         "layers": [{"endpoint": "https://x/wms", "layers": ["bio1"]}]}"#,
/// ).unwrap();
/// assert_eq!(state.layers.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<MapView>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

impl MapState {
    /// A state with no view and no layers.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_view(mut self, view: MapView) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_layer(mut self, layer: impl Into<LayerDescriptor>) -> Self {
        self.layers.push(layer.into());
        self
    }

    /// Parse and validate a JSON payload.
    pub fn from_json(json: &str) -> Result<Self, MapsyncError> {
        let state: Self = serde_json::from_str(json)?;
        state.validate()?;
        Ok(state)
    }

    /// Parse and validate an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, MapsyncError> {
        let state: Self = serde_json::from_value(value)?;
        state.validate()?;
        Ok(state)
    }

    /// Validate view, bounds and every layer descriptor.
    ///
    /// Two descriptors with the same [`LayerKey`] are rejected.
    pub fn validate(&self) -> Result<(), InvalidState> {
        if let Some(view) = &self.view {
            view.validate()?;
        }
        if let Some(bounds) = &self.bounds {
            bounds.validate()?;
        }

        let mut seen: HashMap<LayerKey, usize> = HashMap::new();
        for (index, layer) in self.layers.iter().enumerate() {
            layer.validate(index)?;
            if let Some(&first) = seen.get(&layer.key()) {
                return Err(InvalidState::DuplicateLayer { index, first });
            }
            seen.insert(layer.key(), index);
        }
        Ok(())
    }
}
