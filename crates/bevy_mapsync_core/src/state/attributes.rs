//! Parsing map state from container attributes (pull model).

use crate::components::MapAttributes;
use crate::error::MapsyncError;
use crate::state::{Bounds, LayerDescriptor, MapState, MapView};

/// Names of the attributes read in pull mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeNames {
    /// JSON array of layer descriptors.
    pub layers: String,
    /// JSON `{center, zoom}` object.
    pub view: String,
    /// JSON `[[south, west], [north, east]]` pair.
    pub bounds: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            layers: "data-leaflet".to_string(),
            view: "data-leaflet-view".to_string(),
            bounds: "data-leaflet-bounding-box".to_string(),
        }
    }
}

/// Raw values of the watched attributes, in `layers`, `view`, `bounds` order.
pub type WatchedValues = [Option<String>; 3];

impl AttributeNames {
    /// Snapshot of the watched attributes; other attributes do not matter.
    pub fn watched_values(&self, attributes: &MapAttributes) -> WatchedValues {
        [&self.layers, &self.view, &self.bounds].map(|name| attributes.get(name).map(str::to_string))
    }
}

impl MapState {
    /// Build a state from container attributes.
    ///
    /// Missing or blank attributes mean "not specified". The result is validated.
    pub fn from_attributes(
        attributes: &MapAttributes,
        names: &AttributeNames,
    ) -> Result<Self, MapsyncError> {
        let layers: Option<Vec<LayerDescriptor>> = parse_attribute(attributes, &names.layers)?;
        let view: Option<MapView> = parse_attribute(attributes, &names.view)?;
        let bounds: Option<Bounds> = parse_attribute(attributes, &names.bounds)?;

        let state = MapState {
            view,
            bounds,
            layers: layers.unwrap_or_default(),
        };
        state.validate()?;
        Ok(state)
    }
}

fn parse_attribute<T: serde::de::DeserializeOwned>(
    attributes: &MapAttributes,
    name: &str,
) -> Result<Option<T>, MapsyncError> {
    let Some(raw) = attributes.get(name).filter(|raw| !raw.trim().is_empty()) else {
        return Ok(None);
    };
    serde_json::from_str(raw)
        .map(Some)
        .map_err(|source| MapsyncError::MalformedAttribute {
            attribute: name.to_string(),
            source,
        })
}
