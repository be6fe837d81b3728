//! Overlay layer descriptors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidState;
use crate::style::StyleRule;

/// A layer a map should display.
///
/// Deserialized without a tag: the variant is picked by its required fields
/// (`endpoint` for WMS, `url` for tiles, `source` for GeoJSON).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerDescriptor {
    /// A Web Map Service raster overlay.
    Wms(WmsLayer),
    /// A slippy-map tile layer (`{z}/{x}/{y}` url template).
    Tile(TileLayer),
    /// A named GeoJSON dataset rendered with a style rule.
    GeoJson(GeoJsonLayer),
}

/// Identity of a layer, used to diff layer sets.
///
/// Equal to the descriptor except that GeoJSON styling is left out, so a
/// style-only change restyles the layer instead of replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerKey {
    Wms(WmsLayer),
    Tile(TileLayer),
    GeoJson { source: String, hide_all_zero: bool },
}

impl LayerDescriptor {
    /// Identity of this layer.
    pub fn key(&self) -> LayerKey {
        match self {
            Self::Wms(wms) => LayerKey::Wms(wms.clone()),
            Self::Tile(tile) => LayerKey::Tile(tile.clone()),
            Self::GeoJson(geojson) => LayerKey::GeoJson {
                source: geojson.source.clone(),
                hide_all_zero: geojson.hide_all_zero,
            },
        }
    }

    /// Style rule, for layers that have one.
    pub fn style(&self) -> Option<&StyleRule> {
        match self {
            Self::GeoJson(geojson) => Some(&geojson.style),
            Self::Wms(_) | Self::Tile(_) => None,
        }
    }

    /// Validate the descriptor found at `index` in a layer list.
    pub fn validate(&self, index: usize) -> Result<(), InvalidState> {
        match self {
            Self::Wms(wms) => {
                if wms.endpoint.trim().is_empty() {
                    return Err(InvalidState::MissingEndpoint { index });
                }
                if wms.layers.iter().all(|name| name.trim().is_empty()) {
                    return Err(InvalidState::NoSubLayers { index });
                }
            }
            Self::Tile(tile) => {
                if tile.url.trim().is_empty() {
                    return Err(InvalidState::MissingUrl { index });
                }
                if let (Some(min), Some(max)) = (tile.min_zoom, tile.max_zoom) {
                    if min > max {
                        return Err(InvalidState::InvertedZoomRange { index, min, max });
                    }
                }
            }
            Self::GeoJson(geojson) => {
                if geojson.source.trim().is_empty() {
                    return Err(InvalidState::MissingSource { index });
                }
                if !geojson.style.is_well_formed() {
                    return Err(InvalidState::MissingStyleProperty { index });
                }
            }
        }
        Ok(())
    }
}

impl From<WmsLayer> for LayerDescriptor {
    fn from(layer: WmsLayer) -> Self {
        Self::Wms(layer)
    }
}

impl From<TileLayer> for LayerDescriptor {
    fn from(layer: TileLayer) -> Self {
        Self::Tile(layer)
    }
}

impl From<GeoJsonLayer> for LayerDescriptor {
    fn from(layer: GeoJsonLayer) -> Self {
        Self::GeoJson(layer)
    }
}

/// WMS overlay parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WmsLayer {
    /// Service endpoint. `endPoint` is accepted on input.
    #[serde(alias = "endPoint")]
    pub endpoint: String,

    /// Optional `map` parameter (mapserver map file name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,

    /// Named sub-layers, joined with commas in the request.
    pub layers: Vec<String>,

    #[serde(default = "default_format")]
    pub format: String,

    #[serde(default = "default_transparent")]
    pub transparent: bool,

    #[serde(default = "default_version")]
    pub version: String,
}

impl WmsLayer {
    /// A transparent PNG layer on WMS 1.1.0.
    pub fn new<S: Into<String>>(endpoint: impl Into<String>, layers: impl IntoIterator<Item = S>) -> Self {
        Self {
            endpoint: endpoint.into(),
            map_name: None,
            layers: layers.into_iter().map(Into::into).collect(),
            format: default_format(),
            transparent: default_transparent(),
            version: default_version(),
        }
    }

    pub fn with_map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = Some(map_name.into());
        self
    }

    /// Value of the `layers` request parameter.
    pub fn layers_param(&self) -> String {
        self.layers.join(",")
    }
}

fn default_format() -> String {
    "image/png".to_string()
}

fn default_transparent() -> bool {
    true
}

fn default_version() -> String {
    "1.1.0".to_string()
}

/// Tile layer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    /// Url template, e.g. `http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl TileLayer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            min_zoom: None,
            max_zoom: None,
            attribution: None,
        }
    }

    /// OpenStreetMap base tiles.
    pub fn openstreetmap() -> Self {
        Self {
            url: "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            min_zoom: Some(1),
            max_zoom: Some(12),
            attribution: Some("© OpenStreetMap".to_string()),
        }
    }

    pub fn with_zoom_range(mut self, min: u8, max: u8) -> Self {
        self.min_zoom = Some(min);
        self.max_zoom = Some(max);
        self
    }
}

/// A GeoJSON dataset overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonLayer {
    /// Name of a dataset known to the map backend.
    pub source: String,

    pub style: StyleRule,

    /// Hide features whose properties are all numeric zero.
    #[serde(default)]
    pub hide_all_zero: bool,
}

impl GeoJsonLayer {
    pub fn new(source: impl Into<String>, style: StyleRule) -> Self {
        Self {
            source: source.into(),
            style,
            hide_all_zero: false,
        }
    }

    pub fn hiding_all_zero(mut self) -> Self {
        self.hide_all_zero = true;
        self
    }

    /// Whether a feature with `properties` passes this layer's filter.
    pub fn shows_feature(&self, properties: &Map<String, Value>) -> bool {
        !self.hide_all_zero || properties.values().any(|value| value.as_f64() != Some(0.0))
    }
}
