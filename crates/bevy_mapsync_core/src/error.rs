//! Error types for map state handling.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced by the registry and the command applier.
#[derive(Debug, Error)]
pub enum MapsyncError {
    /// The requested state failed validation. Nothing was applied.
    #[error("invalid map state: {0}")]
    InvalidState(#[from] InvalidState),

    /// A container attribute could not be parsed.
    #[error("malformed attribute '{attribute}': {source}")]
    MalformedAttribute {
        attribute: String,
        #[source]
        source: serde_json::Error,
    },

    /// A state payload could not be parsed.
    #[error("malformed map state: {0}")]
    Json(#[from] serde_json::Error),

    /// The map backend failed.
    #[error("map backend error: {0}")]
    Backend(#[from] BackendError),
}

impl MapsyncError {
    /// Whether this error is a payload problem (as opposed to a backend failure).
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Backend(_))
    }
}

/// Validation failures for a [`MapState`](crate::state::MapState).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidState {
    #[error("view center ({lat}, {lng}) is out of range")]
    CenterOutOfRange { lat: f64, lng: f64 },

    #[error("zoom {0} must be finite and non-negative")]
    InvalidZoom(f64),

    #[error("bounds must be finite and ordered south-west to north-east")]
    InvalidBounds,

    #[error("layer {index}: endpoint is empty")]
    MissingEndpoint { index: usize },

    #[error("layer {index}: no named sub-layers")]
    NoSubLayers { index: usize },

    #[error("layer {index}: tile url is empty")]
    MissingUrl { index: usize },

    #[error("layer {index}: zoom range {min}..{max} is inverted")]
    InvertedZoomRange { index: usize, min: u8, max: u8 },

    #[error("layer {index}: GeoJSON source is empty")]
    MissingSource { index: usize },

    #[error("layer {index}: style property name is empty")]
    MissingStyleProperty { index: usize },

    #[error("layer {index} duplicates layer {first}")]
    DuplicateLayer { index: usize, first: usize },
}
