//! Port channel errors.

use thiserror::Error;

/// Errors decoding or encoding port frames.
#[derive(Debug, Error)]
pub enum PortError {
    /// The frame is not valid JSON or does not match any known port.
    #[error("undecodable frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame names a port this side does not listen on.
    #[error("unknown port '{0}'")]
    UnknownPort(String),
}
