//! # `bevy_mapsync_ports`
//!
//! JSON port channel between `bevy_mapsync` and a message-passing UI.
//!
//! Frames are `{"port": <name>, "payload": <value>}` objects. Inbound map
//! frames (`setMapState`, `clearMapState`, `requestState`) become
//! [`MapCommand`](bevy_mapsync_core::events::MapCommand)s; map messages
//! become outbound frames (`viewChanged`, `mapSelectionDrawn`, `mapState`,
//! `stateRequested`, `mapStateRejected`, `mapCreationFailed`).
//!
//! A few peripheral ports ride along: file selection previews, upload
//! progress and plot-relative pointer events.
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_mapsync_core::prelude::*;
//! use bevy_mapsync_ports::prelude::*;
//!
//! let mut app = App::new();
//! app.add_plugins(MapsyncCorePlugin::default())
//!     .add_plugins(PortsPlugin::default());
//!
//! app.world_mut()
//!     .resource_mut::<PortInbox>()
//!     .push(r#"{"port": "requestState", "payload": "m1"}"#);
//! app.update();
//!
//! for frame in app.world_mut().resource_mut::<PortOutbox>().drain() {
//!     info!("to ui: {frame}");
//! }
//! ```

pub mod bridge;
pub mod error;
pub mod frame;
pub mod peripheral;
pub mod plugin;

pub mod prelude {
    //! Common imports for `bevy_mapsync_ports` users.

    pub use crate::bridge::{PortInbox, PortOutbox};
    pub use crate::error::PortError;
    pub use crate::frame::{InboundFrame, OutboundFrame, decode, encode};
    pub use crate::peripheral::PlotArea;
    pub use crate::plugin::{PortsConfig, PortsPlugin};
}
