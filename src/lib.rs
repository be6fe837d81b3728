//! # bevy_mapsync
//!
//! Keeps live map instances in lockstep with their container entities and
//! with the state a message-passing application pushes to them.
//!
//! This is a meta-crate combining the `bevy_mapsync_*` sub-crates behind
//! feature flags.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_mapsync::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(BevyMapsyncPlugin::default())
//!         .add_systems(Startup, spawn_map)
//!         .run();
//! }
//!
//! fn spawn_map(mut commands: Commands) {
//!     commands.spawn(MapContainer::new("species-map").with_class("leaflet-map"));
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: Includes `ports`
//! - **ports**: JSON port channel ([`ports`]) for talking to a message-passing UI
//!
//! ## Architecture
//!
//! - [`core`]: map registry, container lifecycle, state applier, tandem sync and
//!   the [`MapBackend`](core::backend::MapBackend) seam
//! - [`ports`] (optional): frames in, frames out

pub mod plugin;

pub use bevy_mapsync_core as core;

#[cfg(feature = "ports")]
pub use bevy_mapsync_ports as ports;

/// Unified prelude for bevy_mapsync
pub mod prelude {
    pub use crate::core::prelude::*;

    #[cfg(feature = "ports")]
    pub use crate::ports::prelude::*;

    pub use crate::plugin::BevyMapsyncPlugin;
}
