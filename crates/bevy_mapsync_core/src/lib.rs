//! # `bevy_mapsync_core`
//!
//! Map lifecycle synchronization for `bevy_mapsync`. Keeps exactly one live
//! map instance per mounted container entity and reconciles each map with the
//! view and layer state the application pushes (or the container's attributes
//! describe).
//!
//! **This crate does NOT render maps or fetch tiles** - that is the job of the
//! [`MapBackend`](backend::MapBackend) it drives.
//!
//! ## How it fits together
//!
//! 1. **Containers**: an entity with a [`MapContainer`](components::MapContainer)
//!    is a place a map lives. Spawning it mounts a map, despawning it
//!    unmounts the map.
//! 2. **Registry**: [`MapRegistry`](registry::MapRegistry) owns the backend and
//!    every live map, keyed by [`ContainerId`](components::ContainerId).
//! 3. **Applier**: [`MapRegistry::apply`](registry::MapRegistry::apply) diffs a
//!    [`MapState`](state::MapState) against the map and changes only what
//!    differs. Maps are never recreated to change layers.
//! 4. **Tandem**: optionally, moving one map moves all the others.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_mapsync_core::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(MinimalPlugins)
//!         .add_plugins(MapsyncCorePlugin::default())
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands, mut maps: MessageWriter<MapCommand>) {
//!     commands.spawn(MapContainer::new("m1").with_class("leaflet-map"));
//!     maps.write(MapCommand::set(
//!         "m1",
//!         MapState::empty().with_layer(WmsLayer::new("https://maps.example.org/wms", ["bio1"])),
//!     ));
//! }
//! ```

pub mod applier;
pub mod backend;
pub mod components;
pub mod error;
pub mod events;
pub mod plugin;
pub mod registry;
pub mod state;
pub mod style;
pub mod systems;
pub mod tandem;

pub mod prelude {
    //! Common imports for `bevy_mapsync_core` users.

    pub use crate::applier::{ApplyChanges, ApplyReport};
    pub use crate::backend::{
        BackendError, BackendEvent, Crs, HeadlessBackend, HeadlessProbe, LayerHandle,
        MapBackend, MapHandle, MapOptions,
    };
    pub use crate::components::{ContainerId, ContainerSelector, MapAttributes, MapContainer};
    pub use crate::error::{InvalidState, MapsyncError};
    pub use crate::events::{
        MapCommand, MapCreationFailed, MapMounted, MapSelectionDrawn, MapStateRejected,
        MapStateReport, StateRequested, ViewChanged,
    };
    pub use crate::plugin::{
        LifecycleSource, MapsyncCoreConfig, MapsyncCorePlugin, MapsyncSet, StateSource,
    };
    pub use crate::registry::{AttachedLayer, MapEntry, MapRegistry, PushedStates};
    pub use crate::state::{
        AttributeNames, Bounds, GeoJsonLayer, LatLng, LayerDescriptor, LayerKey, MapState,
        MapView, TileLayer, WmsLayer,
    };
    pub use crate::style::{Classification, FeatureStyle, StyleRule};
    pub use crate::systems::ContainerOwners;
    pub use crate::tandem::{MapNotice, PropagationFlag, PropagationToken};
}
