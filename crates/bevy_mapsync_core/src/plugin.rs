//! Plugin for `bevy_mapsync_core`.

use std::sync::Mutex;
use std::time::Duration;

use bevy::prelude::*;

use crate::backend::{HeadlessBackend, MapBackend, MapOptions};
use crate::components::{ContainerId, ContainerSelector, MapAttributes, MapContainer};
use crate::events::{
    MapCommand, MapCreationFailed, MapSelectionDrawn, MapStateRejected, MapStateReport,
    StateRequested, ViewChanged,
};
use crate::registry::{MapRegistry, PushedStates};
use crate::state::AttributeNames;
use crate::systems::{
    ContainerOwners, PollTimer, apply_map_commands, on_container_inserted, on_container_replaced,
    poll_containers, pump_backend_events, reapply_changed_attributes, teardown_on_exit,
};

/// Where a container's map state comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StateSource {
    /// Pushed by the application through [`MapCommand`]s.
    #[default]
    Push,
    /// Read from the container's [`MapAttributes`].
    Pull(AttributeNames),
}

/// How container insertion and removal are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleSource {
    /// React to `MapContainer` being added or removed.
    #[default]
    Observer,
    /// Rescan all containers every `interval`.
    Poll { interval: Duration },
}

impl LifecycleSource {
    /// Poll every 100 ms.
    pub fn polling() -> Self {
        Self::Poll {
            interval: Duration::from_millis(100),
        }
    }
}

/// Configuration for [`MapsyncCorePlugin`].
///
/// Inserted as a resource; the systems read it every frame.
///
/// # Example
///
/// ```rust,no_run
/// use bevy_mapsync_core::prelude::*;
///
/// // Two maps kept in tandem, state read from `data-leaflet*` attributes.
/// let config = MapsyncCoreConfig::default()
///     .with_state_source(StateSource::Pull(AttributeNames::default()))
///     .with_tandem(true);
/// ```
#[derive(Resource, Debug, Clone, Default)]
pub struct MapsyncCoreConfig {
    /// Which containers get a map.
    pub selector: ContainerSelector,
    pub lifecycle: LifecycleSource,
    pub state_source: StateSource,
    /// Replay every map move on all other maps.
    pub tandem: bool,
    /// Options for every created map.
    pub map_options: MapOptions,
}

impl MapsyncCoreConfig {
    pub fn with_selector(mut self, selector: ContainerSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleSource) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_state_source(mut self, state_source: StateSource) -> Self {
        self.state_source = state_source;
        self
    }

    pub fn with_tandem(mut self, tandem: bool) -> Self {
        self.tandem = tandem;
        self
    }

    pub fn with_map_options(mut self, map_options: MapOptions) -> Self {
        self.map_options = map_options;
        self
    }
}

/// Ordering of the plugin's `PreUpdate` systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapsyncSet {
    /// Polling and attribute watching.
    Lifecycle,
    /// [`MapCommand`] processing.
    Commands,
    /// Backend events and tandem fan-out.
    BackendEvents,
}

/// Plugin keeping one map instance per mounted [`MapContainer`].
///
/// Without [`with_backend`](Self::with_backend) the in-memory
/// [`HeadlessBackend`] is used.
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_mapsync_core::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(MapsyncCorePlugin::default())
///     .add_systems(Startup, |mut commands: Commands| {
///         commands.spawn(MapContainer::new("m1").with_class("leaflet-map"));
///     })
///     .run();
/// ```
#[derive(Default)]
pub struct MapsyncCorePlugin {
    config: MapsyncCoreConfig,
    backend: Mutex<Option<Box<dyn MapBackend>>>,
}

impl MapsyncCorePlugin {
    /// Create a new plugin with custom configuration.
    pub fn new(config: MapsyncCoreConfig) -> Self {
        Self {
            config,
            backend: Mutex::new(None),
        }
    }

    /// Drive `backend` instead of the headless one.
    pub fn with_backend(self, backend: impl MapBackend) -> Self {
        self.with_boxed_backend(Box::new(backend))
    }

    pub fn with_boxed_backend(self, backend: Box<dyn MapBackend>) -> Self {
        Self {
            config: self.config,
            backend: Mutex::new(Some(backend)),
        }
    }
}

impl Plugin for MapsyncCorePlugin {
    fn build(&self, app: &mut App) {
        let backend = self
            .backend
            .lock()
            .ok()
            .and_then(|mut backend| backend.take())
            .unwrap_or_else(|| Box::new(HeadlessBackend::default()));

        app.register_type::<ContainerId>()
            .register_type::<MapContainer>()
            .register_type::<MapAttributes>();

        app.insert_resource(MapRegistry::from_boxed(backend))
            .insert_resource(self.config.clone())
            .init_resource::<PushedStates>()
            .init_resource::<ContainerOwners>();

        app.add_message::<MapCommand>()
            .add_message::<ViewChanged>()
            .add_message::<MapSelectionDrawn>()
            .add_message::<MapStateReport>()
            .add_message::<StateRequested>()
            .add_message::<MapStateRejected>()
            .add_message::<MapCreationFailed>()
            .add_message::<AppExit>();

        app.configure_sets(
            PreUpdate,
            (MapsyncSet::Lifecycle, MapsyncSet::Commands, MapsyncSet::BackendEvents).chain(),
        );

        match self.config.lifecycle {
            LifecycleSource::Observer => {
                app.add_observer(on_container_replaced);
                app.add_observer(on_container_inserted);
            }
            LifecycleSource::Poll { interval } => {
                app.init_resource::<Time>();
                app.insert_resource(PollTimer(Timer::new(interval, TimerMode::Repeating)));
                app.add_systems(PreUpdate, poll_containers.in_set(MapsyncSet::Lifecycle));
            }
        }

        if matches!(self.config.state_source, StateSource::Pull(_)) {
            app.add_systems(
                PreUpdate,
                reapply_changed_attributes
                    .in_set(MapsyncSet::Lifecycle)
                    .after(poll_containers),
            );
        }

        app.add_systems(PreUpdate, apply_map_commands.in_set(MapsyncSet::Commands))
            .add_systems(PreUpdate, pump_backend_events.in_set(MapsyncSet::BackendEvents))
            .add_systems(Last, teardown_on_exit);

        info!(
            "MapsyncCorePlugin initialized ({:?} lifecycle, tandem: {})",
            self.config.lifecycle, self.config.tandem
        );
    }
}
