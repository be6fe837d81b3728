//! Unified plugin for bevy_mapsync.

use std::sync::Mutex;

use bevy::prelude::*;

use bevy_mapsync_core::backend::MapBackend;
use bevy_mapsync_core::plugin::{MapsyncCoreConfig, MapsyncCorePlugin};

#[cfg(feature = "ports")]
use bevy_mapsync_ports::plugin::{PortsConfig, PortsPlugin};

/// Unified plugin that adds all enabled bevy_mapsync functionality.
///
/// - Map lifecycle and state sync ([`MapsyncCorePlugin`])
/// - `ports` (default): the JSON port channel (`PortsPlugin`)
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_mapsync::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(
///         BevyMapsyncPlugin::default()
///             .with_core(MapsyncCoreConfig::default().with_tandem(true)),
///     )
///     .run();
/// ```
#[derive(Default)]
pub struct BevyMapsyncPlugin {
    /// Core configuration
    pub core: MapsyncCoreConfig,

    /// Port channel configuration (if feature enabled)
    #[cfg(feature = "ports")]
    pub ports: PortsConfig,

    backend: Mutex<Option<Box<dyn MapBackend>>>,
}

impl BevyMapsyncPlugin {
    /// Create with custom core configuration
    pub fn with_core(mut self, config: MapsyncCoreConfig) -> Self {
        self.core = config;
        self
    }

    /// Create with custom port channel configuration
    #[cfg(feature = "ports")]
    pub fn with_ports(mut self, config: PortsConfig) -> Self {
        self.ports = config;
        self
    }

    /// Drive `backend` instead of the headless in-memory one
    pub fn with_backend(mut self, backend: impl MapBackend) -> Self {
        self.backend = Mutex::new(Some(Box::new(backend)));
        self
    }
}

impl Plugin for BevyMapsyncPlugin {
    fn build(&self, app: &mut App) {
        let mut core = MapsyncCorePlugin::new(self.core.clone());
        if let Some(backend) = self.backend.lock().ok().and_then(|mut backend| backend.take()) {
            core = core.with_boxed_backend(backend);
        }
        app.add_plugins(core);

        #[cfg(feature = "ports")]
        app.add_plugins(PortsPlugin::new(self.ports.clone()));

        info!("BevyMapsyncPlugin initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_unified_plugin_mounts_with_given_backend() {
        let backend = HeadlessBackend::default();
        let probe = backend.probe();
        let mut app = App::new();
        app.add_plugins(
            BevyMapsyncPlugin::default()
                .with_core(MapsyncCoreConfig::default().with_selector(ContainerSelector::Any))
                .with_backend(backend),
        );

        app.world_mut().spawn(MapContainer::new("m1"));
        app.update();
        assert_eq!(probe.mounted(), vec![ContainerId::from("m1")]);
    }

    #[cfg(feature = "ports")]
    #[test]
    fn test_unified_plugin_wires_ports() {
        let backend = HeadlessBackend::default();
        let probe = backend.probe();
        let mut app = App::new();
        app.add_plugins(BevyMapsyncPlugin::default().with_backend(backend));

        app.world_mut()
            .spawn(MapContainer::new("m1").with_class("leaflet-map"));
        app.world_mut().resource_mut::<PortInbox>().push(
            serde_json::json!({
                "port": "setMapState",
                "payload": {"containerId": "m1", "layers": [{"endpoint": "https://x/wms", "layers": ["bio1"]}]}
            })
            .to_string(),
        );
        app.update();

        assert_eq!(probe.layers(&"m1".into()).len(), 1);
        let frames = app.world_mut().resource_mut::<PortOutbox>().drain();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("stateRequested"));
    }
}
