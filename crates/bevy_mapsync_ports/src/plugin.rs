//! Plugin for `bevy_mapsync_ports`.

use bevy::prelude::*;
use bevy_mapsync_core::prelude::*;

use crate::bridge::{PortInbox, PortOutbox, decode_inbox, encode_outbox};

/// Configuration for [`PortsPlugin`].
#[derive(Resource, Debug, Clone)]
pub struct PortsConfig {
    /// Rows of a file preview relayed back in `selectedFileName`.
    pub preview_rows: usize,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self { preview_rows: 4 }
    }
}

/// Bridges the map messages to a JSON port channel.
///
/// Push raw frames into [`PortInbox`]; collect replies from [`PortOutbox`].
/// Add after [`MapsyncCorePlugin`].
///
/// # Example
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_mapsync_core::prelude::*;
/// use bevy_mapsync_ports::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(MapsyncCorePlugin::default())
///     .add_plugins(PortsPlugin::default());
/// ```
#[derive(Default)]
pub struct PortsPlugin {
    config: PortsConfig,
}

impl PortsPlugin {
    /// Create a new plugin with custom configuration.
    pub fn new(config: PortsConfig) -> Self {
        Self { config }
    }
}

impl Plugin for PortsPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<MapsyncCorePlugin>() {
            warn!("PortsPlugin added without MapsyncCorePlugin; map frames will go unanswered");
        }

        app.insert_resource(self.config.clone())
            .init_resource::<PortInbox>()
            .init_resource::<PortOutbox>();

        app.add_message::<MapCommand>()
            .add_message::<ViewChanged>()
            .add_message::<MapSelectionDrawn>()
            .add_message::<MapStateReport>()
            .add_message::<StateRequested>()
            .add_message::<MapStateRejected>()
            .add_message::<MapCreationFailed>();

        app.add_systems(PreUpdate, decode_inbox.before(MapsyncSet::Commands))
            .add_systems(PostUpdate, encode_outbox);

        info!("PortsPlugin initialized");
    }
}
