//! Two species maps kept in tandem.
//!
//! Runs headless: the in-memory backend stands in for a map library, and a
//! simulated pan on one map shows the other one following.

use bevy::app::AppExit;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_mapsync_core::prelude::*;

#[derive(Resource)]
struct Probe(HeadlessProbe);

fn main() {
    let backend = HeadlessBackend::default();
    let probe = backend.probe();

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(
            MapsyncCorePlugin::new(MapsyncCoreConfig::default().with_tandem(true)).with_backend(backend),
        )
        .insert_resource(Probe(probe))
        .add_systems(Startup, spawn_maps)
        .add_systems(Update, (answer_state_requests, log_view_changes, drive_demo))
        .run();
}

fn spawn_maps(mut commands: Commands) {
    for id in ["present-day", "future-2050"] {
        commands.spawn(MapContainer::new(id).with_class("leaflet-map"));
    }
}

fn answer_state_requests(
    mut requests: MessageReader<StateRequested>,
    mut maps: MessageWriter<MapCommand>,
) {
    for request in requests.read() {
        let layer = WmsLayer::new("https://maps.example.org/wms", [request.container_id.as_str()])
            .with_map_name("species.map");
        let state = MapState::empty()
            .with_view(MapView::new(-25.0, 135.0, 4.0))
            .with_layer(TileLayer::openstreetmap())
            .with_layer(layer);
        info!("Pushing state for '{}'", request.container_id);
        maps.write(MapCommand::set(request.container_id.clone(), state));
    }
}

fn log_view_changes(mut views: MessageReader<ViewChanged>) {
    for changed in views.read() {
        info!(
            "'{}' moved to ({:.2}, {:.2}) @ {}",
            changed.container_id, changed.view.center.lat, changed.view.center.lng, changed.view.zoom
        );
    }
}

fn drive_demo(probe: Res<Probe>, mut frame: Local<u32>, mut exit: MessageWriter<AppExit>) {
    *frame += 1;
    match *frame {
        3 => {
            info!("Panning 'present-day'");
            probe.0.simulate_move(&"present-day".into(), MapView::new(-33.9, 151.2, 8.0));
        }
        5 => {
            for id in probe.0.mounted() {
                info!("'{}' is at {:?}", id, probe.0.view(&id));
            }
            exit.write(AppExit::Success);
        }
        _ => {}
    }
}
