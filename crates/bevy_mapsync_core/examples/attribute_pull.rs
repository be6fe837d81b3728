//! Map state read from container attributes.
//!
//! The container carries `data-leaflet*` attributes; editing them re-applies
//! the map state without recreating the map.

use bevy::app::AppExit;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_mapsync_core::prelude::*;

#[derive(Resource)]
struct Probe(HeadlessProbe);

fn main() {
    let backend = HeadlessBackend::default();
    let probe = backend.probe();
    let config = MapsyncCoreConfig::default()
        .with_state_source(StateSource::Pull(AttributeNames::default()))
        .with_lifecycle(LifecycleSource::polling());

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(LogPlugin::default())
        .add_plugins(MapsyncCorePlugin::new(config).with_backend(backend))
        .insert_resource(Probe(probe))
        .add_systems(Startup, spawn_container)
        .add_systems(Update, edit_attributes)
        .run();
}

fn spawn_container(mut commands: Commands) {
    commands.spawn((
        MapContainer::new("occurrences").with_class("leaflet-map"),
        MapAttributes::default()
            .with(
                "data-leaflet",
                r#"[{"endPoint": "https://maps.example.org/wms", "layers": ["occurrences"]}]"#,
            )
            .with("data-leaflet-bounding-box", "[[-44.0, 112.0], [-10.0, 154.0]]"),
    ));
}

fn edit_attributes(
    time: Res<Time>,
    probe: Res<Probe>,
    mut containers: Query<&mut MapAttributes>,
    mut step: Local<u32>,
    mut exit: MessageWriter<AppExit>,
) {
    let id = ContainerId::from("occurrences");
    match *step {
        0 if time.elapsed_secs() > 0.3 => {
            info!("Mounted with layers {:?}", probe.0.layers(&id));
            for mut attributes in &mut containers {
                attributes.set(
                    "data-leaflet",
                    r#"[{"endPoint": "https://maps.example.org/wms", "layers": ["occurrences", "range"]}]"#,
                );
            }
            *step = 1;
        }
        1 => {
            info!("After edit: layers {:?}", probe.0.layers(&id));
            info!("Maps created for '{}': {}", id, probe.0.created(&id));
            exit.write(AppExit::Success);
        }
        _ => {}
    }
}
