//! Round trips through the port mailboxes of a headless `App`.

use bevy::prelude::*;
use bevy_mapsync_core::prelude::*;
use bevy_mapsync_ports::prelude::*;
use serde_json::{Value, json};

fn app() -> (App, HeadlessProbe) {
    let backend = HeadlessBackend::default();
    let probe = backend.probe();
    let mut app = App::new();
    app.add_plugins(MapsyncCorePlugin::new(MapsyncCoreConfig::default().with_tandem(true)).with_backend(backend))
        .add_plugins(PortsPlugin::default());
    (app, probe)
}

fn deliver(app: &mut App, frame: Value) {
    app.world_mut().resource_mut::<PortInbox>().push(frame.to_string());
    app.update();
}

fn collect(app: &mut App) -> Vec<Value> {
    app.world_mut()
        .resource_mut::<PortOutbox>()
        .drain()
        .iter()
        .map(|raw| serde_json::from_str(raw).unwrap())
        .collect()
}

fn mount(app: &mut App, id: &str) {
    app.world_mut().spawn(MapContainer::new(id).with_class("leaflet-map"));
}

#[test]
fn test_mount_asks_for_state_over_the_port() {
    let (mut app, _probe) = app();
    mount(&mut app, "m1");
    app.update();
    assert_eq!(
        collect(&mut app),
        vec![json!({"port": "stateRequested", "payload": "m1"})]
    );
}

#[test]
fn test_set_map_state_frame_reaches_the_map() {
    let (mut app, probe) = app();
    mount(&mut app, "m1");
    app.update();
    collect(&mut app);

    deliver(
        &mut app,
        json!({"port": "setMapState", "payload": {
            "containerId": "m1",
            "layers": [
                {"url": "http://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", "minZoom": 1, "maxZoom": 12},
                {"endPoint": "https://maps.example.org/wms", "mapName": "species.map", "layers": ["bio1"]}
            ]
        }}),
    );
    assert_eq!(probe.layers(&"m1".into()).len(), 2);

    deliver(&mut app, json!({"port": "requestState", "payload": "m1"}));
    let frames = collect(&mut app);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["port"], "mapState");
    assert_eq!(frames[0]["payload"]["containerId"], "m1");
    assert_eq!(frames[0]["payload"]["state"]["layers"][1]["layers"], json!(["bio1"]));
}

#[test]
fn test_moves_are_reported_once_in_tandem() {
    let (mut app, probe) = app();
    mount(&mut app, "a");
    mount(&mut app, "b");
    app.update();
    collect(&mut app);

    probe.simulate_move(&"a".into(), MapView::new(10.0, 20.0, 5.0));
    app.update();
    assert_eq!(
        collect(&mut app),
        vec![json!({"port": "viewChanged", "payload": {"containerId": "a", "center": [10.0, 20.0], "zoom": 5.0}})]
    );
    assert_eq!(probe.view(&"b".into()), Some(MapView::new(10.0, 20.0, 5.0)));
}

#[test]
fn test_malformed_state_is_rejected_for_its_container() {
    let (mut app, probe) = app();
    mount(&mut app, "m1");
    app.update();
    collect(&mut app);

    deliver(
        &mut app,
        json!({"port": "setMapState", "payload": {"containerId": "m1", "layers": [{"endPoint": "", "layers": ["x"]}]}}),
    );
    let frames = collect(&mut app);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["port"], "mapStateRejected");
    assert_eq!(frames[0]["payload"]["containerId"], "m1");
    assert!(probe.layers(&"m1".into()).is_empty());
}

#[test]
fn test_garbage_is_answered_with_port_error() {
    let (mut app, _probe) = app();
    app.world_mut().resource_mut::<PortInbox>().push("{oops");
    app.update();
    let frames = collect(&mut app);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["port"], "portError");
    assert!(frames[0]["payload"].get("containerId").is_none());
}

#[test]
fn test_peripheral_relays() {
    let (mut app, _probe) = app();

    deliver(
        &mut app,
        json!({"port": "fileSelected", "payload": {
            "id": "occurrences",
            "filename": "points.csv",
            "preview": [["a"], ["b"], ["c"], ["d"], ["e"], ["f"]]
        }}),
    );
    deliver(
        &mut app,
        json!({"port": "transferReport", "payload": {"id": "occurrences", "event": {"type": "progress", "loaded": 3}}}),
    );
    deliver(
        &mut app,
        json!({"port": "transferReport", "payload": {"id": "occurrences", "event": {"type": "load", "response": "done", "status": 200}}}),
    );
    deliver(
        &mut app,
        json!({"port": "pointerEvent", "payload": {"eventType": "mousemove", "clientX": 30.0, "clientY": 40.0}}),
    );
    app.insert_resource(PlotArea::new(10.0, 10.0, 100.0, 100.0));
    deliver(
        &mut app,
        json!({"port": "pointerEvent", "payload": {"eventType": "mousemove", "clientX": 30.0, "clientY": 40.0}}),
    );

    assert_eq!(
        collect(&mut app),
        vec![
            json!({"port": "selectedFileName", "payload": {
                "id": "occurrences",
                "filename": "points.csv",
                "preview": [["a"], ["b"], ["c"], ["d"]]
            }}),
            json!({"port": "uploadComplete", "payload": {"id": "occurrences", "response": "done", "status": 200}}),
            json!({"port": "mouseEvent", "payload": {"eventType": "mousemove", "x": 20.0, "y": 30.0, "ctrlKey": false}}),
        ]
    );
}
