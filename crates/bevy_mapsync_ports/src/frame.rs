//! Wire format of the port channel.
//!
//! Every frame is a JSON object `{"port": <name>, "payload": <value>}`. Port
//! names are camelCase, payload fields too.

use bevy_mapsync_core::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PortError;

/// A frame sent by the application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "port", content = "payload", rename_all = "camelCase")]
pub enum InboundFrame {
    SetMapState(StatePayload),
    ClearMapState(ContainerId),
    RequestState(ContainerId),
    FileSelected(FileSelection),
    TransferReport(TransferReport),
    PointerEvent(PointerEvent),
}

/// Payload of `setMapState`: a container id plus the state fields.
///
/// The state is kept undecoded so a malformed state can still be reported
/// against its container.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub container_id: ContainerId,
    #[serde(flatten)]
    pub state: serde_json::Map<String, Value>,
}

impl StatePayload {
    /// Parse and validate the carried state.
    pub fn decode_state(&self) -> Result<MapState, MapsyncError> {
        MapState::from_value(Value::Object(self.state.clone()))
    }
}

/// A file chosen in a file input, with the first rows of a CSV preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSelection {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub preview: Vec<Vec<String>>,
}

/// Something that happened to an upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransferReport {
    pub id: String,
    pub event: TransferEvent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransferEvent {
    /// `total` is absent when the length is not computable.
    Progress {
        loaded: u64,
        #[serde(default)]
        total: Option<u64>,
    },
    Load {
        #[serde(default)]
        response: String,
        status: u16,
    },
    Error {
        #[serde(default)]
        response: String,
    },
    Abort,
}

/// A raw pointer event in client (page) coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerEvent {
    pub event_type: String,
    pub client_x: f32,
    pub client_y: f32,
    #[serde(default)]
    pub ctrl_key: bool,
}

/// A frame sent to the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "port", content = "payload", rename_all = "camelCase")]
pub enum OutboundFrame {
    ViewChanged(ViewPayload),
    MapSelectionDrawn(SelectionPayload),
    #[serde(rename = "mapState")]
    MapStateReport(StateReportPayload),
    StateRequested(ContainerId),
    MapStateRejected(ReasonPayload),
    MapCreationFailed(ReasonPayload),
    PortError(ReasonPayload),
    SelectedFileName(FileSelection),
    UploadProgress(UploadProgress),
    UploadComplete(UploadComplete),
    UploadFailed(UploadFailed),
    UploadCanceled(String),
    MouseEvent(PlotPointer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPayload {
    pub container_id: ContainerId,
    pub center: LatLng,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPayload {
    pub container_id: ContainerId,
    pub sites: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateReportPayload {
    pub container_id: ContainerId,
    pub state: MapState,
}

/// Payload of the rejection and failure ports. `container_id` is absent for
/// `portError` frames that could not be attributed to a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadProgress {
    pub id: String,
    pub loaded: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadComplete {
    pub id: String,
    pub response: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadFailed {
    pub id: String,
    pub response: String,
}

/// A pointer event relative to the plot area's top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotPointer {
    pub event_type: String,
    pub x: f32,
    pub y: f32,
    pub ctrl_key: bool,
}

/// Decode one inbound frame.
pub fn decode(raw: &str) -> Result<InboundFrame, PortError> {
    let value: Value = serde_json::from_str(raw)?;
    if let Some(port) = value.get("port").and_then(Value::as_str) {
        if !is_inbound_port(port) {
            return Err(PortError::UnknownPort(port.to_string()));
        }
    }
    Ok(serde_json::from_value(value)?)
}

/// Encode one outbound frame.
pub fn encode(frame: &OutboundFrame) -> Result<String, PortError> {
    Ok(serde_json::to_string(frame)?)
}

fn is_inbound_port(port: &str) -> bool {
    matches!(
        port,
        "setMapState"
            | "clearMapState"
            | "requestState"
            | "fileSelected"
            | "transferReport"
            | "pointerEvent"
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_set_map_state_keeps_state_raw() {
        let frame = decode(
            r#"{"port": "setMapState", "payload": {
                "containerId": "m1",
                "view": {"center": [1, 2], "zoom": 3},
                "layers": [{"endPoint": "https://x/wms", "layers": ["bio1"]}]
            }}"#,
        )
        .unwrap();
        let InboundFrame::SetMapState(payload) = frame else {
            panic!("expected setMapState");
        };
        assert_eq!(payload.container_id, ContainerId::from("m1"));
        assert!(!payload.state.contains_key("containerId"));

        let state = payload.decode_state().unwrap();
        assert_eq!(state.view, Some(MapView::new(1.0, 2.0, 3.0)));
        assert_eq!(state.layers.len(), 1);
    }

    #[test]
    fn test_malformed_state_still_names_its_container() {
        let frame = decode(r#"{"port": "setMapState", "payload": {"containerId": "m1", "layers": 7}}"#)
            .unwrap();
        let InboundFrame::SetMapState(payload) = frame else {
            panic!("expected setMapState");
        };
        assert_eq!(payload.container_id, ContainerId::from("m1"));
        assert!(payload.decode_state().is_err());
    }

    #[test]
    fn test_decode_plain_id_payloads() {
        assert_eq!(
            decode(r#"{"port": "clearMapState", "payload": "m1"}"#).unwrap(),
            InboundFrame::ClearMapState("m1".into())
        );
        assert_eq!(
            decode(r#"{"port": "requestState", "payload": "m2"}"#).unwrap(),
            InboundFrame::RequestState("m2".into())
        );
    }

    #[test]
    fn test_decode_transfer_events() {
        let frame = decode(
            r#"{"port": "transferReport", "payload": {"id": "f1", "event": {"type": "progress", "loaded": 10}}}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            InboundFrame::TransferReport(TransferReport {
                id: "f1".into(),
                event: TransferEvent::Progress { loaded: 10, total: None },
            })
        );

        let frame =
            decode(r#"{"port": "transferReport", "payload": {"id": "f1", "event": {"type": "abort"}}}"#)
                .unwrap();
        assert!(matches!(
            frame,
            InboundFrame::TransferReport(TransferReport { event: TransferEvent::Abort, .. })
        ));
    }

    #[test]
    fn test_unknown_port_and_garbage() {
        assert!(matches!(
            decode(r#"{"port": "launchRockets", "payload": null}"#),
            Err(PortError::UnknownPort(port)) if port == "launchRockets"
        ));
        assert!(matches!(decode("{not json"), Err(PortError::Json(_))));
        assert!(matches!(decode(r#"{"payload": 1}"#), Err(PortError::Json(_))));
    }

    #[test]
    fn test_encode_uses_port_names() {
        let encoded = encode(&OutboundFrame::ViewChanged(ViewPayload {
            container_id: "m1".into(),
            center: LatLng::new(-1.5, 2.0),
            zoom: 4.0,
        }))
        .unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({"port": "viewChanged", "payload": {"containerId": "m1", "center": [-1.5, 2.0], "zoom": 4.0}})
        );

        let encoded = encode(&OutboundFrame::MapStateReport(StateReportPayload {
            container_id: "m1".into(),
            state: MapState::empty(),
        }))
        .unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["port"], "mapState");
        assert_eq!(value["payload"]["state"], json!({"layers": []}));

        let encoded = encode(&OutboundFrame::UploadCanceled("f1".into())).unwrap();
        assert_eq!(encoded, r#"{"port":"uploadCanceled","payload":"f1"}"#);
    }
}
