//! Port mailboxes and the systems moving frames through them.

use std::collections::VecDeque;

use bevy::prelude::*;
use bevy_mapsync_core::prelude::*;

use crate::frame::{
    InboundFrame, OutboundFrame, ReasonPayload, SelectionPayload, StateReportPayload, ViewPayload,
    decode, encode,
};
use crate::peripheral::{PlotArea, relay_file_selection, relay_pointer, relay_transfer};
use crate::plugin::PortsConfig;

/// Raw frames received from the application, oldest first.
#[derive(Resource, Debug, Default)]
pub struct PortInbox(VecDeque<String>);

impl PortInbox {
    pub fn push(&mut self, frame: impl Into<String>) {
        self.0.push_back(frame.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encoded frames waiting to be delivered to the application.
#[derive(Resource, Debug, Default)]
pub struct PortOutbox(Vec<String>);

impl PortOutbox {
    /// Encode and queue `frame`.
    pub fn push(&mut self, frame: &OutboundFrame) {
        match encode(frame) {
            Ok(raw) => self.0.push(raw),
            Err(err) => error!("Failed to encode port frame: {}", err),
        }
    }

    pub fn frames(&self) -> &[String] {
        &self.0
    }

    /// Take every queued frame.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.0)
    }
}

/// Decode the inbox into map commands and peripheral relays.
///
/// Undecodable frames are answered with a `portError` frame. A `setMapState`
/// frame whose state is malformed is answered with `mapStateRejected` for its
/// container.
pub fn decode_inbox(
    mut inbox: ResMut<PortInbox>,
    mut outbox: ResMut<PortOutbox>,
    config: Res<PortsConfig>,
    plot: Option<Res<PlotArea>>,
    mut commands: MessageWriter<MapCommand>,
    mut rejections: MessageWriter<MapStateRejected>,
) {
    for raw in inbox.0.drain(..) {
        let frame = match decode(&raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Dropping port frame: {}", err);
                outbox.push(&OutboundFrame::PortError(ReasonPayload {
                    container_id: None,
                    reason: err.to_string(),
                }));
                continue;
            }
        };

        match frame {
            InboundFrame::SetMapState(payload) => match payload.decode_state() {
                Ok(state) => {
                    commands.write(MapCommand::set(payload.container_id, state));
                }
                Err(err) => {
                    warn!("Rejected state for container '{}': {}", payload.container_id, err);
                    rejections.write(MapStateRejected {
                        container_id: payload.container_id,
                        reason: err.to_string(),
                    });
                }
            },
            InboundFrame::ClearMapState(container_id) => {
                commands.write(MapCommand::clear(container_id));
            }
            InboundFrame::RequestState(container_id) => {
                commands.write(MapCommand::request(container_id));
            }
            InboundFrame::FileSelected(selection) => {
                outbox.push(&relay_file_selection(selection, config.preview_rows));
            }
            InboundFrame::TransferReport(report) => {
                if let Some(frame) = relay_transfer(report) {
                    outbox.push(&frame);
                }
            }
            InboundFrame::PointerEvent(event) => match relay_pointer(event, plot.as_deref()) {
                Some(frame) => outbox.push(&frame),
                None => trace!("No plot area registered, dropping pointer event"),
            },
        }
    }
}

/// Encode outbound map messages into the outbox.
pub fn encode_outbox(
    mut outbox: ResMut<PortOutbox>,
    mut views: MessageReader<ViewChanged>,
    mut selections: MessageReader<MapSelectionDrawn>,
    mut reports: MessageReader<MapStateReport>,
    mut requests: MessageReader<StateRequested>,
    mut rejections: MessageReader<MapStateRejected>,
    mut failures: MessageReader<MapCreationFailed>,
) {
    for changed in views.read() {
        outbox.push(&OutboundFrame::ViewChanged(ViewPayload {
            container_id: changed.container_id.clone(),
            center: changed.view.center,
            zoom: changed.view.zoom,
        }));
    }
    for drawn in selections.read() {
        outbox.push(&OutboundFrame::MapSelectionDrawn(SelectionPayload {
            container_id: drawn.container_id.clone(),
            sites: drawn.sites.clone(),
        }));
    }
    for report in reports.read() {
        outbox.push(&OutboundFrame::MapStateReport(StateReportPayload {
            container_id: report.container_id.clone(),
            state: report.state.clone(),
        }));
    }
    for request in requests.read() {
        outbox.push(&OutboundFrame::StateRequested(request.container_id.clone()));
    }
    for rejected in rejections.read() {
        outbox.push(&OutboundFrame::MapStateRejected(ReasonPayload {
            container_id: Some(rejected.container_id.clone()),
            reason: rejected.reason.clone(),
        }));
    }
    for failed in failures.read() {
        outbox.push(&OutboundFrame::MapCreationFailed(ReasonPayload {
            container_id: Some(failed.container_id.clone()),
            reason: failed.reason.clone(),
        }));
    }
}
