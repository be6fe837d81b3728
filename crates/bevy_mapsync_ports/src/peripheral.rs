//! Relays for the non-map ports: file selection, uploads and plot pointer.
//!
//! Each relay turns one inbound frame into at most one outbound frame. The
//! file reading, the transfer itself and the pointer capture happen on the
//! application side; only their reports pass through here.

use bevy::prelude::*;

use crate::frame::{
    FileSelection, OutboundFrame, PlotPointer, PointerEvent, TransferEvent, TransferReport,
    UploadComplete, UploadFailed, UploadProgress,
};

/// Screen rectangle of the plot that pointer events are relative to.
///
/// Pointer events are dropped while this resource is absent.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct PlotArea(pub Rect);

impl PlotArea {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self(Rect::new(left, top, left + width, top + height))
    }

    /// `client` relative to the plot's top-left corner.
    pub fn relative(&self, client: Vec2) -> Vec2 {
        client - self.0.min
    }
}

/// Echo a file selection, keeping the first `preview_rows` preview rows.
pub fn relay_file_selection(mut selection: FileSelection, preview_rows: usize) -> OutboundFrame {
    selection.preview.truncate(preview_rows);
    OutboundFrame::SelectedFileName(selection)
}

/// Translate an upload report. Progress of unknown length is not reported.
pub fn relay_transfer(report: TransferReport) -> Option<OutboundFrame> {
    let TransferReport { id, event } = report;
    let frame = match event {
        TransferEvent::Progress { loaded, total } => {
            OutboundFrame::UploadProgress(UploadProgress {
                id,
                loaded,
                total: total?,
            })
        }
        TransferEvent::Load { response, status } => {
            OutboundFrame::UploadComplete(UploadComplete { id, response, status })
        }
        TransferEvent::Error { response } => OutboundFrame::UploadFailed(UploadFailed { id, response }),
        TransferEvent::Abort => OutboundFrame::UploadCanceled(id),
    };
    Some(frame)
}

/// Convert a pointer event to plot coordinates, if a plot is registered.
pub fn relay_pointer(event: PointerEvent, plot: Option<&PlotArea>) -> Option<OutboundFrame> {
    let plot = plot?;
    let position = plot.relative(Vec2::new(event.client_x, event.client_y));
    Some(OutboundFrame::MouseEvent(PlotPointer {
        event_type: event.event_type,
        x: position.x,
        y: position.y,
        ctrl_key: event.ctrl_key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(count: usize) -> Vec<Vec<String>> {
        (0..count).map(|row| vec![format!("site{row}"), "1".into()]).collect()
    }

    #[test]
    fn test_preview_is_truncated() {
        let selection = FileSelection {
            id: "occurrences".into(),
            filename: "points.csv".into(),
            preview: rows(10),
        };
        let OutboundFrame::SelectedFileName(relayed) = relay_file_selection(selection, 4) else {
            panic!("expected selectedFileName");
        };
        assert_eq!(relayed.filename, "points.csv");
        assert_eq!(relayed.preview, rows(4));
    }

    #[test]
    fn test_progress_needs_a_total() {
        let report = |total| TransferReport {
            id: "f1".into(),
            event: TransferEvent::Progress { loaded: 5, total },
        };
        assert_eq!(relay_transfer(report(None)), None);
        assert_eq!(
            relay_transfer(report(Some(20))),
            Some(OutboundFrame::UploadProgress(UploadProgress {
                id: "f1".into(),
                loaded: 5,
                total: 20
            }))
        );
    }

    #[test]
    fn test_transfer_outcomes() {
        let relay = |event| {
            relay_transfer(TransferReport {
                id: "f1".into(),
                event,
            })
        };
        assert_eq!(
            relay(TransferEvent::Load {
                response: "ok".into(),
                status: 201
            }),
            Some(OutboundFrame::UploadComplete(UploadComplete {
                id: "f1".into(),
                response: "ok".into(),
                status: 201
            }))
        );
        assert!(matches!(
            relay(TransferEvent::Error { response: String::new() }),
            Some(OutboundFrame::UploadFailed(_))
        ));
        assert_eq!(
            relay(TransferEvent::Abort),
            Some(OutboundFrame::UploadCanceled("f1".into()))
        );
    }

    #[test]
    fn test_pointer_is_made_plot_relative() {
        let event = PointerEvent {
            event_type: "mousedown".into(),
            client_x: 150.0,
            client_y: 90.0,
            ctrl_key: true,
        };
        assert_eq!(relay_pointer(event.clone(), None), None);

        let plot = PlotArea::new(100.0, 40.0, 400.0, 300.0);
        assert_eq!(
            relay_pointer(event, Some(&plot)),
            Some(OutboundFrame::MouseEvent(PlotPointer {
                event_type: "mousedown".into(),
                x: 50.0,
                y: 50.0,
                ctrl_key: true
            }))
        );
    }
}
