//! Writers for everything the component reports to the application.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::components::ContainerId;
use crate::error::MapsyncError;
use crate::events::{
    MapCreationFailed, MapSelectionDrawn, MapStateRejected, MapStateReport, StateRequested,
    ViewChanged,
};
use crate::state::MapState;
use crate::tandem::MapNotice;

/// All outbound message writers in one system parameter.
#[derive(SystemParam)]
pub struct MapOutbound<'w> {
    views: MessageWriter<'w, ViewChanged>,
    selections: MessageWriter<'w, MapSelectionDrawn>,
    reports: MessageWriter<'w, MapStateReport>,
    requests: MessageWriter<'w, StateRequested>,
    rejections: MessageWriter<'w, MapStateRejected>,
    failures: MessageWriter<'w, MapCreationFailed>,
}

impl MapOutbound<'_> {
    pub fn notice(&mut self, notice: MapNotice) {
        match notice {
            MapNotice::ViewChanged { container, view } => {
                self.views.write(ViewChanged {
                    container_id: container,
                    view,
                });
            }
            MapNotice::SelectionDrawn { container, sites } => {
                self.selections.write(MapSelectionDrawn {
                    container_id: container,
                    sites,
                });
            }
        }
    }

    pub fn report(&mut self, container_id: ContainerId, state: MapState) {
        self.reports.write(MapStateReport { container_id, state });
    }

    pub fn request_state(&mut self, container_id: ContainerId) {
        self.requests.write(StateRequested { container_id });
    }

    pub fn rejected(&mut self, container_id: ContainerId, error: &MapsyncError) {
        self.rejections.write(MapStateRejected {
            container_id,
            reason: error.to_string(),
        });
    }

    pub fn creation_failed(&mut self, container_id: ContainerId, error: &MapsyncError) {
        self.failures.write(MapCreationFailed {
            container_id,
            reason: error.to_string(),
        });
    }
}
