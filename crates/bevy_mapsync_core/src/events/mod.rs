//! Messages exchanged with the application, and entity events.
//!
//! Commands flow in as [`MapCommand`] messages and are processed in the order
//! they were written. Everything the maps report back is written as one of
//! the outbound messages below.

use bevy::prelude::*;

use crate::components::ContainerId;
use crate::state::{MapState, MapView};

/// A command from the application.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum MapCommand {
    /// Remember `state` as the container's pushed state and apply it.
    SetMapState {
        container_id: ContainerId,
        state: MapState,
    },
    /// Forget the pushed state and clear the container's overlays.
    ClearMapState { container_id: ContainerId },
    /// Ask for a [`MapStateReport`].
    RequestState { container_id: ContainerId },
}

impl MapCommand {
    pub fn set(container_id: impl Into<ContainerId>, state: MapState) -> Self {
        Self::SetMapState {
            container_id: container_id.into(),
            state,
        }
    }

    pub fn clear(container_id: impl Into<ContainerId>) -> Self {
        Self::ClearMapState {
            container_id: container_id.into(),
        }
    }

    pub fn request(container_id: impl Into<ContainerId>) -> Self {
        Self::RequestState {
            container_id: container_id.into(),
        }
    }

    pub fn container_id(&self) -> &ContainerId {
        match self {
            Self::SetMapState { container_id, .. }
            | Self::ClearMapState { container_id }
            | Self::RequestState { container_id } => container_id,
        }
    }
}

/// A map finished moving and the move was not part of a tandem replay.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct ViewChanged {
    pub container_id: ContainerId,
    pub view: MapView,
}

/// The user completed a draw-and-select on a map.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct MapSelectionDrawn {
    pub container_id: ContainerId,
    pub sites: Vec<String>,
}

/// Reply to [`MapCommand::RequestState`].
#[derive(Message, Debug, Clone, PartialEq)]
pub struct MapStateReport {
    pub container_id: ContainerId,
    pub state: MapState,
}

/// A container mounted in push mode and no state is known for it yet.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct StateRequested {
    pub container_id: ContainerId,
}

/// A state payload or attribute was rejected; the previous state is kept.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct MapStateRejected {
    pub container_id: ContainerId,
    pub reason: String,
}

/// The backend could not create a map for a container.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct MapCreationFailed {
    pub container_id: ContainerId,
    pub reason: String,
}

/// Triggered on a container entity once its map exists and the known state
/// has been applied.
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_mapsync_core::prelude::*;
///
/// fn on_mounted(mounted: On<MapMounted>) {
///     info!("Map mounted on {:?}", mounted.event().entity);
/// }
/// ```
#[derive(EntityEvent, Debug, Clone)]
pub struct MapMounted {
    pub entity: Entity,
}
