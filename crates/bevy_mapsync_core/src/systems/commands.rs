//! Inbound commands, backend event pumping and teardown.

use bevy::prelude::*;

use crate::error::MapsyncError;
use crate::events::MapCommand;
use crate::plugin::MapsyncCoreConfig;
use crate::registry::{MapRegistry, PushedStates};
use crate::state::MapState;
use crate::systems::MapOutbound;
use crate::systems::context::apply_and_report;

/// Process [`MapCommand`]s in the order they were written.
pub fn apply_map_commands(
    mut inbound: MessageReader<MapCommand>,
    mut registry: ResMut<MapRegistry>,
    mut pushed: ResMut<PushedStates>,
    mut outbound: MapOutbound,
) {
    for command in inbound.read() {
        match command {
            MapCommand::SetMapState {
                container_id,
                state,
            } => {
                if let Err(err) = state.validate() {
                    warn!("Rejected state for container '{}': {}", container_id, err);
                    outbound.rejected(container_id.clone(), &MapsyncError::from(err));
                    continue;
                }
                pushed.insert(container_id.clone(), state.clone());
                apply_and_report(&mut registry, container_id, state, &mut outbound);
            }
            MapCommand::ClearMapState { container_id } => {
                pushed.remove(container_id);
                apply_and_report(&mut registry, container_id, &MapState::empty(), &mut outbound);
            }
            MapCommand::RequestState { container_id } => {
                let state = registry
                    .get(container_id)
                    .and_then(|entry| entry.applied_state())
                    .or_else(|| pushed.get(container_id))
                    .cloned()
                    .unwrap_or_default();
                outbound.report(container_id.clone(), state);
            }
        }
    }
}

/// Drain backend events into outbound messages, fanning out moves in tandem mode.
pub fn pump_backend_events(
    config: Res<MapsyncCoreConfig>,
    mut registry: ResMut<MapRegistry>,
    mut outbound: MapOutbound,
) {
    for notice in registry.pump_events(config.tandem) {
        outbound.notice(notice);
    }
}

/// Release every map when the app exits.
pub fn teardown_on_exit(mut exits: MessageReader<AppExit>, mut registry: ResMut<MapRegistry>) {
    if exits.read().count() == 0 || registry.is_empty() {
        return;
    }
    info!("Tearing down {} map(s)", registry.len());
    registry.teardown();
}
