//! Shared mount/apply steps used by every lifecycle source.

use bevy::prelude::*;

use crate::applier::ApplyReport;
use crate::components::{ContainerId, MapAttributes, MapContainer};
use crate::error::MapsyncError;
use crate::plugin::{MapsyncCoreConfig, StateSource};
use crate::registry::{MapRegistry, PushedStates};
use crate::state::MapState;
use crate::systems::MapOutbound;

/// Read-only context for mounting containers.
pub struct MountContext<'a> {
    pub config: &'a MapsyncCoreConfig,
    pub pushed: &'a PushedStates,
}

impl<'a> MountContext<'a> {
    pub fn new(config: &'a MapsyncCoreConfig, pushed: &'a PushedStates) -> Self {
        Self { config, pushed }
    }

    /// Create the map for `container` and apply its known state.
    ///
    /// Returns `true` if a map was created. A container that is already
    /// registered is left alone.
    pub fn mount(
        &self,
        registry: &mut MapRegistry,
        container: &MapContainer,
        attributes: Option<&MapAttributes>,
        outbound: &mut MapOutbound<'_>,
    ) -> bool {
        let id = &container.id;
        match registry.create(id, &self.config.map_options) {
            Ok(true) => info!("Mounted map in container '{}'", id),
            Ok(false) => return false,
            Err(err) => {
                error!("Failed to create map in container '{}': {}", id, err);
                outbound.creation_failed(id.clone(), &err);
                return false;
            }
        }

        match self.known_state(id, attributes) {
            Ok(Some(state)) => apply_and_report(registry, id, &state, outbound),
            Ok(None) => {
                if self.config.state_source == StateSource::Push {
                    debug!("No state known for '{}', requesting it", id);
                    outbound.request_state(id.clone());
                }
            }
            Err(err) => {
                warn!("Rejected state for container '{}': {}", id, err);
                outbound.rejected(id.clone(), &err);
            }
        }
        true
    }

    fn known_state(
        &self,
        id: &ContainerId,
        attributes: Option<&MapAttributes>,
    ) -> Result<Option<MapState>, MapsyncError> {
        match &self.config.state_source {
            StateSource::Push => Ok(self.pushed.get(id).cloned()),
            StateSource::Pull(names) => attributes
                .map(|attributes| MapState::from_attributes(attributes, names))
                .transpose(),
        }
    }
}

/// Apply `state` to `id`, logging the outcome and reporting failures.
pub(crate) fn apply_and_report(
    registry: &mut MapRegistry,
    id: &ContainerId,
    state: &MapState,
    outbound: &mut MapOutbound<'_>,
) {
    match registry.apply(id, state) {
        Ok(ApplyReport::Dropped) => {}
        Ok(ApplyReport::Applied(changes)) => debug!("Applied state to '{}': {:?}", id, changes),
        Err(err) => {
            if err.is_malformed() {
                warn!("Rejected state for container '{}': {}", id, err);
            } else {
                error!("Failed to apply state to '{}': {}", id, err);
            }
            outbound.rejected(id.clone(), &err);
        }
    }
}
