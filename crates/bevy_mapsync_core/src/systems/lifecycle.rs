//! Container lifecycle: mounting and unmounting maps as containers come and go.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::components::{ContainerId, MapAttributes, MapContainer};
use crate::events::MapMounted;
use crate::plugin::{MapsyncCoreConfig, StateSource};
use crate::registry::{MapRegistry, PushedStates};
use crate::state::{MapState, WatchedValues};
use crate::systems::context::apply_and_report;
use crate::systems::{MapOutbound, MountContext};

/// Interval timer for [`poll_containers`].
#[derive(Resource, Debug)]
pub struct PollTimer(pub Timer);

/// The container entity that holds the map of each mounted id.
///
/// When several containers carry the same id, only the owner's removal or
/// attribute changes reach the map.
#[derive(Resource, Debug, Default)]
pub struct ContainerOwners(HashMap<ContainerId, Entity>);

impl ContainerOwners {
    pub fn owner(&self, id: &ContainerId) -> Option<Entity> {
        self.0.get(id).copied()
    }

    pub fn owns(&self, id: &ContainerId, entity: Entity) -> bool {
        self.owner(id) == Some(entity)
    }
}

fn mount_owned(
    context: &MountContext,
    registry: &mut MapRegistry,
    owners: &mut ContainerOwners,
    outbound: &mut MapOutbound<'_>,
    commands: &mut Commands,
    entity: Entity,
    container: &MapContainer,
    attributes: Option<&MapAttributes>,
) {
    if context.mount(registry, container, attributes, outbound) {
        owners.0.insert(container.id.clone(), entity);
        commands.entity(entity).trigger(|entity| MapMounted { entity });
    }
}

/// Observer: mount a map when a selected container is inserted.
///
/// Also runs when a container component is overwritten, after
/// [`on_container_replaced`] released the old map. A container whose map
/// creation failed earlier gets another chance here.
pub fn on_container_inserted(
    insert: On<Insert, MapContainer>,
    containers: Query<(&MapContainer, Option<&MapAttributes>)>,
    config: Res<MapsyncCoreConfig>,
    pushed: Res<PushedStates>,
    mut registry: ResMut<MapRegistry>,
    mut owners: ResMut<ContainerOwners>,
    mut outbound: MapOutbound,
    mut commands: Commands,
) {
    let entity = insert.event().entity;
    let Ok((container, attributes)) = containers.get(entity) else {
        return;
    };
    if !config.selector.matches(container) {
        return;
    }
    if registry.contains(&container.id) {
        warn!(
            "Container id '{}' is already mounted, ignoring {:?}",
            container.id, entity
        );
        return;
    }
    registry.forget_unmanaged(&container.id);

    let context = MountContext::new(&config, &pushed);
    mount_owned(
        &context,
        &mut registry,
        &mut owners,
        &mut outbound,
        &mut commands,
        entity,
        container,
        attributes,
    );
}

/// Observer: destroy the map of a container that is removed or overwritten.
///
/// Removing a container that does not own its id's map leaves the map alone.
/// When the owner goes, another selected container with the same id takes
/// the id over with a fresh map.
pub fn on_container_replaced(
    replace: On<Replace, MapContainer>,
    containers: Query<(Entity, &MapContainer, Option<&MapAttributes>)>,
    config: Res<MapsyncCoreConfig>,
    pushed: Res<PushedStates>,
    mut registry: ResMut<MapRegistry>,
    mut owners: ResMut<ContainerOwners>,
    mut outbound: MapOutbound,
    mut commands: Commands,
) {
    let entity = replace.event().entity;
    let Ok((_, container, _)) = containers.get(entity) else {
        return;
    };
    if !config.selector.matches(container) {
        return;
    }
    let id = container.id.clone();
    if owners.owner(&id).is_some_and(|owner| owner != entity) {
        debug!("{:?} does not own the map of '{}', keeping it", entity, id);
        return;
    }

    owners.0.remove(&id);
    if !registry.destroy(&id) {
        return;
    }
    info!("Unmounted map in container '{}'", id);

    let heir = containers
        .iter()
        .find(|(other, candidate, _)| {
            *other != entity && candidate.id == id && config.selector.matches(candidate)
        });
    if let Some((heir, container, attributes)) = heir {
        debug!("Container {:?} takes over id '{}'", heir, id);
        let context = MountContext::new(&config, &pushed);
        mount_owned(
            &context,
            &mut registry,
            &mut owners,
            &mut outbound,
            &mut commands,
            heir,
            container,
            attributes,
        );
    }
}

/// Poll-based lifecycle source.
///
/// Every tick of the [`PollTimer`], destroys every map whose owning container
/// is gone or now carries another id, then mounts every selected id that has
/// no map. Containers whose map creation failed are skipped until they
/// disappear.
pub fn poll_containers(
    time: Res<Time>,
    mut timer: ResMut<PollTimer>,
    containers: Query<(Entity, &MapContainer, Option<&MapAttributes>)>,
    config: Res<MapsyncCoreConfig>,
    pushed: Res<PushedStates>,
    mut registry: ResMut<MapRegistry>,
    mut owners: ResMut<ContainerOwners>,
    mut outbound: MapOutbound,
    mut commands: Commands,
) {
    if !timer.0.duration().is_zero() && !timer.0.tick(time.delta()).just_finished() {
        return;
    }

    let mut present: HashMap<&ContainerId, Vec<Entity>> = HashMap::new();
    for (entity, container, _) in &containers {
        if config.selector.matches(container) {
            present.entry(&container.id).or_default().push(entity);
        }
    }

    for id in registry.ids() {
        let owned = owners
            .owner(&id)
            .zip(present.get(&id))
            .is_some_and(|(owner, entities)| entities.contains(&owner));
        if !owned {
            owners.0.remove(&id);
            if registry.destroy(&id) {
                info!("Unmounted map in container '{}'", id);
            }
        }
    }

    let context = MountContext::new(&config, &pushed);
    for (entity, container, attributes) in &containers {
        if !config.selector.matches(container) {
            continue;
        }
        if registry.contains(&container.id) {
            if !owners.owns(&container.id, entity) {
                debug!(
                    "Container id '{}' is used more than once, ignoring {:?}",
                    container.id, entity
                );
            }
            continue;
        }
        if registry.is_unmanaged(&container.id) {
            continue;
        }
        mount_owned(
            &context,
            &mut registry,
            &mut owners,
            &mut outbound,
            &mut commands,
            entity,
            container,
            attributes,
        );
    }
    registry.retain_unmanaged(|id| present.contains_key(id));
}

/// Pull mode: re-apply a container's state when a watched attribute changes.
///
/// Changes to other attributes are ignored. Containers added this tick are
/// skipped; mounting already applied them.
pub fn reapply_changed_attributes(
    containers: Query<(Entity, Ref<MapContainer>, &MapAttributes), Changed<MapAttributes>>,
    mut detached: RemovedComponents<MapAttributes>,
    mut seen: Local<HashMap<Entity, WatchedValues>>,
    config: Res<MapsyncCoreConfig>,
    owners: Res<ContainerOwners>,
    mut registry: ResMut<MapRegistry>,
    mut outbound: MapOutbound,
) {
    let StateSource::Pull(names) = &config.state_source else {
        return;
    };
    for entity in detached.read() {
        seen.remove(&entity);
    }

    for (entity, container, attributes) in &containers {
        if !config.selector.matches(&container) {
            continue;
        }
        let watched = names.watched_values(attributes);
        let previous = seen.insert(entity, watched.clone());
        if container.is_added() || previous.as_ref() == Some(&watched) {
            continue;
        }
        if !owners.owns(&container.id, entity) {
            continue;
        }
        match MapState::from_attributes(attributes, names) {
            Ok(state) => apply_and_report(&mut registry, &container.id, &state, &mut outbound),
            Err(err) => {
                warn!("Rejected attributes of container '{}': {}", container.id, err);
                outbound.rejected(container.id.clone(), &err);
            }
        }
    }
}
