//! Tandem view synchronization between live maps.
//!
//! When tandem mode is on, a move of one map is replayed on every other map.
//! Replaying a move makes the sibling report a move of its own; those echoes
//! arrive while a [`PropagationToken`] is held and are suppressed, so one user
//! gesture produces exactly one fan-out. Any other report that shows up during
//! a fan-out is handled after it, in arrival order.

use std::collections::VecDeque;
use std::iter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy::prelude::*;

use crate::backend::{BackendEvent, MapHandle};
use crate::components::ContainerId;
use crate::registry::MapRegistry;
use crate::state::MapView;

/// Shared "a propagation is in progress" flag.
#[derive(Debug, Clone, Default)]
pub struct PropagationFlag(Arc<AtomicBool>);

impl PropagationFlag {
    /// Take the flag, or `None` if a propagation is already in progress.
    ///
    /// The flag is released when the returned token drops, including on
    /// early return and unwinding.
    pub fn try_acquire(&self) -> Option<PropagationToken> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PropagationToken(Arc::clone(&self.0)))
    }

    pub fn is_propagating(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Held for the duration of one fan-out.
#[must_use = "the propagation ends when the token is dropped"]
#[derive(Debug)]
pub struct PropagationToken(Arc<AtomicBool>);

impl Drop for PropagationToken {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A backend report worth telling the application about.
#[derive(Debug, Clone, PartialEq)]
pub enum MapNotice {
    ViewChanged {
        container: ContainerId,
        view: MapView,
    },
    SelectionDrawn {
        container: ContainerId,
        sites: Vec<String>,
    },
}

impl MapRegistry {
    /// The registry's propagation flag.
    pub fn propagation(&self) -> &PropagationFlag {
        &self.propagation
    }

    /// Drain pending backend events.
    ///
    /// Every non-suppressed move of a registered map yields a
    /// [`MapNotice::ViewChanged`]; with `tandem` set it is also replayed on
    /// the other maps. Events for containers that are no longer registered
    /// are dropped.
    pub fn pump_events(&mut self, tandem: bool) -> Vec<MapNotice> {
        let mut notices = Vec::new();
        let mut pending = VecDeque::new();
        loop {
            pending.extend(iter::from_fn(|| self.backend.poll_event()));
            let Some(event) = pending.pop_front() else {
                break;
            };
            self.dispatch(event, tandem, &mut pending, &mut notices);
        }
        notices
    }

    fn dispatch(
        &mut self,
        event: BackendEvent,
        tandem: bool,
        pending: &mut VecDeque<BackendEvent>,
        notices: &mut Vec<MapNotice>,
    ) {
        match event {
            BackendEvent::Moved { container, view } => {
                if !self.entries.contains_key(&container) {
                    debug!("Ignoring move of unmanaged map '{}'", container);
                    return;
                }
                let Some(_token) = self.propagation.try_acquire() else {
                    trace!("Suppressing nested move of '{}'", container);
                    return;
                };
                notices.push(MapNotice::ViewChanged {
                    container: container.clone(),
                    view,
                });
                if tandem {
                    self.fan_out(&container, view, pending);
                }
            }
            BackendEvent::SelectionDrawn { container, sites } => {
                if !self.entries.contains_key(&container) {
                    debug!("Ignoring selection on unmanaged map '{}'", container);
                    return;
                }
                notices.push(MapNotice::SelectionDrawn { container, sites });
            }
        }
    }

    /// Replay `view` on every registered map except `source`.
    ///
    /// A sibling with a move of its own still in `pending` keeps its view; its
    /// move fans out when its turn comes. Must be called with the propagation
    /// token held.
    fn fan_out(&mut self, source: &ContainerId, view: MapView, pending: &mut VecDeque<BackendEvent>) {
        let mut siblings: Vec<(ContainerId, MapHandle)> = self
            .entries
            .iter()
            .filter(|(id, _)| *id != source)
            .map(|(id, entry)| (id.clone(), entry.map))
            .collect();
        siblings.sort();

        for (id, map) in siblings {
            if self.backend.view(map) == Some(view) {
                continue;
            }
            let moving = pending.iter().any(
                |event| matches!(event, BackendEvent::Moved { container, .. } if *container == id),
            );
            if moving {
                debug!("Map '{}' has a pending move of its own, not replaying", id);
                continue;
            }
            if let Err(err) = self.backend.set_view(map, view) {
                warn!("Tandem move of map '{}' failed: {}", id, err);
                continue;
            }
            // Only the sibling's echo of the replay is suppressed.
            while let Some(event) = self.backend.poll_event() {
                match event {
                    BackendEvent::Moved { container, .. } if container == id => {
                        trace!("Suppressing echo of tandem move on '{}'", container);
                    }
                    other => pending.push_back(other),
                }
            }
        }
    }
}
