//! graph::tracker
//!
//! Lifecycle states of tracked objects.

use std::collections::BTreeMap;

use serde::Serialize;

use super::objects::ObjectId;

/// Persistence state assigned to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    /// Must be inserted
    New,
    /// Persisted, no changes
    Unchanged,
    /// Persisted, scalar values changed
    Modified,
    /// Persisted, no longer reachable from its principal
    MarkedForDeletion,
    /// Not tracked
    Detached,
}

impl std::fmt::Display for EntityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityState::New => "new",
            EntityState::Unchanged => "unchanged",
            EntityState::Modified => "modified",
            EntityState::MarkedForDeletion => "marked_for_deletion",
            EntityState::Detached => "detached",
        };
        write!(f, "{s}")
    }
}

/// The set of tracked objects and their states.
///
/// An object absent from the tracker is [`EntityState::Detached`].
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    states: BTreeMap<ObjectId, EntityState>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `id` with `state`. Tracking as `Detached` removes it.
    pub fn set_state(&mut self, id: ObjectId, state: EntityState) {
        if state == EntityState::Detached {
            self.states.remove(&id);
        } else {
            self.states.insert(id, state);
        }
    }

    pub fn state(&self, id: ObjectId) -> EntityState {
        self.states
            .get(&id)
            .copied()
            .unwrap_or(EntityState::Detached)
    }

    pub fn is_tracked(&self, id: ObjectId) -> bool {
        self.states.contains_key(&id)
    }

    /// Stop tracking `id`. Returns whether it was tracked.
    pub fn detach(&mut self, id: ObjectId) -> bool {
        self.states.remove(&id).is_some()
    }

    /// Tracked objects in id order.
    pub fn entries(&self) -> impl Iterator<Item = (ObjectId, EntityState)> + '_ {
        self.states.iter().map(|(id, state)| (*id, *state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
