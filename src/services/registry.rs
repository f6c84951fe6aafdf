//! Room registry — lazy creation and empty-room eviction.
//!
//! DESIGN
//! ======
//! The registry maps room names to live rooms behind its own `RwLock`,
//! separate from every room's lock. Lookups take the read lock; creation and
//! removal take the write lock briefly.
//!
//! EVICTION
//! ========
//! A leaving client checks emptiness under the room lock, releases it, then
//! asks the registry to evict. The registry re-validates under its write lock
//! that the entry is still the same room and still empty, marking it evicted
//! before removal. A caller that resolved the room just before eviction gets
//! `RoomError::Evicted` from `join` and resolves the name again, so nobody is
//! left in an orphaned room.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::envelope::{DrawOperation, Envelope, EnvelopeError};
use crate::services::room::{Disposition, Room, RoomError};

// =============================================================================
// REGISTRY
// =============================================================================

/// Process-wide index of active rooms. Clone is cheap; clones share the map.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<String, Arc<Room>>>>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Room>>> {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Room>>> {
        self.rooms.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the room registered under `name`, creating an empty one if
    /// none exists.
    pub fn get_or_create(&self, name: &str) -> Arc<Room> {
        if let Some(room) = self.read().get(name) {
            return Arc::clone(room);
        }

        let mut rooms = self.write();
        let room = rooms.entry(name.to_owned()).or_insert_with(|| {
            info!(room = %name, "created room");
            Arc::new(Room::new(name))
        });
        Arc::clone(room)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Room>> {
        self.read().get(name).cloned()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.read().len()
    }

    /// Remove `name` if it still maps to `room` and `room` has no members.
    /// Returns `true` if the room was removed.
    pub fn evict_if_empty(&self, name: &str, room: &Arc<Room>) -> bool {
        if room.member_count() > 0 {
            return false;
        }

        let mut rooms = self.write();
        let Some(current) = rooms.get(name) else {
            return false;
        };
        if !Arc::ptr_eq(current, room) {
            return false;
        }
        // Someone may have joined between the caller's leave and now.
        if !room.mark_evicted_if_empty() {
            return false;
        }

        rooms.remove(name);
        info!(room = %name, remaining = rooms.len(), "evicted empty room");
        true
    }

    /// Join `name` as `client_id`, creating the room if needed.
    ///
    /// Returns a membership guard that leaves the room (and evicts it if
    /// empty) when dropped, plus the history snapshot. A non-empty snapshot
    /// has already been queued to `tx`.
    pub fn join(&self, name: &str, client_id: Uuid, tx: mpsc::UnboundedSender<Envelope>) -> (Membership, Vec<DrawOperation>) {
        loop {
            let room = self.get_or_create(name);
            match room.join(client_id, tx.clone()) {
                Ok(snapshot) => {
                    let membership = Membership { registry: self.clone(), room, client_id };
                    return (membership, snapshot);
                }
                Err(RoomError::Evicted(_)) => {}
            }
        }
    }
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// A client's seat in a room. Leaving happens on drop, on every exit path.
pub struct Membership {
    registry: RoomRegistry,
    room: Arc<Room>,
    client_id: Uuid,
}

impl Membership {
    #[must_use]
    pub fn room(&self) -> &Arc<Room> {
        &self.room
    }

    #[must_use]
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Apply an inbound envelope from this client.
    ///
    /// # Errors
    ///
    /// Returns the decode error for a malformed `draw_line`.
    pub fn handle(&self, envelope: &Envelope) -> Result<Disposition, EnvelopeError> {
        self.room.handle(envelope, self.client_id)
    }

    pub fn leave(self) {
        drop(self);
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        let is_empty = self.room.leave(self.client_id);
        info!(room = %self.room.name(), client_id = %self.client_id, is_empty, "client left room");
        if is_empty {
            self.registry.evict_if_empty(self.room.name(), &self.room);
        }
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
