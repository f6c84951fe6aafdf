//! Room service — per-room membership, draw history, and fan-out.
//!
//! DESIGN
//! ======
//! A room owns its connected clients and the ordered draw history since the
//! last clear. Everything is serialized by one mutex per room, so activity in
//! one room never blocks another. The lock is a `std::sync::Mutex`: no
//! critical section awaits, and the membership guard can release from `Drop`.
//!
//! JOIN ORDERING
//! =============
//! `join` inserts the client and queues the history envelope into the
//! client's own outbound channel inside the same critical section. Any draw
//! accepted afterwards is broadcast into that channel behind the history, and
//! anything already in the snapshot is never re-sent. The joiner sees no gaps
//! and no duplicates.
//!
//! Outbound channels are unbounded. A broadcast never waits on a slow peer
//! while the room lock is held, and never drops an envelope for a client that
//! is still connected; only a closed channel counts as a failed delivery.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::envelope::{CLEAR_BOARD, DRAW_LINE, DrawOperation, Envelope, EnvelopeError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room evicted: {0}")]
    Evicted(String),
}

/// What a room did with one inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Appended to history and broadcast.
    Drew { recipients: usize },
    /// History wiped and broadcast.
    Cleared { recipients: usize },
    /// Forwarded untouched.
    Relayed { recipients: usize },
}

pub struct Room {
    name: String,
    inner: Mutex<RoomState>,
}

struct RoomState {
    /// Connected clients: `client_id` -> sender for outgoing envelopes.
    clients: HashMap<Uuid, mpsc::UnboundedSender<Envelope>>,
    /// Accepted draws since creation or the last clear.
    history: Vec<DrawOperation>,
    /// Set once the registry has dropped this room. Joins are refused after.
    evicted: bool,
}

// =============================================================================
// ROOM
// =============================================================================

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(RoomState { clients: HashMap::new(), history: Vec::new(), evicted: false }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a client and return the history snapshot taken in the same
    /// critical section. A non-empty snapshot is also queued to `tx` as a
    /// single `history` envelope before the lock is released.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Evicted`] if the registry has already dropped this
    /// room; the caller should resolve the name again.
    pub fn join(&self, client_id: Uuid, tx: mpsc::UnboundedSender<Envelope>) -> Result<Vec<DrawOperation>, RoomError> {
        let mut state = self.lock();
        if state.evicted {
            return Err(RoomError::Evicted(self.name.clone()));
        }

        let snapshot = state.history.clone();
        if !snapshot.is_empty() {
            if tx.send(Envelope::history(&snapshot)).is_err() {
                debug!(room = %self.name, %client_id, "client channel closed before history replay");
            }
        }
        state.clients.insert(client_id, tx);
        Ok(snapshot)
    }

    /// Remove a client. Returns `true` if the room is now empty.
    pub fn leave(&self, client_id: Uuid) -> bool {
        let mut state = self.lock();
        state.clients.remove(&client_id);
        state.clients.is_empty()
    }

    pub fn apply_draw(&self, op: DrawOperation) {
        self.lock().apply_draw(op);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Offer `envelope` to every member except `exclude`. Returns how many
    /// members accepted it.
    pub fn broadcast(&self, envelope: &Envelope, exclude: Option<Uuid>) -> usize {
        self.lock().broadcast(&self.name, envelope, exclude)
    }

    /// Apply one inbound envelope from `from` and relay it to the other
    /// members, all under a single critical section.
    ///
    /// Only `draw_line` payloads are validated. Every type other than
    /// `draw_line` and `clear_board` is relayed as-is, whatever its `data`.
    ///
    /// # Errors
    ///
    /// Returns the decode error for a malformed `draw_line`. Nothing is
    /// recorded or broadcast in that case.
    pub fn handle(&self, envelope: &Envelope, from: Uuid) -> Result<Disposition, EnvelopeError> {
        let draw = if envelope.kind == DRAW_LINE { Some(envelope.draw_operation()?) } else { None };

        let mut state = self.lock();
        let disposition = if let Some(op) = draw {
            state.apply_draw(op);
            Disposition::Drew { recipients: state.broadcast(&self.name, envelope, Some(from)) }
        } else if envelope.kind == CLEAR_BOARD {
            state.clear();
            Disposition::Cleared { recipients: state.broadcast(&self.name, envelope, Some(from)) }
        } else {
            Disposition::Relayed { recipients: state.broadcast(&self.name, envelope, Some(from)) }
        };
        Ok(disposition)
    }

    #[must_use]
    pub fn member_count(&self) -> usize {
        self.lock().clients.len()
    }

    #[must_use]
    pub fn history(&self) -> Vec<DrawOperation> {
        self.lock().history.clone()
    }

    /// Mark the room evicted if it has no members. Called by the registry
    /// while it holds its own lock.
    pub(crate) fn mark_evicted_if_empty(&self) -> bool {
        let mut state = self.lock();
        if state.clients.is_empty() {
            state.evicted = true;
        }
        state.evicted
    }
}

impl RoomState {
    fn apply_draw(&mut self, op: DrawOperation) {
        self.history.push(op);
    }

    fn clear(&mut self) {
        self.history.clear();
    }

    fn broadcast(&self, room: &str, envelope: &Envelope, exclude: Option<Uuid>) -> usize {
        let mut delivered = 0;
        for (client_id, tx) in &self.clients {
            if exclude == Some(*client_id) {
                continue;
            }
            // A closed channel means the client is on its way out; skip it.
            if tx.send(envelope.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!(%room, %client_id, kind = %envelope.kind, "client channel closed; envelope dropped");
            }
        }
        delivered
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
