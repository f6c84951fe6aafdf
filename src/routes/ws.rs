//! WebSocket handler — per-connection room relay.
//!
//! DESIGN
//! ======
//! On upgrade, the client joins the room named by the `room` query parameter
//! and enters a `select!` loop:
//! - Incoming client frames → decode envelope → room state machine
//! - Envelopes from room peers → serialize → forward to client
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join room; a non-empty history is queued as the first
//!    outbound envelope
//! 2. Client sends envelopes → room records and relays them
//! 3. Close, transport error, or undecodable frame → loop exits
//! 4. Membership guard drops → leave room → evict if empty

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::services::registry::Membership;
use crate::services::room::Disposition;
use crate::state::AppState;

/// Room used when the client names none.
pub const DEFAULT_ROOM: &str = "general";

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("undecodable envelope: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("socket send failed: {0}")]
    Send(#[source] axum::Error),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let room = room_name(params.get("room").map(String::as_str));
    ws.on_upgrade(move |socket| run_ws(socket, state, room))
}

/// Resolve the requested room name, falling back to [`DEFAULT_ROOM`].
#[must_use]
pub fn room_name(raw: Option<&str>) -> String {
    match raw {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_ROOM.to_string(),
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, room: String) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for the history replay and peer broadcasts.
    let (client_tx, mut client_rx) = mpsc::unbounded_channel::<Envelope>();

    let (membership, snapshot) = state.rooms.join(&room, client_id, client_tx);
    info!(%room, %client_id, history = snapshot.len(), "ws: client joined room");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        debug!(%room, %client_id, error = %e, "ws: read failed");
                        break;
                    }
                };
                let result = match msg {
                    Message::Text(text) => process_inbound(&membership, text.as_str().as_bytes()),
                    Message::Binary(bytes) => process_inbound(&membership, &bytes),
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) => continue,
                };
                if let Err(e) = result {
                    warn!(%room, %client_id, error = %e, "ws: closing connection");
                    break;
                }
            }
            Some(envelope) = client_rx.recv() => {
                if let Err(e) = send_envelope(&mut socket, &envelope).await {
                    debug!(%room, %client_id, error = %e, "ws: write failed");
                    break;
                }
            }
        }
    }

    membership.leave();
    info!(%room, %client_id, "ws: client disconnected");
}

// =============================================================================
// ENVELOPE DISPATCH
// =============================================================================

/// Decode one inbound frame and hand it to the room.
///
/// A malformed `draw_line` payload is dropped and the connection stays up.
/// Only a frame that is not an envelope at all is returned as an error, which
/// ends the connection.
fn process_inbound(membership: &Membership, bytes: &[u8]) -> Result<(), FrameError> {
    let envelope = decode_envelope(bytes)?;
    let room = membership.room().name();
    let client_id = membership.client_id();

    match membership.handle(&envelope) {
        Ok(Disposition::Drew { recipients }) => {
            debug!(%room, %client_id, recipients, "ws: draw_line recorded");
        }
        Ok(Disposition::Cleared { recipients }) => {
            info!(%room, %client_id, recipients, "ws: board cleared");
        }
        Ok(Disposition::Relayed { recipients }) => {
            debug!(%room, %client_id, kind = %envelope.kind, recipients, "ws: relayed");
        }
        Err(e) => {
            debug!(%room, %client_id, error = %e, "ws: dropped malformed payload");
        }
    }
    Ok(())
}

fn decode_envelope(bytes: &[u8]) -> Result<Envelope, FrameError> {
    serde_json::from_slice(bytes).map_err(FrameError::Decode)
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_envelope(socket: &mut WebSocket, envelope: &Envelope) -> Result<(), FrameError> {
    let json = serde_json::to_string(envelope).map_err(FrameError::Encode)?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(FrameError::Send)
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
