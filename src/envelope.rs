//! Envelope — the wire message type for the drawing relay.
//!
//! DESIGN
//! ======
//! Every message on the socket is `{ "type": string, "data": value }`. The
//! envelope keeps `data` as raw JSON so unknown types relay byte-for-byte
//! (modulo key order). Typed access goes through [`Envelope::payload`], which
//! validates the shape for the types the relay understands and reports a
//! recoverable [`EnvelopeError`] instead of panicking on bad input.

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPE CONSTANTS
// =============================================================================

/// A single line segment drawn by a client.
pub const DRAW_LINE: &str = "draw_line";

/// Wipes the room history.
pub const CLEAR_BOARD: &str = "clear_board";

/// Server → client replay of the room history on join.
pub const HISTORY: &str = "history";

// =============================================================================
// TYPES
// =============================================================================

/// One line segment. Immutable once accepted into a room history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOperation {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub color: String,
}

/// Wire-level wrapper. `kind` is serialized as `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

/// Decoded view of an envelope's `data`, selected by its `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Draw(DrawOperation),
    History(Vec<DrawOperation>),
    Empty,
    Unknown(serde_json::Value),
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed draw_line payload: {0}")]
    MalformedDraw(#[source] serde_json::Error),
    #[error("malformed history payload: {0}")]
    MalformedHistory(#[source] serde_json::Error),
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Envelope {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind: kind.into(), data }
    }

    #[must_use]
    pub fn draw_line(op: &DrawOperation) -> Self {
        Self::new(DRAW_LINE, serde_json::to_value(op).unwrap_or_default())
    }

    #[must_use]
    pub fn clear_board() -> Self {
        Self::new(CLEAR_BOARD, serde_json::Value::Null)
    }

    /// Bulk replay of a room history, sent once on join.
    #[must_use]
    pub fn history(ops: &[DrawOperation]) -> Self {
        Self::new(HISTORY, serde_json::to_value(ops).unwrap_or_default())
    }

    /// Decode `data` according to `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if a `draw_line` or `history` payload is missing
    /// fields or has mistyped ones. Other types never fail.
    pub fn payload(&self) -> Result<Payload, EnvelopeError> {
        match self.kind.as_str() {
            DRAW_LINE => self.draw_operation().map(Payload::Draw),
            HISTORY => Vec::<DrawOperation>::deserialize(&self.data)
                .map(Payload::History)
                .map_err(EnvelopeError::MalformedHistory),
            CLEAR_BOARD => Ok(Payload::Empty),
            _ => Ok(Payload::Unknown(self.data.clone())),
        }
    }

    /// Decode `data` as a single draw operation, regardless of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MalformedDraw`] if a field is missing or mistyped.
    pub fn draw_operation(&self) -> Result<DrawOperation, EnvelopeError> {
        DrawOperation::deserialize(&self.data).map_err(EnvelopeError::MalformedDraw)
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
