//! Real-time collaborative drawing relay.
//!
//! ARCHITECTURE
//! ============
//! Clients join a named room over a websocket, receive the room's draw
//! history, then exchange `draw_line` / `clear_board` / opaque envelopes
//! with the other members. Rooms live only while someone is connected.
//!
//! - `envelope`: wire message type and typed payload decoding
//! - `services::room`: per-room membership, history, and fan-out
//! - `services::registry`: name → room index, lazy creation, eviction
//! - `routes`: axum router and the per-connection websocket loop
//! - `config` / `state`: env configuration and handler state

pub mod config;
pub mod envelope;
pub mod routes;
pub mod services;
pub mod state;
