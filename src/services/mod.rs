//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! `registry` owns the name → room index and room lifecycle; `room` owns
//! per-room membership, history, and fan-out. The route handler only
//! translates socket frames into calls on these.

pub mod registry;
pub mod room;
