//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! carries the room registry and the relay configuration. Nothing here is a
//! global, so tests build as many isolated states as they like.

use crate::config::RelayConfig;
use crate::services::registry::RoomRegistry;

/// Clone is required by Axum; the registry is Arc-backed and the config Copy.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomRegistry,
    pub config: RelayConfig,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self { rooms: RoomRegistry::new(), config }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
