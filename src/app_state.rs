//! Shared application state injected into all Axum handlers.

use crate::hub::HubHandle;
use crate::ws::ConnectionSettings;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Queue to the hub that owns the live connection set.
    pub hub: HubHandle,
    /// Limits applied to every upgraded connection.
    pub connection: ConnectionSettings,
}

impl AppState {
    /// Creates the state from its parts.
    #[must_use]
    pub const fn new(hub: HubHandle, connection: ConnectionSettings) -> Self {
        Self { hub, connection }
    }
}
