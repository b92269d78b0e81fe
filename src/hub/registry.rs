//! Live connection set owned by the hub task.
//!
//! [`ConnectionRegistry`] has no interior locking: it is only ever touched
//! from the hub's run loop, which serializes registration, removal,
//! broadcast and liveness sweeps.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use super::connection::Connection;
use crate::domain::ConnectionId;

/// Mapping from connection identity to the shared connection handle.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Arc<Connection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection. Returns `false` if its id was already present,
    /// leaving the existing entry in place.
    pub fn insert(&mut self, conn: Arc<Connection>) -> bool {
        match self.connections.entry(conn.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(conn);
                true
            }
        }
    }

    /// Removes a connection, returning it if it was present.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.remove(&id)
    }

    /// Keeps only the connections for which `keep` returns `true`.
    ///
    /// Every connection is visited even after `keep` rejects one.
    pub fn retain(&mut self, mut keep: impl FnMut(&Arc<Connection>) -> bool) {
        self.connections.retain(|_, conn| keep(conn));
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
