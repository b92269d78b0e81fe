//! Cloneable front-end to the hub actor.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::broadcaster::HubCommand;
use super::connection::Connection;
use crate::domain::Notification;
use crate::error::GatewayError;

/// Queues requests to the [`super::Hub`].
///
/// This is the only way to register, unregister or broadcast: callers never
/// see the registry itself. Every method waits for queue capacity, not for
/// the hub to act on the request; commands from one caller are processed
/// in the order they were sent.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub(crate) const fn new(commands: mpsc::Sender<HubCommand>) -> Self {
        Self { commands }
    }

    async fn send(&self, command: HubCommand) -> Result<(), GatewayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GatewayError::HubUnavailable)
    }

    /// Adds a connection to the live set. Registering twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HubUnavailable`] if the hub has stopped.
    pub async fn register(&self, conn: Arc<Connection>) -> Result<(), GatewayError> {
        self.send(HubCommand::Register(conn)).await
    }

    /// Closes a connection and removes it from the live set. Unregistering
    /// an absent connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HubUnavailable`] if the hub has stopped.
    pub async fn unregister(&self, conn: Arc<Connection>) -> Result<(), GatewayError> {
        self.send(HubCommand::Unregister(conn)).await
    }

    /// Offers a notification to every matching connection.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HubUnavailable`] if the hub has stopped.
    pub async fn broadcast(&self, notification: Notification) -> Result<(), GatewayError> {
        self.send(HubCommand::Broadcast(notification)).await
    }

    /// Returns the number of registered connections once every previously
    /// queued command from this caller has been processed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HubUnavailable`] if the hub has stopped.
    pub async fn connection_count(&self) -> Result<usize, GatewayError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::ConnectionCount(reply)).await?;
        rx.await.map_err(|_| GatewayError::HubUnavailable)
    }

    /// Returns `true` while the hub task is accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
