//! The hub actor: sole owner of the connection registry.
//!
//! [`Hub::run`] processes one command or liveness tick at a time. That loop
//! is the only place the registry is mutated or iterated, so registration,
//! removal, fan-out and sweeps are totally ordered without any lock on the
//! live set.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::connection::{Connection, ConnectionState, Outbound};
use super::handle::HubHandle;
use super::liveness;
use super::registry::ConnectionRegistry;
use crate::domain::Notification;

/// Hub tuning parameters.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Capacity of the command queue feeding the hub.
    pub queue_capacity: usize,
    /// Interval between liveness sweeps.
    pub ping_interval: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Requests queued to the hub.
#[derive(Debug)]
pub(crate) enum HubCommand {
    Register(Arc<Connection>),
    Unregister(Arc<Connection>),
    Broadcast(Notification),
    ConnectionCount(oneshot::Sender<usize>),
}

/// Single-owner coordinator for the live connection set.
#[derive(Debug)]
pub struct Hub {
    registry: ConnectionRegistry,
    commands: mpsc::Receiver<HubCommand>,
    ping_interval: Duration,
}

impl Hub {
    /// Creates a hub and the handle used to reach it.
    #[must_use]
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let hub = Self {
            registry: ConnectionRegistry::new(),
            commands: rx,
            ping_interval: config.ping_interval,
        };
        (hub, HubHandle::new(tx))
    }

    /// Creates a hub and runs it on a new tokio task.
    #[must_use]
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        (handle, tokio::spawn(hub.run()))
    }

    /// Processes commands and liveness ticks until every [`HubHandle`] has
    /// been dropped.
    pub async fn run(mut self) {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(ping_interval = ?self.ping_interval, "hub started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = ticker.tick() => {
                    let outcome = liveness::sweep(&mut self.registry, Instant::now());
                    tracing::debug!(
                        pinged = outcome.pinged,
                        evicted = outcome.evicted,
                        connections = self.registry.len(),
                        "liveness sweep"
                    );
                }
            }
        }

        tracing::debug!(connections = self.registry.len(), "hub stopped");
    }

    fn handle(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register(conn) => self.register(conn),
            HubCommand::Unregister(conn) => self.unregister(&conn),
            HubCommand::Broadcast(notification) => self.broadcast(&notification),
            HubCommand::ConnectionCount(reply) => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    fn register(&mut self, conn: Arc<Connection>) {
        // The handler may have given up before this command was processed.
        if conn.is_closing() {
            conn.mark_removed();
            return;
        }
        let id = conn.id();
        if self.registry.insert(Arc::clone(&conn)) {
            conn.advance(ConnectionState::Registered);
            tracing::info!(connection_id = %id, connections = self.registry.len(), "connection registered");
        } else {
            tracing::debug!(connection_id = %id, "connection already registered");
        }
    }

    fn unregister(&mut self, conn: &Connection) {
        conn.close();
        if self.registry.remove(conn.id()).is_some() {
            tracing::info!(
                connection_id = %conn.id(),
                connections = self.registry.len(),
                "connection unregistered"
            );
        }
        conn.mark_removed();
    }

    fn broadcast(&mut self, notification: &Notification) {
        let frame = match notification.to_frame() {
            Ok(frame) => Utf8Bytes::from(frame),
            Err(e) => {
                tracing::warn!(notification_id = %notification.id, error = %e, "failed to encode notification");
                return;
            }
        };

        let mut delivered = 0usize;
        let mut evicted = 0usize;
        self.registry.retain(|conn| {
            if !conn.wants(notification) {
                return true;
            }
            match conn.try_deliver(Outbound::Text(frame.clone())) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(e) => {
                    tracing::warn!(connection_id = %conn.id(), error = %e, "delivery failed; dropping connection");
                    conn.mark_removed();
                    evicted += 1;
                    false
                }
            }
        });

        tracing::debug!(
            notification_id = %notification.id,
            category = %notification.category,
            delivered,
            evicted,
            "broadcast notification"
        );
    }
}
