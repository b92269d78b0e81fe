//! Server-side view of one client connection.
//!
//! A [`Connection`] is shared between three tasks: the connection's own
//! read loop (which edits its subscription and renews its read deadline),
//! its writer task (which drains the outbound queue into the socket), and
//! the hub (which filters, enqueues frames, sweeps liveness and evicts).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::domain::{ConnectionId, Notification, Subscription};
use crate::error::GatewayError;

/// A frame queued for the connection's writer task.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Serialized notification, shared by every recipient of a broadcast.
    Text(Utf8Bytes),
    /// Protocol-level liveness ping.
    Ping,
}

/// Connection lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake done, not yet in the registry.
    Connecting = 0,
    /// In the registry; receives broadcasts and pings.
    Registered = 1,
    /// Shutdown requested; reader and writer are stopping.
    Closing = 2,
    /// Out of the registry and the writer has released the transport.
    /// Terminal.
    Closed = 3,
}

impl ConnectionState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Registered,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Shared handle to one live client connection.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    subscription: Mutex<Subscription>,
    deadline: Mutex<Instant>,
    read_timeout: Duration,
    state: AtomicU8,
    removed: AtomicBool,
    outbound: mpsc::Sender<Outbound>,
    shutdown: CancellationToken,
}

impl Connection {
    /// Creates a connection with a bounded outbound queue of `capacity`
    /// frames. The read deadline starts at now + `read_timeout`.
    ///
    /// Returns the shared handle and the receiving end of the outbound
    /// queue, which belongs to the writer task.
    #[must_use]
    pub fn new(
        id: ConnectionId,
        capacity: usize,
        read_timeout: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<Outbound>) {
        let (outbound, rx) = mpsc::channel(capacity.max(1));
        let conn = Self {
            id,
            subscription: Mutex::new(Subscription::new()),
            deadline: Mutex::new(Instant::now() + read_timeout),
            read_timeout,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            removed: AtomicBool::new(false),
            outbound,
            shutdown: CancellationToken::new(),
        };
        (Arc::new(conn), rx)
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves the state forward to `next`. Returns `false` (and leaves the
    /// state untouched) if the connection is already at or past `next`.
    pub(crate) fn advance(&self, next: ConnectionState) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur < next as u8).then_some(next as u8)
            })
            .is_ok()
    }

    /// Runs `f` against the subscription under the connection-local lock.
    pub fn update_subscription<R>(&self, f: impl FnOnce(&mut Subscription) -> R) -> R {
        f(&mut *self.subscription.lock())
    }

    /// Returns a copy of the current subscription.
    #[must_use]
    pub fn subscription(&self) -> Subscription {
        self.subscription.lock().clone()
    }

    /// Evaluates the subscription filter under the connection-local lock.
    #[must_use]
    pub fn wants(&self, notification: &Notification) -> bool {
        self.subscription.lock().matches(notification)
    }

    /// Renews the read deadline to now + the read timeout.
    pub fn touch(&self) {
        *self.deadline.lock() = Instant::now() + self.read_timeout;
    }

    /// Returns `true` if the read deadline has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= *self.deadline.lock()
    }

    /// Enqueues a frame without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Connection`] if the outbound queue is full
    /// (slow consumer) or the writer has gone away (closed transport).
    pub fn try_deliver(&self, frame: Outbound) -> Result<(), GatewayError> {
        self.outbound.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => GatewayError::Connection("outbound queue full".to_string()),
            TrySendError::Closed(_) => GatewayError::Connection("transport closed".to_string()),
        })
    }

    /// Requests shutdown: moves to `Closing` and cancels the reader and
    /// writer tasks. Idempotent.
    pub fn close(&self) {
        self.advance(ConnectionState::Closing);
        self.shutdown.cancel();
    }

    /// Records that the hub no longer holds this connection and requests
    /// shutdown. Never reinserted after this.
    pub(crate) fn mark_removed(&self) {
        self.close();
        self.removed.store(true, Ordering::SeqCst);
        self.settle();
    }

    /// Moves to `Closed` once the connection is out of the registry and the
    /// receiving end of its outbound queue (owned by the writer) is gone.
    /// Called from both sides; whichever finishes last completes the
    /// transition. Returns `true` if the connection is `Closed`.
    pub(crate) fn settle(&self) -> bool {
        if self.removed.load(Ordering::SeqCst) && self.outbound.is_closed() {
            self.advance(ConnectionState::Closed);
        }
        self.state() == ConnectionState::Closed
    }

    /// Resolves once [`Connection::close`] has been called.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
