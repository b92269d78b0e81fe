//! Per-connection read and write loops.
//!
//! Each upgraded socket is split in two. The read loop (this task) applies
//! control frames to the connection's subscription and renews its read
//! deadline; a spawned writer drains the bounded outbound queue into the
//! socket. Either side stopping cancels the other through the connection's
//! shutdown token, after which the connection is unregistered.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use super::messages::ControlFrame;
use crate::config::GatewayConfig;
use crate::domain::ConnectionId;
use crate::error::GatewayError;
use crate::hub::{Connection, HubHandle, Outbound};

/// Per-connection limits applied at upgrade time.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Outbound queue length, in frames.
    pub outbound_buffer: usize,
    /// Read deadline renewed by every inbound frame.
    pub read_timeout: Duration,
    /// Upper bound on a single socket write.
    pub send_timeout: Duration,
    /// Largest inbound message accepted, in bytes.
    pub max_frame_bytes: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 64,
            read_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(10),
            max_frame_bytes: 512,
        }
    }
}

impl From<&GatewayConfig> for ConnectionSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            outbound_buffer: config.outbound_buffer,
            read_timeout: config.pong_timeout,
            send_timeout: config.send_timeout,
            max_frame_bytes: config.max_frame_bytes,
        }
    }
}

/// Why a read loop stopped.
#[derive(Debug)]
enum ReadExit {
    /// The hub or the writer closed the connection.
    Shutdown,
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// The transport reported an error.
    ReadError(axum::Error),
    /// The client sent a frame that is not a valid control frame.
    UnexpectedFrame(String),
}

impl fmt::Display for ReadExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown requested"),
            Self::ClientClosed => f.write_str("closed by client"),
            Self::ReadError(e) => write!(f, "read error: {e}"),
            Self::UnexpectedFrame(why) => write!(f, "unexpected frame: {why}"),
        }
    }
}

/// Runs one client connection from registration to release.
pub async fn run_connection(socket: WebSocket, hub: HubHandle, settings: ConnectionSettings) {
    let (conn, outbound) = Connection::new(
        ConnectionId::new(),
        settings.outbound_buffer,
        settings.read_timeout,
    );
    let id = conn.id();

    if let Err(e) = hub.register(Arc::clone(&conn)).await {
        tracing::warn!(connection_id = %id, error = %e, "could not register connection");
        conn.close();
        return;
    }

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_loop(
        sink,
        outbound,
        Arc::clone(&conn),
        settings.send_timeout,
    ));

    let exit = read_loop(stream, &conn).await;
    match &exit {
        ReadExit::Shutdown | ReadExit::ClientClosed => {
            tracing::debug!(connection_id = %id, reason = %exit, "read loop finished");
        }
        ReadExit::ReadError(_) | ReadExit::UnexpectedFrame(_) => {
            tracing::info!(connection_id = %id, reason = %exit, "read loop finished");
        }
    }

    conn.close();
    if let Err(e) = hub.unregister(Arc::clone(&conn)).await {
        tracing::warn!(connection_id = %id, error = %e, "could not unregister connection");
    }

    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::info!(connection_id = %id, error = %e, "writer stopped"),
        Err(e) => tracing::error!(connection_id = %id, error = %e, "writer task failed"),
    }
    // The hub may not have processed the unregister yet; it completes the
    // transition in that case.
    let closed = conn.settle();
    tracing::debug!(connection_id = %id, closed, "connection released");
}

async fn read_loop(mut stream: SplitStream<WebSocket>, conn: &Connection) -> ReadExit {
    loop {
        let frame = tokio::select! {
            () = conn.closed() => return ReadExit::Shutdown,
            frame = stream.next() => frame,
        };

        let message = match frame {
            None => return ReadExit::ClientClosed,
            Some(Err(e)) => return ReadExit::ReadError(e),
            Some(Ok(message)) => message,
        };
        conn.touch();

        match message {
            Message::Text(text) => match ControlFrame::parse(text.as_str()) {
                Ok(control) => {
                    tracing::debug!(connection_id = %conn.id(), frame = ?control, "control frame");
                    conn.update_subscription(|sub| control.apply(sub));
                }
                Err(e) => return ReadExit::UnexpectedFrame(e.to_string()),
            },
            // Pings are answered by the protocol layer.
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return ReadExit::ClientClosed,
            Message::Binary(_) => {
                return ReadExit::UnexpectedFrame("binary frames are not accepted".to_string());
            }
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    conn: Arc<Connection>,
    send_timeout: Duration,
) -> Result<(), GatewayError> {
    loop {
        let frame = tokio::select! {
            () = conn.closed() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let message = match frame {
            Outbound::Text(text) => Message::Text(text),
            Outbound::Ping => Message::Ping(Bytes::new()),
        };

        let result = match tokio::time::timeout(send_timeout, sink.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(GatewayError::Connection(e.to_string())),
            Err(_) => Err(GatewayError::SendTimeout {
                timeout_ms: u64::try_from(send_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        if let Err(e) = result {
            conn.close();
            return Err(e);
        }
    }

    // Best effort; the peer may already be gone.
    let _ = tokio::time::timeout(send_timeout, sink.send(Message::Close(None))).await;
    Ok(())
}
