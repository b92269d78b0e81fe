//! WebSocket layer: upgrade handling, per-connection loops, control frames.
//!
//! The endpoint at `/ws` streams notifications to clients. Clients narrow
//! what they receive with `subscribe` / `unsubscribe` control frames and
//! must answer the server's protocol pings to stay connected.

pub mod connection;
pub mod handler;
pub mod messages;

pub use connection::ConnectionSettings;
