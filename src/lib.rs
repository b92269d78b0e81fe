//! # alert-gateway
//!
//! Real-time alert notification gateway. Notifications published by an
//! upstream event pipeline on a Redis pub/sub channel are relayed to every
//! connected WebSocket client whose subscription (categories, severities,
//! location radius) matches.
//!
//! ## Architecture
//!
//! ```text
//! Upstream pipeline
//!     │  PUBLISH notifications <json>
//!     ▼
//! Redis pub/sub ──► RelayBridge (relay/) ── decode, drop malformed
//!                        │
//!                        ▼ broadcast
//!                 Hub (hub/) ── single owner of the ConnectionRegistry
//!                        │      liveness sweep every ping interval
//!                        ▼ filter per connection, bounded try_send
//!                 Connection writer tasks (ws/)
//!                        │
//!                        ▼
//!                 WebSocket clients ── subscribe / unsubscribe frames
//! ```
//!
//! Delivery is fire-and-forget and at most once per live connection. A
//! client that falls behind or stops answering pings is disconnected
//! without affecting anyone else.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod relay;
pub mod ws;
