//! Relay from the external broker into the hub.
//!
//! [`broker::subscribe`] opens the Redis pub/sub subscription once at
//! startup; [`RelayBridge`] decodes each payload into a
//! [`crate::domain::Notification`] and hands it to the hub for fan-out.
//! The bridge accepts any payload stream, so tests drive it from memory.

pub mod bridge;
pub mod broker;

pub use bridge::{RelayBridge, RelayStats};
