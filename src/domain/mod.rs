//! Domain layer: notification model, subscription filtering, identities.
//!
//! This module contains the transport-independent model: the
//! [`Notification`] relayed from the broker, the per-connection
//! [`Subscription`] predicate that decides delivery, and the
//! [`ConnectionId`] that keys the hub's registry.

pub mod connection_id;
pub mod geo;
pub mod notification;
pub mod subscription;

pub use connection_id::ConnectionId;
pub use notification::{Coordinates, Notification};
pub use subscription::{GeoFilter, Subscription};
