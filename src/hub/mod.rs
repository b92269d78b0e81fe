//! Connection hub: registry, fan-out and liveness.
//!
//! A single [`Hub`] task owns the [`ConnectionRegistry`]. Everything else
//! talks to it through a [`HubHandle`], which turns register, unregister and
//! broadcast into queued commands. Liveness sweeps run on the same task, so
//! the live set has exactly one writer.
//!
//! ```text
//! ws handlers ──register/unregister──┐
//!                                    ├──► mpsc ──► Hub::run ──► ConnectionRegistry
//! relay bridge ───────broadcast──────┘                 ▲
//!                                     ping tick ───────┘
//! ```

pub mod broadcaster;
pub mod connection;
pub mod handle;
pub mod liveness;
pub mod registry;

pub use broadcaster::{Hub, HubConfig};
pub use connection::{Connection, ConnectionState, Outbound};
pub use handle::HubHandle;
pub use registry::ConnectionRegistry;
