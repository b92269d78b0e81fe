//! Periodic ping/pong liveness sweep.
//!
//! Runs on the hub task at every ping tick. A connection is evicted when its
//! read deadline has lapsed (no inbound frame, pong included, since the
//! last renewal) or when the ping cannot be queued. This catches half-open
//! sockets the transport has not reported as closed.

use tokio::time::Instant;

use super::connection::Outbound;
use super::registry::ConnectionRegistry;

/// Result of one liveness sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Connections that were sent a ping.
    pub pinged: usize,
    /// Connections evicted by this sweep.
    pub evicted: usize,
}

/// Pings every registered connection and evicts the dead ones.
pub fn sweep(registry: &mut ConnectionRegistry, now: Instant) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    registry.retain(|conn| {
        if conn.is_expired(now) {
            tracing::info!(connection_id = %conn.id(), "read deadline elapsed; evicting connection");
            conn.mark_removed();
            outcome.evicted += 1;
            return false;
        }
        match conn.try_deliver(Outbound::Ping) {
            Ok(()) => {
                outcome.pinged += 1;
                true
            }
            Err(e) => {
                tracing::info!(connection_id = %conn.id(), error = %e, "ping failed; evicting connection");
                conn.mark_removed();
                outcome.evicted += 1;
                false
            }
        }
    });

    outcome
}
