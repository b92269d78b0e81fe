//! Broker → hub relay loop.

use futures_util::{Stream, StreamExt};

use crate::domain::Notification;
use crate::error::GatewayError;
use crate::hub::HubHandle;

/// Counters reported when the relay loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Payloads decoded and handed to the hub.
    pub relayed: u64,
    /// Payloads dropped because they did not decode.
    pub discarded: u64,
}

/// Decodes broker payloads and forwards them to the hub for fan-out.
#[derive(Debug, Clone)]
pub struct RelayBridge {
    hub: HubHandle,
    channel: String,
}

impl RelayBridge {
    /// Creates a bridge feeding `hub`. `channel` is used for logging.
    #[must_use]
    pub fn new(hub: HubHandle, channel: impl Into<String>) -> Self {
        Self {
            hub,
            channel: channel.into(),
        }
    }

    /// Relays every payload until the stream ends.
    ///
    /// A payload that fails to decode is logged and skipped; the loop keeps
    /// going.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::HubUnavailable`] if the hub stops accepting
    /// broadcasts.
    pub async fn run<S>(self, mut payloads: S) -> Result<RelayStats, GatewayError>
    where
        S: Stream<Item = String> + Unpin,
    {
        let mut stats = RelayStats::default();
        tracing::info!(channel = %self.channel, "relay started");

        while let Some(payload) = payloads.next().await {
            match Notification::from_payload(&payload) {
                Ok(notification) => {
                    tracing::debug!(
                        channel = %self.channel,
                        notification_id = %notification.id,
                        category = %notification.category,
                        "relaying notification"
                    );
                    self.hub.broadcast(notification).await?;
                    stats.relayed += 1;
                }
                Err(e) => {
                    stats.discarded += 1;
                    tracing::warn!(
                        channel = %self.channel,
                        error = %e,
                        discarded = stats.discarded,
                        "discarding malformed notification payload"
                    );
                }
            }
        }

        tracing::warn!(
            channel = %self.channel,
            relayed = stats.relayed,
            discarded = stats.discarded,
            "relay stream ended"
        );
        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::stream;
    use tokio_test::assert_ok;

    use super::*;
    use crate::domain::ConnectionId;
    use crate::hub::{Connection, Hub, HubConfig, Outbound};

    const GOOD: &str = r#"{"id":"n1","type":"alert","category":"wildfire","title":"Fire","message":"..","severity":"critical","created_at":"2024-01-01T00:00:00Z","read":false}"#;

    #[tokio::test]
    async fn malformed_payload_does_not_stop_relay() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let (conn, mut rx) = Connection::new(ConnectionId::new(), 8, Duration::from_secs(60));
        assert_ok!(hub.register(Arc::clone(&conn)).await);

        let payloads = stream::iter(vec![
            "{\"id\":".to_string(),
            r#"{"id":"x","type":"alert"}"#.to_string(),
            GOOD.to_string(),
        ]);
        let bridge = RelayBridge::new(hub.clone(), "notifications");
        let Ok(stats) = bridge.run(payloads).await else {
            panic!("relay should finish cleanly");
        };
        assert_eq!(stats, RelayStats { relayed: 1, discarded: 2 });

        assert_ok!(hub.connection_count().await);
        let Ok(Outbound::Text(text)) = rx.try_recv() else {
            panic!("expected the well-formed notification");
        };
        let sent: serde_json::Value = serde_json::from_str(text.as_str()).unwrap_or_default();
        let expected: serde_json::Value = serde_json::from_str(GOOD).unwrap_or_default();
        assert_eq!(sent, expected);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stopped_hub_is_an_error() {
        let (hub_actor, hub) = Hub::new(HubConfig::default());
        drop(hub_actor);

        let bridge = RelayBridge::new(hub, "notifications");
        let result = bridge.run(stream::iter(vec![GOOD.to_string()])).await;
        assert!(matches!(result, Err(GatewayError::HubUnavailable)));
    }

    #[tokio::test]
    async fn empty_stream_reports_zero() {
        let (hub, _task) = Hub::spawn(HubConfig::default());
        let bridge = RelayBridge::new(hub, "notifications");
        let Ok(stats) = bridge.run(stream::iter(Vec::<String>::new())).await else {
            panic!("relay should finish cleanly");
        };
        assert_eq!(stats, RelayStats::default());
    }
}
