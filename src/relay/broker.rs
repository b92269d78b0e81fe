//! Redis pub/sub source for the relay.

use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::error::GatewayError;

/// Connects to Redis and subscribes to `channel`.
///
/// Returns the stream of text payloads published on the channel. Payloads
/// that are not valid UTF-8 are logged and skipped. The stream ends if the
/// broker connection drops; there is no reconnect.
///
/// # Errors
///
/// Returns [`GatewayError::BrokerConnect`] if the URL is invalid, the
/// broker is unreachable, or the subscription is refused.
pub async fn subscribe(
    url: &str,
    channel: &str,
) -> Result<BoxStream<'static, String>, GatewayError> {
    let client = redis::Client::open(url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    tracing::info!(channel, "subscribed to broker channel");

    let payloads = pubsub.into_on_message().filter_map(|msg| async move {
        match msg.get_payload::<String>() {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(
                    channel = msg.get_channel_name(),
                    error = %e,
                    "discarding non-text broker payload"
                );
                None
            }
        }
    });
    Ok(payloads.boxed())
}
