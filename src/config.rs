//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Every key has a default so the gateway
//! starts with no configuration against a local Redis.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::GatewayError;
use crate::hub::HubConfig;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8082`).
    pub listen_addr: SocketAddr,

    /// Redis connection URL for the relay subscription.
    pub redis_url: String,

    /// Broker channel the relay subscribes to.
    pub relay_channel: String,

    /// Interval between liveness pings.
    pub ping_interval: Duration,

    /// Read deadline renewed by every inbound frame.
    pub pong_timeout: Duration,

    /// Upper bound on a single socket write.
    pub send_timeout: Duration,

    /// Per-connection outbound queue length, in frames.
    pub outbound_buffer: usize,

    /// Capacity of the hub command queue.
    pub hub_queue_capacity: usize,

    /// Largest inbound WebSocket message accepted from a client, in bytes.
    pub max_frame_bytes: usize,

    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set or cannot be
    /// parsed. Calls `dotenvy::dotenv().ok()` to optionally load a `.env`
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if `LISTEN_ADDR` is set but cannot
    /// be parsed as a [`SocketAddr`], or if `PONG_TIMEOUT_SECS` does not
    /// exceed `PING_INTERVAL_SECS`.
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();

        let raw_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8082".to_string());
        let listen_addr: SocketAddr = raw_addr
            .parse()
            .map_err(|e| GatewayError::Config(format!("LISTEN_ADDR {raw_addr:?}: {e}")))?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let relay_channel =
            std::env::var("RELAY_CHANNEL").unwrap_or_else(|_| "notifications".to_string());

        let ping_interval = Duration::from_secs(parse_env("PING_INTERVAL_SECS", 30).max(1));
        let pong_timeout = Duration::from_secs(parse_env("PONG_TIMEOUT_SECS", 60).max(1));
        check_liveness(ping_interval, pong_timeout)?;

        Ok(Self {
            listen_addr,
            redis_url: normalize_redis_url(redis_url),
            relay_channel,
            ping_interval,
            pong_timeout,
            send_timeout: Duration::from_secs(parse_env("SEND_TIMEOUT_SECS", 10).max(1)),
            outbound_buffer: parse_env("OUTBOUND_BUFFER", 64).max(1),
            hub_queue_capacity: parse_env("HUB_QUEUE_CAPACITY", 1024).max(1),
            max_frame_bytes: parse_env("MAX_FRAME_BYTES", 512),
            log_json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the hub settings derived from this configuration.
    #[must_use]
    pub const fn hub_config(&self) -> HubConfig {
        HubConfig {
            queue_capacity: self.hub_queue_capacity,
            ping_interval: self.ping_interval,
        }
    }
}

/// A client that answers every ping only renews its deadline once per ping
/// interval, so the read deadline must be longer than the interval.
fn check_liveness(ping_interval: Duration, pong_timeout: Duration) -> Result<(), GatewayError> {
    if pong_timeout <= ping_interval {
        return Err(GatewayError::Config(format!(
            "PONG_TIMEOUT_SECS ({}s) must exceed PING_INTERVAL_SECS ({}s)",
            pong_timeout.as_secs(),
            ping_interval.as_secs()
        )));
    }
    Ok(())
}

/// Accepts a bare `host:port` (as older deployments set `REDIS_URL`) by
/// prefixing the `redis://` scheme.
fn normalize_redis_url(url: String) -> String {
    if url.contains("://") {
        url
    } else {
        format!("redis://{url}")
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
