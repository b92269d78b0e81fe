//! alert-gateway server entry point.
//!
//! Subscribes to the broker, starts the hub and serves `/ws` and `/health`.

use std::future::IntoFuture;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use alert_gateway::api;
use alert_gateway::app_state::AppState;
use alert_gateway::config::GatewayConfig;
use alert_gateway::error::GatewayError;
use alert_gateway::hub::Hub;
use alert_gateway::relay::{RelayBridge, broker};
use alert_gateway::ws::ConnectionSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    tracing::info!(addr = %config.listen_addr, "starting alert-gateway");

    // Start the hub
    let (hub, hub_task) = Hub::spawn(config.hub_config());

    // Subscribe to the broker; the gateway is useless without it
    let payloads = broker::subscribe(&config.redis_url, &config.relay_channel)
        .await
        .with_context(|| format!("could not subscribe to broker at {}", config.redis_url))?;
    let relay = RelayBridge::new(hub.clone(), config.relay_channel.clone());
    let relay_task = tokio::spawn(relay.run(payloads));

    // Build router
    let app = api::app(AppState::new(hub, ConnectionSettings::from(&config)));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("could not bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    tokio::select! {
        served = axum::serve(listener, app).into_future() => {
            served.context("http server failed")?;
        }
        relayed = relay_task => {
            let stats = relayed.context("relay task panicked")??;
            tracing::error!(
                channel = %config.relay_channel,
                relayed = stats.relayed,
                discarded = stats.discarded,
                "broker subscription lost; shutting down"
            );
            return Err(GatewayError::RelayClosed {
                channel: config.relay_channel,
            }
            .into());
        }
        stopped = hub_task => {
            stopped.context("hub task panicked")?;
            anyhow::bail!("hub stopped unexpectedly");
        }
    }

    Ok(())
}
