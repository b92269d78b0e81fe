//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::GatewayError;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// # Errors
///
/// Returns [`GatewayError::Upgrade`] for requests that are not valid
/// WebSocket upgrades and [`GatewayError::HubUnavailable`] if the hub task
/// has stopped.
pub async fn ws_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, GatewayError> {
    if !state.hub.is_running() {
        return Err(GatewayError::HubUnavailable);
    }

    let ws = upgrade.map_err(|rejection| {
        let err = GatewayError::Upgrade(rejection.body_text());
        tracing::warn!(error = %err, "rejecting websocket upgrade");
        err
    })?;

    let hub = state.hub.clone();
    let settings = state.connection;

    Ok(ws
        .max_message_size(settings.max_frame_bytes)
        .on_failed_upgrade(|e: axum::Error| {
            tracing::warn!(error = %e, "websocket handshake failed");
        })
        .on_upgrade(move |socket| run_connection(socket, hub, settings)))
}
