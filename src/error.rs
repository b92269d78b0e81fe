//! Gateway error types with HTTP status code mapping.
//!
//! [`GatewayError`] is the central error type for the gateway. Most variants
//! never leave the task they occur in (a single connection or a single relay
//! payload); the ones that surface over HTTP map to a status code and a
//! structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3002,
///     "message": "notification hub is not running",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Gateway error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category              | Scope                      |
/// |-----------|-----------------------|----------------------------|
/// | 1000–1999 | Client / protocol     | one request or connection  |
/// | 2000–2999 | Relay                 | one payload, or the relay  |
/// | 3000–3999 | Server                | process                    |
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A relay payload or client control frame did not match its schema.
    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// Read or write failure on one client transport.
    #[error("connection error: {0}")]
    Connection(String),

    /// A socket write did not complete within the send timeout.
    #[error("send timed out after {timeout_ms} ms")]
    SendTimeout {
        /// The bound that was exceeded.
        timeout_ms: u64,
    },

    /// The WebSocket handshake could not be completed.
    #[error("upgrade failed: {0}")]
    Upgrade(String),

    /// The broker could not be reached or subscribed to at startup.
    #[error("broker connect failed: {0}")]
    BrokerConnect(#[from] redis::RedisError),

    /// The broker payload stream ended.
    #[error("relay stream from channel {channel:?} ended")]
    RelayClosed {
        /// Broker channel the relay was subscribed to.
        channel: String,
    },

    /// The hub task has stopped and no longer accepts commands.
    #[error("notification hub is not running")]
    HubUnavailable,

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Upgrade(_) => 1001,
            Self::Connection(_) => 1002,
            Self::SendTimeout { .. } => 1003,
            Self::Decode(_) => 2001,
            Self::BrokerConnect(_) => 2002,
            Self::RelayClosed { .. } => 2003,
            Self::Config(_) => 3001,
            Self::HubUnavailable => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Upgrade(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::BrokerConnect(_) | Self::RelayClosed { .. } => StatusCode::BAD_GATEWAY,
            Self::Connection(_) | Self::SendTimeout { .. } | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
