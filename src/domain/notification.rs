//! Notification messages relayed from the broker to WebSocket clients.
//!
//! A [`Notification`] is decoded once by the relay bridge, then shared
//! read-only across the broadcast. The decode schema is strict: required
//! fields must be present and well typed, unknown fields are rejected, and
//! coordinates must be exactly `[longitude, latitude]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// A geographic point in decimal degrees.
///
/// Serialized as a two-element array `[longitude, latitude]`, the order used
/// by GeoJSON and by the upstream event pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    /// Longitude in degrees, east positive.
    pub lon: f64,
    /// Latitude in degrees, north positive.
    pub lat: f64,
}

impl Coordinates {
    /// Creates a point from longitude and latitude.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lon, c.lat]
    }
}

/// An alert or event notification pushed to subscribed clients.
///
/// Immutable once constructed. Absent optional fields are omitted from the
/// wire encoding so a decoded payload re-encodes to the same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notification {
    /// Producer-assigned notification identifier.
    pub id: String,
    /// Notification kind (e.g. `"alert"`, `"prediction"`, `"info"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Event category (e.g. `"wildfire"`, `"flood"`). Matched case-sensitively.
    pub category: String,
    /// Short human-readable headline.
    pub title: String,
    /// Notification body text.
    pub message: String,
    /// Severity label (e.g. `"info"`, `"warning"`, `"critical"`).
    pub severity: String,
    /// Source event this notification refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    /// Location of the source event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Targeting hint set by the producer; passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Producer creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Read flag as set by the producer.
    pub read: bool,
}

impl Notification {
    /// Decodes a broker payload into a notification.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if the payload is not valid JSON or
    /// does not match the notification schema.
    pub fn from_payload(payload: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(payload).map_err(GatewayError::Decode)
    }

    /// Encodes the notification as the JSON text frame sent to clients.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if `serde_json` fails to serialize
    /// the value. The notification holds only strings, numbers, booleans and
    /// a timestamp, so this is not expected in practice; non-finite
    /// coordinates are written as `null` rather than failing.
    pub fn to_frame(&self) -> Result<String, GatewayError> {
        serde_json::to_string(self).map_err(GatewayError::Decode)
    }
}
