//! Client → server control frames.
//!
//! Server → client data frames are plain JSON-encoded
//! [`crate::domain::Notification`]s and need no envelope.

use serde::Deserialize;

use crate::domain::{Coordinates, GeoFilter, Subscription};
use crate::error::GatewayError;

/// Subscription control frame sent by a client.
///
/// ```json
/// {"action": "subscribe", "categories": ["wildfire"], "severities": ["critical"],
///  "coordinates": [-120.5, 38.2], "radius": 50}
/// ```
///
/// No acknowledgment is sent for either action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Merge categories and severities into the subscription. When
    /// `coordinates` and `radius` are given (always together) the location
    /// filter is replaced.
    Subscribe {
        /// Categories to add.
        #[serde(default)]
        categories: Vec<String>,
        /// Severities to add.
        #[serde(default)]
        severities: Vec<String>,
        /// Area center as `[longitude, latitude]`.
        #[serde(default)]
        coordinates: Option<Coordinates>,
        /// Area radius in kilometres.
        #[serde(default)]
        radius: Option<f64>,
        /// Reject notifications without coordinates while the area filter
        /// is active.
        #[serde(default)]
        require_coordinates: bool,
    },
    /// Remove categories and severities from the subscription.
    Unsubscribe {
        /// Categories to remove.
        #[serde(default)]
        categories: Vec<String>,
        /// Severities to remove.
        #[serde(default)]
        severities: Vec<String>,
    },
}

impl ControlFrame {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Decode`] if the text is not a known control
    /// frame, if it carries only one of `coordinates` and `radius`, or if
    /// the radius is negative or non-finite.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let frame: Self = serde_json::from_str(text).map_err(GatewayError::Decode)?;
        if let Self::Subscribe {
            coordinates,
            radius,
            ..
        } = &frame
        {
            match (coordinates, radius) {
                (Some(_), None) | (None, Some(_)) => {
                    return Err(invalid("coordinates and radius must be given together"));
                }
                (Some(_), Some(radius)) if !(radius.is_finite() && *radius >= 0.0) => {
                    return Err(invalid(format!("invalid radius {radius}")));
                }
                _ => {}
            }
        }
        Ok(frame)
    }

    /// Applies the frame to a subscription.
    pub fn apply(self, subscription: &mut Subscription) {
        match self {
            Self::Subscribe {
                categories,
                severities,
                coordinates,
                radius,
                require_coordinates,
            } => {
                subscription.add_categories(categories);
                subscription.add_severities(severities);
                if let (Some(center), Some(radius_km)) = (coordinates, radius) {
                    let geo = GeoFilter::new(center, radius_km);
                    subscription.set_geo(Some(if require_coordinates {
                        geo.requiring_coordinates()
                    } else {
                        geo
                    }));
                }
            }
            Self::Unsubscribe {
                categories,
                severities,
            } => {
                subscription.remove_categories(categories);
                subscription.remove_severities(severities);
            }
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> GatewayError {
    GatewayError::Decode(serde::de::Error::custom(msg))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_subscribe() {
        let Ok(frame) = ControlFrame::parse(r#"{"action":"subscribe","categories":["wildfire"]}"#)
        else {
            panic!("frame should parse");
        };
        let mut sub = Subscription::new();
        frame.apply(&mut sub);
        assert_eq!(sub.category_count(), 1);
        assert!(sub.geo().is_none());
    }

    #[test]
    fn subscribe_merges_into_existing_categories() {
        let mut sub = Subscription::new();
        for text in [
            r#"{"action":"subscribe","categories":["wildfire"]}"#,
            r#"{"action":"subscribe","categories":["flood","wildfire"]}"#,
        ] {
            let Ok(frame) = ControlFrame::parse(text) else {
                panic!("frame should parse");
            };
            frame.apply(&mut sub);
        }
        assert_eq!(sub.category_count(), 2);
    }

    #[test]
    fn subscribe_with_location_sets_geo() {
        let text = r#"{"action":"subscribe","coordinates":[10.0,20.0],"radius":5,"require_coordinates":true}"#;
        let Ok(frame) = ControlFrame::parse(text) else {
            panic!("frame should parse");
        };
        let mut sub = Subscription::new();
        frame.apply(&mut sub);
        let Some(geo) = sub.geo() else {
            panic!("geo filter expected");
        };
        assert_eq!(geo.center, Coordinates::new(10.0, 20.0));
        assert!(geo.require_coordinates);
    }

    #[test]
    fn unsubscribe_removes_entries() {
        let mut sub = Subscription::new();
        sub.add_categories(["wildfire", "flood"]);
        sub.add_severities(["critical"]);
        let Ok(frame) = ControlFrame::parse(
            r#"{"action":"unsubscribe","categories":["flood"],"severities":["critical"]}"#,
        ) else {
            panic!("frame should parse");
        };
        frame.apply(&mut sub);
        assert_eq!(sub.category_count(), 1);
        assert_eq!(sub.severity_count(), 0);
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!(ControlFrame::parse(r#"{"action":"publish","categories":[]}"#).is_err());
    }

    #[test]
    fn negative_radius_is_rejected() {
        assert!(
            ControlFrame::parse(r#"{"action":"subscribe","coordinates":[0,0],"radius":-1}"#)
                .is_err()
        );
    }

    #[test]
    fn coordinates_without_radius_are_rejected() {
        let result = ControlFrame::parse(r#"{"action":"subscribe","coordinates":[10.0,20.0]}"#);
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }

    #[test]
    fn radius_without_coordinates_is_rejected() {
        let result = ControlFrame::parse(r#"{"action":"subscribe","radius":5}"#);
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(ControlFrame::parse("{not json").is_err());
    }
}
