//! Per-connection subscription filter.
//!
//! Tracks which categories, severities and area a WebSocket client wants to
//! hear about and decides, per broadcast, whether a notification is
//! delivered to it.

use std::collections::HashSet;

use super::Notification;
use super::geo::haversine_km;
use super::notification::Coordinates;

/// Location constraint: deliver only notifications within `radius_km` of
/// `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFilter {
    /// Center of the area of interest.
    pub center: Coordinates,
    /// Radius around `center`, in kilometres. The boundary is inclusive.
    pub radius_km: f64,
    /// When `true`, notifications without coordinates are rejected. When
    /// `false` the filter is skipped for them.
    pub require_coordinates: bool,
}

impl GeoFilter {
    /// Creates a filter that ignores notifications without coordinates.
    #[must_use]
    pub const fn new(center: Coordinates, radius_km: f64) -> Self {
        Self {
            center,
            radius_km,
            require_coordinates: false,
        }
    }

    /// Returns the same filter, rejecting notifications without coordinates.
    #[must_use]
    pub const fn requiring_coordinates(mut self) -> Self {
        self.require_coordinates = true;
        self
    }

    fn admits(&self, coordinates: Option<Coordinates>) -> bool {
        match coordinates {
            Some(point) => haversine_km(self.center, point) <= self.radius_km,
            None => !self.require_coordinates,
        }
    }
}

/// Subscription state of a single connection.
///
/// An empty subscription receives everything. Each configured dimension
/// (categories, severities, area) must match for a notification to pass;
/// unconfigured dimensions always pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subscription {
    categories: HashSet<String>,
    severities: HashSet<String>,
    geo: Option<GeoFilter>,
}

impl Subscription {
    /// Creates an empty (receive-all) subscription.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges categories into the subscription.
    pub fn add_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
    }

    /// Removes categories from the subscription.
    pub fn remove_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for category in categories {
            self.categories.remove(category.as_ref());
        }
    }

    /// Merges severities into the subscription.
    pub fn add_severities<I, S>(&mut self, severities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.severities.extend(severities.into_iter().map(Into::into));
    }

    /// Removes severities from the subscription.
    pub fn remove_severities<I, S>(&mut self, severities: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for severity in severities {
            self.severities.remove(severity.as_ref());
        }
    }

    /// Replaces the location constraint. `None` clears it.
    pub fn set_geo(&mut self, geo: Option<GeoFilter>) {
        self.geo = geo;
    }

    /// Returns the active location constraint, if any.
    #[must_use]
    pub const fn geo(&self) -> Option<&GeoFilter> {
        self.geo.as_ref()
    }

    /// Returns `true` if no filter is configured (receive-all).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.severities.is_empty() && self.geo.is_none()
    }

    /// Returns the number of subscribed categories.
    #[must_use]
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Returns the number of subscribed severities.
    #[must_use]
    pub fn severity_count(&self) -> usize {
        self.severities.len()
    }

    /// Returns `true` if `notification` should be delivered under this
    /// subscription.
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        if !self.categories.is_empty() && !self.categories.contains(&notification.category) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&notification.severity) {
            return false;
        }
        self.geo
            .as_ref()
            .is_none_or(|geo| geo.admits(notification.coordinates))
    }
}
