//! Matches optimizer output back onto geocoded points.
//!
//! The optimizer returns address strings, not identifiers. Matching is exact:
//! entries that differ in any byte from a geocoded key are dropped, never
//! fuzzy-matched.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::geocode::GeocodedSet;
use crate::traits::{Address, GeocodedPoint};

/// Minimum number of waypoints the directions service accepts.
pub const MIN_WAYPOINTS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// At least two matched points, in optimizer order.
    Waypoints(Vec<GeocodedPoint>),
    /// Too few matches to route. The matched points are still reported.
    Insufficient(Vec<GeocodedPoint>),
}

impl Reconciled {
    pub fn points(&self) -> &[GeocodedPoint] {
        match self {
            Reconciled::Waypoints(points) | Reconciled::Insufficient(points) => points,
        }
    }

    pub fn into_points(self) -> Vec<GeocodedPoint> {
        match self {
            Reconciled::Waypoints(points) | Reconciled::Insufficient(points) => points,
        }
    }

    pub fn is_routable(&self) -> bool {
        matches!(self, Reconciled::Waypoints(_))
    }
}

/// Orders geocoded points by `ordered`, dropping anything without an exact
/// match. A repeated optimizer entry only contributes its first occurrence.
pub fn reconcile(ordered: &[Address], points: &GeocodedSet) -> Reconciled {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut matched = Vec::with_capacity(ordered.len());

    for address in ordered {
        if !seen.insert(address.as_str()) {
            warn!(address = %address, "optimizer repeated an address");
            continue;
        }
        match points.get(address) {
            Some(point) => matched.push(point.clone()),
            None => warn!(address = %address, "optimizer address has no geocoded match"),
        }
    }

    debug!(requested = ordered.len(), matched = matched.len(), "reconciled optimizer order");

    if matched.len() < MIN_WAYPOINTS {
        Reconciled::Insufficient(matched)
    } else {
        Reconciled::Waypoints(matched)
    }
}
