//! Drivable path through a reconciled waypoint sequence.

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::reconcile::MIN_WAYPOINTS;
use crate::traits::{DirectionsProvider, DirectionsRequest, DrivablePath, GeocodedPoint, TravelMode};

pub struct DirectionsResolver<D> {
    provider: D,
}

/// Builds the provider request: first point is the origin, last the
/// destination, the rest fixed-order via points. Points are referenced by
/// address string so the provider resolves them by name.
pub fn build_request(waypoints: &[GeocodedPoint]) -> Option<DirectionsRequest> {
    if waypoints.len() < MIN_WAYPOINTS {
        return None;
    }
    let (first, rest) = waypoints.split_first()?;
    let (last, middle) = rest.split_last()?;
    Some(DirectionsRequest {
        origin: first.address.clone(),
        destination: last.address.clone(),
        waypoints: middle.iter().map(|point| point.address.clone()).collect(),
        mode: TravelMode::Driving,
    })
}

impl<D: DirectionsProvider> DirectionsResolver<D> {
    pub fn new(provider: D) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &D {
        &self.provider
    }

    /// Requests a path. Any provider failure, or fewer than two waypoints,
    /// is reported as [`PipelineError::DirectionsUnavailable`]. Never retries.
    pub async fn resolve(&self, waypoints: &[GeocodedPoint]) -> Result<DrivablePath> {
        let Some(request) = build_request(waypoints) else {
            return Err(PipelineError::DirectionsUnavailable);
        };
        debug!(
            origin = %request.origin,
            destination = %request.destination,
            via = request.waypoints.len(),
            "requesting directions"
        );

        self.provider.route(&request).await.map_err(|err| {
            warn!(error = %err, "directions request failed");
            PipelineError::DirectionsUnavailable
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(address: &str) -> GeocodedPoint {
        GeocodedPoint {
            address: address.to_string(),
            location: (0.0, 0.0),
        }
    }

    #[test]
    fn request_splits_origin_via_destination() {
        let request = build_request(&[point("a"), point("b"), point("c"), point("d")]).unwrap();
        assert_eq!(request.origin, "a");
        assert_eq!(request.destination, "d");
        assert_eq!(request.waypoints, vec!["b", "c"]);
        assert_eq!(request.mode, TravelMode::Driving);
    }

    #[test]
    fn two_points_have_no_via() {
        let request = build_request(&[point("a"), point("b")]).unwrap();
        assert!(request.waypoints.is_empty());
    }

    #[test]
    fn fewer_than_two_points_build_nothing() {
        assert!(build_request(&[point("a")]).is_none());
        assert!(build_request(&[]).is_none());
    }
}
