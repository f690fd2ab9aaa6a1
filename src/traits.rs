//! Collaborator seams and the data passed across them.
//!
//! Every external service (geocoder, optimizer, directions, photo
//! recognition) sits behind one of these traits so the pipeline can be
//! exercised with in-process fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DirectionsError, GeocodeError, ProviderError};
use crate::polyline::{Bounds, Polyline};

/// A user-authored address string. Identity is exact string equality.
pub type Address = String;

/// An address resolved to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPoint {
    pub address: Address,
    /// (lat, lng)
    pub location: (f64, f64),
}

/// One structured component of a geocoder result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    pub types: Vec<String>,
}

/// Best geocoder match for a single lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Geocoded {
    pub location: (f64, f64),
    pub formatted_address: Option<String>,
    pub components: Vec<AddressComponent>,
}

impl Geocoded {
    pub fn at(location: (f64, f64)) -> Self {
        Self {
            location,
            formatted_address: None,
            components: Vec::new(),
        }
    }

    /// Short name of the first component tagged `country`.
    pub fn country_code(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|component| component.types.iter().any(|t| t == "country"))
            .map(|component| component.short_name.as_str())
    }
}

/// Optional hints biasing a geocode lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeBias {
    /// Viewport the results should prefer.
    pub bounds: Option<Bounds>,
    /// ccTLD-style region code, e.g. "gb".
    pub region: Option<String>,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve a free-text address to its best match.
    async fn geocode(&self, address: &str, bias: &GeocodeBias) -> Result<Geocoded, GeocodeError>;

    /// Resolve a coordinate to the country code containing it.
    async fn reverse_country(&self, location: (f64, f64)) -> Result<Option<String>, GeocodeError>;
}

/// Input to the external route optimizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub addresses: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_location: Option<String>,
}

/// Optimizer reply before schema validation. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptimization {
    #[serde(default)]
    pub optimized_route: Option<Vec<String>>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A validated optimizer reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub ordered_addresses: Vec<Address>,
    pub reasoning: String,
}

#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<RawOptimization, ProviderError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Driving,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
        }
    }
}

/// A directions query. Waypoints are visited in the given order.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    pub origin: Address,
    pub destination: Address,
    pub waypoints: Vec<Address>,
    pub mode: TravelMode,
}

/// One origin-to-stop segment of a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub start_address: String,
    pub end_address: String,
    pub distance_meters: u64,
    pub duration_secs: u64,
}

/// A drivable path through an ordered waypoint sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivablePath {
    pub polyline: Polyline,
    pub bounds: Bounds,
    pub legs: Vec<Leg>,
}

impl DrivablePath {
    pub fn total_distance_meters(&self) -> u64 {
        self.legs.iter().map(|leg| leg.distance_meters).sum()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.legs.iter().map(|leg| leg.duration_secs).sum()
    }
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn route(&self, request: &DirectionsRequest) -> Result<DrivablePath, DirectionsError>;
}

/// Photo recognition reply before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecognition {
    #[serde(default)]
    pub address: Option<String>,
}

#[async_trait]
pub trait AddressRecognizer: Send + Sync {
    /// `data_uri` is `data:<mime>;base64,<payload>`.
    async fn recognize(&self, data_uri: &str) -> Result<RawRecognition, ProviderError>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn geocode(&self, address: &str, bias: &GeocodeBias) -> Result<Geocoded, GeocodeError> {
        (**self).geocode(address, bias).await
    }

    async fn reverse_country(&self, location: (f64, f64)) -> Result<Option<String>, GeocodeError> {
        (**self).reverse_country(location).await
    }
}

#[async_trait]
impl<T: RouteOptimizer + ?Sized> RouteOptimizer for Arc<T> {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<RawOptimization, ProviderError> {
        (**self).optimize(request).await
    }
}

#[async_trait]
impl<T: DirectionsProvider + ?Sized> DirectionsProvider for Arc<T> {
    async fn route(&self, request: &DirectionsRequest) -> Result<DrivablePath, DirectionsError> {
        (**self).route(request).await
    }
}

#[async_trait]
impl<T: AddressRecognizer + ?Sized> AddressRecognizer for Arc<T> {
    async fn recognize(&self, data_uri: &str) -> Result<RawRecognition, ProviderError> {
        (**self).recognize(data_uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_optimization_tolerates_missing_fields() {
        let raw: RawOptimization = serde_json::from_str(r#"{"reasoning":"short"}"#).unwrap();
        assert!(raw.optimized_route.is_none());
        assert_eq!(raw.reasoning.as_deref(), Some("short"));
    }

    #[test]
    fn optimize_request_uses_camel_case() {
        let request = OptimizeRequest {
            addresses: vec!["a".into(), "b".into()],
            origin_location: Some("51.5,-0.12".into()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["originLocation"], "51.5,-0.12");
        assert_eq!(json["addresses"][1], "b");
    }

    #[test]
    fn country_code_from_components() {
        let geocoded = Geocoded {
            location: (51.5, -0.12),
            formatted_address: None,
            components: vec![
                AddressComponent {
                    long_name: "London".into(),
                    short_name: "London".into(),
                    types: vec!["locality".into()],
                },
                AddressComponent {
                    long_name: "United Kingdom".into(),
                    short_name: "GB".into(),
                    types: vec!["country".into(), "political".into()],
                },
            ],
        };
        assert_eq!(geocoded.country_code(), Some("GB"));
        assert_eq!(Geocoded::at((0.0, 0.0)).country_code(), None);
    }

    #[test]
    fn path_totals_sum_legs() {
        let path = DrivablePath {
            polyline: Polyline::default(),
            bounds: Bounds::new((0.0, 0.0), (1.0, 1.0)),
            legs: vec![
                Leg {
                    start_address: "a".into(),
                    end_address: "b".into(),
                    distance_meters: 1200,
                    duration_secs: 300,
                },
                Leg {
                    start_address: "b".into(),
                    end_address: "c".into(),
                    distance_meters: 800,
                    duration_secs: 240,
                },
            ],
        };
        assert_eq!(path.total_distance_meters(), 2000);
        assert_eq!(path.total_duration_secs(), 540);
    }
}
