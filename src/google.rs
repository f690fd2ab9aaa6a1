//! Google Maps web-service adapters for geocoding and directions.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{DirectionsConfig, GeocoderConfig, resolve_api_key};
use crate::error::{DirectionsError, GeocodeError, ProviderError};
use crate::polyline::{Bounds, Polyline};
use crate::traits::{
    AddressComponent, DirectionsProvider, DirectionsRequest, DrivablePath, GeocodeBias, Geocoded,
    Geocoder, Leg,
};

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, ProviderError> {
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|err| ProviderError::InvalidResponse(format!("failed to parse response: {err}")))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    config: GeocoderConfig,
    client: reqwest::Client,
}

impl GoogleGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    async fn lookup(&self, mut query: Vec<(&str, String)>) -> Result<GeocodeResponse, GeocodeError> {
        let key = resolve_api_key(self.config.api_key.as_deref(), &self.config.api_key_env)?;
        query.push(("key", key));
        let url = endpoint(&self.config.base_url, "geocode/json");
        let body: GeocodeResponse = get_json(&self.client, &url, &query).await?;
        match body.status.as_str() {
            "OK" => Ok(body),
            "ZERO_RESULTS" => Err(GeocodeError::NotFound),
            other => {
                warn!(
                    status = other,
                    message = body.error_message.as_deref().unwrap_or(""),
                    "geocoder rejected request"
                );
                Err(GeocodeError::Status(other.to_string()))
            }
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str, bias: &GeocodeBias) -> Result<Geocoded, GeocodeError> {
        let mut query = vec![("address", address.to_string())];
        if let Some(bounds) = bias.bounds {
            query.push((
                "bounds",
                format!(
                    "{:.6},{:.6}|{:.6},{:.6}",
                    bounds.south, bounds.west, bounds.north, bounds.east
                ),
            ));
        }
        if let Some(region) = bias.region.as_ref().or(self.config.region.as_ref()) {
            query.push(("region", region.to_lowercase()));
        }

        let body = self.lookup(query).await?;
        let result = body.results.into_iter().next().ok_or(GeocodeError::NotFound)?;
        debug!(address, lat = result.geometry.location.lat, lng = result.geometry.location.lng, "geocoded");
        Ok(result.into())
    }

    async fn reverse_country(&self, (lat, lng): (f64, f64)) -> Result<Option<String>, GeocodeError> {
        let query = vec![("latlng", format!("{:.6},{:.6}", lat, lng))];
        let body = match self.lookup(query).await {
            Ok(body) => body,
            Err(GeocodeError::NotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(body
            .results
            .into_iter()
            .next()
            .map(Geocoded::from)
            .and_then(|geocoded| geocoded.country_code().map(str::to_string)))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: Option<String>,
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for (f64, f64) {
    fn from(value: LatLng) -> Self {
        (value.lat, value.lng)
    }
}

impl From<GeocodeResult> for Geocoded {
    fn from(result: GeocodeResult) -> Self {
        Geocoded {
            location: result.geometry.location.into(),
            formatted_address: result.formatted_address,
            components: result.address_components,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoogleDirections {
    config: DirectionsConfig,
    client: reqwest::Client,
}

impl GoogleDirections {
    pub fn new(config: DirectionsConfig) -> Result<Self, ProviderError> {
        let client = http_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl DirectionsProvider for GoogleDirections {
    async fn route(&self, request: &DirectionsRequest) -> Result<DrivablePath, DirectionsError> {
        let key = resolve_api_key(self.config.api_key.as_deref(), &self.config.api_key_env)?;
        let mut query = vec![
            ("origin", request.origin.clone()),
            ("destination", request.destination.clone()),
            ("mode", request.mode.as_str().to_string()),
        ];
        if !request.waypoints.is_empty() {
            query.push(("waypoints", request.waypoints.join("|")));
        }
        query.push(("key", key));

        let url = endpoint(&self.config.base_url, "directions/json");
        let body: DirectionsResponse = get_json(&self.client, &url, &query).await?;
        if body.status != "OK" {
            warn!(
                status = %body.status,
                message = body.error_message.as_deref().unwrap_or(""),
                "directions rejected request"
            );
            return Err(DirectionsError::Status(body.status));
        }

        let route = body.routes.into_iter().next().ok_or(DirectionsError::NoRoute)?;
        let polyline = Polyline::decode(&route.overview_polyline.points).ok_or_else(|| {
            ProviderError::InvalidResponse("malformed overview polyline".to_string())
        })?;
        let bounds = route
            .bounds
            .map(|b| Bounds::new(b.southwest.into(), b.northeast.into()))
            .or_else(|| polyline.bounds())
            .ok_or(DirectionsError::NoRoute)?;
        let legs = route
            .legs
            .into_iter()
            .map(|leg| Leg {
                start_address: leg.start_address,
                end_address: leg.end_address,
                distance_meters: leg.distance.map(|d| d.value).unwrap_or(0),
                duration_secs: leg.duration.map(|d| d.value).unwrap_or(0),
            })
            .collect();

        Ok(DrivablePath {
            polyline,
            bounds,
            legs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<RouteBody>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    bounds: Option<RouteBounds>,
    #[serde(default)]
    legs: Vec<LegBody>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct RouteBounds {
    northeast: LatLng,
    southwest: LatLng,
}

#[derive(Debug, Deserialize)]
struct LegBody {
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
    #[serde(default)]
    distance: Option<Measure>,
    #[serde(default)]
    duration: Option<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: u64,
}
