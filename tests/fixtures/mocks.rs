//! In-process collaborators that record every call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Barrier, Notify};

use route_wise::error::{DirectionsError, GeocodeError, ProviderError};
use route_wise::polyline::{Bounds, Polyline};
use route_wise::traits::{
    DirectionsProvider, DirectionsRequest, DrivablePath, GeocodeBias, Geocoded, Geocoder, Leg,
    OptimizeRequest, RawOptimization, RouteOptimizer,
};

use super::london_locations::Location;

#[derive(Default)]
pub struct MockGeocoder {
    table: HashMap<String, (f64, f64)>,
    rejected: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    barrier: Option<Arc<Barrier>>,
    country: Option<String>,
    calls: Mutex<Vec<String>>,
    biases: Mutex<Vec<GeocodeBias>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &Location) -> Self {
        self.table.insert(location.address.to_string(), location.coords());
        self
    }

    pub fn with_all(mut self, locations: &[Location]) -> Self {
        for location in locations {
            self = self.with(location);
        }
        self
    }

    /// Lookups for `address` answer with a provider status error.
    pub fn rejecting(mut self, address: &str) -> Self {
        self.rejected.insert(address.to_string());
        self
    }

    /// Lookups for `address` block until the returned handle is notified.
    pub fn gated(&mut self, address: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.insert(address.to_string(), Arc::clone(&notify));
        notify
    }

    /// Every lookup waits until `n` lookups are in flight at once.
    pub fn with_barrier(mut self, n: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(n)));
        self
    }

    pub fn with_country(mut self, code: &str) -> Self {
        self.country = Some(code.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn biases(&self) -> Vec<GeocodeBias> {
        self.biases.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str, bias: &GeocodeBias) -> Result<Geocoded, GeocodeError> {
        self.calls.lock().unwrap().push(address.to_string());
        self.biases.lock().unwrap().push(bias.clone());
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(gate) = self.gates.get(address) {
            gate.notified().await;
        }
        if self.rejected.contains(address) {
            return Err(GeocodeError::Status("OVER_QUERY_LIMIT".into()));
        }
        self.table
            .get(address)
            .map(|location| Geocoded::at(*location))
            .ok_or(GeocodeError::NotFound)
    }

    async fn reverse_country(&self, _location: (f64, f64)) -> Result<Option<String>, GeocodeError> {
        Ok(self.country.clone())
    }
}

enum Reply {
    Raw(RawOptimization),
    Fail,
}

pub struct MockOptimizer {
    reply: Reply,
    requests: Mutex<Vec<OptimizeRequest>>,
}

impl MockOptimizer {
    pub fn replying(route: &[&str], reasoning: &str) -> Self {
        Self::raw(RawOptimization {
            optimized_route: Some(route.iter().map(|s| s.to_string()).collect()),
            reasoning: Some(reasoning.to_string()),
        })
    }

    pub fn raw(raw: RawOptimization) -> Self {
        Self {
            reply: Reply::Raw(raw),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Reply::Fail,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<OptimizeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouteOptimizer for MockOptimizer {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<RawOptimization, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Raw(raw) => Ok(raw.clone()),
            Reply::Fail => Err(ProviderError::Status {
                status: 500,
                body: "internal error".into(),
            }),
        }
    }
}

pub struct MockDirections {
    status: Option<String>,
    requests: Mutex<Vec<DirectionsRequest>>,
}

impl MockDirections {
    pub fn ok() -> Self {
        Self {
            status: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: &str) -> Self {
        Self {
            status: Some(status.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DirectionsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectionsProvider for MockDirections {
    async fn route(&self, request: &DirectionsRequest) -> Result<DrivablePath, DirectionsError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(status) = &self.status {
            return Err(DirectionsError::Status(status.clone()));
        }

        let mut stops = vec![request.origin.clone()];
        stops.extend(request.waypoints.iter().cloned());
        stops.push(request.destination.clone());
        let legs = stops
            .windows(2)
            .map(|pair| Leg {
                start_address: pair[0].clone(),
                end_address: pair[1].clone(),
                distance_meters: 1000,
                duration_secs: 120,
            })
            .collect();

        Ok(DrivablePath {
            polyline: Polyline::new(vec![(51.50, -0.16), (51.52, -0.12)]),
            bounds: Bounds::new((51.50, -0.16), (51.52, -0.12)),
            legs,
        })
    }
}
