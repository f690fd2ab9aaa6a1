//! Deterministic route ordering (nearest neighbour + 2-opt).
//!
//! A drop-in [`RouteOptimizer`] that needs no language model. It geocodes the
//! addresses itself, orders them greedily by straight-line distance and then
//! removes crossings. Addresses it cannot geocode keep their relative input
//! order at the end of the route. Strings are never rewritten.

use async_trait::async_trait;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::ProviderError;
use crate::geocode::resolve_all;
use crate::haversine::{HaversineMatrix, haversine_km};
use crate::traits::{GeocodeBias, Geocoder, OptimizeRequest, RawOptimization, RouteOptimizer};

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Maximum 2-opt passes after the greedy construction.
    pub local_search_iterations: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            local_search_iterations: 100,
        }
    }
}

/// An ordering of stop indices and its open-path length in km.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub order: Vec<usize>,
    pub length_km: f64,
}

/// Greedy nearest-neighbour tour followed by 2-opt, over a distance matrix.
///
/// Starts at the stop nearest `origin` when given, otherwise at stop 0. The
/// start stop is never moved by local search.
pub fn solve(locations: &[(f64, f64)], origin: Option<(f64, f64)>, matrix: &[Vec<f64>], options: &SolveOptions) -> Tour {
    let n = locations.len();
    if n == 0 {
        return Tour {
            order: Vec::new(),
            length_km: 0.0,
        };
    }

    let start = origin
        .map(|origin| {
            (0..n)
                .min_by(|&a, &b| haversine_km(origin, locations[a]).total_cmp(&haversine_km(origin, locations[b])))
                .unwrap_or(0)
        })
        .unwrap_or(0);

    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut current = start;
    visited[current] = true;
    order.push(current);

    while order.len() < n {
        let next = (0..n)
            .filter(|&candidate| !visited[candidate])
            .min_by(|&a, &b| matrix[current][a].total_cmp(&matrix[current][b]));
        let Some(next) = next else { break };
        visited[next] = true;
        order.push(next);
        current = next;
    }

    for _ in 0..options.local_search_iterations {
        if !two_opt_improve(&mut order, matrix) {
            break;
        }
    }

    let length_km = path_length(&order, matrix);
    Tour { order, length_km }
}

fn path_length(order: &[usize], matrix: &[Vec<f64>]) -> f64 {
    order.windows(2).map(|pair| matrix[pair[0]][pair[1]]).sum()
}

/// 2-opt: Reverse a segment to shorten the open path.
/// Returns true if an improvement was made.
fn two_opt_improve(order: &mut [usize], matrix: &[Vec<f64>]) -> bool {
    let n = order.len();
    if n < 3 {
        return false;
    }

    let current = path_length(order, matrix);
    for i in 0..n - 1 {
        for j in i + 2..n {
            // Reverse segment [i+1..=j]
            order[i + 1..=j].reverse();
            if path_length(order, matrix) + 1e-9 < current {
                return true;
            }
            order[i + 1..=j].reverse();
        }
    }

    false
}

/// Parses a `"lat,lng"` origin hint.
pub fn parse_origin(text: &str) -> Option<(f64, f64)> {
    let (lat, lng) = text.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some((lat, lng))
}

pub struct NearestNeighborOptimizer<G> {
    geocoder: G,
    matrix: HaversineMatrix,
    options: SolveOptions,
    resolver: ResolverConfig,
}

impl<G: Geocoder> NearestNeighborOptimizer<G> {
    pub fn new(geocoder: G) -> Self {
        Self {
            geocoder,
            matrix: HaversineMatrix::default(),
            options: SolveOptions::default(),
            resolver: ResolverConfig::default(),
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.resolver = resolver;
        self
    }
}

#[async_trait]
impl<G: Geocoder> RouteOptimizer for NearestNeighborOptimizer<G> {
    async fn optimize(&self, request: &OptimizeRequest) -> Result<RawOptimization, ProviderError> {
        let bias = GeocodeBias {
            bounds: self.resolver.bias,
            region: None,
        };
        let (points, unresolved) =
            resolve_all(&self.geocoder, &request.addresses, &bias, self.resolver.max_in_flight).await;
        if points.is_empty() {
            return Err(ProviderError::RequestFailed("no address could be geocoded".to_string()));
        }

        let locations: Vec<(f64, f64)> = points.iter().map(|point| point.location).collect();
        let origin = request.origin_location.as_deref().and_then(parse_origin);
        let distances = self.matrix.distances_km(&locations);
        let tour = solve(&locations, origin, &distances, &self.options);
        debug!(stops = tour.order.len(), length_km = tour.length_km, "nearest-neighbour tour");

        let mut route: Vec<String> = tour.order.iter().map(|&i| points[i].address.clone()).collect();
        route.extend(unresolved.iter().cloned());

        let mut reasoning = format!(
            "Ordered {} stops by always driving to the nearest unvisited stop{}, then reversed \
             segments wherever that shortened the route. Straight-line length is {:.1} km, roughly \
             {} minutes at {} km/h.",
            tour.order.len(),
            if origin.is_some() { ", starting from the stop closest to your location" } else { "" },
            tour.length_km,
            self.matrix.drive_time(tour.length_km).as_secs() / 60,
            self.matrix.speed_kmh,
        );
        if !unresolved.is_empty() {
            reasoning.push_str(&format!(
                " {} address(es) could not be located and were kept at the end.",
                unresolved.len()
            ));
        }

        Ok(RawOptimization {
            optimized_route: Some(route),
            reasoning: Some(reasoning),
        })
    }
}
