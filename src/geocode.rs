//! Concurrent, best-effort geocoding of an address sequence.
//!
//! Each refresh is a batch tagged with a generation number. A batch is
//! dispatched from a snapshot of the addresses and carries no borrow of the
//! resolver, so a newer batch can be started while an older one is still in
//! flight. Only the batch matching the current generation may publish.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{GeocodeError, PipelineError, Result};
use crate::polyline::Bounds;
use crate::traits::{Address, GeocodeBias, Geocoded, GeocodedPoint, Geocoder};

/// Geocoded points in address-sequence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodedSet {
    points: Vec<GeocodedPoint>,
}

impl GeocodedSet {
    pub fn new(points: Vec<GeocodedPoint>) -> Self {
        Self { points }
    }

    /// Exact-string lookup.
    pub fn get(&self, address: &str) -> Option<&GeocodedPoint> {
        self.points.iter().find(|point| point.address == address)
    }

    pub fn points(&self) -> &[GeocodedPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.points.iter().map(|point| point.location))
    }
}

async fn lookup<G: Geocoder + ?Sized>(
    geocoder: &G,
    index: usize,
    address: &str,
    bias: &GeocodeBias,
) -> (usize, Result<Geocoded, GeocodeError>) {
    (index, geocoder.geocode(address, bias).await)
}

/// Geocodes every address with at most `max_in_flight` requests outstanding.
///
/// Returns the resolved points in input order and the addresses that failed.
pub async fn resolve_all<G: Geocoder + ?Sized>(
    geocoder: &G,
    addresses: &[Address],
    bias: &GeocodeBias,
    max_in_flight: usize,
) -> (Vec<GeocodedPoint>, Vec<Address>) {
    let lookups: Vec<_> = addresses
        .iter()
        .enumerate()
        .map(|(index, address)| lookup(geocoder, index, address, bias))
        .collect();

    let mut results: Vec<_> = stream::iter(lookups)
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;
    results.sort_by_key(|(index, _)| *index);

    let mut points = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (index, result) in results {
        let address = &addresses[index];
        match result {
            Ok(geocoded) => points.push(GeocodedPoint {
                address: address.clone(),
                location: geocoded.location,
            }),
            Err(err) => {
                warn!(address = %address, error = %err, "geocoding failed");
                failed.push(address.clone());
            }
        }
    }

    (points, failed)
}

/// A dispatched geocode batch.
pub struct GeocodeBatch<G> {
    generation: u64,
    addresses: Vec<Address>,
    geocoder: Arc<G>,
    bias: GeocodeBias,
    max_in_flight: usize,
}

impl<G: Geocoder> GeocodeBatch<G> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub async fn run(self) -> BatchOutcome {
        let (points, failed) =
            resolve_all(&*self.geocoder, &self.addresses, &self.bias, self.max_in_flight).await;
        BatchOutcome {
            generation: self.generation,
            requested: self.addresses.len(),
            points,
            failed,
        }
    }
}

/// Completed batch, not yet published.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub generation: u64,
    pub requested: usize,
    pub points: Vec<GeocodedPoint>,
    pub failed: Vec<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// The outcome replaced the current point set.
    Applied,
    /// A newer batch has been started; the outcome was dropped.
    Stale,
    /// The address sequence has not changed since the last batch.
    Unchanged,
}

/// Owns the current point set and the generation counter.
pub struct GeocodingResolver<G> {
    geocoder: Arc<G>,
    config: ResolverConfig,
    region: Option<String>,
    generation: u64,
    requested: Option<Vec<Address>>,
    /// The last published batch resolved nothing.
    exhausted: bool,
    points: GeocodedSet,
}

impl<G: Geocoder> GeocodingResolver<G> {
    pub fn new(geocoder: G, config: ResolverConfig) -> Self {
        Self::with_shared(Arc::new(geocoder), config)
    }

    pub fn with_shared(geocoder: Arc<G>, config: ResolverConfig) -> Self {
        Self {
            geocoder,
            config,
            region: None,
            generation: 0,
            requested: None,
            exhausted: false,
            points: GeocodedSet::default(),
        }
    }

    pub fn geocoder(&self) -> &Arc<G> {
        &self.geocoder
    }

    pub fn points(&self) -> &GeocodedSet {
        &self.points
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Changes the region bias. The next refresh re-geocodes everything.
    pub fn set_region(&mut self, region: Option<String>) {
        if self.region != region {
            self.region = region;
            self.requested = None;
        }
    }

    fn bias(&self) -> GeocodeBias {
        GeocodeBias {
            bounds: self.config.bias,
            region: self.region.clone(),
        }
    }

    /// Starts a batch for `addresses` unless they equal the last requested
    /// sequence. A sequence whose last batch resolved nothing is always
    /// retried. Starting a batch supersedes any batch still in flight.
    pub fn begin(&mut self, addresses: &[Address]) -> Option<GeocodeBatch<G>> {
        if !self.exhausted && self.requested.as_deref() == Some(addresses) {
            return None;
        }
        self.generation += 1;
        self.requested = Some(addresses.to_vec());
        debug!(generation = self.generation, count = addresses.len(), "geocode batch started");

        Some(GeocodeBatch {
            generation: self.generation,
            addresses: addresses.to_vec(),
            geocoder: Arc::clone(&self.geocoder),
            bias: self.bias(),
            max_in_flight: self.config.max_in_flight,
        })
    }

    /// Publishes a finished batch if it is still current.
    ///
    /// Fails with [`PipelineError::NoAddressGeocoded`] when a non-empty batch
    /// resolved nothing; the point set is cleared in that case.
    pub fn publish(&mut self, outcome: BatchOutcome) -> Result<Published> {
        if outcome.generation != self.generation {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                "discarding stale geocode batch"
            );
            return Ok(Published::Stale);
        }

        let all_failed = outcome.requested > 0 && outcome.points.is_empty();
        self.exhausted = all_failed;
        self.points = GeocodedSet::new(outcome.points);
        if all_failed {
            warn!(requested = outcome.requested, "no address could be geocoded");
            return Err(PipelineError::NoAddressGeocoded);
        }
        if !outcome.failed.is_empty() {
            info!(
                resolved = self.points.len(),
                failed = outcome.failed.len(),
                "partial geocode"
            );
        }
        Ok(Published::Applied)
    }

    /// Begins, runs and publishes a batch in one step.
    pub async fn refresh(&mut self, addresses: &[Address]) -> Result<Published> {
        match self.begin(addresses) {
            Some(batch) => {
                let outcome = batch.run().await;
                self.publish(outcome)
            }
            None => Ok(Published::Unchanged),
        }
    }

    /// Forgets the last requested sequence so the next refresh re-runs.
    pub fn invalidate(&mut self) {
        self.requested = None;
    }

    /// Reverse-geocodes `location` to a country code. Failures are logged.
    pub async fn locate_country(&self, location: (f64, f64)) -> Option<String> {
        match self.geocoder.reverse_country(location).await {
            Ok(country) => country,
            Err(err) => {
                warn!(error = %err, "reverse geocoding failed");
                None
            }
        }
    }
}
