//! Orchestration of the address-to-route pipeline.
//!
//! [`PipelineController`] owns all session state: the address list, the
//! current geocoded points, the optimization result and the derived path.
//! Optimization runs as a small state machine (`Idle -> Optimizing -> Idle`)
//! split into start / run / complete so that a caller can observe the busy
//! state and so a result computed for an outdated address list is dropped.

use tracing::{debug, info, warn};

use crate::address::{AddOutcome, AddressStore};
use crate::config::ResolverConfig;
use crate::directions::DirectionsResolver;
use crate::error::{NEED_TWO_ADDRESSES, PipelineError, Result};
use crate::geocode::{GeocodedSet, GeocodingResolver, Published};
use crate::optimize::RouteOptimizationClient;
use crate::photo::{PhotoUpload, recognize_address};
use crate::polyline::Bounds;
use crate::reconcile::{Reconciled, reconcile};
use crate::traits::{
    Address, AddressRecognizer, DirectionsProvider, DrivablePath, GeocodedPoint, Geocoder,
    OptimizationResult, RouteOptimizer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Optimizing,
}

/// Snapshot taken when an optimization starts.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationJob {
    addresses: Vec<Address>,
    origin: Option<String>,
    revision: u64,
}

impl OptimizationJob {
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub async fn run<O: RouteOptimizer>(self, client: &RouteOptimizationClient<O>) -> JobOutcome {
        let result = client.optimize(&self.addresses, self.origin.as_deref()).await;
        JobOutcome {
            revision: self.revision,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    revision: u64,
    result: Result<OptimizationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result was stored and the map layer updated.
    Applied,
    /// The address list changed while the job ran; the result was dropped.
    Discarded,
}

/// Read-only snapshot for the view layer.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineView {
    pub phase: Phase,
    pub addresses: Vec<Address>,
    /// Optimizer order when an optimization is present, else `addresses`.
    pub displayed: Vec<Address>,
    pub points: Vec<GeocodedPoint>,
    pub waypoints: Vec<GeocodedPoint>,
    pub path: Option<DrivablePath>,
    pub reasoning: Option<String>,
    /// Optimization failure or caller misuse.
    pub error: Option<PipelineError>,
    /// Geocoding or directions failure. Never blocks the reasoning text.
    pub map_error: Option<PipelineError>,
    pub is_busy: bool,
    pub can_optimize: bool,
}

impl PipelineView {
    /// Region the map should frame: the path if any, else all points.
    pub fn frame(&self) -> Option<Bounds> {
        self.path
            .as_ref()
            .map(|path| path.bounds)
            .or_else(|| Bounds::from_points(self.points.iter().map(|point| point.location)))
    }
}

pub struct PipelineController<G, O, D> {
    store: AddressStore,
    resolver: GeocodingResolver<G>,
    optimizer: RouteOptimizationClient<O>,
    directions: DirectionsResolver<D>,
    phase: Phase,
    user_location: Option<(f64, f64)>,
    optimization: Option<OptimizationResult>,
    waypoints: Vec<GeocodedPoint>,
    path: Option<DrivablePath>,
    error: Option<PipelineError>,
    map_error: Option<PipelineError>,
}

impl<G, O, D> PipelineController<G, O, D>
where
    G: Geocoder,
    O: RouteOptimizer,
    D: DirectionsProvider,
{
    pub fn new(geocoder: G, optimizer: O, directions: D, config: ResolverConfig) -> Self {
        Self::from_parts(
            GeocodingResolver::new(geocoder, config),
            RouteOptimizationClient::new(optimizer),
            DirectionsResolver::new(directions),
        )
    }

    pub fn from_parts(
        resolver: GeocodingResolver<G>,
        optimizer: RouteOptimizationClient<O>,
        directions: DirectionsResolver<D>,
    ) -> Self {
        Self {
            store: AddressStore::new(),
            resolver,
            optimizer,
            directions,
            phase: Phase::Idle,
            user_location: None,
            optimization: None,
            waypoints: Vec::new(),
            path: None,
            error: None,
            map_error: None,
        }
    }

    pub fn addresses(&self) -> &[Address] {
        self.store.as_slice()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Optimizing
    }

    pub fn can_optimize(&self) -> bool {
        self.phase == Phase::Idle && self.store.len() >= 2
    }

    pub fn optimization(&self) -> Option<&OptimizationResult> {
        self.optimization.as_ref()
    }

    pub fn points(&self) -> &GeocodedSet {
        self.resolver.points()
    }

    pub fn waypoints(&self) -> &[GeocodedPoint] {
        &self.waypoints
    }

    pub fn path(&self) -> Option<&DrivablePath> {
        self.path.as_ref()
    }

    pub fn optimization_client(&self) -> &RouteOptimizationClient<O> {
        &self.optimizer
    }

    fn invalidate_derived(&mut self) {
        self.optimization = None;
        self.waypoints.clear();
        self.path = None;
        self.error = None;
        self.map_error = None;
    }

    /// Adds typed input. A duplicate leaves all state untouched.
    pub fn add_address(&mut self, input: &str) -> Result<AddOutcome> {
        let outcome = self.store.add_entry(input)?;
        if outcome == AddOutcome::Added {
            self.invalidate_derived();
        }
        Ok(outcome)
    }

    pub fn remove_address(&mut self, index: usize) -> Result<Address> {
        let removed = self.store.remove(index)?;
        self.invalidate_derived();
        Ok(removed)
    }

    /// Recognizes an address in `upload` and adds it.
    ///
    /// Returns `Ok(None)` when the photo contained no address.
    pub async fn add_from_photo<R: AddressRecognizer + ?Sized>(
        &mut self,
        recognizer: &R,
        upload: &PhotoUpload,
    ) -> Result<Option<AddOutcome>> {
        match recognize_address(recognizer, upload).await? {
            Some(address) => self.add_address(&address).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_user_location(&mut self, location: Option<(f64, f64)>) {
        self.user_location = location;
    }

    pub fn user_location(&self) -> Option<(f64, f64)> {
        self.user_location
    }

    /// Origin hint passed to the optimizer, as `"lat,lng"`.
    pub fn origin_hint(&self) -> Option<String> {
        self.user_location.map(|(lat, lng)| format!("{},{}", lat, lng))
    }

    /// Reverse-geocodes the user location and uses its country as region
    /// bias for later lookups.
    pub async fn refresh_locale(&mut self) -> Option<String> {
        let location = self.user_location?;
        let country = self.resolver.locate_country(location).await;
        if let Some(code) = &country {
            info!(country = %code, "region bias set from user location");
        }
        self.resolver.set_region(country.clone());
        country
    }

    /// The sequence shown on the map: the optimizer's order restricted to
    /// addresses the user entered, or the raw list when not optimized.
    pub fn displayed_addresses(&self) -> Vec<Address> {
        match &self.optimization {
            Some(result) => result
                .ordered_addresses
                .iter()
                .filter(|address| self.store.contains(address))
                .cloned()
                .collect(),
            None => self.store.as_slice().to_vec(),
        }
    }

    /// Geocodes the displayed sequence if it changed since the last call.
    pub async fn refresh_points(&mut self) -> Result<Published> {
        let displayed = self.displayed_addresses();
        match self.resolver.refresh(&displayed).await {
            Ok(published) => {
                if published == Published::Applied
                    && matches!(self.map_error, Some(PipelineError::NoAddressGeocoded))
                {
                    self.map_error = None;
                }
                Ok(published)
            }
            Err(err) => {
                self.map_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Enters `Optimizing` and snapshots the inputs.
    ///
    /// Rejected with [`PipelineError::Busy`] while a job is in flight and
    /// with a validation error when fewer than two addresses exist; neither
    /// rejection touches the network.
    pub fn start_optimization(&mut self) -> Result<OptimizationJob> {
        if self.phase == Phase::Optimizing {
            return Err(PipelineError::Busy);
        }
        if self.store.len() < 2 {
            let err = PipelineError::validation(NEED_TWO_ADDRESSES);
            self.error = Some(err.clone());
            return Err(err);
        }

        self.invalidate_derived();
        self.phase = Phase::Optimizing;
        debug!(revision = self.store.revision(), "optimization started");

        Ok(OptimizationJob {
            addresses: self.store.as_slice().to_vec(),
            origin: self.origin_hint(),
            revision: self.store.revision(),
        })
    }

    /// Leaves `Optimizing`. On success the result is stored and the map layer
    /// (geocode, reconcile, directions) is brought up to date; map-layer
    /// failures land in `map_error` and are not returned.
    pub async fn complete_optimization(&mut self, outcome: JobOutcome) -> Result<Completion> {
        self.phase = Phase::Idle;

        let result = match outcome.result {
            Ok(result) => result,
            Err(err) => {
                self.error = Some(err.clone());
                return Err(err);
            }
        };

        if outcome.revision != self.store.revision() {
            info!("address list changed during optimization, discarding result");
            return Ok(Completion::Discarded);
        }

        self.optimization = Some(result);
        self.update_route().await;
        Ok(Completion::Applied)
    }

    /// Runs a full optimization: start, call the optimizer, complete.
    pub async fn optimize(&mut self) -> Result<Completion> {
        let job = self.start_optimization()?;
        let outcome = job.run(&self.optimizer).await;
        self.complete_optimization(outcome).await
    }

    async fn update_route(&mut self) {
        self.waypoints.clear();
        self.path = None;
        self.map_error = None;

        if self.refresh_points().await.is_err() {
            return;
        }
        let Some(result) = &self.optimization else {
            return;
        };

        match reconcile(&result.ordered_addresses, self.resolver.points()) {
            Reconciled::Insufficient(points) => {
                info!(matched = points.len(), "too few waypoints for directions");
                self.waypoints = points;
            }
            Reconciled::Waypoints(points) => {
                match self.directions.resolve(&points).await {
                    Ok(path) => self.path = Some(path),
                    Err(err) => {
                        warn!(error = %err, "no drivable path");
                        self.map_error = Some(err);
                    }
                }
                self.waypoints = points;
            }
        }
    }

    pub fn view(&self) -> PipelineView {
        PipelineView {
            phase: self.phase,
            addresses: self.store.as_slice().to_vec(),
            displayed: self.displayed_addresses(),
            points: self.resolver.points().points().to_vec(),
            waypoints: self.waypoints.clone(),
            path: self.path.clone(),
            reasoning: self.optimization.as_ref().map(|result| result.reasoning.clone()),
            error: self.error.clone(),
            map_error: self.map_error.clone(),
            is_busy: self.is_busy(),
            can_optimize: self.can_optimize(),
        }
    }
}
