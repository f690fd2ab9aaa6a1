//! Validating wrapper around a [`RouteOptimizer`].
//!
//! The optimizer is untrusted. Its reply is schema-checked here and every
//! failure is collapsed into a user-facing [`PipelineError::Upstream`]; the
//! raw cause is only logged.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::{NEED_TWO_ADDRESSES, OPTIMIZE_FAILED, PipelineError, Result};
use crate::traits::{Address, OptimizationResult, OptimizeRequest, RawOptimization, RouteOptimizer};

pub struct RouteOptimizationClient<O> {
    optimizer: O,
}

impl<O: RouteOptimizer> RouteOptimizationClient<O> {
    pub fn new(optimizer: O) -> Self {
        Self { optimizer }
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// Requests an ordering for `addresses`. Rejects fewer than two addresses
    /// before any call is made. Never retries.
    pub async fn optimize(&self, addresses: &[Address], origin: Option<&str>) -> Result<OptimizationResult> {
        if addresses.len() < 2 {
            return Err(PipelineError::validation(NEED_TWO_ADDRESSES));
        }

        let request = OptimizeRequest {
            addresses: addresses.to_vec(),
            origin_location: origin.map(str::to_string),
        };
        debug!(count = addresses.len(), has_origin = origin.is_some(), "requesting route optimization");

        let raw = self.optimizer.optimize(&request).await.map_err(|err| {
            warn!(error = %err, "route optimizer failed");
            PipelineError::upstream(OPTIMIZE_FAILED)
        })?;

        let result = validate(raw, addresses)?;
        info!(stops = result.ordered_addresses.len(), "route optimized");
        Ok(result)
    }
}

/// Schema-checks an optimizer reply against the addresses it was given.
///
/// Both fields must be present and the route non-empty. Exact repeats are
/// collapsed; a route still longer than the input is rejected. Entries that
/// drifted from the input strings are kept for the reconciler to drop.
pub fn validate(raw: RawOptimization, input: &[Address]) -> Result<OptimizationResult> {
    let (Some(route), Some(reasoning)) = (raw.optimized_route, raw.reasoning) else {
        warn!("optimizer reply is missing a required field");
        return Err(PipelineError::upstream(OPTIMIZE_FAILED));
    };
    if route.is_empty() {
        warn!("optimizer returned an empty route");
        return Err(PipelineError::upstream(OPTIMIZE_FAILED));
    }

    let mut seen = HashSet::new();
    let ordered: Vec<Address> = route
        .into_iter()
        .filter(|address| seen.insert(address.clone()))
        .collect();

    if ordered.len() > input.len() {
        warn!(
            returned = ordered.len(),
            supplied = input.len(),
            "optimizer returned more addresses than supplied"
        );
        return Err(PipelineError::upstream(OPTIMIZE_FAILED));
    }

    let drifted = ordered.iter().filter(|address| !input.contains(address)).count();
    if drifted > 0 {
        warn!(drifted, "optimizer altered address strings");
    }

    Ok(OptimizationResult {
        ordered_addresses: ordered,
        reasoning,
    })
}
