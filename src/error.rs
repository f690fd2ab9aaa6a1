//! Error types for the address-to-route pipeline.
//!
//! Collaborator failures ([`ProviderError`], [`GeocodeError`],
//! [`DirectionsError`]) are translated into [`PipelineError`] at the component
//! that invoked them. Only `PipelineError` messages reach the view layer.

use thiserror::Error;

/// User-facing message for a failed optimization call.
pub const OPTIMIZE_FAILED: &str = "Failed to optimize route. Please try again.";

/// User-facing message for a failed photo recognition call.
pub const RECOGNIZE_FAILED: &str = "Failed to recognize address from photo. Please try again.";

/// User-facing message when fewer than two addresses are available.
pub const NEED_TWO_ADDRESSES: &str = "At least two addresses are required to optimize a route.";

/// User-facing message when the directions service cannot route.
pub const DIRECTIONS_FAILED: &str = "Could not calculate directions for the optimized route.";

/// Transport-level failure talking to any HTTP collaborator.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Missing API key or endpoint.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to resolve a single address.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("no result for address")]
    NotFound,

    /// Provider answered with a non-OK status code.
    #[error("geocoder status {0}")]
    Status(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failure to compute a drivable path.
#[derive(Error, Debug)]
pub enum DirectionsError {
    #[error("directions status {0}")]
    Status(String),

    #[error("no route returned")]
    NoRoute,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// The pipeline's error taxonomy as seen by the controller and view layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Caller misuse, rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// Optimization or recognition service failed or returned malformed output.
    #[error("{0}")]
    Upstream(String),

    /// Every geocode lookup in a batch failed.
    #[error("Could not geocode any address.")]
    NoAddressGeocoded,

    #[error("{}", DIRECTIONS_FAILED)]
    DirectionsUnavailable,

    #[error("index {index} out of range for {len} addresses")]
    IndexOutOfRange { index: usize, len: usize },

    /// An optimization is already in flight.
    #[error("an optimization is already in progress")]
    Busy,
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PipelineError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        PipelineError::Upstream(msg.into())
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
