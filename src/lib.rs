//! route-wise: address-to-route pipeline.
//!
//! Collects addresses, geocodes them, asks a pluggable optimizer for a
//! visiting order, reconciles that order with the geocoded points and fetches
//! a drivable path for the result.

pub mod address;
pub mod config;
pub mod directions;
pub mod error;
pub mod geocode;
pub mod google;
pub mod haversine;
pub mod llm;
pub mod optimize;
pub mod photo;
pub mod pipeline;
pub mod polyline;
pub mod reconcile;
pub mod solver;
pub mod traits;

pub use address::{AddOutcome, AddressStore};
pub use error::{PipelineError, Result};
pub use pipeline::{Completion, Phase, PipelineController, PipelineView};
