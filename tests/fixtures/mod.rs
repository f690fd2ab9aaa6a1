//! Test fixtures for route-wise.
//!
//! Provides:
//! - Real central London addresses with coordinates
//! - Recording mock collaborators (geocoder, optimizer, directions)

#![allow(dead_code)]

pub mod london_locations;
pub mod mocks;

pub use london_locations::*;
pub use mocks::*;
