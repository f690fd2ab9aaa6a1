//! Ordered, duplicate-free list of user-entered addresses.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::traits::Address;

/// Result of [`AddressStore::add`]. A duplicate is a notice, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Duplicate,
}

/// Addresses in insertion order.
///
/// Every successful mutation bumps [`revision`](Self::revision) so holders of
/// derived state can tell it has gone stale.
#[derive(Debug, Clone, Default)]
pub struct AddressStore {
    addresses: Vec<Address>,
    revision: u64,
}

impl AddressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `address` unless an identical string is already present.
    ///
    /// Matching is exact: case and whitespace differences are distinct
    /// addresses.
    pub fn add(&mut self, address: impl Into<Address>) -> AddOutcome {
        let address = address.into();
        if self.contains(&address) {
            debug!(address = %address, "duplicate address ignored");
            return AddOutcome::Duplicate;
        }
        self.addresses.push(address);
        self.revision += 1;
        AddOutcome::Added
    }

    /// Trims typed input before adding it. Blank input is rejected.
    pub fn add_entry(&mut self, input: &str) -> Result<AddOutcome> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::validation("Please enter an address."));
        }
        Ok(self.add(trimmed))
    }

    pub fn remove(&mut self, index: usize) -> Result<Address> {
        if index >= self.addresses.len() {
            return Err(PipelineError::IndexOutOfRange {
                index,
                len: self.addresses.len(),
            });
        }
        self.revision += 1;
        Ok(self.addresses.remove(index))
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.iter().any(|existing| existing == address)
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
