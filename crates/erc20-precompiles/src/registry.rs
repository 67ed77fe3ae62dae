//! Active extension set.

use alloy_primitives::Address;

use crate::error::ExtensionError;

/// Sorted, duplicate-free list of enabled extension addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveExtensions {
    addresses: Vec<Address>,
}

impl ActiveExtensions {
    /// Builds the set from an unordered list, dropping duplicates.
    pub fn new(addresses: Vec<Address>) -> Self {
        let mut addresses = addresses;
        addresses.sort_unstable();
        addresses.dedup();
        Self { addresses }
    }

    /// Returns the addresses in ascending order.
    pub fn as_slice(&self) -> &[Address] {
        &self.addresses
    }

    /// Number of active extensions.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns true if no extension is active.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Returns true if `address` is active.
    pub fn contains(&self, address: Address) -> bool {
        self.addresses.binary_search(&address).is_ok()
    }

    /// Inserts `address` at its sorted position.
    pub fn insert(&mut self, address: Address) -> Result<(), ExtensionError> {
        match self.addresses.binary_search(&address) {
            Ok(_) => Err(ExtensionError::AlreadyRegistered(address)),
            Err(index) => {
                self.addresses.insert(index, address);
                Ok(())
            }
        }
    }
}
