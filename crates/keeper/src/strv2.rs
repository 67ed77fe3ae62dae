//! Accounts that touched a native-coin pair through its legacy contract.
//!
//! The migration converts balances of every known account; this set adds the accounts the
//! host might not enumerate, such as contracts that only ever received tokens.

use alloy_primitives::Address;

use crate::{
    expected_keepers::Ledger,
    keeper::Keeper,
    store::{prefixed_key, KEY_PREFIX_STRV2_ADDRESS},
};

fn strv2_key(address: Address) -> Vec<u8> {
    prefixed_key(KEY_PREFIX_STRV2_ADDRESS, address.as_slice())
}

impl<L: Ledger> Keeper<L> {
    /// Adds `address` to the set. Idempotent.
    pub fn set_strv2_address(&mut self, address: Address) {
        self.ledger.set(&strv2_key(address), Vec::new());
    }

    /// Returns true if `address` is in the set.
    pub fn has_strv2_address(&self, address: Address) -> bool {
        self.ledger.has(&strv2_key(address))
    }

    /// Removes `address` from the set.
    pub fn delete_strv2_address(&mut self, address: Address) {
        self.ledger.delete(&strv2_key(address));
    }

    /// Iterates the set in address order.
    pub fn strv2_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.ledger.prefix_iter(KEY_PREFIX_STRV2_ADDRESS).filter_map(|(key, _)| {
            let raw = key.get(KEY_PREFIX_STRV2_ADDRESS.len()..)?;
            (raw.len() == 20).then(|| Address::from_slice(raw))
        })
    }

    /// Records both parties of a movement on a native-coin pair.
    pub(crate) fn track_strv2(&mut self, addresses: &[Address]) {
        for address in addresses {
            if !address.is_zero() && *address != self.module_address() {
                self.set_strv2_address(*address);
            }
        }
    }
}
