//! Governance-controlled module parameters.

use serde::{Deserialize, Serialize};

/// Runtime toggles of the module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Params {
    /// Global switch for conversions, registrations and the IBC middleware.
    pub enable_erc20: bool,
    /// Whether contract `Transfer` logs to the module address are mirrored into coins.
    pub enable_evm_hook: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self { enable_erc20: true, enable_evm_hook: true }
    }
}

impl Params {
    /// Params with both switches off.
    pub const fn disabled() -> Self {
        Self { enable_erc20: false, enable_evm_hook: false }
    }
}
