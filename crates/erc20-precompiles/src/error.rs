//! Errors surfaced by extension calls.

use alloy_primitives::{Address, U256};

/// Failure of a native extension call. Any error reverts the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtensionError {
    /// Calldata did not match a supported selector.
    #[error("invalid calldata: {0}")]
    Decode(String),
    /// Native value was attached to a non-payable method.
    #[error("method is not payable")]
    NonPayable,
    /// Transfer or approval targets the zero address.
    #[error("cannot {0} the zero address")]
    ZeroAddress(&'static str),
    /// Sender balance is below the requested amount.
    #[error("insufficient balance: {available} < {needed}")]
    InsufficientBalance {
        /// Requested amount.
        needed: U256,
        /// Current balance.
        available: U256,
    },
    /// Spender allowance is below the requested amount.
    #[error("insufficient allowance: {available} < {needed}")]
    InsufficientAllowance {
        /// Requested amount.
        needed: U256,
        /// Current allowance.
        available: U256,
    },
    /// Bank rejected the movement for another reason.
    #[error("bank error: {0}")]
    Bank(String),
    /// The address is already in the active extension set.
    #[error("extension {0} is already registered")]
    AlreadyRegistered(Address),
}
