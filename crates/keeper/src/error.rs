use alloy_primitives::{Address, U256};
use erc20_precompiles::ExtensionError;
use erc20_primitives::{Coin, DenomError, MetadataError, MsgError};
use thiserror::Error;

use crate::{
    expected_keepers::{BankError, EvmError},
    ibc::TransferError,
};

/// Errors returned by the keeper.
#[derive(Debug, Error)]
pub enum Erc20Error {
    /// Conversions and registrations are switched off by governance.
    #[error("erc20 module is disabled")]
    ModuleDisabled,
    /// The token pair exists but conversions on it are switched off.
    #[error("conversions of token '{0}' are disabled")]
    PairDisabled(String),
    /// No token pair resolves for the token.
    #[error("token pair for '{0}' not found")]
    NotFound(String),
    /// A token pair is already registered for the address or denom.
    #[error("token pair already exists: {0}")]
    AlreadyExists(String),
    /// The signer or receiver is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// The coin may not be sent to a different account.
    #[error("transfers of '{0}' to other accounts are disabled")]
    TransfersDisabled(String),
    /// A conversion post-condition did not hold.
    #[error("balance invariance violated for {what}: expected {expected}, got {actual}")]
    BalanceInvariance {
        /// Which balance was checked.
        what: &'static str,
        /// Expected balance after the conversion.
        expected: U256,
        /// Observed balance after the conversion.
        actual: U256,
    },
    /// The EVM reverted or failed a contract call.
    #[error("call to {method} on {contract} failed: {reason}")]
    ContractCallFailed {
        /// Called contract.
        contract: Address,
        /// Called method signature.
        method: &'static str,
        /// Revert reason or decode failure.
        reason: String,
    },
    /// The pair has neither a module nor an external owner.
    #[error("token pair '{0}' has an undefined owner")]
    UndefinedOwner(String),
    /// A contract call emitted an event a conversion must never produce.
    #[error("unexpected {event} event emitted by {contract}")]
    UnexpectedEvent {
        /// Emitting contract.
        contract: Address,
        /// Event name.
        event: &'static str,
    },
    /// The address holds no contract code.
    #[error("account {0} is not a contract")]
    NotContract(Address),
    /// The address is already an active extension.
    #[error("extension {0} is already registered")]
    AlreadyRegistered(Address),
    /// The denom may not be registered.
    #[error("denom '{0}' cannot be registered")]
    ProhibitedDenom(String),
    /// The coin has no supply.
    #[error("base denom '{0}' has no supply")]
    NoSupply(String),
    /// Coin metadata is malformed or conflicts with stored metadata.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] MetadataError),
    /// Denom is malformed.
    #[error("invalid denom: {0}")]
    InvalidDenom(#[from] DenomError),
    /// Message failed stateless validation.
    #[error("invalid message: {0}")]
    InvalidMsg(#[from] MsgError),
    /// Stored module data could not be decoded.
    #[error("corrupted state: {0}")]
    Corrupted(String),
    /// Coins remained in the module account after the STRv2 migration.
    #[error("module account holds unconverted coins after migration: {}", format_coins(.0))]
    MigrationResidue(Vec<Coin>),
    /// Arithmetic overflow on a balance.
    #[error("amount overflow while checking {0}")]
    Overflow(&'static str),
    /// Bank capability failure.
    #[error(transparent)]
    Bank(#[from] BankError),
    /// EVM capability failure outside a contract call.
    #[error(transparent)]
    Evm(#[from] EvmError),
    /// Native extension failure.
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    /// Inner transfer application failure.
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl Erc20Error {
    /// Returns true for errors that indicate a bug, an exploit attempt or corrupted state.
    ///
    /// These are surfaced to the host bootstrap and must never be recovered locally.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BalanceInvariance { .. }
                | Self::UndefinedOwner(_)
                | Self::Corrupted(_)
                | Self::MigrationResidue(_)
        )
    }
}

fn format_coins(coins: &[Coin]) -> String {
    coins.iter().map(|coin| format!("{}{}", coin.amount, coin.denom)).collect::<Vec<_>>().join(",")
}
