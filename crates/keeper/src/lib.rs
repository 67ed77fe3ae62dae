//! erc20 keeper
//!
//! This crate provides the state transitions of the token-pair module, including:
//! - The token pair registry and its secondary indexes
//! - Coin/token conversion in both directions for both owner kinds
//! - Governance registration, toggling and params
//! - The post-transaction EVM hook and the ICS-20 middleware
//! - Native extension installation and the STRv2 migration
//!
//! The keeper owns no balances. Everything it touches is reached through the capability traits
//! in [`expected_keepers`], bundled as [`Ledger`].

/// Static configuration loaded at construction.
pub mod config;
/// Conversion eligibility and the four conversion paths.
pub mod conversion;
/// Keeper error type.
pub mod error;
/// Post-transaction hook for transfers to the module address.
pub mod evm_hooks;
/// Capabilities consumed from the host chain.
pub mod expected_keepers;
/// ICS-20 callbacks and middleware.
pub mod ibc;
/// The keeper service object.
pub mod keeper;
/// STRv2 migration.
pub mod migration;
/// Owner-gated mint, burn and ownership transfer.
pub mod owner;
/// Native extension registration and installation.
pub mod precompiles;
/// Governance proposals and params.
pub mod proposals;
/// Paginated queries.
pub mod queries;
/// Store layout and the key-value capability.
pub mod store;
/// STRv2 affected-address tracking.
pub mod strv2;
/// Token pair registry.
pub mod token_pairs;

/// In-memory host chain and fixtures for tests.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export public types for convenience.
pub use config::{ConfigError, Erc20Config};
pub use conversion::ConversionOutcome;
pub use error::Erc20Error;
pub use expected_keepers::{
    AccountKeeper, BankError, BankKeeper, CallOutput, Checkpoint, EventManager, EvmAccount,
    EvmError, EvmKeeper, Ledger, Receipt, Transactional,
};
pub use ibc::{Erc20Middleware, TransferApp, TransferError};
pub use keeper::{Erc20Data, Keeper};
pub use migration::{MigrationFailure, MigrationReport};
pub use queries::{PageRequest, PageResponse, QueryTokenPairsResponse};
pub use store::{KvStore, MemoryStore};
