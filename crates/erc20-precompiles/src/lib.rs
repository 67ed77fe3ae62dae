//! # Native ERC20 Extensions
//!
//! This crate provides the non-bytecode ERC20 implementation installed into the EVM for
//! module-owned token pairs, together with the ABI of the legacy contracts the keeper still
//! talks to.
//!
//! ## Contents
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`abi`] | `sol!` interfaces: ERC20, the module minter/burner token, the wrapped native token |
//! | [`erc20`] | [`Erc20Extension`]: ERC20 calls served directly from bank balances |
//! | [`registry`] | [`ActiveExtensions`]: the sorted set of enabled extension addresses |
//!
//! ## Architecture
//!
//! An extension never stores balances of its own. Every read and write goes through a
//! [`NativeBank`] handle supplied by the host for the duration of one call, so the contract
//! view and the bank view of a denom can never diverge and host rollbacks cover both.

pub mod abi;
pub mod erc20;
pub mod error;
pub mod registry;

pub use erc20::{Erc20Extension, ExtensionInput, ExtensionOutput, NativeBank};
pub use error::ExtensionError;
pub use registry::ActiveExtensions;
