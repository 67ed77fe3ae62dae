//! Scenario tests for the erc20 token-pair module
//!
//! This crate drives the keeper end to end over the in-memory chain: conversions in both
//! directions, registry invariants, the ICS-20 middleware and the STRv2 migration.

pub mod common;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod migration_tests;

// Re-export common test utilities
pub use common::*;
