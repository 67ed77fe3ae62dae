//! Static module configuration.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::{env, fmt, str::FromStr};
use thiserror::Error;

/// Default native denom of the EVM.
pub const DEFAULT_EVM_DENOM: &str = "aevm";

/// Environment variable holding the EVM denom.
pub const ENV_EVM_DENOM: &str = "ERC20_EVM_DENOM";
/// Environment variable holding the wrapped native contract address.
pub const ENV_WRAPPED_NATIVE: &str = "ERC20_WRAPPED_NATIVE_ADDRESS";
/// Environment variable holding the governance authority address.
pub const ENV_AUTHORITY: &str = "ERC20_AUTHORITY";

/// Configuration fixed at keeper construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Erc20Config {
    /// Native denom of the EVM; never registrable as a pair.
    pub evm_denom: String,
    /// Wrapped native token contract migrated by STRv2.
    pub wrapped_native: Address,
    /// Governance account allowed to register pairs, toggle them and update params.
    pub authority: Address,
    /// Creation code of the module minter/burner token, without constructor arguments.
    pub minter_burner_code: Bytes,
    /// Local channel ids whose counterparty is an EVM chain. Inbound packets on these channels
    /// may name the same account as sender and receiver.
    pub evm_channels: Vec<String>,
}

impl Default for Erc20Config {
    fn default() -> Self {
        Self {
            evm_denom: DEFAULT_EVM_DENOM.to_string(),
            wrapped_native: Address::ZERO,
            authority: Address::ZERO,
            minter_burner_code: Bytes::new(),
            evm_channels: Vec::new(),
        }
    }
}

impl Erc20Config {
    /// Creates a configuration with an empty minter/burner code.
    pub fn new(evm_denom: impl Into<String>, wrapped_native: Address, authority: Address) -> Self {
        Self { evm_denom: evm_denom.into(), wrapped_native, authority, ..Default::default() }
    }

    /// Sets the minter/burner creation code.
    pub fn with_minter_burner_code(mut self, code: Bytes) -> Self {
        self.minter_burner_code = code;
        self
    }

    /// Sets the channels connected to EVM chains.
    pub fn with_evm_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evm_channels = channels.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if `channel` connects to an EVM chain.
    pub fn is_evm_channel(&self, channel: &str) -> bool {
        self.evm_channels.iter().any(|evm| evm == channel)
    }

    /// Parses a configuration from a JSON object with camelCase keys.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value.clone()).map_err(|err| ConfigError::InvalidJson(err.to_string()))
    }

    /// Loads the configuration from the environment.
    ///
    /// The wrapped native address and the authority are required. The EVM denom falls back to
    /// [`DEFAULT_EVM_DENOM`] when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let evm_denom = match read_env(ENV_EVM_DENOM) {
            Ok(denom) => denom,
            Err(ConfigError::MissingEnv { .. }) => DEFAULT_EVM_DENOM.to_string(),
            Err(err) => return Err(err),
        };
        let wrapped_native = parse_address(&read_env(ENV_WRAPPED_NATIVE)?)?;
        let authority = parse_address(&read_env(ENV_AUTHORITY)?)?;
        Ok(Self::new(evm_denom, wrapped_native, authority))
    }
}

/// Errors that can occur while building an [`Erc20Config`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The environment variable was not set.
    #[error("environment variable {var} is not set")]
    MissingEnv {
        /// Name of the environment variable that was not present.
        var: String,
    },
    /// The environment variable was empty or whitespace.
    #[error("environment variable {var} is empty")]
    EmptyEnv {
        /// Name of the environment variable that evaluated to an empty string.
        var: String,
    },
    /// The supplied address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(AddressParseDisplay),
    /// The JSON configuration could not be deserialized.
    #[error("invalid erc20 config: {0}")]
    InvalidJson(String),
}

/// Wrapper for formatting address parse failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParseDisplay(String);

impl fmt::Display for AddressParseDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn read_env(var: &str) -> Result<String, ConfigError> {
    let raw = env::var(var).map_err(|_| ConfigError::MissingEnv { var: var.into() })?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyEnv { var: var.into() });
    }
    Ok(trimmed.to_string())
}

fn parse_address(value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value)
        .map_err(|err| ConfigError::InvalidAddress(AddressParseDisplay(err.to_string())))
}
