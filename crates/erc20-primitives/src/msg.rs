//! Messages accepted by the module.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    coin::Coin,
    denom::{validate_denom, DenomError},
    params::Params,
};

/// Stateless validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MsgError {
    /// Amount is zero.
    #[error("amount must be positive")]
    ZeroAmount,
    /// Coin denom is malformed.
    #[error(transparent)]
    Denom(#[from] DenomError),
    /// A required field is empty.
    #[error("{0} cannot be empty")]
    Empty(&'static str),
}

/// Converts a bank coin into its contract representation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgConvertCoin {
    /// Coin to convert.
    pub coin: Coin,
    /// Account credited with contract tokens.
    pub receiver: Address,
    /// Account debited in coins.
    pub sender: Address,
}

impl MsgConvertCoin {
    /// Checks the message without touching state.
    pub fn validate_basic(&self) -> Result<(), MsgError> {
        validate_denom(&self.coin.denom)?;
        if self.coin.is_zero() {
            return Err(MsgError::ZeroAmount);
        }
        Ok(())
    }
}

/// Converts contract tokens into the bank coin representation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgConvertErc20 {
    /// Contract whose tokens are converted.
    pub contract_address: Address,
    /// Amount of tokens.
    pub amount: U256,
    /// Account credited with coins.
    pub receiver: Address,
    /// Account debited in tokens.
    pub sender: Address,
}

impl MsgConvertErc20 {
    /// Checks the message without touching state.
    pub fn validate_basic(&self) -> Result<(), MsgError> {
        if self.amount.is_zero() {
            return Err(MsgError::ZeroAmount);
        }
        Ok(())
    }
}

/// Outgoing ICS-20 transfer. `token.denom` may be a contract address in hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgTransfer {
    /// Port the packet is sent on.
    pub source_port: String,
    /// Channel the packet is sent on.
    pub source_channel: String,
    /// Token to send.
    pub token: Coin,
    /// Local sender.
    pub sender: Address,
    /// Receiver on the counterparty chain, opaque to this chain.
    pub receiver: String,
    /// Timeout as a unix timestamp in nanoseconds.
    pub timeout_timestamp: u64,
    /// Optional memo forwarded with the packet.
    #[serde(default)]
    pub memo: String,
}

impl MsgTransfer {
    /// Checks the message without touching state.
    pub fn validate_basic(&self) -> Result<(), MsgError> {
        if self.source_port.is_empty() {
            return Err(MsgError::Empty("source port"));
        }
        if self.source_channel.is_empty() {
            return Err(MsgError::Empty("source channel"));
        }
        if self.receiver.trim().is_empty() {
            return Err(MsgError::Empty("receiver"));
        }
        if self.token.is_zero() {
            return Err(MsgError::ZeroAmount);
        }
        if self.token.denom.parse::<Address>().is_err() {
            validate_denom(&self.token.denom)?;
        }
        Ok(())
    }
}

/// Replaces the module params. Only the configured authority may send it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    /// Signer; must equal the module authority.
    pub authority: Address,
    /// New params.
    pub params: Params,
}
