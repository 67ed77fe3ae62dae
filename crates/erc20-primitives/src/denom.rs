//! Denomination syntax and the deterministic denom/address mappings.

use alloy_primitives::{keccak256, Address};
use sha2::{Digest, Sha256};

/// Prefix of coins created for wrapped external contracts.
pub const ERC20_DENOM_PREFIX: &str = "erc20/";
/// Prefix of ICS-20 voucher denominations.
pub const IBC_DENOM_PREFIX: &str = "ibc/";

const MIN_DENOM_LEN: usize = 3;
const MAX_DENOM_LEN: usize = 128;

/// Errors returned by denom validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenomError {
    /// Denom length is outside `3..=128`.
    #[error("invalid denom length {len} for '{denom}'")]
    Length {
        /// The rejected denom.
        denom: String,
        /// Its length.
        len: usize,
    },
    /// Denom does not start with an ASCII letter.
    #[error("denom '{0}' must start with a letter")]
    Leading(String),
    /// Denom contains a character outside `[a-zA-Z0-9/:._-]`.
    #[error("denom '{denom}' contains invalid character '{ch}'")]
    Character {
        /// The rejected denom.
        denom: String,
        /// The first offending character.
        ch: char,
    },
}

/// Validates `denom` against the bank denom syntax `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
pub fn validate_denom(denom: &str) -> Result<(), DenomError> {
    let len = denom.len();
    if !(MIN_DENOM_LEN..=MAX_DENOM_LEN).contains(&len) {
        return Err(DenomError::Length { denom: denom.to_string(), len });
    }
    let mut chars = denom.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(DenomError::Leading(denom.to_string()));
    }
    if let Some(ch) = chars.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))) {
        return Err(DenomError::Character { denom: denom.to_string(), ch });
    }
    Ok(())
}

/// Returns the coin denom minted for an external contract, `erc20/0x...`.
pub fn create_denom(address: Address) -> String {
    format!("{ERC20_DENOM_PREFIX}{address}")
}

/// Returns the deterministic extension address for `denom`.
///
/// Voucher denoms of the form `ibc/<64 hex>` map to the last 20 bytes of their hash so the
/// address is recognisable from the voucher. Every other denom maps to the last 20 bytes of
/// `keccak256(denom)`.
pub fn denom_address(denom: &str) -> Address {
    if let Some(hash) = denom.strip_prefix(IBC_DENOM_PREFIX) {
        if let Ok(bytes) = hex::decode(hash) {
            if bytes.len() == 32 {
                return Address::from_slice(&bytes[12..]);
            }
        }
    }
    Address::from_word(keccak256(denom.as_bytes()))
}

/// Returns the ICS-20 voucher denom for a full trace path, `ibc/{SHA256(path)}` in upper hex.
pub fn ibc_denom(path: &str) -> String {
    format!("{IBC_DENOM_PREFIX}{}", hex::encode_upper(Sha256::digest(path.as_bytes())))
}
