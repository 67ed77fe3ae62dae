//! The token pair: a binding between a bank denomination and an EVM contract address.

use alloy_primitives::{keccak256, Address, B256};
use alloy_rlp::{BufMut, Decodable, Encodable, RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

use crate::denom::denom_address;

/// Registry key of a [`TokenPair`], derived from its contract address and denom.
pub type TokenPairId = B256;

/// Which side of a pair is canonical.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Owner {
    /// No owner recorded. Treated as corrupted data by the conversion engine.
    #[default]
    Unspecified = 0,
    /// The module deployed the contract; the bank coin is canonical.
    Module = 1,
    /// A pre-existing contract was wrapped; the contract token is canonical.
    External = 2,
}

impl Owner {
    /// Maps a stored discriminant back to an owner, falling back to [`Owner::Unspecified`].
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Module,
            2 => Self::External,
            _ => Self::Unspecified,
        }
    }
}

impl Encodable for Owner {
    fn encode(&self, out: &mut dyn BufMut) {
        (*self as u8).encode(out);
    }

    fn length(&self) -> usize {
        (*self as u8).length()
    }
}

impl Decodable for Owner {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        u8::decode(buf).map(Self::from_u8)
    }
}

/// A registered coin/contract binding.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Address of the contract representation.
    pub erc20_address: Address,
    /// Bank denomination of the coin representation.
    pub denom: String,
    /// Whether conversions are allowed in either direction.
    pub enabled: bool,
    /// Canonical side of the pair.
    pub contract_owner: Owner,
    /// Account allowed to mint and burn coins of a native-coin pair. Zero when unset.
    pub owner_address: Address,
}

impl TokenPair {
    /// Creates an enabled pair with no owner account.
    pub const fn new(erc20_address: Address, denom: String, contract_owner: Owner) -> Self {
        Self { erc20_address, denom, enabled: true, contract_owner, owner_address: Address::ZERO }
    }

    /// Creates a module-owned pair whose address is the deterministic extension address of
    /// `denom`.
    pub fn native_extension(denom: impl Into<String>) -> Self {
        let denom = denom.into();
        Self::new(denom_address(&denom), denom, Owner::Module)
    }

    /// Returns the registry id, `keccak256("{address}|{denom}")`.
    pub fn id(&self) -> TokenPairId {
        keccak256(format!("{}|{}", self.erc20_address, self.denom))
    }

    /// Returns true if the bank coin is canonical.
    pub fn is_native_coin(&self) -> bool {
        self.contract_owner == Owner::Module
    }

    /// Returns true if the contract token is canonical.
    pub fn is_native_erc20(&self) -> bool {
        self.contract_owner == Owner::External
    }

    /// Encodes the pair for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Decodes a stored pair.
    pub fn from_bytes(mut bytes: &[u8]) -> alloy_rlp::Result<Self> {
        Self::decode(&mut bytes)
    }
}
