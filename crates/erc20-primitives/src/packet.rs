//! ICS-20 packet shapes and denom trace helpers.
//!
//! Only the pieces the conversion middleware reads are modelled: the packet routing fields,
//! the JSON fungible token payload and the acknowledgement result.

use alloy_primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::denom::ibc_denom;

/// A channel packet as delivered by the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    /// Sequence number on the sending channel.
    pub sequence: u64,
    /// Port on the sending chain.
    pub source_port: String,
    /// Channel on the sending chain.
    pub source_channel: String,
    /// Port on the receiving chain.
    pub destination_port: String,
    /// Channel on the receiving chain.
    pub destination_channel: String,
    /// Application payload.
    pub data: Bytes,
    /// Timeout as a unix timestamp in nanoseconds.
    pub timeout_timestamp: u64,
}

impl Packet {
    /// Decodes the fungible token payload.
    pub fn token_data(&self) -> Result<FungibleTokenPacketData, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }

    /// Returns the local denom credited when this packet is received.
    ///
    /// A denom prefixed with the packet's source port and channel is returning home, so the
    /// prefix is removed and the remainder hashed only if it still carries a trace. Any other
    /// denom gets this chain's destination hop prepended and is hashed into a voucher.
    pub fn received_denom(&self, denom: &str) -> String {
        let source_prefix = format!("{}/{}/", self.source_port, self.source_channel);
        match denom.strip_prefix(&source_prefix) {
            Some(unprefixed) if is_trace(unprefixed) => ibc_denom(unprefixed),
            Some(unprefixed) => unprefixed.to_string(),
            None => ibc_denom(&format!(
                "{}/{}/{denom}",
                self.destination_port, self.destination_channel
            )),
        }
    }
}

/// Returns the local denom that was escrowed or burned when a packet carrying `denom` was
/// sent from this chain.
pub fn sent_denom(denom: &str) -> String {
    if is_trace(denom) {
        ibc_denom(denom)
    } else {
        denom.to_string()
    }
}

/// Returns true if `denom` starts with at least one `{port}/{channel}/` hop.
fn is_trace(denom: &str) -> bool {
    let mut parts = denom.splitn(3, '/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(port), Some(channel), Some(base))
            if !port.is_empty() && channel.starts_with("channel-") && !base.is_empty()
    )
}

/// ICS-20 fungible token payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    /// Denom trace as seen by the sender.
    pub denom: String,
    /// Decimal amount.
    pub amount: String,
    /// Sender on the sending chain.
    pub sender: String,
    /// Receiver on the receiving chain.
    pub receiver: String,
    /// Optional memo.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

impl FungibleTokenPacketData {
    /// Parses the decimal amount.
    pub fn amount(&self) -> Option<U256> {
        U256::from_str_radix(&self.amount, 10).ok()
    }

    /// Encodes the payload as packet data.
    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Acknowledgement written for a received packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acknowledgement {
    /// Receive succeeded.
    Result(Bytes),
    /// Receive failed; the sender is refunded.
    Error(String),
}

impl Acknowledgement {
    /// The ICS-20 success acknowledgement, a single `0x01` byte.
    pub fn success() -> Self {
        Self::Result(Bytes::from_static(&[1]))
    }

    /// Creates an error acknowledgement.
    pub fn error(err: impl ToString) -> Self {
        Self::Error(err.to_string())
    }

    /// Returns true for a success acknowledgement.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Result(_))
    }
}
