//! ICS-20 integration.
//!
//! [`Erc20Middleware`] wraps the host's fungible token transfer application. Inbound vouchers
//! of registered pairs are projected into their contract form for the receiver, refunds of
//! failed outbound transfers are projected back for the sender, and outbound transfers of a
//! contract token are converted to coins before the inner application escrows them.

mod callbacks;
mod middleware;

pub use middleware::Erc20Middleware;

use alloy_primitives::Address;
use erc20_primitives::{Acknowledgement, MsgTransfer, Packet};
use thiserror::Error;

use crate::expected_keepers::BankError;

/// Errors raised by the transfer application or while decoding its payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Packet data is not a fungible token payload.
    #[error("invalid ICS-20 packet data: {0}")]
    InvalidPacket(String),
    /// A sender or receiver is not a 20-byte hex address.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    /// Sender and receiver are the same account on a channel that does not lead to an EVM
    /// chain, so the receiver cannot hold the sender's key.
    #[error("sender and receiver {account} must differ on non-EVM channel {channel}")]
    SameSenderReceiver {
        /// The account named on both sides of the packet.
        account: Address,
        /// Destination channel of the packet.
        channel: String,
    },
    /// The amount is not a base-10 unsigned integer.
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    /// The inner application refused the transfer.
    #[error("transfer rejected: {0}")]
    Rejected(String),
    /// Escrow, mint or refund failed.
    #[error(transparent)]
    Bank(#[from] BankError),
}

/// The fungible token transfer application wrapped by the middleware.
///
/// Every callback receives the host ledger so that its balance changes share the middleware's
/// checkpoint.
pub trait TransferApp<L> {
    /// Credits the receiver of an inbound packet.
    fn on_recv_packet(&mut self, ledger: &mut L, packet: &Packet) -> Acknowledgement;

    /// Refunds the sender if the counterparty rejected the packet.
    fn on_acknowledgement_packet(
        &mut self,
        ledger: &mut L,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), TransferError>;

    /// Refunds the sender of a packet that was never received.
    fn on_timeout_packet(&mut self, ledger: &mut L, packet: &Packet) -> Result<(), TransferError>;

    /// Escrows or burns the coins of an outbound transfer and returns the packet sequence.
    fn send_transfer(&mut self, ledger: &mut L, msg: &MsgTransfer) -> Result<u64, TransferError>;
}
