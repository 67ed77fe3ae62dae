use erc20_primitives::{Acknowledgement, MsgTransfer, Packet};

use super::{TransferApp, TransferError};
use crate::{
    error::Erc20Error,
    expected_keepers::{Ledger, Transactional},
    keeper::Keeper,
};

/// ICS-20 middleware that owns the keeper and the wrapped transfer application.
#[derive(Debug)]
pub struct Erc20Middleware<L, A> {
    keeper: Keeper<L>,
    app: A,
}

impl<L: Ledger, A: TransferApp<L>> Erc20Middleware<L, A> {
    /// Wraps `app` with the conversion hooks of `keeper`.
    pub const fn new(keeper: Keeper<L>, app: A) -> Self {
        Self { keeper, app }
    }

    /// Returns the keeper.
    pub const fn keeper(&self) -> &Keeper<L> {
        &self.keeper
    }

    /// Returns the keeper mutably.
    pub fn keeper_mut(&mut self) -> &mut Keeper<L> {
        &mut self.keeper
    }

    /// Returns the wrapped application.
    pub const fn app(&self) -> &A {
        &self.app
    }

    /// Splits the middleware into the keeper and the wrapped application.
    pub fn into_parts(self) -> (Keeper<L>, A) {
        (self.keeper, self.app)
    }

    /// Credits the receiver through the inner application, then converts.
    ///
    /// Both steps share one checkpoint; an error acknowledgement from either discards the
    /// credit as well as any conversion.
    pub fn on_recv_packet(&mut self, packet: &Packet) -> Acknowledgement {
        let checkpoint = self.keeper.ledger_mut().checkpoint();
        let mut ack = self.app.on_recv_packet(self.keeper.ledger_mut(), packet);
        if ack.is_success() {
            ack = self.keeper.on_recv_packet(packet, ack);
        }

        if ack.is_success() {
            self.keeper.ledger_mut().checkpoint_commit(checkpoint);
        } else {
            tracing::debug!(target: "erc20::ibc", sequence = packet.sequence, "inbound packet rejected");
            self.keeper.ledger_mut().checkpoint_revert(checkpoint);
        }
        ack
    }

    /// Lets the inner application refund a rejected packet, then converts the refund.
    pub fn on_acknowledgement_packet(
        &mut self,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), Erc20Error> {
        let Self { keeper, app } = self;
        keeper.with_checkpoint(|keeper| {
            app.on_acknowledgement_packet(keeper.ledger_mut(), packet, ack)?;
            let data = packet
                .token_data()
                .map_err(|err| TransferError::InvalidPacket(err.to_string()))?;
            keeper.on_acknowledgement_packet(&data, ack)
        })
    }

    /// Lets the inner application refund a timed-out packet, then converts the refund.
    pub fn on_timeout_packet(&mut self, packet: &Packet) -> Result<(), Erc20Error> {
        let Self { keeper, app } = self;
        keeper.with_checkpoint(|keeper| {
            app.on_timeout_packet(keeper.ledger_mut(), packet)?;
            let data = packet
                .token_data()
                .map_err(|err| TransferError::InvalidPacket(err.to_string()))?;
            keeper.on_timeout_packet(&data)
        })
    }

    /// Converts an outbound contract token to coins, then hands the transfer to the inner
    /// application. Returns the packet sequence.
    pub fn send_transfer(&mut self, msg: &MsgTransfer) -> Result<u64, Erc20Error> {
        msg.validate_basic()?;
        let Self { keeper, app } = self;
        keeper.with_checkpoint(|keeper| {
            let forwarded = keeper.prepare_transfer(msg)?;
            Ok(app.send_transfer(keeper.ledger_mut(), &forwarded)?)
        })
    }
}
