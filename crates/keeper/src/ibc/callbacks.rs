//! Keeper side of the ICS-20 callbacks.

use alloy_primitives::Address;
use erc20_primitives::{sent_denom, Acknowledgement, FungibleTokenPacketData, MsgTransfer, Packet};
use std::str::FromStr;
use tracing::instrument;

use super::TransferError;
use crate::{
    error::Erc20Error,
    expected_keepers::Ledger,
    keeper::Keeper,
    token_pairs::parse_contract_address,
};

/// Denom prefix of token factory coins.
const TOKEN_FACTORY_PREFIX: &str = "factory/";

fn parse_account(raw: &str) -> Result<Address, TransferError> {
    Address::from_str(raw.trim()).map_err(|_| TransferError::InvalidAddress(raw.to_string()))
}

impl<L: Ledger> Keeper<L> {
    /// Projects the coins credited by an inbound packet into their contract form.
    ///
    /// Runs after the transfer application credited the receiver. The incoming
    /// acknowledgement is returned unchanged whenever the packet is not eligible for
    /// conversion; a failed conversion yields an error acknowledgement so the transfer itself
    /// is rolled back. Packets naming the same sender and receiver are rejected unless they
    /// arrive on a configured EVM channel.
    #[instrument(skip(self, packet, ack), fields(
        sequence = packet.sequence,
        channel = %packet.destination_channel,
        denom = tracing::field::Empty,
    ))]
    pub fn on_recv_packet(&mut self, packet: &Packet, ack: Acknowledgement) -> Acknowledgement {
        if !self.params.enable_erc20 {
            return ack;
        }
        let data = match packet.token_data() {
            Ok(data) => data,
            Err(err) => return Acknowledgement::error(TransferError::InvalidPacket(err.to_string())),
        };
        let (sender, receiver) = match (parse_account(&data.sender), parse_account(&data.receiver)) {
            (Ok(sender), Ok(receiver)) => (sender, receiver),
            (Err(err), _) | (_, Err(err)) => return Acknowledgement::error(err),
        };
        if self.ledger.blocked_addr(sender) || self.ledger.blocked_addr(receiver) {
            return Acknowledgement::error(Erc20Error::Unauthorized(format!(
                "{sender} or {receiver} is blocked from receiving funds"
            )));
        }
        if sender == receiver && !self.config.is_evm_channel(&packet.destination_channel) {
            return Acknowledgement::error(TransferError::SameSenderReceiver {
                account: receiver,
                channel: packet.destination_channel.clone(),
            });
        }
        if self.ledger.is_module_account(receiver) {
            return ack;
        }

        // Token factory coins are never converted.
        if data.denom.starts_with(TOKEN_FACTORY_PREFIX) {
            return ack;
        }
        let denom = packet.received_denom(&data.denom);
        tracing::Span::current().record("denom", denom.as_str());
        if denom == self.config.evm_denom {
            return ack;
        }
        let pair = match self.token_pair_by_token(&denom) {
            Ok(pair) if pair.enabled => pair,
            Ok(_) | Err(Erc20Error::NotFound(_)) => return ack,
            Err(err) => return Acknowledgement::error(err),
        };

        let balance = self.ledger.get_balance(receiver, &denom).amount;
        if balance.is_zero() {
            return ack;
        }
        match self.with_checkpoint(|keeper| keeper.convert_coin_for_pair(&pair, balance, receiver, receiver)) {
            Ok(outcome) => {
                tracing::debug!(target: "erc20::ibc", ?receiver, %balance, ?outcome, "inbound coins converted");
                ack
            }
            Err(err) => {
                tracing::warn!(target: "erc20::ibc", ?receiver, %denom, %err, "inbound conversion failed");
                Acknowledgement::error(err)
            }
        }
    }

    /// Converts the refund of a rejected transfer back to its contract form.
    pub fn on_acknowledgement_packet(
        &mut self,
        data: &FungibleTokenPacketData,
        ack: &Acknowledgement,
    ) -> Result<(), Erc20Error> {
        match ack {
            Acknowledgement::Error(_) => self.convert_coin_to_erc20_from_packet(data),
            Acknowledgement::Result(_) => Ok(()),
        }
    }

    /// Converts the refund of a timed-out transfer back to its contract form.
    pub fn on_timeout_packet(&mut self, data: &FungibleTokenPacketData) -> Result<(), Erc20Error> {
        self.convert_coin_to_erc20_from_packet(data)
    }

    /// Projects refunded coins of an outbound packet back into their contract form for the
    /// original sender. Module-account senders keep the coins.
    #[instrument(skip(self, data), fields(denom = %data.denom, amount = %data.amount))]
    pub fn convert_coin_to_erc20_from_packet(
        &mut self,
        data: &FungibleTokenPacketData,
    ) -> Result<(), Erc20Error> {
        if !self.params.enable_erc20 {
            return Ok(());
        }
        let sender = parse_account(&data.sender)?;
        let denom = sent_denom(&data.denom);
        let pair = match self.token_pair_by_token(&denom) {
            Ok(pair) if pair.enabled => pair,
            Ok(_) | Err(Erc20Error::NotFound(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        if self.ledger.is_module_account(sender) {
            return Ok(());
        }
        let amount = data
            .amount()
            .ok_or_else(|| TransferError::InvalidAmount(data.amount.clone()))?;

        self.with_checkpoint(|keeper| keeper.convert_coin_for_pair(&pair, amount, sender, sender))?;
        tracing::debug!(target: "erc20::ibc", ?sender, %amount, %denom, "refund converted");
        Ok(())
    }

    /// Converts an outbound contract token into coins and rewrites the transfer to carry the
    /// pair's denom. Transfers of plain coins pass through unchanged.
    pub(crate) fn prepare_transfer(&mut self, msg: &MsgTransfer) -> Result<MsgTransfer, Erc20Error> {
        let Some(contract) = parse_contract_address(&msg.token.denom) else {
            return Ok(msg.clone());
        };
        if !self.params.enable_erc20 || !self.is_erc20_registered(contract) {
            return Ok(msg.clone());
        }

        let pair = self.conversion_eligible(msg.sender, msg.sender, &msg.token.denom)?;
        self.convert_erc20_for_pair(&pair, msg.token.amount, msg.sender, msg.sender)?;
        tracing::debug!(
            target: "erc20::ibc",
            sender = ?msg.sender,
            amount = %msg.token.amount,
            denom = %pair.denom,
            "outbound tokens converted"
        );

        let mut forwarded = msg.clone();
        forwarded.token.denom = pair.denom;
        Ok(forwarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expected_keepers::BankKeeper,
        test_utils::{
            coin_metadata, packet, setup_keeper, test_config, MockChain, ALICE, AUTHORITY, BOB,
            MODULE_DENOM,
        },
    };
    use alloy_primitives::U256;
    use erc20_primitives::Params;

    fn credited(keeper: &mut Keeper<MockChain>, denom: &str, amount: u64) {
        keeper.ledger_mut().fund(BOB, denom, U256::from(amount));
    }

    // === Test: Inbound Pass-Through ===

    #[test]
    fn unregistered_denom_passes_through() {
        let mut keeper = setup_keeper();
        let inbound = packet("uatom", 10, ALICE, BOB);
        let ack = keeper.on_recv_packet(&inbound, Acknowledgement::success());
        assert!(ack.is_success());
    }

    #[test]
    fn blocked_receiver_gets_error_ack() {
        let mut keeper = setup_keeper();
        keeper.ledger_mut().block_address(BOB);
        let ack = keeper.on_recv_packet(&packet("uatom", 10, ALICE, BOB), Acknowledgement::success());
        assert!(!ack.is_success());
    }

    #[test]
    fn malformed_receiver_gets_error_ack() {
        let mut keeper = setup_keeper();
        let mut inbound = packet("uatom", 10, ALICE, BOB);
        let mut data = inbound.token_data().expect("valid data");
        data.receiver = "cosmos1xyz".into();
        inbound.data = data.to_bytes().expect("encode");
        match keeper.on_recv_packet(&inbound, Acknowledgement::success()) {
            Acknowledgement::Error(reason) => assert!(reason.contains("cosmos1xyz")),
            other => panic!("expected error ack, got {other:?}"),
        }
    }

    #[test]
    fn same_sender_receiver_rejected_off_evm_channel() {
        let mut keeper = setup_keeper();
        match keeper.on_recv_packet(&packet("uatom", 10, BOB, BOB), Acknowledgement::success()) {
            Acknowledgement::Error(reason) => assert!(reason.contains("channel-0"), "{reason}"),
            other => panic!("expected error ack, got {other:?}"),
        }
    }

    #[test]
    fn same_sender_receiver_allowed_on_evm_channel() {
        let config = test_config().with_evm_channels(["channel-0"]);
        let mut keeper = Keeper::new(MockChain::new(), config, Params::default());
        let pair = keeper.register_module_coin().expect("register coin");
        credited(&mut keeper, MODULE_DENOM, 25);

        let inbound = packet(&format!("transfer/channel-0/{MODULE_DENOM}"), 25, BOB, BOB);
        assert!(keeper.on_recv_packet(&inbound, Acknowledgement::success()).is_success());
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, BOB), U256::from(25));
    }

    #[test]
    fn token_factory_denom_passes_through() {
        let mut keeper = setup_keeper();
        let denom = "factory/osmo1creator/ufoo";
        let voucher = packet(denom, 10, ALICE, BOB).received_denom(denom);
        keeper.ledger_mut().fund(AUTHORITY, &voucher, U256::from(1));
        let pair = keeper.register_coin(AUTHORITY, coin_metadata(&voucher, 0)).expect("register voucher");
        credited(&mut keeper, &voucher, 10);

        let ack = keeper.on_recv_packet(&packet(denom, 10, ALICE, BOB), Acknowledgement::success());
        assert!(ack.is_success());
        assert_eq!(keeper.ledger().get_balance(BOB, &voucher).amount, U256::from(10));
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, BOB), U256::ZERO);
    }

    // === Test: Inbound Conversion ===

    #[test]
    fn returning_coin_is_converted_for_receiver() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        // The transfer application unescrowed the returning coins before the keeper runs.
        credited(&mut keeper, MODULE_DENOM, 25);

        let inbound = packet(&format!("transfer/channel-0/{MODULE_DENOM}"), 25, ALICE, BOB);
        let ack = keeper.on_recv_packet(&inbound, Acknowledgement::success());

        assert!(ack.is_success());
        assert_eq!(keeper.ledger().get_balance(BOB, MODULE_DENOM).amount, U256::ZERO);
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, BOB), U256::from(25));
    }

    #[test]
    fn disabled_pair_passes_through() {
        let mut keeper = setup_keeper();
        keeper.register_module_coin().expect("register coin");
        keeper.toggle_conversion(AUTHORITY, MODULE_DENOM).expect("toggle");
        credited(&mut keeper, MODULE_DENOM, 25);

        let inbound = packet(&format!("transfer/channel-0/{MODULE_DENOM}"), 25, ALICE, BOB);
        assert!(keeper.on_recv_packet(&inbound, Acknowledgement::success()).is_success());
        assert_eq!(keeper.ledger().get_balance(BOB, MODULE_DENOM).amount, U256::from(25));
    }

    // === Test: Refunds ===

    #[test]
    fn error_ack_refund_is_converted_back() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(7));
        let data = FungibleTokenPacketData {
            denom: MODULE_DENOM.into(),
            amount: "7".into(),
            sender: ALICE.to_string(),
            receiver: "cosmos1receiver".into(),
            memo: String::new(),
        };

        keeper.on_acknowledgement_packet(&data, &Acknowledgement::success()).expect("success ack");
        assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(7));

        keeper
            .on_acknowledgement_packet(&data, &Acknowledgement::error("rejected"))
            .expect("error ack");
        assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::ZERO);
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, ALICE), U256::from(7));
    }

    #[test]
    fn module_sender_keeps_refund_as_coins() {
        let mut keeper = setup_keeper();
        keeper.register_module_coin().expect("register coin");
        let module = keeper.module_address();
        keeper.ledger_mut().fund(module, MODULE_DENOM, U256::from(3));
        let data = FungibleTokenPacketData {
            denom: MODULE_DENOM.into(),
            amount: "3".into(),
            sender: module.to_string(),
            receiver: "cosmos1receiver".into(),
            memo: String::new(),
        };
        keeper.on_timeout_packet(&data).expect("timeout");
        assert_eq!(keeper.ledger().coin_balance(module, MODULE_DENOM), U256::from(3));
    }
}
