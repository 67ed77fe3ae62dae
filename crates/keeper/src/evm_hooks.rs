//! Post-transaction hook mirroring token transfers to the module address into coins.
//!
//! A user may send registered tokens straight to the module address from any EVM
//! transaction. After the transaction executes, every matching `Transfer` log is turned into a
//! coin credit for the sender of the tokens:
//!
//! - module-owned pair: the module burns the received tokens and releases escrowed coins
//! - module-owned pair served by an extension: the coins the transfer moved are returned
//! - external pair: the tokens stay in escrow and the module mints fresh coins
//!
//! Each log is processed inside its own checkpoint. A failing log is logged and skipped.

use alloy_primitives::{Address, Log, U256};
use alloy_sol_types::SolEvent;
use erc20_precompiles::abi::{IERC20MinterBurnerDecimals, IERC20};
use erc20_primitives::{Coin, Owner, TokenPair, MODULE_NAME};
use tracing::instrument;

use crate::{
    error::Erc20Error,
    expected_keepers::{Ledger, Receipt},
    keeper::Keeper,
};

impl<L: Ledger> Keeper<L> {
    /// Processes the logs of an executed EVM transaction. Returns the number of logs that were
    /// converted into coins.
    #[instrument(skip(self, receipt), fields(tx_hash = %receipt.tx_hash, log_count = receipt.logs.len()))]
    pub fn post_tx_processing(&mut self, receipt: &Receipt) -> usize {
        if !self.params.enable_erc20 || !self.params.enable_evm_hook {
            return 0;
        }

        let mut converted = 0;
        for (index, log) in receipt.logs.iter().enumerate() {
            let Some((pair, from, amount)) = self.match_transfer_to_module(log) else {
                continue;
            };
            match self.with_checkpoint(|keeper| keeper.mirror_transfer(&pair, from, amount)) {
                Ok(()) => converted += 1,
                Err(err) => {
                    tracing::warn!(
                        target: "erc20::evm_hook",
                        tx_hash = %receipt.tx_hash,
                        log_index = index,
                        denom = %pair.denom,
                        %err,
                        "failed to process EVM hook for erc20 -> coin conversion"
                    );
                }
            }
        }
        converted
    }

    /// Returns the pair, origin and amount of a positive `Transfer` to the module address on an
    /// enabled registered pair.
    fn match_transfer_to_module(&self, log: &Log) -> Option<(TokenPair, Address, U256)> {
        if log.data.topics().len() != 3 {
            return None;
        }
        let event = IERC20::Transfer::decode_log_data(&log.data).ok()?;
        if event.value.is_zero() || event.to != self.module_address() {
            return None;
        }

        let id = self.token_pair_id(&log.address.to_string()).ok()??;
        let pair = self.token_pair(&id).ok()??;
        if !pair.enabled {
            tracing::debug!(
                target: "erc20::evm_hook",
                denom = %pair.denom,
                erc20 = ?pair.erc20_address,
                "conversion is disabled for pair"
            );
            return None;
        }
        Some((pair, event.from, event.value))
    }

    fn mirror_transfer(
        &mut self,
        pair: &TokenPair,
        from: Address,
        amount: U256,
    ) -> Result<(), Erc20Error> {
        let coin = Coin::new(pair.denom.clone(), amount);
        match pair.contract_owner {
            // An extension already moved the coins themselves into the module account.
            Owner::Module if self.ledger.active_extensions().contains(pair.erc20_address) => {}
            Owner::Module => {
                self.call_contract(
                    self.module_address(),
                    pair.erc20_address,
                    &IERC20MinterBurnerDecimals::burnCall { amount },
                    true,
                )?;
                self.track_strv2(&[from]);
            }
            Owner::External => self.ledger.mint_coins(MODULE_NAME, &coin)?,
            Owner::Unspecified => return Err(Erc20Error::UndefinedOwner(pair.denom.clone())),
        }
        self.ledger.send_coins_from_module_to_account(MODULE_NAME, from, &coin)?;
        tracing::debug!(target: "erc20::evm_hook", ?from, %amount, denom = %pair.denom, "transfer to module mirrored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expected_keepers::EvmKeeper,
        test_utils::{setup_keeper, ALICE, AUTHORITY, EXTERNAL_TOKEN, MODULE_DENOM},
    };
    use alloy_primitives::B256;
    use alloy_sol_types::SolCall;
    use erc20_primitives::{MsgConvertCoin, MsgUpdateParams, Params};

    fn transfer_to_module(
        keeper: &mut Keeper<crate::test_utils::MockChain>,
        token: Address,
        from: Address,
        amount: u64,
    ) -> Receipt {
        let to = keeper.module_address();
        let call = IERC20::transferCall { to, amount: U256::from(amount) };
        let output = keeper
            .ledger_mut()
            .call_evm(from, token, call.abi_encode().into(), true)
            .expect("transfer to module");
        Receipt { tx_hash: B256::repeat_byte(0x11), logs: output.logs }
    }

    // === Test: Module Pair ===

    #[test]
    fn module_pair_transfer_releases_escrow() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(100));
        let msg = MsgConvertCoin {
            coin: Coin::new(MODULE_DENOM, U256::from(100)),
            receiver: ALICE,
            sender: ALICE,
        };
        keeper.convert_coin(&msg).expect("convert");

        let receipt = transfer_to_module(&mut keeper, pair.erc20_address, ALICE, 40);
        assert_eq!(keeper.post_tx_processing(&receipt), 1);

        let module = keeper.module_address();
        assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(40));
        assert_eq!(keeper.ledger().coin_balance(module, MODULE_DENOM), U256::from(60));
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, module), U256::ZERO);
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, ALICE), U256::from(60));
    }

    // === Test: External Pair ===

    #[test]
    fn external_pair_transfer_mints_coins() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_external_token().expect("register erc20");
        keeper.ledger_mut().mint_tokens(EXTERNAL_TOKEN, ALICE, U256::from(30));

        let receipt = transfer_to_module(&mut keeper, EXTERNAL_TOKEN, ALICE, 30);
        assert_eq!(keeper.post_tx_processing(&receipt), 1);

        let module = keeper.module_address();
        assert_eq!(keeper.ledger().coin_balance(ALICE, &pair.denom), U256::from(30));
        assert_eq!(keeper.ledger().token_balance(EXTERNAL_TOKEN, module), U256::from(30));
    }

    // === Test: Skipped Logs ===

    #[test]
    fn disabled_hook_or_pair_is_ignored() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_external_token().expect("register erc20");
        keeper.ledger_mut().mint_tokens(EXTERNAL_TOKEN, ALICE, U256::from(30));
        let receipt = transfer_to_module(&mut keeper, EXTERNAL_TOKEN, ALICE, 10);

        let params = Params { enable_erc20: true, enable_evm_hook: false };
        keeper.update_params(&MsgUpdateParams { authority: AUTHORITY, params }).expect("params");
        assert_eq!(keeper.post_tx_processing(&receipt), 0);

        keeper.update_params(&MsgUpdateParams { authority: AUTHORITY, params: Params::default() }).expect("params");
        keeper.toggle_conversion(AUTHORITY, &pair.denom).expect("toggle");
        assert_eq!(keeper.post_tx_processing(&receipt), 0);
        assert_eq!(keeper.ledger().coin_balance(ALICE, &pair.denom), U256::ZERO);
    }

    // === Test: Extension Pair ===

    #[test]
    fn extension_transfer_to_module_returns_coins() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(100));
        keeper.run_strv2_migration().expect("migration");
        assert!(keeper.ledger().active_extensions().contains(pair.erc20_address));

        let receipt = transfer_to_module(&mut keeper, pair.erc20_address, ALICE, 40);
        let module = keeper.module_address();
        assert_eq!(keeper.ledger().coin_balance(module, MODULE_DENOM), U256::from(40));

        assert_eq!(keeper.post_tx_processing(&receipt), 1);
        assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(100));
        assert!(keeper.ledger().coin_balance(module, MODULE_DENOM).is_zero());
    }

    #[test]
    fn failing_log_does_not_abort_the_rest() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(10));
        let msg = MsgConvertCoin {
            coin: Coin::new(MODULE_DENOM, U256::from(10)),
            receiver: ALICE,
            sender: ALICE,
        };
        keeper.convert_coin(&msg).expect("convert");

        // The first log claims more than the module escrows, so releasing coins fails.
        let mut forged = transfer_to_module(&mut keeper, pair.erc20_address, ALICE, 5);
        let mut oversized = forged.logs[0].clone();
        let module = keeper.module_address();
        oversized.data = IERC20::Transfer { from: ALICE, to: module, value: U256::from(1_000) }
            .encode_log_data();
        forged.logs.insert(0, oversized);

        assert_eq!(keeper.post_tx_processing(&forged), 1);
        assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(5));
    }
}
