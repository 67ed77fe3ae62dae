//! Single Token Representation v2 migration.
//!
//! Moves every native-coin pair off its legacy minter/burner contract:
//!
//! 1. register the wrapped native token as a module pair of the EVM denom
//! 2. unwrap every wrapped native balance for its holder
//! 3. convert every legacy token balance of the other native-coin pairs back into coins
//! 4. require the module account to hold no coins
//! 5. install native extensions for every module pair
//!
//! Steps 2 and 3 run each item in its own checkpoint and record failures without stopping.
//! The whole run shares one outer checkpoint, so a residue in step 4 leaves no trace.

use alloy_primitives::{Address, U256};
use erc20_precompiles::abi::IWrappedNative;
use erc20_primitives::{Owner, TokenPair};
use std::collections::BTreeSet;
use tracing::instrument;

use crate::{error::Erc20Error, expected_keepers::Ledger, keeper::Keeper};

/// A per-item failure that did not stop the migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    /// Account whose balance could not be moved.
    pub account: Address,
    /// Denom of the pair being migrated.
    pub denom: String,
    /// Rendered error.
    pub reason: String,
}

/// Summary of a completed migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Wrapped native balances unwrapped for their holders.
    pub withdrawn: usize,
    /// Legacy token balances converted back into coins.
    pub converted: usize,
    /// Items skipped because of an error.
    pub failures: Vec<MigrationFailure>,
    /// Addresses that now serve a native extension.
    pub installed: Vec<Address>,
}

impl<L: Ledger> Keeper<L> {
    /// Runs the STRv2 migration.
    ///
    /// Fails with [`Erc20Error::MigrationResidue`] if the module account still holds coins
    /// after the conversions.
    #[instrument(skip(self), fields(pairs = tracing::field::Empty, holders = tracing::field::Empty))]
    pub fn run_strv2_migration(&mut self) -> Result<MigrationReport, Erc20Error> {
        self.with_checkpoint(|keeper| {
            let mut report = MigrationReport::default();

            keeper.register_wrapped_native_pair()?;
            let wrapped = keeper.config.wrapped_native;
            let native_pairs = keeper
                .token_pairs()
                .filter(|pair| {
                    pair.as_ref()
                        .map_or(true, |pair| pair.is_native_coin() && pair.erc20_address != wrapped)
                })
                .collect::<Result<Vec<_>, _>>()?;
            let holders = keeper.migration_holders();
            tracing::Span::current().record("pairs", native_pairs.len());
            tracing::Span::current().record("holders", holders.len());

            keeper.withdraw_wrapped_native(&holders, &mut report);
            for pair in &native_pairs {
                keeper.convert_pair_balances(pair, &holders, &mut report);
            }

            let residue = keeper.ledger.get_all_balances(keeper.module_address());
            if residue.iter().any(|coin| !coin.is_zero()) {
                tracing::error!(target: "erc20::migration", ?residue, "module account not empty after migration");
                return Err(Erc20Error::MigrationResidue(residue));
            }

            report.installed = keeper.install_extensions_for_all_pairs()?;
            tracing::info!(
                target: "erc20::migration",
                withdrawn = report.withdrawn,
                converted = report.converted,
                failures = report.failures.len(),
                installed = report.installed.len(),
                "STRv2 migration completed"
            );
            Ok(report)
        })
    }

    fn register_wrapped_native_pair(&mut self) -> Result<(), Erc20Error> {
        let wrapped = self.config.wrapped_native;
        if wrapped.is_zero() {
            tracing::warn!(target: "erc20::migration", "no wrapped native contract configured");
            return Ok(());
        }
        if self.is_erc20_registered(wrapped) {
            return Ok(());
        }
        let pair = TokenPair::new(wrapped, self.config.evm_denom.clone(), Owner::Module);
        self.register_token_pair(pair)?;
        Ok(())
    }

    /// Every known account plus every tracked address, without the module account.
    fn migration_holders(&self) -> Vec<Address> {
        let module = self.module_address();
        let holders: BTreeSet<Address> =
            self.ledger.accounts().chain(self.strv2_addresses()).filter(|a| *a != module).collect();
        holders.into_iter().collect()
    }

    fn withdraw_wrapped_native(&mut self, holders: &[Address], report: &mut MigrationReport) {
        let wrapped = self.config.wrapped_native;
        let deployed = self.ledger.evm_account(wrapped).is_some_and(|account| account.is_contract());
        if wrapped.is_zero() || !deployed {
            return;
        }

        for &holder in holders {
            let result = self.with_checkpoint(|keeper| {
                let balance = keeper.balance_of(wrapped, holder)?;
                if balance.is_zero() {
                    return Ok(false);
                }
                keeper.call_contract(holder, wrapped, &IWrappedNative::withdrawCall { wad: balance }, true)?;
                tracing::debug!(target: "erc20::migration", ?holder, %balance, "wrapped native withdrawn");
                Ok(true)
            });
            match result {
                Ok(true) => report.withdrawn += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(target: "erc20::migration", ?holder, %err, "failed to withdraw wrapped native");
                    report.failures.push(MigrationFailure {
                        account: holder,
                        denom: self.config.evm_denom.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn convert_pair_balances(
        &mut self,
        pair: &TokenPair,
        holders: &[Address],
        report: &mut MigrationReport,
    ) {
        if self.ledger.active_extensions().contains(pair.erc20_address) {
            return;
        }
        for &holder in holders {
            let result = self.with_checkpoint(|keeper| {
                let balance = keeper.balance_of(pair.erc20_address, holder)?;
                if balance.is_zero() {
                    return Ok(U256::ZERO);
                }
                keeper.convert_erc20_for_pair(pair, balance, holder, holder)?;
                Ok(balance)
            });
            match result {
                Ok(balance) if balance.is_zero() => {}
                Ok(balance) => {
                    report.converted += 1;
                    tracing::debug!(target: "erc20::migration", ?holder, %balance, denom = %pair.denom, "legacy balance converted");
                }
                Err(err) => {
                    tracing::warn!(target: "erc20::migration", ?holder, denom = %pair.denom, %err, "failed to convert legacy balance");
                    report.failures.push(MigrationFailure {
                        account: holder,
                        denom: pair.denom.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expected_keepers::EvmKeeper,
        test_utils::{setup_keeper, ALICE, BOB, MODULE_DENOM, WRAPPED_NATIVE},
    };
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;
    use erc20_precompiles::abi::IERC20;
    use erc20_primitives::{Coin, MsgConvertCoin};

    const CAROL: Address = address!("0x00000000000000000000000000000000000000c3");

    fn convert(keeper: &mut Keeper<crate::test_utils::MockChain>, holder: Address, amount: u64) {
        keeper.ledger_mut().fund(holder, MODULE_DENOM, U256::from(amount));
        let msg = MsgConvertCoin {
            coin: Coin::new(MODULE_DENOM, U256::from(amount)),
            receiver: holder,
            sender: holder,
        };
        keeper.convert_coin(&msg).expect("convert coin");
    }

    // === Test: Full Migration ===

    #[test]
    fn migration_returns_legacy_balances_as_coins() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        convert(&mut keeper, ALICE, 10);
        convert(&mut keeper, BOB, 20);
        keeper.ledger_mut().fund(CAROL, "aevm", U256::from(5));
        keeper.ledger_mut().wrap_native(CAROL, U256::from(5));

        let report = keeper.run_strv2_migration().expect("migration");

        assert_eq!(report.converted, 2);
        assert_eq!(report.withdrawn, 1);
        assert!(report.failures.is_empty());
        assert!(report.installed.contains(&pair.erc20_address));
        assert!(report.installed.contains(&WRAPPED_NATIVE));

        let module = keeper.module_address();
        assert!(keeper.ledger().coin_balance(module, MODULE_DENOM).is_zero());
        assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(10));
        assert_eq!(keeper.ledger().coin_balance(BOB, MODULE_DENOM), U256::from(20));
        assert_eq!(keeper.ledger().coin_balance(CAROL, "aevm"), U256::from(5));
        assert_eq!(keeper.token_pair_by_token("aevm").expect("wrapped pair").erc20_address, WRAPPED_NATIVE);
        assert!(keeper.ledger().active_extensions().contains(WRAPPED_NATIVE));
    }

    // === Test: Untracked Holder Leaves Residue ===

    #[test]
    fn untracked_holder_fails_migration_without_side_effects() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");
        convert(&mut keeper, ALICE, 10);

        // A plain EVM transfer bypasses the keeper, so the recipient is never tracked.
        let untracked = address!("0x00000000000000000000000000000000000000d4");
        let call = IERC20::transferCall { to: untracked, amount: U256::from(4) };
        keeper
            .ledger_mut()
            .call_evm(ALICE, pair.erc20_address, call.abi_encode().into(), true)
            .expect("evm transfer");

        match keeper.run_strv2_migration() {
            Err(err @ Erc20Error::MigrationResidue(_)) => {
                assert!(err.is_fatal());
                assert!(err.to_string().contains(&format!("4{MODULE_DENOM}")));
            }
            other => panic!("expected MigrationResidue, got {other:?}"),
        }
        assert_eq!(keeper.ledger().token_balance(pair.erc20_address, ALICE), U256::from(6));
        assert!(!keeper.is_erc20_registered(WRAPPED_NATIVE));
        assert!(keeper.ledger().active_extensions().is_empty());
    }

    #[test]
    fn failing_withdrawal_is_recorded_and_skipped() {
        let mut keeper = setup_keeper();
        keeper.ledger_mut().fund(CAROL, "aevm", U256::from(5));
        keeper.ledger_mut().wrap_native(CAROL, U256::from(5));
        keeper.ledger_mut().block_address(CAROL);

        let report = keeper.run_strv2_migration().expect("migration");

        assert_eq!(report.withdrawn, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].account, CAROL);
        assert_eq!(report.failures[0].denom, "aevm");
        assert_eq!(report.installed, vec![WRAPPED_NATIVE]);
    }

    #[test]
    fn failing_holder_leaves_residue() {
        let mut keeper = setup_keeper();
        keeper.register_module_coin().expect("register coin");
        convert(&mut keeper, ALICE, 10);
        convert(&mut keeper, BOB, 10);
        keeper.ledger_mut().block_address(BOB);

        match keeper.run_strv2_migration() {
            Err(Erc20Error::MigrationResidue(residue)) => {
                assert_eq!(residue, vec![Coin::new(MODULE_DENOM, U256::from(10))]);
            }
            other => panic!("expected MigrationResidue, got {other:?}"),
        }
    }
}
