//! Conversion engine: the eligibility check and the four directional algorithms.
//!
//! | Direction | Owner | Steps |
//! |-----------|-------|-------|
//! | coin → token | module | escrow coin, mint token to receiver, check receiver token delta |
//! | token → coin | module | burn sender token, release escrowed coin, check both deltas |
//! | token → coin | external | move token into module escrow, mint coin, check both deltas |
//! | coin → token | external | escrow coin, release escrowed token, burn coin, check token delta |
//!
//! Every public entry point runs inside one checkpoint: a failed post-condition reverts the
//! escrow and mint steps that preceded it.

use alloy_primitives::{Address, Log, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use erc20_precompiles::abi::{IERC20MinterBurnerDecimals, IERC20};
use erc20_primitives::{
    Coin, Erc20Event, MsgConvertCoin, MsgConvertErc20, Owner, TokenPair, MODULE_NAME,
};
use tracing::instrument;

use crate::{
    error::Erc20Error,
    expected_keepers::Ledger,
    keeper::{decode_failure, Keeper},
};

/// Which path a successful conversion took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Balances moved between the two representations.
    Converted,
    /// The backing contract no longer exists; the pair was removed and nothing moved.
    PairDeleted,
    /// The pair is served by a native extension whose token balance is the coin balance.
    NativeExtension,
}

fn expect_balance(what: &'static str, expected: Option<U256>, actual: U256) -> Result<(), Erc20Error> {
    let expected = expected.ok_or(Erc20Error::Overflow(what))?;
    if expected == actual {
        Ok(())
    } else {
        tracing::error!(target: "erc20::conversion", what, %expected, %actual, "balance invariance violated");
        Err(Erc20Error::BalanceInvariance { what, expected, actual })
    }
}

impl<L: Ledger> Keeper<L> {
    /// Checks that `sender` may convert `token` for `receiver` and returns the resolved pair.
    ///
    /// Checks, in order: module enabled, pair registered, pair enabled, receiver not blocked,
    /// and third-party sends allowed for the denom when `sender != receiver`.
    pub fn conversion_eligible(
        &self,
        sender: Address,
        receiver: Address,
        token: &str,
    ) -> Result<TokenPair, Erc20Error> {
        if !self.params.enable_erc20 {
            return Err(Erc20Error::ModuleDisabled);
        }
        let pair = self.token_pair_by_token(token)?;
        if !pair.enabled {
            return Err(Erc20Error::PairDisabled(token.to_string()));
        }
        if self.ledger.blocked_addr(receiver) {
            return Err(Erc20Error::Unauthorized(format!(
                "{receiver} is not allowed to receive funds"
            )));
        }
        if sender != receiver && !self.ledger.is_send_enabled(&pair.denom) {
            return Err(Erc20Error::TransfersDisabled(pair.denom));
        }
        Ok(pair)
    }

    /// Converts a bank coin into its contract representation.
    #[instrument(skip(self, msg), fields(
        denom = %msg.coin.denom,
        amount = %msg.coin.amount,
        outcome = tracing::field::Empty,
    ))]
    pub fn convert_coin(&mut self, msg: &MsgConvertCoin) -> Result<ConversionOutcome, Erc20Error> {
        msg.validate_basic()?;
        let outcome = self.with_checkpoint(|keeper| {
            let pair = keeper.conversion_eligible(msg.sender, msg.receiver, &msg.coin.denom)?;
            keeper.convert_coin_for_pair(&pair, msg.coin.amount, msg.sender, msg.receiver)
        })?;
        tracing::Span::current().record("outcome", tracing::field::debug(outcome));
        Ok(outcome)
    }

    /// Converts contract tokens into the bank coin representation.
    #[instrument(skip(self, msg), fields(
        contract = %msg.contract_address,
        amount = %msg.amount,
        outcome = tracing::field::Empty,
    ))]
    pub fn convert_erc20(&mut self, msg: &MsgConvertErc20) -> Result<ConversionOutcome, Erc20Error> {
        msg.validate_basic()?;
        let outcome = self.with_checkpoint(|keeper| {
            let token = msg.contract_address.to_string();
            let pair = keeper.conversion_eligible(msg.sender, msg.receiver, &token)?;
            keeper.convert_erc20_for_pair(&pair, msg.amount, msg.sender, msg.receiver)
        })?;
        tracing::Span::current().record("outcome", tracing::field::debug(outcome));
        Ok(outcome)
    }

    /// Dispatches a coin → token conversion on an already eligible pair.
    pub(crate) fn convert_coin_for_pair(
        &mut self,
        pair: &TokenPair,
        amount: U256,
        sender: Address,
        receiver: Address,
    ) -> Result<ConversionOutcome, Erc20Error> {
        if let Some(outcome) = self.check_backing_contract(pair)? {
            return Ok(outcome);
        }
        match pair.contract_owner {
            Owner::Module => self.convert_coin_native_coin(pair, amount, sender, receiver)?,
            Owner::External => self.convert_coin_native_erc20(pair, amount, sender, receiver)?,
            Owner::Unspecified => return Err(Erc20Error::UndefinedOwner(pair.denom.clone())),
        }
        Ok(ConversionOutcome::Converted)
    }

    /// Dispatches a token → coin conversion on an already eligible pair.
    pub(crate) fn convert_erc20_for_pair(
        &mut self,
        pair: &TokenPair,
        amount: U256,
        sender: Address,
        receiver: Address,
    ) -> Result<ConversionOutcome, Erc20Error> {
        if let Some(outcome) = self.check_backing_contract(pair)? {
            return Ok(outcome);
        }
        match pair.contract_owner {
            Owner::Module => self.convert_erc20_native_coin(pair, amount, sender, receiver)?,
            Owner::External => self.convert_erc20_native_token(pair, amount, sender, receiver)?,
            Owner::Unspecified => return Err(Erc20Error::UndefinedOwner(pair.denom.clone())),
        }
        Ok(ConversionOutcome::Converted)
    }

    /// Short-circuits pairs that are served by an extension or whose contract is gone.
    fn check_backing_contract(
        &mut self,
        pair: &TokenPair,
    ) -> Result<Option<ConversionOutcome>, Erc20Error> {
        if pair.is_native_coin() && self.ledger.active_extensions().contains(pair.erc20_address) {
            return Ok(Some(ConversionOutcome::NativeExtension));
        }
        let is_contract =
            self.ledger.evm_account(pair.erc20_address).is_some_and(|account| account.is_contract());
        if is_contract {
            return Ok(None);
        }

        tracing::warn!(
            target: "erc20::conversion",
            denom = %pair.denom,
            erc20 = ?pair.erc20_address,
            "token contract no longer exists, deleting pair"
        );
        self.delete_token_pair(pair);
        self.emit(Erc20Event::DeletePair {
            denom: pair.denom.clone(),
            erc20_address: pair.erc20_address,
        });
        Ok(Some(ConversionOutcome::PairDeleted))
    }

    /// coin → token for a module-owned pair.
    fn convert_coin_native_coin(
        &mut self,
        pair: &TokenPair,
        amount: U256,
        sender: Address,
        receiver: Address,
    ) -> Result<(), Erc20Error> {
        let contract = pair.erc20_address;
        let coin = Coin::new(pair.denom.clone(), amount);
        let token_before = self.balance_of(contract, receiver)?;

        self.ledger.send_coins_from_account_to_module(sender, MODULE_NAME, &coin)?;
        self.call_contract(
            self.module_address(),
            contract,
            &IERC20MinterBurnerDecimals::mintCall { to: receiver, amount },
            true,
        )?;

        let token_after = self.balance_of(contract, receiver)?;
        expect_balance("receiver token balance", token_before.checked_add(amount), token_after)?;

        self.track_strv2(&[sender, receiver]);
        self.emit_convert_coin(pair, amount, sender, receiver);
        Ok(())
    }

    /// token → coin for a module-owned pair.
    fn convert_erc20_native_coin(
        &mut self,
        pair: &TokenPair,
        amount: U256,
        sender: Address,
        receiver: Address,
    ) -> Result<(), Erc20Error> {
        let contract = pair.erc20_address;
        let coin = Coin::new(pair.denom.clone(), amount);
        let coin_before = self.ledger.get_balance(receiver, &pair.denom).amount;
        let token_before = self.balance_of(contract, sender)?;

        self.call_contract(
            self.module_address(),
            contract,
            &IERC20MinterBurnerDecimals::burnCoinsCall { from: sender, amount },
            true,
        )?;
        self.ledger.send_coins_from_module_to_account(MODULE_NAME, receiver, &coin)?;

        let coin_after = self.ledger.get_balance(receiver, &pair.denom).amount;
        expect_balance("receiver coin balance", coin_before.checked_add(amount), coin_after)?;
        let token_after = self.balance_of(contract, sender)?;
        expect_balance("sender token balance", token_before.checked_sub(amount), token_after)?;

        self.track_strv2(&[sender, receiver]);
        self.emit_convert_erc20(pair, amount, sender, receiver);
        Ok(())
    }

    /// token → coin for an externally owned pair.
    fn convert_erc20_native_token(
        &mut self,
        pair: &TokenPair,
        amount: U256,
        sender: Address,
        receiver: Address,
    ) -> Result<(), Erc20Error> {
        let contract = pair.erc20_address;
        let module = self.module_address();
        let coin = Coin::new(pair.denom.clone(), amount);
        let escrow_before = self.balance_of(contract, module)?;
        let coin_before = self.ledger.get_balance(receiver, &pair.denom).amount;

        let output =
            self.call_contract(sender, contract, &IERC20::transferCall { to: module, amount }, true)?;
        ensure_transfer_succeeded(contract, &output.ret)?;

        let escrow_after = self.balance_of(contract, module)?;
        expect_balance("module escrow balance", escrow_before.checked_add(amount), escrow_after)?;

        self.ledger.mint_coins(MODULE_NAME, &coin)?;
        self.ledger.send_coins_from_module_to_account(MODULE_NAME, receiver, &coin)?;

        let coin_after = self.ledger.get_balance(receiver, &pair.denom).amount;
        expect_balance("receiver coin balance", coin_before.checked_add(amount), coin_after)?;

        ensure_no_approval(contract, &output.logs)?;
        self.emit_convert_erc20(pair, amount, sender, receiver);
        Ok(())
    }

    /// coin → token for an externally owned pair.
    fn convert_coin_native_erc20(
        &mut self,
        pair: &TokenPair,
        amount: U256,
        sender: Address,
        receiver: Address,
    ) -> Result<(), Erc20Error> {
        let contract = pair.erc20_address;
        let coin = Coin::new(pair.denom.clone(), amount);
        let token_before = self.balance_of(contract, receiver)?;

        self.ledger.send_coins_from_account_to_module(sender, MODULE_NAME, &coin)?;
        let output = self.call_contract(
            self.module_address(),
            contract,
            &IERC20::transferCall { to: receiver, amount },
            true,
        )?;
        ensure_transfer_succeeded(contract, &output.ret)?;

        let token_after = self.balance_of(contract, receiver)?;
        expect_balance("receiver token balance", token_before.checked_add(amount), token_after)?;

        self.ledger.burn_coins(MODULE_NAME, &coin)?;

        ensure_no_approval(contract, &output.logs)?;
        self.emit_convert_coin(pair, amount, sender, receiver);
        Ok(())
    }

    fn emit_convert_coin(&mut self, pair: &TokenPair, amount: U256, sender: Address, receiver: Address) {
        tracing::debug!(target: "erc20::conversion", ?sender, ?receiver, %amount, denom = %pair.denom, "coin converted");
        self.emit(Erc20Event::ConvertCoin {
            sender,
            receiver,
            amount,
            denom: pair.denom.clone(),
            erc20_address: pair.erc20_address,
        });
    }

    fn emit_convert_erc20(&mut self, pair: &TokenPair, amount: U256, sender: Address, receiver: Address) {
        tracing::debug!(target: "erc20::conversion", ?sender, ?receiver, %amount, denom = %pair.denom, "erc20 converted");
        self.emit(Erc20Event::ConvertErc20 {
            sender,
            receiver,
            amount,
            denom: pair.denom.clone(),
            contract_address: pair.erc20_address,
        });
    }
}

fn ensure_transfer_succeeded(contract: Address, ret: &[u8]) -> Result<(), Erc20Error> {
    let succeeded = bool::abi_decode(ret)
        .map_err(|err| decode_failure(contract, IERC20::transferCall::SIGNATURE, err))?;
    if succeeded {
        Ok(())
    } else {
        Err(Erc20Error::ContractCallFailed {
            contract,
            method: IERC20::transferCall::SIGNATURE,
            reason: "transfer returned false".to_string(),
        })
    }
}

/// A conversion transfer never approves anything; an `Approval` log means the token contract
/// is doing more than it claims.
fn ensure_no_approval(contract: Address, logs: &[Log]) -> Result<(), Erc20Error> {
    let approval = logs
        .iter()
        .any(|log| log.data.topics().first() == Some(&IERC20::Approval::SIGNATURE_HASH));
    if approval {
        tracing::warn!(target: "erc20::conversion", ?contract, "unexpected Approval event in conversion");
        return Err(Erc20Error::UnexpectedEvent { contract, event: "Approval" });
    }
    Ok(())
}
