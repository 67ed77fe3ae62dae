//! Owner-gated supply operations on native-coin pairs.

use alloy_primitives::{Address, U256};
use erc20_primitives::{Coin, Erc20Event, TokenPair, MODULE_NAME};
use tracing::instrument;

use crate::{error::Erc20Error, expected_keepers::Ledger, keeper::Keeper};

impl<L: Ledger> Keeper<L> {
    /// Mints `amount` coins of the pair resolved by `token` to `to`.
    ///
    /// `sender` must be the pair's owner account and pass the conversion eligibility checks.
    #[instrument(skip_all, fields(%token, %amount))]
    pub fn mint_coins(
        &mut self,
        sender: Address,
        to: Address,
        amount: U256,
        token: &str,
    ) -> Result<(), Erc20Error> {
        self.with_checkpoint(|keeper| {
            let pair = keeper.conversion_eligible(sender, to, token)?;
            ensure_native_coin(&pair, "minting", token)?;
            ensure_owner(&pair, sender)?;

            let coin = Coin::new(pair.denom.clone(), amount);
            keeper.ledger.mint_coins(MODULE_NAME, &coin)?;
            keeper.ledger.send_coins_from_module_to_account(MODULE_NAME, to, &coin)?;

            tracing::info!(target: "erc20::owner", ?sender, ?to, %amount, denom = %pair.denom, "coins minted");
            keeper.emit(Erc20Event::Mint { sender, to, amount, denom: pair.denom });
            Ok(())
        })
    }

    /// Burns `amount` coins of the pair resolved by `token` from `sender`.
    #[instrument(skip_all, fields(%token, %amount))]
    pub fn burn_coins(&mut self, sender: Address, amount: U256, token: &str) -> Result<(), Erc20Error> {
        self.with_checkpoint(|keeper| {
            let pair = keeper.token_pair_by_token(token)?;
            ensure_native_coin(&pair, "burning", token)?;
            ensure_owner(&pair, sender)?;

            let coin = Coin::new(pair.denom.clone(), amount);
            keeper.ledger.send_coins_from_account_to_module(sender, MODULE_NAME, &coin)?;
            keeper.ledger.burn_coins(MODULE_NAME, &coin)?;

            tracing::info!(target: "erc20::owner", ?sender, %amount, denom = %pair.denom, "coins burned");
            keeper.emit(Erc20Event::Burn { sender, amount, denom: pair.denom });
            Ok(())
        })
    }

    /// Hands the owner account of a native-coin pair to `new_owner`.
    #[instrument(skip_all, fields(%token, ?new_owner))]
    pub fn transfer_ownership(
        &mut self,
        authority: Address,
        token: &str,
        new_owner: Address,
    ) -> Result<TokenPair, Erc20Error> {
        self.ensure_authority(authority)?;
        let mut pair = self.token_pair_by_token(token)?;
        ensure_native_coin(&pair, "transferring ownership of", token)?;

        pair.owner_address = new_owner;
        self.set_token_pair(&pair);
        tracing::info!(target: "erc20::owner", denom = %pair.denom, ?new_owner, "ownership transferred");
        self.emit(Erc20Event::TransferOwnership { denom: pair.denom.clone(), new_owner });
        Ok(pair)
    }

    /// Returns the owner account of the pair resolved by `token`, if any.
    pub fn owner_address(&self, token: &str) -> Option<Address> {
        self.token_pair_by_token(token)
            .ok()
            .map(|pair| pair.owner_address)
            .filter(|owner| !owner.is_zero())
    }
}

fn ensure_native_coin(pair: &TokenPair, action: &str, token: &str) -> Result<(), Erc20Error> {
    if pair.is_native_coin() {
        Ok(())
    } else {
        Err(Erc20Error::Unauthorized(format!("{action} token '{token}' is not enabled")))
    }
}

fn ensure_owner(pair: &TokenPair, sender: Address) -> Result<(), Erc20Error> {
    if !pair.owner_address.is_zero() && pair.owner_address == sender {
        Ok(())
    } else {
        Err(Erc20Error::Unauthorized(format!("{sender} is not the owner of {}", pair.denom)))
    }
}
