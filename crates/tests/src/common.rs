//! Common test utilities and fixtures for the scenario tests.
//!
//! This module provides shared setup and balance helpers on top of the keeper's in-memory
//! chain so each scenario reads as a sequence of module operations.

use alloy_primitives::{address, Address, U256};
use alloy_sol_types::{SolCall, SolValue};
use erc20_keeper::{
    test_utils::{setup_keeper, MockChain, ALICE, MODULE_DENOM},
    EvmKeeper, Keeper,
};
use erc20_precompiles::abi::IERC20;
use erc20_primitives::{Coin, MsgConvertCoin, MsgConvertErc20, TokenPair};
use eyre::{eyre, Result};
use tracing_subscriber::EnvFilter;

// Test constants
/// Third holder used by the migration scenarios.
pub const CAROL: Address = address!("0x00000000000000000000000000000000000000c3");
/// Amount funded to every holder.
pub const INITIAL_COINS: u64 = 1_000;

/// Installs a fmt subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Keeper with [`MODULE_DENOM`] registered and [`INITIAL_COINS`] funded to each of `holders`.
pub fn keeper_with_module_coin(holders: &[Address]) -> Result<(Keeper<MockChain>, TokenPair)> {
    let mut keeper = setup_keeper();
    let pair = keeper.register_module_coin()?;
    for holder in holders {
        keeper.ledger_mut().fund(*holder, MODULE_DENOM, U256::from(INITIAL_COINS));
    }
    Ok((keeper, pair))
}

/// Coin and token balance of `holder` for `pair`.
pub fn holdings(keeper: &Keeper<MockChain>, pair: &TokenPair, holder: Address) -> (U256, U256) {
    let ledger = keeper.ledger();
    (ledger.coin_balance(holder, &pair.denom), ledger.token_balance(pair.erc20_address, holder))
}

/// Sum of both representations held by `holder`.
pub fn combined(keeper: &Keeper<MockChain>, pair: &TokenPair, holder: Address) -> U256 {
    let (coins, tokens) = holdings(keeper, pair, holder);
    coins + tokens
}

/// Self conversion of `amount` coins of `pair` into tokens.
pub fn coin_to_token(pair: &TokenPair, amount: u64, holder: Address) -> MsgConvertCoin {
    MsgConvertCoin {
        coin: Coin::new(pair.denom.clone(), U256::from(amount)),
        receiver: holder,
        sender: holder,
    }
}

/// Self conversion of `amount` tokens of `pair` into coins.
pub fn token_to_coin(pair: &TokenPair, amount: u64, holder: Address) -> MsgConvertErc20 {
    MsgConvertErc20 {
        contract_address: pair.erc20_address,
        amount: U256::from(amount),
        receiver: holder,
        sender: holder,
    }
}

/// Reads `totalSupply()` of `contract` without committing.
pub fn token_total_supply(keeper: &mut Keeper<MockChain>, contract: Address) -> Result<U256> {
    let call = IERC20::totalSupplyCall {};
    let output = keeper.ledger_mut().call_evm(ALICE, contract, call.abi_encode().into(), false)?;
    U256::abi_decode(&output.ret).map_err(|err| eyre!("invalid totalSupply return data: {err}"))
}
