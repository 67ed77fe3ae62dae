//! STRv2 migration scenarios across several holders.

use alloy_primitives::{address, U256};
use alloy_sol_types::SolCall;
use erc20_keeper::{
    test_utils::{SpanCollector, ALICE, BOB, MODULE_DENOM, WRAPPED_NATIVE},
    BankKeeper, ConversionOutcome, Erc20Error, EvmKeeper,
};
use erc20_precompiles::abi::IERC20;
use eyre::Result;

use crate::common::{
    coin_to_token, init_test_tracing, keeper_with_module_coin, token_total_supply, CAROL,
    INITIAL_COINS,
};

#[test]
fn test_migration_returns_every_holder_to_coins() -> Result<()> {
    init_test_tracing();
    let holders = [ALICE, BOB, CAROL];
    let (mut keeper, pair) = keeper_with_module_coin(&holders)?;
    for (i, holder) in holders.iter().enumerate() {
        keeper.convert_coin(&coin_to_token(&pair, 100 * (i as u64 + 1), *holder))?;
    }
    assert_eq!(token_total_supply(&mut keeper, pair.erc20_address)?, U256::from(600));

    let report = keeper.run_strv2_migration()?;
    assert_eq!(report.converted, 3);
    assert!(report.failures.is_empty());
    assert!(report.installed.contains(&pair.erc20_address));
    assert!(report.installed.contains(&WRAPPED_NATIVE));

    let module = keeper.module_address();
    assert!(keeper.ledger().get_all_balances(module).is_empty());
    for holder in holders {
        assert_eq!(keeper.ledger().coin_balance(holder, MODULE_DENOM), U256::from(INITIAL_COINS));
        // The extension reports the coin balance as the token balance.
        assert_eq!(keeper.balance_of(pair.erc20_address, holder)?, U256::from(INITIAL_COINS));
    }

    // Conversions are no-ops once the pair is served natively.
    let outcome = keeper.convert_coin(&coin_to_token(&pair, 10, ALICE))?;
    assert_eq!(outcome, ConversionOutcome::NativeExtension);
    assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(INITIAL_COINS));
    Ok(())
}

#[test]
fn test_extension_transfer_moves_coins() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE, BOB])?;
    keeper.convert_coin(&coin_to_token(&pair, 300, ALICE))?;
    keeper.run_strv2_migration()?;

    let call = IERC20::transferCall { to: BOB, amount: U256::from(250) };
    keeper.ledger_mut().call_evm(ALICE, pair.erc20_address, call.abi_encode().into(), true)?;

    assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(INITIAL_COINS - 250));
    assert_eq!(keeper.ledger().coin_balance(BOB, MODULE_DENOM), U256::from(INITIAL_COINS + 250));
    assert_eq!(keeper.ledger().token_balance(pair.erc20_address, BOB), U256::from(INITIAL_COINS + 250));
    Ok(())
}

#[test]
fn test_untracked_balance_aborts_migration() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE, BOB])?;
    keeper.convert_coin(&coin_to_token(&pair, 100, ALICE))?;
    keeper.convert_coin(&coin_to_token(&pair, 100, BOB))?;

    let stranger = address!("0x00000000000000000000000000000000000000d4");
    let call = IERC20::transferCall { to: stranger, amount: U256::from(30) };
    keeper.ledger_mut().call_evm(BOB, pair.erc20_address, call.abi_encode().into(), true)?;

    match keeper.run_strv2_migration() {
        Err(err @ Erc20Error::MigrationResidue(_)) => assert!(err.is_fatal()),
        other => panic!("expected MigrationResidue, got {other:?}"),
    }

    // Nothing moved: ALICE keeps the tokens and the module still escrows every coin.
    let module = keeper.module_address();
    assert_eq!(keeper.ledger().token_balance(pair.erc20_address, ALICE), U256::from(100));
    assert_eq!(keeper.ledger().coin_balance(module, MODULE_DENOM), U256::from(200));
    assert!(!keeper.is_erc20_registered(WRAPPED_NATIVE));
    assert!(keeper.ledger().active_extensions().is_empty());
    Ok(())
}

#[test]
fn test_migration_span_records_counts() -> Result<()> {
    let collector = SpanCollector::new();
    let _guard = collector.as_default();

    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE, BOB])?;
    keeper.convert_coin(&coin_to_token(&pair, 5, ALICE))?;
    keeper.run_strv2_migration()?;

    let span = collector
        .find_span("run_strv2_migration")
        .ok_or_else(|| eyre::eyre!("run_strv2_migration span not recorded"))?;
    assert!(span.has_field("pairs"), "missing pairs field: {span:?}");
    assert!(span.has_field("holders"), "missing holders field: {span:?}");
    Ok(())
}
