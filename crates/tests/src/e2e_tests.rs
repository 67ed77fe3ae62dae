use alloy_primitives::U256;
use erc20_keeper::{
    test_utils::{
        coin_metadata, packet, setup_keeper, MockTransferApp, ALICE, AUTHORITY, BOB,
        EXTERNAL_TOKEN, MODULE_DENOM, TOKEN_A,
    },
    BankKeeper, ConversionOutcome, Erc20Error, Erc20Middleware, EvmKeeper,
};
use erc20_primitives::{Acknowledgement, Coin, Erc20Event, MsgTransfer, Owner, TokenPair};
use eyre::Result;

use crate::common::{
    coin_to_token, combined, holdings, init_test_tracing, keeper_with_module_coin,
    token_to_coin, token_total_supply, INITIAL_COINS,
};

#[test]
fn test_conversions_conserve_holder_balance() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE])?;
    let total = combined(&keeper, &pair, ALICE);

    keeper.convert_coin(&coin_to_token(&pair, 300, ALICE))?;
    assert_eq!(combined(&keeper, &pair, ALICE), total);
    keeper.convert_erc20(&token_to_coin(&pair, 120, ALICE))?;
    assert_eq!(combined(&keeper, &pair, ALICE), total);

    // Every outstanding token is backed by an escrowed coin.
    let module = keeper.module_address();
    let supply = token_total_supply(&mut keeper, pair.erc20_address)?;
    assert_eq!(supply, U256::from(180));
    assert_eq!(keeper.ledger().coin_balance(module, MODULE_DENOM), supply);

    // Same for a contract-native token, whose escrow sits on the contract side.
    let external = keeper.register_external_token()?;
    keeper.ledger_mut().mint_tokens(EXTERNAL_TOKEN, ALICE, U256::from(500));
    let total = combined(&keeper, &external, ALICE);
    keeper.convert_erc20(&token_to_coin(&external, 200, ALICE))?;
    assert_eq!(combined(&keeper, &external, ALICE), total);
    keeper.convert_coin(&coin_to_token(&external, 50, ALICE))?;
    assert_eq!(combined(&keeper, &external, ALICE), total);
    assert_eq!(keeper.ledger().token_balance(EXTERNAL_TOKEN, module), U256::from(150));
    assert_eq!(keeper.ledger().supply_of(&external.denom), U256::from(150));

    Ok(())
}

#[test]
fn test_round_trip_restores_balances() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE])?;
    let before = holdings(&keeper, &pair, ALICE);

    keeper.convert_coin(&coin_to_token(&pair, 250, ALICE))?;
    assert_ne!(holdings(&keeper, &pair, ALICE), before);
    keeper.convert_erc20(&token_to_coin(&pair, 250, ALICE))?;

    assert_eq!(holdings(&keeper, &pair, ALICE), before);
    assert!(keeper.ledger().get_all_balances(keeper.module_address()).is_empty());
    Ok(())
}

#[test]
fn test_registry_rejects_duplicates() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[])?;

    let same_address = TokenPair::new(pair.erc20_address, "bcoin".into(), Owner::Module);
    let same_denom = TokenPair::new(TOKEN_A, MODULE_DENOM.into(), Owner::External);
    for duplicate in [same_address, same_denom] {
        match keeper.register_token_pair(duplicate) {
            Err(Erc20Error::AlreadyExists(_)) => {}
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }
    match keeper.register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18)) {
        Err(Erc20Error::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    keeper.register_external_token()?;
    match keeper.register_external_token() {
        Err(Erc20Error::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    let pairs = keeper.token_pairs().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(pairs.len(), 2);
    Ok(())
}

#[test]
fn test_disabled_pair_rejects_both_directions() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE])?;
    keeper.convert_coin(&coin_to_token(&pair, 40, ALICE))?;
    keeper.toggle_conversion(AUTHORITY, MODULE_DENOM)?;
    let before = holdings(&keeper, &pair, ALICE);

    match keeper.convert_coin(&coin_to_token(&pair, 10, ALICE)) {
        Err(Erc20Error::PairDisabled(_)) => {}
        other => panic!("expected PairDisabled, got {other:?}"),
    }
    match keeper.convert_erc20(&token_to_coin(&pair, 10, ALICE)) {
        Err(Erc20Error::PairDisabled(_)) => {}
        other => panic!("expected PairDisabled, got {other:?}"),
    }

    assert_eq!(holdings(&keeper, &pair, ALICE), before);
    Ok(())
}

#[test]
fn test_self_destructed_contract_deletes_pair() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE])?;
    keeper.ledger_mut().delete_account(pair.erc20_address)?;

    let outcome = keeper.convert_coin(&coin_to_token(&pair, 50, ALICE))?;
    assert_eq!(outcome, ConversionOutcome::PairDeleted);
    assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(INITIAL_COINS));
    assert!(!keeper.is_denom_registered(MODULE_DENOM));
    assert!(keeper.ledger().events().iter().any(|event| matches!(
        event,
        Erc20Event::DeletePair { erc20_address, .. } if *erc20_address == pair.erc20_address
    )));

    match keeper.convert_coin(&coin_to_token(&pair, 50, ALICE)) {
        Err(Erc20Error::NotFound(token)) => assert_eq!(token, MODULE_DENOM),
        other => panic!("expected NotFound, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_hundred_acoin_lands_as_tokens() -> Result<()> {
    init_test_tracing();
    let (mut keeper, pair) = keeper_with_module_coin(&[ALICE])?;
    assert_eq!(keeper.ledger().token_decimals(pair.erc20_address), Some(18));

    let msg = erc20_primitives::MsgConvertCoin {
        coin: Coin::new(MODULE_DENOM, U256::from(100)),
        receiver: BOB,
        sender: ALICE,
    };
    keeper.convert_coin(&msg)?;

    let module = keeper.module_address();
    assert_eq!(keeper.ledger().token_balance(pair.erc20_address, BOB), U256::from(100));
    assert_eq!(keeper.ledger().coin_balance(module, MODULE_DENOM), U256::from(100));
    assert_eq!(keeper.ledger().coin_balance(ALICE, MODULE_DENOM), U256::from(INITIAL_COINS - 100));
    Ok(())
}

#[test]
fn test_inbound_voucher_lands_as_tokens_and_refund_returns() -> Result<()> {
    init_test_tracing();
    let inbound = packet("uatom", 10, ALICE, BOB);
    let voucher = inbound.received_denom("uatom");

    let mut keeper = setup_keeper();
    keeper.ledger_mut().fund(AUTHORITY, &voucher, U256::from(1));
    let pair = keeper.register_coin(AUTHORITY, coin_metadata(&voucher, 0))?;
    let mut mw = Erc20Middleware::new(keeper, MockTransferApp::default());

    let ack = mw.on_recv_packet(&inbound);
    assert!(ack.is_success(), "unexpected ack {ack:?}");
    assert_eq!(mw.keeper().ledger().coin_balance(BOB, &voucher), U256::ZERO);
    assert_eq!(mw.keeper().ledger().token_balance(pair.erc20_address, BOB), U256::from(10));

    // Sending the tokens back converts them to vouchers, which the transfer app burns.
    let outbound = MsgTransfer {
        source_port: "transfer".into(),
        source_channel: "channel-0".into(),
        token: Coin::new(pair.erc20_address.to_string(), U256::from(10)),
        sender: BOB,
        receiver: "cosmos1receiver".into(),
        timeout_timestamp: 1,
        memo: String::new(),
    };
    mw.send_transfer(&outbound)?;
    assert_eq!(mw.keeper().ledger().token_balance(pair.erc20_address, BOB), U256::ZERO);
    assert_eq!(mw.keeper().ledger().supply_of(&voucher), U256::from(1));

    // The counterparty rejects the packet: the refund lands as tokens again.
    let sent = mw.app().sent_packet(0).ok_or_else(|| eyre::eyre!("outbound packet not recorded"))?;
    mw.on_acknowledgement_packet(&sent, &Acknowledgement::error("receiver rejected"))?;
    assert_eq!(mw.keeper().ledger().token_balance(pair.erc20_address, BOB), U256::from(10));
    assert_eq!(mw.keeper().ledger().coin_balance(BOB, &voucher), U256::ZERO);
    Ok(())
}
