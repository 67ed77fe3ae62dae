//! Governance-gated registration, toggling and params updates.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolConstructor;
use erc20_precompiles::abi::ERC20MinterBurnerDecimals;
use erc20_primitives::{
    create_denom, sanitize_erc20_name, DenomUnit, Erc20Event, Metadata, MetadataError,
    MsgUpdateParams, Owner, Params, TokenPair,
};
use tracing::instrument;

use crate::{error::Erc20Error, expected_keepers::Ledger, keeper::Keeper};

impl<L: Ledger> Keeper<L> {
    /// Deploys the module minter/burner contract for an existing coin and registers the pair.
    #[instrument(skip_all, fields(denom = %metadata.base))]
    pub fn register_coin(
        &mut self,
        authority: Address,
        metadata: Metadata,
    ) -> Result<TokenPair, Erc20Error> {
        self.ensure_authority(authority)?;
        if !self.params.enable_erc20 {
            return Err(Erc20Error::ModuleDisabled);
        }
        if metadata.base == self.config.evm_denom {
            return Err(Erc20Error::ProhibitedDenom(metadata.base));
        }
        if self.is_denom_registered(&metadata.base) {
            return Err(Erc20Error::AlreadyExists(format!(
                "coin denomination already registered: {}",
                metadata.base
            )));
        }
        if !self.ledger.has_supply(&metadata.base) {
            return Err(Erc20Error::NoSupply(metadata.base));
        }

        self.with_checkpoint(|keeper| {
            keeper.verify_metadata(&metadata)?;
            let address = keeper.deploy_minter_burner(&metadata)?;
            let pair =
                keeper.register_token_pair(TokenPair::new(address, metadata.base.clone(), Owner::Module))?;

            tracing::info!(target: "erc20::gov", denom = %pair.denom, erc20 = ?address, "coin registered");
            keeper.emit(Erc20Event::RegisterPair {
                denom: pair.denom.clone(),
                erc20_address: address,
                owner: Owner::Module,
            });
            Ok(pair)
        })
    }

    /// Creates a coin for an existing token contract and registers the pair.
    #[instrument(skip_all, fields(?contract))]
    pub fn register_erc20(
        &mut self,
        authority: Address,
        contract: Address,
    ) -> Result<TokenPair, Erc20Error> {
        self.ensure_authority(authority)?;
        if !self.params.enable_erc20 {
            return Err(Erc20Error::ModuleDisabled);
        }
        let is_contract =
            self.ledger.evm_account(contract).is_some_and(|account| account.is_contract());
        if !is_contract {
            return Err(Erc20Error::NotContract(contract));
        }
        if self.is_erc20_registered(contract) {
            return Err(Erc20Error::AlreadyExists(format!(
                "token contract already registered: {contract}"
            )));
        }

        self.with_checkpoint(|keeper| {
            let metadata = keeper.create_coin_metadata(contract)?;
            let pair = keeper.register_token_pair(TokenPair::new(contract, metadata.base, Owner::External))?;

            tracing::info!(target: "erc20::gov", denom = %pair.denom, erc20 = ?contract, "erc20 registered");
            keeper.emit(Erc20Event::RegisterPair {
                denom: pair.denom.clone(),
                erc20_address: contract,
                owner: Owner::External,
            });
            Ok(pair)
        })
    }

    /// Flips the `enabled` flag of the pair resolved by `token`.
    #[instrument(skip_all, fields(%token))]
    pub fn toggle_conversion(
        &mut self,
        authority: Address,
        token: &str,
    ) -> Result<TokenPair, Erc20Error> {
        self.ensure_authority(authority)?;
        let mut pair = self.token_pair_by_token(token)?;
        pair.enabled = !pair.enabled;
        self.set_token_pair(&pair);

        tracing::info!(target: "erc20::gov", denom = %pair.denom, enabled = pair.enabled, "token conversion toggled");
        self.emit(Erc20Event::ToggleTokenConversion {
            denom: pair.denom.clone(),
            erc20_address: pair.erc20_address,
            enabled: pair.enabled,
        });
        Ok(pair)
    }

    /// Replaces the module params.
    pub fn update_params(&mut self, msg: &MsgUpdateParams) -> Result<(), Erc20Error> {
        self.ensure_authority(msg.authority)?;
        tracing::info!(
            target: "erc20::gov",
            enable_erc20 = msg.params.enable_erc20,
            enable_evm_hook = msg.params.enable_evm_hook,
            "params updated"
        );
        self.params = msg.params;
        Ok(())
    }

    /// Returns the current params.
    pub const fn params(&self) -> Params {
        self.params
    }

    /// Stores `metadata` if the bank has none for its base, otherwise requires it to match.
    fn verify_metadata(&mut self, metadata: &Metadata) -> Result<(), Erc20Error> {
        metadata.validate()?;
        match self.ledger.denom_metadata(&metadata.base) {
            None => {
                self.ledger.set_denom_metadata(metadata.clone());
                Ok(())
            }
            Some(stored) if stored == *metadata => Ok(()),
            Some(_) => Err(MetadataError::Mismatch(metadata.base.clone()).into()),
        }
    }

    fn deploy_minter_burner(&mut self, metadata: &Metadata) -> Result<Address, Erc20Error> {
        let decimals = u8::try_from(metadata.display_exponent())
            .map_err(|_| Erc20Error::Overflow("display exponent"))?;
        let args = ERC20MinterBurnerDecimals::constructorCall {
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            decimals,
        }
        .abi_encode();

        let mut init_code = self.config.minter_burner_code.to_vec();
        init_code.extend_from_slice(&args);

        let module = self.module_address();
        let expected = module.create(self.ledger.sequence(module));
        let address = self.ledger.create_contract(module, Bytes::from(init_code))?;
        if address != expected {
            tracing::warn!(target: "erc20::gov", ?expected, ?address, "minter/burner deployed at an unexpected address");
        }
        Ok(address)
    }

    fn create_coin_metadata(&mut self, contract: Address) -> Result<Metadata, Erc20Error> {
        let data = self.query_erc20(contract)?;
        let base = create_denom(contract);

        if self.ledger.denom_metadata(&base).is_some() {
            return Err(Erc20Error::AlreadyExists(format!("denom metadata already registered: {base}")));
        }
        if self.is_denom_registered(&base) {
            return Err(Erc20Error::AlreadyExists(format!("coin denomination already registered: {base}")));
        }

        let mut metadata = Metadata {
            description: format!("Cosmos coin token representation of {contract}"),
            denom_units: vec![DenomUnit::new(base.clone(), 0)],
            base: base.clone(),
            display: base.clone(),
            name: base,
            symbol: data.symbol,
        };
        if data.decimals > 0 {
            let display = sanitize_erc20_name(&data.name);
            metadata.denom_units.push(DenomUnit::new(display.clone(), u32::from(data.decimals)));
            metadata.display = display;
        }

        metadata.validate()?;
        self.ledger.set_denom_metadata(metadata.clone());
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expected_keepers::{AccountKeeper, BankKeeper},
        test_utils::{coin_metadata, setup_keeper, ALICE, AUTHORITY, EXTERNAL_TOKEN, MODULE_DENOM},
    };
    use alloy_primitives::U256;
    use erc20_primitives::MODULE_NAME;

    // === Test: Register Coin ===

    #[test]
    fn register_coin_deploys_at_module_create_address() {
        let mut keeper = setup_keeper();
        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(1));
        let module = keeper.module_address();
        let expected = module.create(keeper.ledger().sequence(module));

        let pair = keeper
            .register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18))
            .expect("register coin");

        assert_eq!(pair.erc20_address, expected);
        assert_eq!(pair.contract_owner, Owner::Module);
        assert!(pair.enabled);
        assert_eq!(keeper.ledger().token_decimals(pair.erc20_address), Some(18));
        assert!(keeper.ledger().denom_metadata(MODULE_DENOM).is_some());
    }

    #[test]
    fn register_coin_checks_in_order() {
        let mut keeper = setup_keeper();

        match keeper.register_coin(ALICE, coin_metadata(MODULE_DENOM, 18)) {
            Err(Erc20Error::Unauthorized(_)) => {}
            other => panic!("expected Unauthorized, got {other:?}"),
        }
        match keeper.register_coin(AUTHORITY, coin_metadata("aevm", 18)) {
            Err(Erc20Error::ProhibitedDenom(denom)) => assert_eq!(denom, "aevm"),
            other => panic!("expected ProhibitedDenom, got {other:?}"),
        }
        match keeper.register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18)) {
            Err(Erc20Error::NoSupply(denom)) => assert_eq!(denom, MODULE_DENOM),
            other => panic!("expected NoSupply, got {other:?}"),
        }

        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(1));
        keeper.register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18)).expect("register");
        match keeper.register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18)) {
            Err(Erc20Error::AlreadyExists(_)) => {}
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn register_coin_rejects_conflicting_metadata() {
        let mut keeper = setup_keeper();
        keeper.ledger_mut().fund(ALICE, MODULE_DENOM, U256::from(1));
        keeper.ledger_mut().set_denom_metadata(coin_metadata(MODULE_DENOM, 6));

        match keeper.register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18)) {
            Err(Erc20Error::InvalidMetadata(MetadataError::Mismatch(base))) => {
                assert_eq!(base, MODULE_DENOM);
            }
            other => panic!("expected metadata mismatch, got {other:?}"),
        }
        assert!(!keeper.is_denom_registered(MODULE_DENOM));
    }

    #[test]
    fn disabled_module_rejects_registration() {
        let mut keeper = setup_keeper();
        keeper
            .update_params(&MsgUpdateParams { authority: AUTHORITY, params: Params::disabled() })
            .expect("update params");
        match keeper.register_erc20(AUTHORITY, EXTERNAL_TOKEN) {
            Err(Erc20Error::ModuleDisabled) => {}
            other => panic!("expected ModuleDisabled, got {other:?}"),
        }
    }

    // === Test: Register ERC20 ===

    #[test]
    fn register_erc20_creates_coin_metadata() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_erc20(AUTHORITY, EXTERNAL_TOKEN).expect("register erc20");

        assert_eq!(pair.denom, create_denom(EXTERNAL_TOKEN));
        assert_eq!(pair.contract_owner, Owner::External);

        let metadata = keeper.ledger().denom_metadata(&pair.denom).expect("metadata stored");
        assert_eq!(
            metadata.description,
            format!("Cosmos coin token representation of {EXTERNAL_TOKEN}")
        );
        assert_eq!(metadata.symbol, "EXT");
        assert_eq!(metadata.display, "external");
        assert_eq!(metadata.display_exponent(), 6);

        match keeper.register_erc20(AUTHORITY, EXTERNAL_TOKEN) {
            Err(Erc20Error::AlreadyExists(_)) => {}
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[test]
    fn register_erc20_requires_contract() {
        let mut keeper = setup_keeper();
        match keeper.register_erc20(AUTHORITY, ALICE) {
            Err(Erc20Error::NotContract(address)) => assert_eq!(address, ALICE),
            other => panic!("expected NotContract, got {other:?}"),
        }
    }

    // === Test: Toggle ===

    #[test]
    fn toggle_disables_both_directions() {
        let mut keeper = setup_keeper();
        let pair = keeper.register_module_coin().expect("register coin");

        let toggled = keeper.toggle_conversion(AUTHORITY, MODULE_DENOM).expect("toggle");
        assert!(!toggled.enabled);
        match keeper.conversion_eligible(ALICE, ALICE, &pair.erc20_address.to_string()) {
            Err(Erc20Error::PairDisabled(_)) => {}
            other => panic!("expected PairDisabled, got {other:?}"),
        }

        let toggled = keeper.toggle_conversion(AUTHORITY, MODULE_DENOM).expect("toggle back");
        assert!(toggled.enabled);
        assert_eq!(keeper.module_address(), keeper.ledger().module_address(MODULE_NAME));
    }
}
