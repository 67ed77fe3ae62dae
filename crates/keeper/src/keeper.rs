//! The keeper service object and its EVM call helpers.

use alloy_primitives::{Address, U256};
use alloy_sol_types::{SolCall, SolValue};
use erc20_precompiles::abi::IERC20;
use erc20_primitives::{Erc20Event, Params, MODULE_NAME};

use crate::{
    config::Erc20Config,
    error::Erc20Error,
    expected_keepers::{CallOutput, Ledger},
};

/// Name, symbol and decimals read from a token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc20Data {
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Token decimals.
    pub decimals: u8,
}

/// Token-pair registry and conversion engine.
///
/// Constructed once by the host with the capabilities it consumes. Every public operation
/// either completes or leaves the ledger untouched.
#[derive(Debug)]
pub struct Keeper<L> {
    pub(crate) ledger: L,
    pub(crate) config: Erc20Config,
    pub(crate) params: Params,
    module_address: Address,
}

impl<L: Ledger> Keeper<L> {
    /// Creates a keeper over `ledger`.
    pub fn new(ledger: L, config: Erc20Config, params: Params) -> Self {
        let module_address = ledger.module_address(MODULE_NAME);
        Self { ledger, config, params, module_address }
    }

    /// Returns the host ledger.
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the host ledger mutably.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Consumes the keeper, returning the host ledger.
    pub fn into_ledger(self) -> L {
        self.ledger
    }

    /// Returns the static configuration.
    pub const fn config(&self) -> &Erc20Config {
        &self.config
    }

    /// Returns the module account address.
    pub const fn module_address(&self) -> Address {
        self.module_address
    }

    /// Returns true if conversions are globally enabled.
    pub const fn is_erc20_enabled(&self) -> bool {
        self.params.enable_erc20
    }

    /// Runs `f` inside a checkpoint, committing on success and reverting on error.
    pub fn with_checkpoint<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Erc20Error>,
    ) -> Result<T, Erc20Error> {
        let checkpoint = self.ledger.checkpoint();
        match f(self) {
            Ok(value) => {
                self.ledger.checkpoint_commit(checkpoint);
                Ok(value)
            }
            Err(err) => {
                self.ledger.checkpoint_revert(checkpoint);
                Err(err)
            }
        }
    }

    pub(crate) fn emit(&mut self, event: Erc20Event) {
        self.ledger.emit_event(event);
    }

    pub(crate) fn ensure_authority(&self, signer: Address) -> Result<(), Erc20Error> {
        if signer == self.config.authority {
            Ok(())
        } else {
            tracing::warn!(target: "erc20::gov", ?signer, "authority check failed");
            Err(Erc20Error::Unauthorized(format!(
                "invalid authority; expected {}, got {signer}",
                self.config.authority
            )))
        }
    }

    // === Contract Calls ===

    /// Calls `contract` as `from` with a typed ABI call.
    pub(crate) fn call_contract<C: SolCall>(
        &mut self,
        from: Address,
        contract: Address,
        call: &C,
        commit: bool,
    ) -> Result<CallOutput, Erc20Error> {
        self.ledger.call_evm(from, contract, call.abi_encode().into(), commit).map_err(|err| {
            Erc20Error::ContractCallFailed {
                contract,
                method: C::SIGNATURE,
                reason: err.to_string(),
            }
        })
    }

    /// Returns the token balance of `account` on `contract`.
    pub fn balance_of(&mut self, contract: Address, account: Address) -> Result<U256, Erc20Error> {
        let output = self.call_contract(
            self.module_address,
            contract,
            &IERC20::balanceOfCall { account },
            false,
        )?;
        U256::abi_decode(&output.ret)
            .map_err(|err| decode_failure(contract, IERC20::balanceOfCall::SIGNATURE, err))
    }

    /// Reads name, symbol and decimals of `contract`.
    pub fn query_erc20(&mut self, contract: Address) -> Result<Erc20Data, Erc20Error> {
        let from = self.module_address;
        let name = self.call_contract(from, contract, &IERC20::nameCall {}, false)?;
        let name = String::abi_decode(&name.ret)
            .map_err(|err| decode_failure(contract, IERC20::nameCall::SIGNATURE, err))?;
        let symbol = self.call_contract(from, contract, &IERC20::symbolCall {}, false)?;
        let symbol = String::abi_decode(&symbol.ret)
            .map_err(|err| decode_failure(contract, IERC20::symbolCall::SIGNATURE, err))?;
        let decimals = self.call_contract(from, contract, &IERC20::decimalsCall {}, false)?;
        let decimals = U256::abi_decode(&decimals.ret)
            .map_err(|err| decode_failure(contract, IERC20::decimalsCall::SIGNATURE, err))?;
        let decimals = u8::try_from(decimals).map_err(|_| Erc20Error::ContractCallFailed {
            contract,
            method: IERC20::decimalsCall::SIGNATURE,
            reason: format!("decimals {decimals} out of range"),
        })?;
        Ok(Erc20Data { name, symbol, decimals })
    }
}

pub(crate) fn decode_failure(
    contract: Address,
    method: &'static str,
    err: alloy_sol_types::Error,
) -> Erc20Error {
    Erc20Error::ContractCallFailed { contract, method, reason: format!("invalid return data: {err}") }
}
