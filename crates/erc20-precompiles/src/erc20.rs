//! ERC20 Extension
//!
//! Serves the ERC20 interface of a module-owned token pair directly from bank balances.
//!
//! ## Overview
//!
//! Once a native-coin pair is migrated, its contract address no longer holds bytecode. The
//! host routes calls to that address into [`Erc20Extension::call`], which reads and moves the
//! pair's bank denom. The contract-token balance of an account *is* its coin balance.
//!
//! ## Interface
//!
//! ```solidity
//! interface IERC20 {
//!     function name() external view returns (string);
//!     function symbol() external view returns (string);
//!     function decimals() external view returns (uint8);
//!     function totalSupply() external view returns (uint256);
//!     function balanceOf(address account) external view returns (uint256);
//!     function allowance(address owner, address spender) external view returns (uint256);
//!     function transfer(address to, uint256 amount) external returns (bool);
//!     function approve(address spender, uint256 amount) external returns (bool);
//!     function transferFrom(address from, address to, uint256 amount) external returns (bool);
//! }
//! ```
//!
//! ## Security Properties
//!
//! - **Zero address protection**: transfers and approvals to the zero address are rejected
//! - **Non-payable**: calls carrying native value are rejected
//! - **No shadow state**: balances and allowances live in the bank, so a host revert undoes
//!   extension effects together with everything else in the call

use alloy_primitives::{Address, Bytes, Log, U256};
use alloy_sol_types::{SolEvent, SolInterface, SolValue};
use erc20_primitives::TokenPair;

use crate::{abi::IERC20, error::ExtensionError};

/// Bank access granted to an extension for the duration of one call.
pub trait NativeBank {
    /// Returns the `denom` balance of `account`.
    fn balance(&self, account: Address, denom: &str) -> U256;

    /// Returns the total supply of `denom`.
    fn supply(&self, denom: &str) -> U256;

    /// Moves `amount` of `denom` from `from` to `to`.
    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        denom: &str,
        amount: U256,
    ) -> Result<(), ExtensionError>;

    /// Returns the allowance of `spender` over `owner`'s `denom`.
    fn allowance(&self, owner: Address, spender: Address, denom: &str) -> U256;

    /// Sets the allowance of `spender` over `owner`'s `denom`.
    fn set_allowance(&mut self, owner: Address, spender: Address, denom: &str, amount: U256);
}

/// A single call into an extension.
#[derive(Clone, Copy, Debug)]
pub struct ExtensionInput<'a> {
    /// Immediate caller.
    pub caller: Address,
    /// Native value attached to the call.
    pub value: U256,
    /// ABI calldata.
    pub data: &'a [u8],
}

/// Result of a successful extension call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionOutput {
    /// ABI-encoded return data.
    pub bytes: Bytes,
    /// Logs emitted by the call.
    pub logs: Vec<Log>,
}

impl ExtensionOutput {
    fn returning<T: SolValue>(value: T) -> Self {
        Self { bytes: value.abi_encode().into(), logs: Vec::new() }
    }
}

/// Native ERC20 implementation bound to one bank denom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Erc20Extension {
    address: Address,
    denom: String,
    name: String,
    symbol: String,
    decimals: u8,
}

impl Erc20Extension {
    /// Creates the extension for `pair`.
    pub fn new(pair: &TokenPair, name: String, symbol: String, decimals: u8) -> Self {
        Self { address: pair.erc20_address, denom: pair.denom.clone(), name, symbol, decimals }
    }

    /// Address the extension is installed at.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Bank denom backing the extension.
    pub fn denom(&self) -> &str {
        &self.denom
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Display decimals.
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Executes one ERC20 call against `bank`.
    pub fn call<B: NativeBank + ?Sized>(
        &self,
        bank: &mut B,
        input: ExtensionInput<'_>,
    ) -> Result<ExtensionOutput, ExtensionError> {
        let caller = input.caller;
        tracing::debug!(
            target: "erc20::extension",
            address = ?self.address,
            denom = %self.denom,
            ?caller,
            calldata_len = input.data.len(),
            "extension call invoked"
        );

        if !input.value.is_zero() {
            return Err(ExtensionError::NonPayable);
        }
        let decoded = IERC20::IERC20Calls::abi_decode(input.data)
            .map_err(|e| ExtensionError::Decode(e.to_string()))?;

        match decoded {
            IERC20::IERC20Calls::name(_) => Ok(ExtensionOutput::returning(self.name.clone())),
            IERC20::IERC20Calls::symbol(_) => Ok(ExtensionOutput::returning(self.symbol.clone())),
            IERC20::IERC20Calls::decimals(_) => Ok(ExtensionOutput::returning(U256::from(self.decimals))),
            IERC20::IERC20Calls::totalSupply(_) => {
                Ok(ExtensionOutput::returning(bank.supply(&self.denom)))
            }
            IERC20::IERC20Calls::balanceOf(call) => {
                Ok(ExtensionOutput::returning(bank.balance(call.account, &self.denom)))
            }
            IERC20::IERC20Calls::allowance(call) => Ok(ExtensionOutput::returning(
                bank.allowance(call.owner, call.spender, &self.denom),
            )),
            IERC20::IERC20Calls::transfer(call) => {
                let log = self.execute_transfer(bank, caller, call.to, call.amount)?;
                Ok(ExtensionOutput { bytes: true.abi_encode().into(), logs: vec![log] })
            }
            IERC20::IERC20Calls::approve(call) => {
                if call.spender.is_zero() {
                    return Err(ExtensionError::ZeroAddress("approve"));
                }
                bank.set_allowance(caller, call.spender, &self.denom, call.amount);
                let log = self.log(IERC20::Approval {
                    owner: caller,
                    spender: call.spender,
                    value: call.amount,
                });
                Ok(ExtensionOutput { bytes: true.abi_encode().into(), logs: vec![log] })
            }
            IERC20::IERC20Calls::transferFrom(call) => {
                if call.from != caller {
                    self.spend_allowance(bank, call.from, caller, call.amount)?;
                }
                let log = self.execute_transfer(bank, call.from, call.to, call.amount)?;
                Ok(ExtensionOutput { bytes: true.abi_encode().into(), logs: vec![log] })
            }
        }
    }

    fn spend_allowance<B: NativeBank + ?Sized>(
        &self,
        bank: &mut B,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), ExtensionError> {
        let available = bank.allowance(owner, spender, &self.denom);
        let remaining = available
            .checked_sub(amount)
            .ok_or(ExtensionError::InsufficientAllowance { needed: amount, available })?;
        bank.set_allowance(owner, spender, &self.denom, remaining);
        Ok(())
    }

    fn execute_transfer<B: NativeBank + ?Sized>(
        &self,
        bank: &mut B,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Log, ExtensionError> {
        if to.is_zero() {
            return Err(ExtensionError::ZeroAddress("transfer to"));
        }
        if !amount.is_zero() && from != to {
            let available = bank.balance(from, &self.denom);
            if available < amount {
                return Err(ExtensionError::InsufficientBalance { needed: amount, available });
            }
            bank.transfer(from, to, &self.denom, amount)?;
            tracing::debug!(target: "erc20::extension", ?from, ?to, %amount, denom = %self.denom, "transfer executed");
        }
        Ok(self.log(IERC20::Transfer { from, to, value: amount }))
    }

    fn log<E: SolEvent>(&self, event: E) -> Log {
        Log { address: self.address, data: event.encode_log_data() }
    }
}
