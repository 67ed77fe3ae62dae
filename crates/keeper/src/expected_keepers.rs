//! Capabilities the keeper consumes from the host chain.
//!
//! The keeper never owns balances, accounts or contract state. Each concern is reached through
//! one of the traits below; [`Ledger`] bundles them so the keeper carries a single handle.

use alloy_primitives::{Address, Bytes, Log, B256, KECCAK256_EMPTY};
use erc20_precompiles::{ActiveExtensions, Erc20Extension};
use erc20_primitives::{Coin, Erc20Event, Metadata};

use crate::store::KvStore;

/// Errors returned by the bank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    /// Spendable balance is below the requested amount.
    #[error("insufficient funds: {available} {denom} < {needed} {denom}")]
    InsufficientFunds {
        /// Denom being moved.
        denom: String,
        /// Spendable balance.
        available: alloy_primitives::U256,
        /// Requested amount.
        needed: alloy_primitives::U256,
    },
    /// The recipient may not receive funds.
    #[error("{0} is not allowed to receive funds")]
    Blocked(Address),
    /// No module account is registered under the name.
    #[error("unknown module account '{0}'")]
    UnknownModule(String),
    /// Supply or balance would overflow.
    #[error("amount overflow for {0}")]
    Overflow(String),
}

/// Errors returned by the EVM.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvmError {
    /// The call reverted.
    #[error("execution reverted: {0}")]
    Reverted(String),
    /// The call could not be executed.
    #[error("evm error: {0}")]
    Internal(String),
}

/// Output of a contract call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutput {
    /// Return data.
    pub ret: Bytes,
    /// Logs emitted during the call.
    pub logs: Vec<Log>,
}

/// State of an EVM account relevant to the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmAccount {
    /// Account nonce.
    pub nonce: u64,
    /// Hash of the deployed code.
    pub code_hash: B256,
}

impl EvmAccount {
    /// Returns true if the account holds code.
    pub fn is_contract(&self) -> bool {
        self.code_hash != KECCAK256_EMPTY && !self.code_hash.is_zero()
    }
}

/// Receipt of an executed EVM transaction, handed to the post-processing hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash.
    pub tx_hash: B256,
    /// Logs emitted by the transaction.
    pub logs: Vec<Log>,
}

/// Bank capability.
pub trait BankKeeper {
    /// Moves `coin` from `sender` to the module account `module`.
    fn send_coins_from_account_to_module(
        &mut self,
        sender: Address,
        module: &str,
        coin: &Coin,
    ) -> Result<(), BankError>;

    /// Moves `coin` from the module account `module` to `recipient`.
    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        recipient: Address,
        coin: &Coin,
    ) -> Result<(), BankError>;

    /// Mints `coin` into the module account `module`.
    fn mint_coins(&mut self, module: &str, coin: &Coin) -> Result<(), BankError>;

    /// Burns `coin` from the module account `module`.
    fn burn_coins(&mut self, module: &str, coin: &Coin) -> Result<(), BankError>;

    /// Returns the `denom` balance of `account`.
    fn get_balance(&self, account: Address, denom: &str) -> Coin;

    /// Returns every non-zero balance of `account`.
    fn get_all_balances(&self, account: Address) -> Vec<Coin>;

    /// Returns true if `denom` may be sent between accounts.
    fn is_send_enabled(&self, denom: &str) -> bool;

    /// Returns true if `account` may not receive funds.
    fn blocked_addr(&self, account: Address) -> bool;

    /// Returns true if `denom` has a non-zero supply.
    fn has_supply(&self, denom: &str) -> bool;

    /// Returns the metadata stored for `denom`.
    fn denom_metadata(&self, denom: &str) -> Option<Metadata>;

    /// Stores metadata under its base denom.
    fn set_denom_metadata(&mut self, metadata: Metadata);
}

/// Account registry capability.
pub trait AccountKeeper {
    /// Returns the address of the module account `module`.
    fn module_address(&self, module: &str) -> Address;

    /// Returns the sequence (nonce) of `account`.
    fn sequence(&self, account: Address) -> u64;

    /// Iterates every known account.
    fn accounts(&self) -> impl Iterator<Item = Address> + '_;

    /// Returns true if `account` belongs to a module.
    fn is_module_account(&self, account: Address) -> bool;
}

/// EVM capability.
pub trait EvmKeeper {
    /// Calls `to` with `data` as `from`. When `commit` is false state changes are discarded.
    fn call_evm(
        &mut self,
        from: Address,
        to: Address,
        data: Bytes,
        commit: bool,
    ) -> Result<CallOutput, EvmError>;

    /// Deploys `init_code` as `from` at `CREATE(from, sequence(from))`.
    fn create_contract(&mut self, from: Address, init_code: Bytes) -> Result<Address, EvmError>;

    /// Returns the account at `address`, if it exists.
    fn evm_account(&self, address: Address) -> Option<EvmAccount>;

    /// Removes the account at `address` with its code and storage.
    fn delete_account(&mut self, address: Address) -> Result<(), EvmError>;

    /// Installs a native extension at its address.
    fn install_extension(&mut self, extension: Erc20Extension) -> Result<(), EvmError>;

    /// Replaces the set of extensions the EVM dispatches to.
    fn enable_extensions(&mut self, extensions: ActiveExtensions) -> Result<(), EvmError>;

    /// Returns the set of extensions the EVM dispatches to.
    fn active_extensions(&self) -> ActiveExtensions;
}

/// Host event sink.
pub trait EventManager {
    /// Records a module event.
    fn emit_event(&mut self, event: Erc20Event);
}

/// Position in the host's write journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(pub usize);

/// Rollback-capable transaction scope supplied by the host.
///
/// Checkpoints nest. Committing keeps the writes made since the checkpoint in the enclosing
/// scope; reverting discards them, including any checkpoints opened after it.
pub trait Transactional {
    /// Opens a checkpoint.
    fn checkpoint(&mut self) -> Checkpoint;

    /// Keeps the writes made since `checkpoint`.
    fn checkpoint_commit(&mut self, checkpoint: Checkpoint);

    /// Discards the writes made since `checkpoint`.
    fn checkpoint_revert(&mut self, checkpoint: Checkpoint);
}

/// Every capability the keeper needs, behind one handle.
pub trait Ledger:
    KvStore + BankKeeper + AccountKeeper + EvmKeeper + EventManager + Transactional
{
}

impl<T> Ledger for T where
    T: KvStore + BankKeeper + AccountKeeper + EvmKeeper + EventManager + Transactional
{
}
