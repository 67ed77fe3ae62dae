//! Test support: an in-memory host chain, a transfer application and a span collector.
//!
//! [`MockChain`] implements every capability of [`Ledger`](crate::expected_keepers::Ledger)
//! over plain maps. Contract calls are served by scripted tokens (the module minter/burner, a
//! plain external ERC20 and a WETH9-style wrapped native token) and by installed native
//! extensions. Checkpoints snapshot the whole state, so reverts are exact.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex},
};

use alloy_primitives::{address, keccak256, Address, Bytes, Log, KECCAK256_EMPTY, U256};
use alloy_sol_types::{SolEvent, SolInterface, SolValue};
use erc20_precompiles::{
    abi::{IERC20MinterBurnerDecimals, IWrappedNative, IERC20},
    ActiveExtensions, Erc20Extension, ExtensionError, ExtensionInput, NativeBank,
};
use erc20_primitives::{
    sent_denom, Acknowledgement, Coin, DenomUnit, Erc20Event, FungibleTokenPacketData, Metadata,
    MsgTransfer, Packet, Params, TokenPair, IBC_DENOM_PREFIX, MODULE_NAME,
};
use tracing::{
    field::{Field, Visit},
    subscriber::set_default,
    Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    Layer,
};

use crate::{
    config::Erc20Config,
    error::Erc20Error,
    expected_keepers::{
        AccountKeeper, BankError, BankKeeper, CallOutput, Checkpoint, EventManager, EvmAccount,
        EvmError, EvmKeeper, Transactional,
    },
    ibc::{TransferApp, TransferError},
    keeper::Keeper,
    store::{KvStore, MemoryStore},
};

/// Native denom of the test chain's EVM.
pub const EVM_DENOM: &str = "aevm";
/// Denom registered by [`Keeper::register_module_coin`].
pub const MODULE_DENOM: &str = "acoin";
/// Name of the transfer application's escrow module account.
pub const TRANSFER_MODULE: &str = "transfer";
/// Creation code prefix the test chain recognises as the minter/burner token.
pub const MINTER_BURNER_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

/// First test user.
pub const ALICE: Address = address!("0x00000000000000000000000000000000000000a1");
/// Second test user.
pub const BOB: Address = address!("0x00000000000000000000000000000000000000b2");
/// Governance authority of [`setup_keeper`].
pub const AUTHORITY: Address = address!("0x00000000000000000000000000000000000000f0");
/// Arbitrary token address for registry tests.
pub const TOKEN_A: Address = address!("0x000000000000000000000000000000000000aaaa");
/// Arbitrary token address for registry tests.
pub const TOKEN_B: Address = address!("0x000000000000000000000000000000000000bbbb");
/// Pre-deployed external ERC20: "External Token", "EXT", 6 decimals.
pub const EXTERNAL_TOKEN: Address = address!("0x00000000000000000000000000000000000e2020");
/// Pre-deployed wrapped native token.
pub const WRAPPED_NATIVE: Address = address!("0xd4949664cd82660aae99bedc034a0dea8a0bd517");

/// Address of the module account `name`.
pub fn module_account(name: &str) -> Address {
    Address::from_word(keccak256(name.as_bytes()))
}

// === Scripted Token Contracts ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    MinterBurner { owner: Address },
    Plain,
    WrappedNative,
}

#[derive(Debug, Clone)]
struct MockToken {
    kind: TokenKind,
    name: String,
    symbol: String,
    decimals: u8,
    balances: BTreeMap<Address, U256>,
    allowances: BTreeMap<(Address, Address), U256>,
    total_supply: U256,
    fee: U256,
    emit_approval: bool,
    transfer_returns_false: bool,
}

fn returning<T: SolValue>(value: T) -> CallOutput {
    CallOutput { ret: value.abi_encode().into(), logs: Vec::new() }
}

fn reverted(reason: impl Into<String>) -> EvmError {
    EvmError::Reverted(reason.into())
}

fn event_log<E: SolEvent>(address: Address, event: E) -> Log {
    Log { address, data: event.encode_log_data() }
}

impl MockToken {
    fn new(kind: TokenKind, name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            kind,
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            total_supply: U256::ZERO,
            fee: U256::ZERO,
            emit_approval: false,
            transfer_returns_false: false,
        }
    }

    fn balance(&self, holder: Address) -> U256 {
        self.balances.get(&holder).copied().unwrap_or_default()
    }

    fn add_balance(&mut self, holder: Address, amount: U256) {
        let balance = self.balances.entry(holder).or_default();
        *balance = balance.saturating_add(amount);
    }

    fn sub_balance(&mut self, holder: Address, amount: U256) -> Result<(), EvmError> {
        let remaining = self
            .balance(holder)
            .checked_sub(amount)
            .ok_or_else(|| reverted("ERC20: transfer amount exceeds balance"))?;
        self.balances.insert(holder, remaining);
        Ok(())
    }

    fn mint(&mut self, holder: Address, amount: U256) {
        self.add_balance(holder, amount);
        self.total_supply = self.total_supply.saturating_add(amount);
    }

    fn burn(&mut self, holder: Address, amount: U256) -> Result<(), EvmError> {
        self.sub_balance(holder, amount)?;
        self.total_supply = self.total_supply.saturating_sub(amount);
        Ok(())
    }

    fn call(
        &mut self,
        chain: &mut ChainState,
        address: Address,
        caller: Address,
        data: &[u8],
    ) -> Result<CallOutput, EvmError> {
        if let Ok(call) = IERC20::IERC20Calls::abi_decode(data) {
            return self.call_erc20(address, caller, call);
        }
        match self.kind {
            TokenKind::MinterBurner { owner } => {
                let call =
                    IERC20MinterBurnerDecimals::IERC20MinterBurnerDecimalsCalls::abi_decode(data)
                        .map_err(|err| reverted(err.to_string()))?;
                self.call_minter_burner(address, owner, caller, call)
            }
            TokenKind::WrappedNative => {
                let call = IWrappedNative::IWrappedNativeCalls::abi_decode(data)
                    .map_err(|err| reverted(err.to_string()))?;
                match call {
                    IWrappedNative::IWrappedNativeCalls::deposit(_) => Ok(CallOutput::default()),
                    IWrappedNative::IWrappedNativeCalls::withdraw(call) => {
                        self.burn(caller, call.wad)?;
                        chain
                            .move_coins(address, caller, EVM_DENOM, call.wad)
                            .map_err(|err| reverted(err.to_string()))?;
                        Ok(CallOutput::default())
                    }
                }
            }
            TokenKind::Plain => Err(reverted("unknown selector")),
        }
    }

    fn call_erc20(
        &mut self,
        address: Address,
        caller: Address,
        call: IERC20::IERC20Calls,
    ) -> Result<CallOutput, EvmError> {
        match call {
            IERC20::IERC20Calls::name(_) => Ok(returning(self.name.clone())),
            IERC20::IERC20Calls::symbol(_) => Ok(returning(self.symbol.clone())),
            IERC20::IERC20Calls::decimals(_) => Ok(returning(U256::from(self.decimals))),
            IERC20::IERC20Calls::totalSupply(_) => Ok(returning(self.total_supply)),
            IERC20::IERC20Calls::balanceOf(call) => Ok(returning(self.balance(call.account))),
            IERC20::IERC20Calls::allowance(call) => Ok(returning(
                self.allowances.get(&(call.owner, call.spender)).copied().unwrap_or_default(),
            )),
            IERC20::IERC20Calls::transfer(call) => {
                self.transfer(address, caller, call.to, call.amount)
            }
            IERC20::IERC20Calls::approve(call) => {
                self.allowances.insert((caller, call.spender), call.amount);
                let approval = IERC20::Approval { owner: caller, spender: call.spender, value: call.amount };
                Ok(CallOutput { ret: true.abi_encode().into(), logs: vec![event_log(address, approval)] })
            }
            IERC20::IERC20Calls::transferFrom(call) => {
                if call.from != caller {
                    let allowance =
                        self.allowances.get(&(call.from, caller)).copied().unwrap_or_default();
                    let remaining = allowance
                        .checked_sub(call.amount)
                        .ok_or_else(|| reverted("ERC20: insufficient allowance"))?;
                    self.allowances.insert((call.from, caller), remaining);
                }
                self.transfer(address, call.from, call.to, call.amount)
            }
        }
    }

    fn transfer(
        &mut self,
        address: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<CallOutput, EvmError> {
        if self.transfer_returns_false {
            return Ok(returning(false));
        }
        self.sub_balance(from, amount)?;
        let received = amount.saturating_sub(self.fee);
        self.add_balance(to, received);
        self.total_supply = self.total_supply.saturating_sub(amount - received);

        let mut logs = vec![event_log(address, IERC20::Transfer { from, to, value: amount })];
        if self.emit_approval {
            logs.push(event_log(address, IERC20::Approval { owner: from, spender: to, value: U256::ZERO }));
        }
        Ok(CallOutput { ret: true.abi_encode().into(), logs })
    }

    fn call_minter_burner(
        &mut self,
        address: Address,
        owner: Address,
        caller: Address,
        call: IERC20MinterBurnerDecimals::IERC20MinterBurnerDecimalsCalls,
    ) -> Result<CallOutput, EvmError> {
        use IERC20MinterBurnerDecimals::IERC20MinterBurnerDecimalsCalls as Calls;

        let log = match call {
            Calls::mint(call) => {
                if caller != owner {
                    return Err(reverted("ERC20MinterBurnerDecimals: must have minter role to mint"));
                }
                let minted = call.amount.saturating_sub(self.fee);
                self.mint(call.to, minted);
                IERC20::Transfer { from: Address::ZERO, to: call.to, value: minted }
            }
            Calls::burn(call) => {
                self.burn(caller, call.amount)?;
                IERC20::Transfer { from: caller, to: Address::ZERO, value: call.amount }
            }
            Calls::burnCoins(call) => {
                if caller != owner {
                    return Err(reverted("ERC20MinterBurnerDecimals: must have burner role to burn"));
                }
                self.burn(call.from, call.amount)?;
                IERC20::Transfer { from: call.from, to: Address::ZERO, value: call.amount }
            }
        };
        Ok(CallOutput { ret: Bytes::new(), logs: vec![event_log(address, log)] })
    }
}

// === Chain State ===

#[derive(Debug, Clone, Default)]
struct ChainState {
    store: MemoryStore,
    balances: BTreeMap<(Address, String), U256>,
    supply: BTreeMap<String, U256>,
    allowances: BTreeMap<(Address, Address, String), U256>,
    metadata: BTreeMap<String, Metadata>,
    nonces: BTreeMap<Address, u64>,
    known: BTreeSet<Address>,
    blocked: BTreeSet<Address>,
    send_disabled: BTreeSet<String>,
    contracts: BTreeMap<Address, MockToken>,
    extensions: BTreeMap<Address, Erc20Extension>,
    active: ActiveExtensions,
    undeletable: BTreeSet<Address>,
    events: Vec<Erc20Event>,
}

impl ChainState {
    fn balance(&self, account: Address, denom: &str) -> U256 {
        self.balances.get(&(account, denom.to_string())).copied().unwrap_or_default()
    }

    fn credit(&mut self, account: Address, denom: &str, amount: U256) -> Result<(), BankError> {
        let balance = self.balances.entry((account, denom.to_string())).or_default();
        *balance = balance.checked_add(amount).ok_or_else(|| BankError::Overflow(denom.to_string()))?;
        self.known.insert(account);
        Ok(())
    }

    fn debit(&mut self, account: Address, denom: &str, amount: U256) -> Result<(), BankError> {
        let available = self.balance(account, denom);
        let remaining = available.checked_sub(amount).ok_or_else(|| BankError::InsufficientFunds {
            denom: denom.to_string(),
            available,
            needed: amount,
        })?;
        self.balances.insert((account, denom.to_string()), remaining);
        self.known.insert(account);
        Ok(())
    }

    fn move_coins(
        &mut self,
        from: Address,
        to: Address,
        denom: &str,
        amount: U256,
    ) -> Result<(), BankError> {
        if self.blocked.contains(&to) {
            return Err(BankError::Blocked(to));
        }
        self.debit(from, denom, amount)?;
        self.credit(to, denom, amount)
    }

    fn mint(&mut self, account: Address, denom: &str, amount: U256) -> Result<(), BankError> {
        self.credit(account, denom, amount)?;
        let supply = self.supply.entry(denom.to_string()).or_default();
        *supply = supply.checked_add(amount).ok_or_else(|| BankError::Overflow(denom.to_string()))?;
        Ok(())
    }

    fn burn(&mut self, account: Address, denom: &str, amount: U256) -> Result<(), BankError> {
        self.debit(account, denom, amount)?;
        let supply = self.supply.entry(denom.to_string()).or_default();
        *supply = supply.saturating_sub(amount);
        Ok(())
    }

    fn execute(&mut self, from: Address, to: Address, data: &[u8]) -> Result<CallOutput, EvmError> {
        if self.active.contains(to) {
            if let Some(extension) = self.extensions.get(&to).cloned() {
                let input = ExtensionInput { caller: from, value: U256::ZERO, data };
                let output =
                    extension.call(self, input).map_err(|err| reverted(err.to_string()))?;
                return Ok(CallOutput { ret: output.bytes, logs: output.logs });
            }
        }
        let mut token = self
            .contracts
            .get(&to)
            .cloned()
            .ok_or_else(|| EvmError::Internal(format!("no code at {to}")))?;
        let output = token.call(self, to, from, data)?;
        self.contracts.insert(to, token);
        Ok(output)
    }
}

impl NativeBank for ChainState {
    fn balance(&self, account: Address, denom: &str) -> U256 {
        Self::balance(self, account, denom)
    }

    fn supply(&self, denom: &str) -> U256 {
        self.supply.get(denom).copied().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        denom: &str,
        amount: U256,
    ) -> Result<(), ExtensionError> {
        self.move_coins(from, to, denom, amount).map_err(|err| ExtensionError::Bank(err.to_string()))
    }

    fn allowance(&self, owner: Address, spender: Address, denom: &str) -> U256 {
        self.allowances.get(&(owner, spender, denom.to_string())).copied().unwrap_or_default()
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, denom: &str, amount: U256) {
        self.allowances.insert((owner, spender, denom.to_string()), amount);
    }
}

// === Mock Chain ===

/// In-memory host chain implementing every capability the keeper consumes.
#[derive(Debug, Clone)]
pub struct MockChain {
    state: ChainState,
    snapshots: Vec<ChainState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// Creates a chain with [`EXTERNAL_TOKEN`] and [`WRAPPED_NATIVE`] deployed.
    pub fn new() -> Self {
        let mut state = ChainState::default();
        state
            .contracts
            .insert(EXTERNAL_TOKEN, MockToken::new(TokenKind::Plain, "External Token", "EXT", 6));
        state.contracts.insert(
            WRAPPED_NATIVE,
            MockToken::new(TokenKind::WrappedNative, "Wrapped Ether", "WEVM", 18),
        );
        Self { state, snapshots: Vec::new() }
    }

    fn module(name: &str) -> Result<Address, BankError> {
        match name {
            MODULE_NAME | TRANSFER_MODULE => Ok(module_account(name)),
            other => Err(BankError::UnknownModule(other.to_string())),
        }
    }

    /// Mints `amount` of `denom` to `account`.
    pub fn fund(&mut self, account: Address, denom: &str, amount: U256) {
        self.state.mint(account, denom, amount).expect("fund amount overflows");
    }

    /// Returns the `denom` balance of `account`.
    pub fn coin_balance(&self, account: Address, denom: &str) -> U256 {
        self.state.balance(account, denom)
    }

    /// Returns the total supply of `denom`.
    pub fn supply_of(&self, denom: &str) -> U256 {
        self.state.supply.get(denom).copied().unwrap_or_default()
    }

    /// Returns the token balance of `holder`, read from bytecode or an installed extension.
    pub fn token_balance(&self, contract: Address, holder: Address) -> U256 {
        if let Some(token) = self.state.contracts.get(&contract) {
            return token.balance(holder);
        }
        self.state
            .extensions
            .get(&contract)
            .map_or(U256::ZERO, |extension| self.state.balance(holder, extension.denom()))
    }

    /// Returns the decimals of a deployed token contract.
    pub fn token_decimals(&self, contract: Address) -> Option<u8> {
        self.state.contracts.get(&contract).map(|token| token.decimals)
    }

    /// Mints contract tokens to `holder` outside of any call.
    pub fn mint_tokens(&mut self, contract: Address, holder: Address, amount: U256) {
        if let Some(token) = self.state.contracts.get_mut(&contract) {
            token.mint(holder, amount);
        }
    }

    /// Makes every mint and transfer of `contract` deliver `fee` less than requested.
    pub fn set_token_fee(&mut self, contract: Address, fee: U256) {
        if let Some(token) = self.state.contracts.get_mut(&contract) {
            token.fee = fee;
        }
    }

    /// Makes every transfer of `contract` also emit an `Approval` log.
    pub fn set_emit_approval(&mut self, contract: Address, enabled: bool) {
        if let Some(token) = self.state.contracts.get_mut(&contract) {
            token.emit_approval = enabled;
        }
    }

    /// Makes every transfer of `contract` return `false` without moving tokens.
    pub fn set_transfer_returns_false(&mut self, contract: Address, enabled: bool) {
        if let Some(token) = self.state.contracts.get_mut(&contract) {
            token.transfer_returns_false = enabled;
        }
    }

    /// Blocks `account` from receiving funds.
    pub fn block_address(&mut self, account: Address) {
        self.state.blocked.insert(account);
    }

    /// Disables sends of `denom` between accounts.
    pub fn disable_send(&mut self, denom: &str) {
        self.state.send_disabled.insert(denom.to_string());
    }

    /// Wraps `amount` of the EVM denom held by `holder` into [`WRAPPED_NATIVE`] tokens.
    pub fn wrap_native(&mut self, holder: Address, amount: U256) {
        self.state
            .move_coins(holder, WRAPPED_NATIVE, EVM_DENOM, amount)
            .expect("holder lacks native balance to wrap");
        self.mint_tokens(WRAPPED_NATIVE, holder, amount);
    }

    /// Returns the extension installed at `address`.
    pub fn extension(&self, address: Address) -> Option<&Erc20Extension> {
        self.state.extensions.get(&address)
    }

    /// Returns true if scripted bytecode is deployed at `address`.
    pub fn has_contract(&self, address: Address) -> bool {
        self.state.contracts.contains_key(&address)
    }

    /// Makes [`EvmKeeper::delete_account`] fail for `address`.
    pub fn fail_delete_account(&mut self, address: Address) {
        self.state.undeletable.insert(address);
    }

    /// Returns the module events emitted so far.
    pub fn events(&self) -> &[Erc20Event] {
        &self.state.events
    }
}

impl KvStore for MockChain {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.store.get(key)
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.state.store.set(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.state.store.delete(key);
    }

    fn prefix_iter<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a {
        self.state.store.prefix_iter(prefix)
    }
}

impl BankKeeper for MockChain {
    fn send_coins_from_account_to_module(
        &mut self,
        sender: Address,
        module: &str,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let module = Self::module(module)?;
        self.state.move_coins(sender, module, &coin.denom, coin.amount)
    }

    fn send_coins_from_module_to_account(
        &mut self,
        module: &str,
        recipient: Address,
        coin: &Coin,
    ) -> Result<(), BankError> {
        let module = Self::module(module)?;
        self.state.move_coins(module, recipient, &coin.denom, coin.amount)
    }

    fn mint_coins(&mut self, module: &str, coin: &Coin) -> Result<(), BankError> {
        let module = Self::module(module)?;
        self.state.mint(module, &coin.denom, coin.amount)
    }

    fn burn_coins(&mut self, module: &str, coin: &Coin) -> Result<(), BankError> {
        let module = Self::module(module)?;
        self.state.burn(module, &coin.denom, coin.amount)
    }

    fn get_balance(&self, account: Address, denom: &str) -> Coin {
        Coin::new(denom, self.state.balance(account, denom))
    }

    fn get_all_balances(&self, account: Address) -> Vec<Coin> {
        self.state
            .balances
            .range((account, String::new())..)
            .take_while(|((holder, _), _)| *holder == account)
            .filter(|(_, amount)| !amount.is_zero())
            .map(|((_, denom), amount)| Coin::new(denom.clone(), *amount))
            .collect()
    }

    fn is_send_enabled(&self, denom: &str) -> bool {
        !self.state.send_disabled.contains(denom)
    }

    fn blocked_addr(&self, account: Address) -> bool {
        self.state.blocked.contains(&account)
    }

    fn has_supply(&self, denom: &str) -> bool {
        !self.supply_of(denom).is_zero()
    }

    fn denom_metadata(&self, denom: &str) -> Option<Metadata> {
        self.state.metadata.get(denom).cloned()
    }

    fn set_denom_metadata(&mut self, metadata: Metadata) {
        self.state.metadata.insert(metadata.base.clone(), metadata);
    }
}

impl AccountKeeper for MockChain {
    fn module_address(&self, module: &str) -> Address {
        module_account(module)
    }

    fn sequence(&self, account: Address) -> u64 {
        self.state.nonces.get(&account).copied().unwrap_or_default()
    }

    fn accounts(&self) -> impl Iterator<Item = Address> + '_ {
        self.state.known.iter().copied()
    }

    fn is_module_account(&self, account: Address) -> bool {
        [MODULE_NAME, TRANSFER_MODULE].iter().any(|name| module_account(name) == account)
    }
}

impl EvmKeeper for MockChain {
    fn call_evm(
        &mut self,
        from: Address,
        to: Address,
        data: Bytes,
        commit: bool,
    ) -> Result<CallOutput, EvmError> {
        let saved = self.state.clone();
        let result = self.state.execute(from, to, &data);
        if !commit || result.is_err() {
            self.state = saved;
        }
        result
    }

    fn create_contract(&mut self, from: Address, init_code: Bytes) -> Result<Address, EvmError> {
        let args = init_code
            .strip_prefix(MINTER_BURNER_CODE)
            .ok_or_else(|| EvmError::Internal("unsupported creation code".to_string()))?;
        let (name, symbol, decimals) = <(String, String, U256)>::abi_decode_params(args)
            .map_err(|err| reverted(format!("invalid constructor arguments: {err}")))?;
        let decimals =
            u8::try_from(decimals).map_err(|_| reverted(format!("decimals {decimals} out of range")))?;

        let nonce = self.sequence(from);
        let address = from.create(nonce);
        self.state.nonces.insert(from, nonce + 1);
        self.state.known.insert(from);
        self.state.contracts.insert(
            address,
            MockToken::new(TokenKind::MinterBurner { owner: from }, &name, &symbol, decimals),
        );
        Ok(address)
    }

    fn evm_account(&self, address: Address) -> Option<EvmAccount> {
        if self.state.contracts.contains_key(&address) || self.state.extensions.contains_key(&address)
        {
            return Some(EvmAccount { nonce: 1, code_hash: keccak256(address.as_slice()) });
        }
        self.state
            .known
            .contains(&address)
            .then(|| EvmAccount { nonce: self.sequence(address), code_hash: KECCAK256_EMPTY })
    }

    fn delete_account(&mut self, address: Address) -> Result<(), EvmError> {
        if self.state.undeletable.contains(&address) {
            return Err(EvmError::Internal(format!("failed to self-destruct {address}")));
        }
        self.state.contracts.remove(&address);
        Ok(())
    }

    fn install_extension(&mut self, extension: Erc20Extension) -> Result<(), EvmError> {
        self.state.extensions.insert(extension.address(), extension);
        Ok(())
    }

    fn enable_extensions(&mut self, extensions: ActiveExtensions) -> Result<(), EvmError> {
        self.state.active = extensions;
        Ok(())
    }

    fn active_extensions(&self) -> ActiveExtensions {
        self.state.active.clone()
    }
}

impl EventManager for MockChain {
    fn emit_event(&mut self, event: Erc20Event) {
        self.state.events.push(event);
    }
}

impl Transactional for MockChain {
    fn checkpoint(&mut self) -> Checkpoint {
        self.snapshots.push(self.state.clone());
        Checkpoint(self.snapshots.len() - 1)
    }

    fn checkpoint_commit(&mut self, checkpoint: Checkpoint) {
        self.snapshots.truncate(checkpoint.0);
    }

    fn checkpoint_revert(&mut self, checkpoint: Checkpoint) {
        self.snapshots.truncate(checkpoint.0 + 1);
        if let Some(saved) = self.snapshots.pop() {
            self.state = saved;
        }
    }
}

// === Transfer Application ===

/// ICS-20 application that escrows native denoms and burns vouchers, in the shape of the
/// standard transfer module.
#[derive(Debug, Default)]
pub struct MockTransferApp {
    sent: Vec<MsgTransfer>,
    rejection: Option<String>,
}

impl MockTransferApp {
    /// Address of the escrow account.
    pub fn escrow_address<L: AccountKeeper>(&self, ledger: &L) -> Address {
        ledger.module_address(TRANSFER_MODULE)
    }

    /// Transfers accepted so far.
    pub fn sent(&self) -> &[MsgTransfer] {
        &self.sent
    }

    /// Rebuilds the packet the `index`-th accepted transfer was sent as.
    pub fn sent_packet(&self, index: usize) -> Option<Packet> {
        let msg = self.sent.get(index)?;
        let data = FungibleTokenPacketData {
            denom: msg.token.denom.clone(),
            amount: msg.token.amount.to_string(),
            sender: msg.sender.to_string(),
            receiver: msg.receiver.clone(),
            memo: msg.memo.clone(),
        };
        Some(Packet {
            sequence: index as u64 + 1,
            source_port: msg.source_port.clone(),
            source_channel: msg.source_channel.clone(),
            destination_port: TRANSFER_MODULE.to_string(),
            destination_channel: "channel-1".to_string(),
            data: data.to_bytes().ok()?,
            timeout_timestamp: msg.timeout_timestamp,
        })
    }

    /// Makes every following send fail with `reason`.
    pub fn reject_sends(&mut self, reason: impl Into<String>) {
        self.rejection = Some(reason.into());
    }

    fn receive<L: BankKeeper>(&self, ledger: &mut L, packet: &Packet) -> Result<(), TransferError> {
        let data = packet.token_data().map_err(|err| TransferError::InvalidPacket(err.to_string()))?;
        let receiver = parse_hex_account(&data.receiver)?;
        let amount = data.amount().ok_or_else(|| TransferError::InvalidAmount(data.amount.clone()))?;
        let coin = Coin::new(packet.received_denom(&data.denom), amount);

        let source_prefix = format!("{}/{}/", packet.source_port, packet.source_channel);
        if !data.denom.starts_with(&source_prefix) {
            ledger.mint_coins(TRANSFER_MODULE, &coin)?;
        }
        ledger.send_coins_from_module_to_account(TRANSFER_MODULE, receiver, &coin)?;
        Ok(())
    }

    fn refund<L: BankKeeper>(&self, ledger: &mut L, packet: &Packet) -> Result<(), TransferError> {
        let data = packet.token_data().map_err(|err| TransferError::InvalidPacket(err.to_string()))?;
        let sender = parse_hex_account(&data.sender)?;
        let amount = data.amount().ok_or_else(|| TransferError::InvalidAmount(data.amount.clone()))?;
        let coin = Coin::new(sent_denom(&data.denom), amount);

        if coin.denom.starts_with(IBC_DENOM_PREFIX) {
            ledger.mint_coins(TRANSFER_MODULE, &coin)?;
        }
        ledger.send_coins_from_module_to_account(TRANSFER_MODULE, sender, &coin)?;
        Ok(())
    }
}

fn parse_hex_account(raw: &str) -> Result<Address, TransferError> {
    raw.trim().parse().map_err(|_| TransferError::InvalidAddress(raw.to_string()))
}

impl<L: BankKeeper + AccountKeeper> TransferApp<L> for MockTransferApp {
    fn on_recv_packet(&mut self, ledger: &mut L, packet: &Packet) -> Acknowledgement {
        match self.receive(ledger, packet) {
            Ok(()) => Acknowledgement::success(),
            Err(err) => Acknowledgement::error(err),
        }
    }

    fn on_acknowledgement_packet(
        &mut self,
        ledger: &mut L,
        packet: &Packet,
        ack: &Acknowledgement,
    ) -> Result<(), TransferError> {
        if ack.is_success() {
            return Ok(());
        }
        self.refund(ledger, packet)
    }

    fn on_timeout_packet(&mut self, ledger: &mut L, packet: &Packet) -> Result<(), TransferError> {
        self.refund(ledger, packet)
    }

    fn send_transfer(&mut self, ledger: &mut L, msg: &MsgTransfer) -> Result<u64, TransferError> {
        if let Some(reason) = &self.rejection {
            return Err(TransferError::Rejected(reason.clone()));
        }
        ledger.send_coins_from_account_to_module(msg.sender, TRANSFER_MODULE, &msg.token)?;
        if msg.token.denom.starts_with(IBC_DENOM_PREFIX) {
            ledger.burn_coins(TRANSFER_MODULE, &msg.token)?;
        }
        self.sent.push(msg.clone());
        Ok(self.sent.len() as u64)
    }
}

// === Fixtures ===

/// Keeper over a fresh [`MockChain`] with default params.
pub fn setup_keeper() -> Keeper<MockChain> {
    Keeper::new(MockChain::new(), test_config(), Params::default())
}

/// Configuration used by [`setup_keeper`].
pub fn test_config() -> Erc20Config {
    Erc20Config::new(EVM_DENOM, WRAPPED_NATIVE, AUTHORITY)
        .with_minter_burner_code(Bytes::from_static(MINTER_BURNER_CODE))
}

/// Bank metadata for `denom` whose display unit drops the leading `a` and sits at `decimals`.
pub fn coin_metadata(denom: &str, decimals: u32) -> Metadata {
    let mut denom_units = vec![DenomUnit::new(denom, 0)];
    let display = if decimals == 0 {
        denom.to_string()
    } else {
        let display = denom.strip_prefix('a').unwrap_or(denom).to_string();
        denom_units.push(DenomUnit::new(display.clone(), decimals));
        display
    };
    Metadata {
        description: format!("The native staking token {display}"),
        denom_units,
        base: denom.to_string(),
        symbol: display.to_uppercase(),
        name: display.clone(),
        display,
    }
}

/// An ICS-20 packet arriving on `transfer/channel-0`.
pub fn packet(denom: &str, amount: u64, sender: Address, receiver: Address) -> Packet {
    let data = FungibleTokenPacketData {
        denom: denom.to_string(),
        amount: amount.to_string(),
        sender: sender.to_string(),
        receiver: receiver.to_string(),
        memo: String::new(),
    };
    Packet {
        sequence: 1,
        source_port: TRANSFER_MODULE.to_string(),
        source_channel: "channel-0".to_string(),
        destination_port: TRANSFER_MODULE.to_string(),
        destination_channel: "channel-0".to_string(),
        data: data.to_bytes().expect("packet data encodes"),
        timeout_timestamp: 0,
    }
}

impl Keeper<MockChain> {
    /// Registers [`MODULE_DENOM`] with 18 display decimals, minting one unit first if the coin
    /// has no supply yet.
    pub fn register_module_coin(&mut self) -> Result<TokenPair, Erc20Error> {
        if !self.ledger.has_supply(MODULE_DENOM) {
            self.ledger.fund(AUTHORITY, MODULE_DENOM, U256::from(1));
        }
        self.register_coin(AUTHORITY, coin_metadata(MODULE_DENOM, 18))
    }

    /// Registers [`EXTERNAL_TOKEN`].
    pub fn register_external_token(&mut self) -> Result<TokenPair, Erc20Error> {
        self.register_erc20(AUTHORITY, EXTERNAL_TOKEN)
    }
}

// === Span Collection ===

/// A recorded span with its name and captured fields.
#[derive(Debug, Clone)]
pub struct SpanRecord {
    /// Span name.
    pub name: String,
    /// Recorded `(field, value)` pairs.
    pub fields: Vec<(String, String)>,
}

impl SpanRecord {
    /// Returns true if the span recorded `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }
}

struct FieldCollector {
    fields: Vec<(String, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.push((field.name().to_string(), value.to_string()));
    }
}

/// A tracing layer that records span metadata for test assertions.
#[derive(Debug, Clone, Default)]
pub struct SpanCollector {
    spans: Arc<Mutex<Vec<SpanRecord>>>,
}

impl SpanCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the first span with the given name.
    pub fn find_span(&self, name: &str) -> Option<SpanRecord> {
        self.spans.lock().unwrap().iter().find(|s| s.name == name).cloned()
    }

    /// Installs this collector as the default subscriber for the current thread, returning a
    /// guard that restores the previous subscriber on drop.
    pub fn as_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        set_default(subscriber)
    }
}

impl<S> Layer<S> for SpanCollector
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        let mut collector = FieldCollector { fields: Vec::new() };
        attrs.record(&mut collector);
        let record = SpanRecord { name: attrs.metadata().name().to_string(), fields: collector.fields };
        self.spans.lock().unwrap().push(record);
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        ctx: Context<'_, S>,
    ) {
        let mut collector = FieldCollector { fields: Vec::new() };
        values.record(&mut collector);

        if let Some(span_ref) = ctx.span(id) {
            let name = span_ref.name().to_string();
            let mut spans = self.spans.lock().unwrap();
            if let Some(record) = spans.iter_mut().find(|s| s.name == name) {
                record.fields.extend(collector.fields);
            }
        }
    }
}
