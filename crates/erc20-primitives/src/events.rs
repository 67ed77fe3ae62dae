//! Events emitted by the module.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::token_pair::Owner;

/// Module events handed to the host event manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Erc20Event {
    /// A token pair was created.
    RegisterPair {
        /// Pair denom.
        denom: String,
        /// Pair contract.
        erc20_address: Address,
        /// Canonical side.
        owner: Owner,
    },
    /// A denom was registered as a native extension.
    RegisterExtension {
        /// Pair denom.
        denom: String,
        /// Extension address.
        erc20_address: Address,
    },
    /// Conversions on a pair were switched on or off.
    ToggleTokenConversion {
        /// Pair denom.
        denom: String,
        /// Pair contract.
        erc20_address: Address,
        /// New state.
        enabled: bool,
    },
    /// Coins were converted into contract tokens.
    ConvertCoin {
        /// Debited account.
        sender: Address,
        /// Credited account.
        receiver: Address,
        /// Converted amount.
        amount: U256,
        /// Coin denom.
        denom: String,
        /// Pair contract.
        erc20_address: Address,
    },
    /// Contract tokens were converted into coins.
    ConvertErc20 {
        /// Debited account.
        sender: Address,
        /// Credited account.
        receiver: Address,
        /// Converted amount.
        amount: U256,
        /// Coin denom.
        denom: String,
        /// Pair contract.
        contract_address: Address,
    },
    /// The pair owner minted coins.
    Mint {
        /// Minting owner.
        sender: Address,
        /// Credited account.
        to: Address,
        /// Minted amount.
        amount: U256,
        /// Coin denom.
        denom: String,
    },
    /// The pair owner burned coins.
    Burn {
        /// Burning owner.
        sender: Address,
        /// Burned amount.
        amount: U256,
        /// Coin denom.
        denom: String,
    },
    /// The owner account of a native-coin pair changed.
    TransferOwnership {
        /// Pair denom.
        denom: String,
        /// New owner.
        new_owner: Address,
    },
    /// A pair was removed because its contract self-destructed.
    DeletePair {
        /// Pair denom.
        denom: String,
        /// Pair contract.
        erc20_address: Address,
    },
}
