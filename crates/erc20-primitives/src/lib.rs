//! Primitive types for the erc20 token-pair module.
//!
//! Everything in here is plain data: the [`TokenPair`] binding and its storage encoding,
//! coins and bank metadata, module messages, params, events and the ICS-20 packet shapes
//! consumed by the cross-chain middleware. Capability traits and state transitions live in
//! the keeper crate.

pub mod coin;
pub mod denom;
pub mod events;
pub mod msg;
pub mod packet;
pub mod params;
pub mod token_pair;

pub use coin::{sanitize_erc20_name, Coin, DenomUnit, Metadata, MetadataError};
pub use denom::{
    create_denom, denom_address, ibc_denom, validate_denom, DenomError, ERC20_DENOM_PREFIX,
    IBC_DENOM_PREFIX,
};
pub use events::Erc20Event;
pub use msg::{MsgConvertCoin, MsgConvertErc20, MsgError, MsgTransfer, MsgUpdateParams};
pub use packet::{sent_denom, Acknowledgement, FungibleTokenPacketData, Packet};
pub use params::Params;
pub use token_pair::{Owner, TokenPair, TokenPairId};

/// Name of the module account that escrows coins and owns module-deployed contracts.
pub const MODULE_NAME: &str = "erc20";
