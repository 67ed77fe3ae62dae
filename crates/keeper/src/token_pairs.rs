//! Token pair registry: the primary record and its two secondary indexes.

use alloy_primitives::{Address, B256};
use erc20_primitives::{TokenPair, TokenPairId};
use std::str::FromStr;

use crate::{
    error::Erc20Error,
    expected_keepers::Ledger,
    keeper::Keeper,
    store::{
        prefixed_key, KEY_PREFIX_TOKEN_PAIR, KEY_PREFIX_TOKEN_PAIR_BY_DENOM,
        KEY_PREFIX_TOKEN_PAIR_BY_ERC20,
    },
};

/// Parses `token` as a contract address if it is `0x` followed by 40 hex digits.
pub fn parse_contract_address(token: &str) -> Option<Address> {
    if token.len() == 42 && token.starts_with("0x") {
        Address::from_str(token).ok()
    } else {
        None
    }
}

fn pair_key(id: &TokenPairId) -> Vec<u8> {
    prefixed_key(KEY_PREFIX_TOKEN_PAIR, id.as_slice())
}

fn erc20_key(address: Address) -> Vec<u8> {
    prefixed_key(KEY_PREFIX_TOKEN_PAIR_BY_ERC20, address.as_slice())
}

fn denom_key(denom: &str) -> Vec<u8> {
    prefixed_key(KEY_PREFIX_TOKEN_PAIR_BY_DENOM, denom.as_bytes())
}

fn decode_pair(key: &[u8], value: &[u8]) -> Result<TokenPair, Erc20Error> {
    TokenPair::from_bytes(value).map_err(|err| {
        Erc20Error::Corrupted(format!("token pair at {}: {err}", alloy_primitives::hex::encode(key)))
    })
}

fn decode_id(value: &[u8]) -> Result<TokenPairId, Erc20Error> {
    B256::try_from(value)
        .map_err(|_| Erc20Error::Corrupted(format!("token pair id of length {}", value.len())))
}

impl<L: Ledger> Keeper<L> {
    /// Iterates every registered pair in id order.
    pub fn token_pairs(&self) -> impl Iterator<Item = Result<TokenPair, Erc20Error>> + '_ {
        self.ledger
            .prefix_iter(KEY_PREFIX_TOKEN_PAIR)
            .map(|(key, value)| decode_pair(&key, &value))
    }

    /// Resolves the id of a pair from a contract address in hex or a denom.
    pub fn token_pair_id(&self, token: &str) -> Result<Option<TokenPairId>, Erc20Error> {
        let key = match parse_contract_address(token) {
            Some(address) => erc20_key(address),
            None => denom_key(token),
        };
        self.ledger.get(&key).map(|value| decode_id(&value)).transpose()
    }

    /// Returns the pair stored under `id`.
    pub fn token_pair(&self, id: &TokenPairId) -> Result<Option<TokenPair>, Erc20Error> {
        let key = pair_key(id);
        self.ledger.get(&key).map(|value| decode_pair(&key, &value)).transpose()
    }

    /// Returns the pair for a contract address in hex or a denom.
    pub fn token_pair_by_token(&self, token: &str) -> Result<TokenPair, Erc20Error> {
        let id = self.token_pair_id(token)?.ok_or_else(|| Erc20Error::NotFound(token.to_string()))?;
        self.token_pair(&id)?.ok_or_else(|| Erc20Error::NotFound(token.to_string()))
    }

    /// Stores a new pair and both indexes.
    ///
    /// Fails with [`Erc20Error::AlreadyExists`] if the address or the denom is already bound.
    pub fn register_token_pair(&mut self, pair: TokenPair) -> Result<TokenPair, Erc20Error> {
        if self.is_erc20_registered(pair.erc20_address) {
            return Err(Erc20Error::AlreadyExists(format!(
                "contract {} already registered",
                pair.erc20_address
            )));
        }
        if self.is_denom_registered(&pair.denom) {
            return Err(Erc20Error::AlreadyExists(format!("denom {} already registered", pair.denom)));
        }

        let id = pair.id();
        self.ledger.set(&erc20_key(pair.erc20_address), id.to_vec());
        self.ledger.set(&denom_key(&pair.denom), id.to_vec());
        self.set_token_pair(&pair);
        tracing::debug!(
            target: "erc20::registry",
            %id,
            denom = %pair.denom,
            erc20 = ?pair.erc20_address,
            owner = ?pair.contract_owner,
            "token pair registered"
        );
        Ok(pair)
    }

    /// Overwrites the primary record of an already registered pair.
    pub(crate) fn set_token_pair(&mut self, pair: &TokenPair) {
        self.ledger.set(&pair_key(&pair.id()), pair.to_bytes());
    }

    /// Removes a pair and both of its indexes.
    pub fn delete_token_pair(&mut self, pair: &TokenPair) {
        self.ledger.delete(&pair_key(&pair.id()));
        self.ledger.delete(&erc20_key(pair.erc20_address));
        self.ledger.delete(&denom_key(&pair.denom));
        tracing::debug!(target: "erc20::registry", denom = %pair.denom, erc20 = ?pair.erc20_address, "token pair deleted");
    }

    /// Returns true if a pair is stored under `id`.
    pub fn is_token_pair_registered(&self, id: &TokenPairId) -> bool {
        self.ledger.has(&pair_key(id))
    }

    /// Returns true if `address` is bound to a pair.
    pub fn is_erc20_registered(&self, address: Address) -> bool {
        self.ledger.has(&erc20_key(address))
    }

    /// Returns true if `denom` is bound to a pair.
    pub fn is_denom_registered(&self, denom: &str) -> bool {
        self.ledger.has(&denom_key(denom))
    }

    /// Returns the contract address paired with `denom`.
    pub fn coin_address(&self, denom: &str) -> Result<Address, Erc20Error> {
        self.token_pair_by_token(denom).map(|pair| pair.erc20_address)
    }

    /// Returns the denom paired with `address`.
    pub fn token_denom(&self, address: Address) -> Result<String, Erc20Error> {
        self.token_pair_by_token(&address.to_string()).map(|pair| pair.denom)
    }
}
