//! Read-only query surface.

use alloy_primitives::Bytes;
use erc20_primitives::{MsgError, Params, TokenPair};
use serde::{Deserialize, Serialize};

use crate::{
    error::Erc20Error,
    expected_keepers::Ledger,
    keeper::Keeper,
    store::KEY_PREFIX_TOKEN_PAIR,
};

/// Page size used when a request leaves `limit` at zero.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Cursor-based page request over the token pair region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageRequest {
    /// Pair id to start from, inclusive. Empty starts at the first pair.
    pub key: Bytes,
    /// Maximum number of pairs to return.
    pub limit: u64,
    /// Whether to count every stored pair.
    pub count_total: bool,
}

/// Cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    /// Id of the first pair of the next page; empty on the last page.
    pub next_key: Bytes,
    /// Total number of pairs, when requested.
    pub total: Option<u64>,
}

/// Response of the `TokenPairs` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTokenPairsResponse {
    /// Pairs of the requested page.
    pub token_pairs: Vec<TokenPair>,
    /// Cursor for the next page.
    pub pagination: PageResponse,
}

impl<L: Ledger> Keeper<L> {
    /// Returns one page of pairs in id order.
    pub fn token_pairs_page(&self, page: &PageRequest) -> Result<QueryTokenPairsResponse, Erc20Error> {
        let limit = if page.limit == 0 { DEFAULT_PAGE_LIMIT } else { page.limit };
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let start = page.key.as_ref();

        let mut token_pairs = Vec::new();
        let mut next_key = Bytes::new();
        let mut total = 0u64;
        for (key, value) in self.ledger.prefix_iter(KEY_PREFIX_TOKEN_PAIR) {
            total += 1;
            let id = &key[KEY_PREFIX_TOKEN_PAIR.len()..];
            if id < start {
                continue;
            }
            if token_pairs.len() == limit {
                if next_key.is_empty() {
                    next_key = Bytes::copy_from_slice(id);
                }
                if page.count_total {
                    continue;
                }
                break;
            }
            let pair = TokenPair::from_bytes(&value)
                .map_err(|err| Erc20Error::Corrupted(format!("token pair: {err}")))?;
            token_pairs.push(pair);
        }

        let pagination = PageResponse { next_key, total: page.count_total.then_some(total) };
        Ok(QueryTokenPairsResponse { token_pairs, pagination })
    }

    /// Returns the pair for a contract address in hex or a denom.
    pub fn query_token_pair(&self, token: &str) -> Result<TokenPair, Erc20Error> {
        if token.trim().is_empty() {
            return Err(MsgError::Empty("token").into());
        }
        self.token_pair_by_token(token)
    }

    /// Returns the current params.
    pub const fn query_params(&self) -> Params {
        self.params
    }
}
