//! Key-value storage capability and the store layout of the module.

use std::collections::BTreeMap;

/// Prefix of `id -> TokenPair`.
pub const KEY_PREFIX_TOKEN_PAIR: &[u8] = &[0x01];
/// Prefix of `erc20 address -> id`.
pub const KEY_PREFIX_TOKEN_PAIR_BY_ERC20: &[u8] = &[0x02];
/// Prefix of `denom -> id`.
pub const KEY_PREFIX_TOKEN_PAIR_BY_DENOM: &[u8] = &[0x03];
/// Prefix of the STRv2 affected-address set.
pub const KEY_PREFIX_STRV2_ADDRESS: &[u8] = &[0x04];

/// Byte-keyed store scoped to the module.
pub trait KvStore {
    /// Returns the value at `key`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Writes `value` at `key`.
    fn set(&mut self, key: &[u8], value: Vec<u8>);

    /// Removes `key`.
    fn delete(&mut self, key: &[u8]);

    /// Returns true if `key` is present.
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Iterates every entry whose key starts with `prefix`, in ascending key order.
    fn prefix_iter<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a;
}

/// Joins a prefix and a key.
pub fn prefixed_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + key.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(key);
    out
}

/// Ordered in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.entries.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    fn prefix_iter<'a>(
        &'a self,
        prefix: &'a [u8],
    ) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_iter_stays_inside_prefix() {
        let mut store = MemoryStore::new();
        store.set(&prefixed_key(KEY_PREFIX_TOKEN_PAIR, b"b"), b"2".to_vec());
        store.set(&prefixed_key(KEY_PREFIX_TOKEN_PAIR, b"a"), b"1".to_vec());
        store.set(&prefixed_key(KEY_PREFIX_TOKEN_PAIR_BY_ERC20, b"a"), b"x".to_vec());

        let values: Vec<_> =
            store.prefix_iter(KEY_PREFIX_TOKEN_PAIR).map(|(_, value)| value).collect();
        assert_eq!(values, vec![b"1".to_vec(), b"2".to_vec()]);
    }

    #[test]
    fn delete_removes_entry() {
        let mut store = MemoryStore::new();
        store.set(b"key", b"value".to_vec());
        assert!(store.has(b"key"));
        store.delete(b"key");
        assert!(!store.has(b"key"));
        assert!(store.is_empty());
    }
}
