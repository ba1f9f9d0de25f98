//! # Key-Value Store Interface
//!
//! The host chain owns the replicated store; the token module only sees the
//! narrow [`KvStore`] contract. Two implementations ship with the crate:
//!
//! - [`MemoryStore`] — a `BTreeMap`, used by tests and offline tooling.
//! - [`LedgerDb`](super::db::LedgerDb) — sled-backed persistence.
//!
//! [`StoreTransaction`] layers a write buffer over any store. Ledger
//! operations run inside one, so a failing operation leaves the underlying
//! store untouched.

use std::collections::BTreeMap;

use crate::error::StoreResult;

/// Ordered, transactional key-value access.
///
/// `iterate` must return entries in ascending lexicographic order of the raw
/// key bytes. The ledger relies on this for deterministic results.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()>;

    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;

    /// All entries whose key starts with `prefix`, in key order.
    fn iterate(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>>;

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory store backed by a `BTreeMap`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.entries.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn iterate(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// StoreTransaction
// ---------------------------------------------------------------------------

/// Buffered writes over a parent store.
///
/// Reads see the buffer first, then the parent. Nothing reaches the parent
/// until [`commit`](Self::commit); dropping the transaction discards it.
/// `None` in the buffer marks a pending delete.
pub struct StoreTransaction<'a> {
    parent: &'a mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> StoreTransaction<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes and deletes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Applies every buffered write to the parent, in key order.
    pub fn commit(self) -> StoreResult<()> {
        for (key, value) in self.writes {
            match value {
                Some(v) => self.parent.set(&key, v)?,
                None => self.parent.delete(&key)?,
            }
        }
        Ok(())
    }
}

impl KvStore for StoreTransaction<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn iterate(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.iterate(prefix)?.into_iter().collect();
        for (key, value) in self
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
