//! # LedgerDb — Persistent Token State
//!
//! sled-backed implementation of [`KvStore`] for running the ledger outside
//! a host chain: genesis verification, snapshot export, offline queries.
//!
//! ## Tree Layout
//!
//! | Tree       | Key                                    | Value              |
//! |------------|----------------------------------------|--------------------|
//! | `token`    | module ‖ substore ‖ fields (see keys)  | `bincode(Record)`  |
//! | `metadata` | key (UTF-8)                            | value (bytes)      |
//!
//! sled orders keys lexicographically, which is exactly the order the key
//! encoding is designed for, so prefix scans return records in tuple order
//! without any sorting on our side.

use std::path::Path;

use sled::{Db, Tree};

use super::kv::KvStore;
use crate::error::{StoreError, StoreResult};

/// Well-known key in the `metadata` tree recording that genesis ran.
const META_GENESIS_DONE: &[u8] = b"genesis_initialized";

/// Persistent token state.
///
/// Cloning is cheap: sled handles are reference-counted, and every clone
/// sees the same data.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    /// Token module records.
    state: Tree,
    /// Bookkeeping outside the consensus state.
    metadata: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let state = db.open_tree("token")?;
        let metadata = db.open_tree("metadata")?;
        Ok(Self {
            db,
            state,
            metadata,
        })
    }

    pub fn is_genesis_initialized(&self) -> StoreResult<bool> {
        Ok(self.metadata.contains_key(META_GENESIS_DONE)?)
    }

    pub fn mark_genesis_initialized(&self) -> StoreResult<()> {
        self.metadata.insert(META_GENESIS_DONE, vec![1u8])?;
        Ok(())
    }

    /// Number of token records stored.
    pub fn record_count(&self) -> usize {
        self.state.len()
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KvStore for LedgerDb {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> StoreResult<()> {
        self.state.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.state.remove(key)?;
        Ok(())
    }

    fn iterate(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.state
            .scan_prefix(prefix)
            .map(|entry| {
                entry
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(StoreError::from)
            })
            .collect()
    }

    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.state.contains_key(key)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
