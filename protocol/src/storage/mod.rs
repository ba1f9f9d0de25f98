//! # Storage Module
//!
//! The token module's view of the replicated store.
//!
//! ## Architecture
//!
//! ```text
//! kv.rs      — KvStore contract, in-memory store, write-buffer transactions
//! db.rs      — sled persistence for offline tooling
//! keys.rs    — module/substore prefixes and fixed-width key encoding
//! records.rs — UserAccount, SupplyRecord, EscrowRecord, SupportedTokensRecord
//! typed.rs   — per-substore typed handles over a KvStore
//! ```
//!
//! ## Design Decisions
//!
//! 1. **One closed key enum.** Each record kind has its own `StoreKey`
//!    variant and fixed-width encoding, so a key can never be read as the
//!    wrong record type.
//!
//! 2. **Bincode for records.** Compact and deterministic. JSON is reserved
//!    for genesis snapshots and configuration.

pub mod db;
pub mod keys;
pub mod kv;
pub mod records;
pub mod typed;

pub use db::LedgerDb;
pub use keys::{StoreKey, Substore};
pub use kv::{KvStore, MemoryStore, StoreTransaction};
pub use records::{
    EscrowRecord, LockedBalance, Record, SupplyRecord, SupportedTokensRecord, UserAccount,
};
pub use typed::{TokenStores, TypedStore};
