// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Protocol — Core Library
//!
//! A multi-token ledger for a chain that is one of many. Each token belongs
//! to exactly one home chain; balances move locally between accounts and
//! cross chains through escrow held by the home chain.
//!
//! ## Architecture
//!
//! - **identifiers** — chain, local, token ids and addresses.
//! - **storage** — substore keys, records, and the key-value contract.
//! - **ledger** — accounts, minting, locking, token support, queries.
//! - **interop** — cross-chain transfers, message hooks, recovery.
//! - **genesis** — snapshot validation and the supply conservation proof.
//! - **events** — outcome events emitted by every operation.
//! - **config** — module constants and per-chain configuration.
//!
//! ## Invariants
//!
//! 1. For every token native to this chain, its total supply equals the
//!    sum of all user balances (available + locked) plus all escrow.
//! 2. Every operation either commits all of its writes or none of them.
//! 3. Every operation that passes its stateless checks emits exactly one
//!    outcome event.

pub mod config;
pub mod error;
pub mod events;
pub mod genesis;
pub mod identifiers;
pub mod interop;
pub mod ledger;
pub mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::TokenConfig;
pub use error::{GenesisError, StoreError, TokenError, TokenResult};
pub use events::{EventQueue, EventRecord, TokenEvent, TokenEventResult};
pub use genesis::GenesisStore;
pub use identifiers::{Address, ChainId, LocalId, TokenId};
pub use ledger::{MethodContext, TokenMethod};
