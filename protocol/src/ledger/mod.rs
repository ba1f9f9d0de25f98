//! # Ledger Operations
//!
//! [`TokenMethod`] is the token module's method surface: the balance-mutating
//! operations, token-support administration, and the read-only queries. It
//! owns its configuration, its four substore handles, and the two external
//! collaborators it calls into (fee payment and interoperability).
//!
//! ## Execution Model
//!
//! Every public mutating operation runs against a [`MethodContext`], which
//! borrows the host's store and event queue for one unit of work. Inside,
//! the operation body executes over a [`StoreTransaction`] and a child
//! [`EventQueue`]:
//!
//! ```text
//!   ctx.store ──► StoreTransaction ──► body ──► Ok  ─► commit writes + events
//!                                          └──► Err ─► drop writes, keep
//!                                                      no-revert events only
//! ```
//!
//! Exactly one outcome event is emitted per operation: a success event after
//! commit, or a failure event (no-revert) carrying the error's result code.
//! Stateless argument checks run before the body and emit nothing.
//!
//! ## Layout
//!
//! ```text
//! mod.rs      — TokenMethod, MethodContext, atomic execution, balance helpers
//! accounts.rs — initialize, mint, burn, transfer, lock, unlock
//! support.rs  — supported-token administration
//! query.rs    — read-only method surface
//! ```

pub mod accounts;
pub mod query;
pub mod support;

use std::fmt;
use std::sync::Arc;

use crate::config::TokenConfig;
use crate::error::{TokenError, TokenResult};
use crate::events::{EventQueue, TokenEvent, TokenEventResult};
use crate::identifiers::{Address, ChainId, TokenId};
use crate::interop::{FeeMethod, InteroperabilityMethod};
use crate::storage::typed::TokenStores;
use crate::storage::{EscrowRecord, KvStore, StoreKey, StoreTransaction};

// ---------------------------------------------------------------------------
// MethodContext
// ---------------------------------------------------------------------------

/// Store and event sink of the unit of work an operation runs in.
pub struct MethodContext<'a> {
    store: &'a mut dyn KvStore,
    events: &'a mut EventQueue,
}

impl<'a> MethodContext<'a> {
    pub fn new(store: &'a mut dyn KvStore, events: &'a mut EventQueue) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &(dyn KvStore + 'a) {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut (dyn KvStore + 'a) {
        &mut *self.store
    }

    pub fn events(&self) -> &EventQueue {
        &*self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut *self.events
    }
}

// ---------------------------------------------------------------------------
// TokenMethod
// ---------------------------------------------------------------------------

/// The token module's ledger.
pub struct TokenMethod {
    config: TokenConfig,
    stores: TokenStores,
    interop: Arc<dyn InteroperabilityMethod>,
    fee: Arc<dyn FeeMethod>,
}

impl fmt::Debug for TokenMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenMethod")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenMethod {
    /// Builds the ledger. Fails if the configuration is inconsistent.
    pub fn new(
        config: TokenConfig,
        interop: Arc<dyn InteroperabilityMethod>,
        fee: Arc<dyn FeeMethod>,
    ) -> TokenResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stores: TokenStores::default(),
            interop,
            fee,
        })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn own_chain_id(&self) -> ChainId {
        self.config.own_chain_id
    }

    pub(crate) fn stores(&self) -> &TokenStores {
        &self.stores
    }

    pub(crate) fn interop(&self) -> &dyn InteroperabilityMethod {
        self.interop.as_ref()
    }

    pub(crate) fn fee(&self) -> &dyn FeeMethod {
        self.fee.as_ref()
    }

    /// Whether `token_id` was issued by this chain.
    pub fn is_native_token(&self, token_id: TokenId) -> bool {
        token_id.is_native_to(self.config.own_chain_id)
    }

    // -----------------------------------------------------------------------
    // Atomic execution
    // -----------------------------------------------------------------------

    /// Runs `body` over a write buffer. Writes and events reach `ctx` only if
    /// the body succeeds; on failure only no-revert events survive.
    pub(crate) fn atomic<T>(
        &self,
        ctx: &mut MethodContext<'_>,
        body: impl FnOnce(&mut MethodContext<'_>) -> TokenResult<T>,
    ) -> TokenResult<T> {
        let mut events = EventQueue::new();
        let mut tx = StoreTransaction::new(&mut *ctx.store);
        let outcome = body(&mut MethodContext::new(&mut tx, &mut events));
        match outcome {
            Ok(value) => {
                tx.commit()?;
                ctx.events.commit(events);
                Ok(value)
            }
            Err(err) => {
                drop(tx);
                ctx.events.revert(events);
                Err(err)
            }
        }
    }

    /// [`atomic`](Self::atomic), then records `event` as the outcome.
    pub(crate) fn execute<T>(
        &self,
        ctx: &mut MethodContext<'_>,
        event: TokenEvent,
        body: impl FnOnce(&mut MethodContext<'_>) -> TokenResult<T>,
    ) -> TokenResult<T> {
        self.execute_with(ctx, event, TokenError::event_result, body)
    }

    /// Like [`execute`](Self::execute) with a custom failure classification.
    pub(crate) fn execute_with<T>(
        &self,
        ctx: &mut MethodContext<'_>,
        event: TokenEvent,
        classify: fn(&TokenError) -> TokenEventResult,
        body: impl FnOnce(&mut MethodContext<'_>) -> TokenResult<T>,
    ) -> TokenResult<T> {
        let outcome = self.atomic(ctx, body);
        match &outcome {
            Ok(_) => ctx.events.emit(event),
            Err(err) => ctx.events.emit_failure(event, classify(err)),
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Balance helpers
    // -----------------------------------------------------------------------

    /// Read-only check that `address` holds at least `amount` available.
    pub(crate) fn check_available(
        &self,
        store: &dyn KvStore,
        address: Address,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        let key = StoreKey::User { address, token_id };
        let account = self
            .stores
            .user
            .find(store, &key)?
            .ok_or(TokenError::AccountNotFound { address, token_id })?;
        if account.available_balance < amount {
            return Err(TokenError::InsufficientBalance {
                address,
                token_id,
                available: account.available_balance,
                required: amount,
            });
        }
        Ok(())
    }

    pub(crate) fn debit_available(
        &self,
        store: &mut dyn KvStore,
        address: Address,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        self.check_available(store, address, token_id, amount)?;
        let key = StoreKey::User { address, token_id };
        let mut account = self.stores.user.get(store, &key)?;
        account.available_balance -= amount;
        self.stores.user.set(store, &key, &account)?;
        Ok(())
    }

    /// Credits `amount`, creating the account without charging a fee. A
    /// zero credit writes nothing, so it never leaves an empty account.
    pub(crate) fn credit_available_with_create(
        &self,
        store: &mut dyn KvStore,
        address: Address,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let key = StoreKey::User { address, token_id };
        let mut account = self.stores.user.get_or_default(store, &key)?;
        account.credit_available(amount)?;
        self.stores.user.set(store, &key, &account)?;
        Ok(())
    }

    pub(crate) fn escrowed_amount(
        &self,
        store: &dyn KvStore,
        chain_id: ChainId,
        token_id: TokenId,
    ) -> TokenResult<u64> {
        let key = StoreKey::Escrow { chain_id, token_id };
        Ok(self.stores.escrow.get_or_default(store, &key)?.amount)
    }

    /// Read-only check that the escrow for `chain_id` covers `amount`.
    pub(crate) fn check_escrow(
        &self,
        store: &dyn KvStore,
        chain_id: ChainId,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        let escrowed = self.escrowed_amount(store, chain_id, token_id)?;
        if escrowed < amount {
            return Err(TokenError::InsufficientEscrow {
                chain_id,
                token_id,
                escrowed,
                required: amount,
            });
        }
        Ok(())
    }

    /// Draws `amount` from an escrow bucket. A zero amount is a no-op, so
    /// a chain without a bucket can still send fee-less messages.
    pub(crate) fn debit_escrow(
        &self,
        store: &mut dyn KvStore,
        chain_id: ChainId,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        self.check_escrow(store, chain_id, token_id, amount)?;
        if amount == 0 {
            return Ok(());
        }
        let key = StoreKey::Escrow { chain_id, token_id };
        let mut escrow = self.stores.escrow.get(store, &key)?;
        escrow.amount -= amount;
        self.stores.escrow.set(store, &key, &escrow)?;
        Ok(())
    }

    /// Credits an escrow bucket, creating it without charging a fee.
    pub(crate) fn credit_escrow_with_create(
        &self,
        store: &mut dyn KvStore,
        chain_id: ChainId,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        if chain_id == self.config.own_chain_id {
            return Err(TokenError::SameChain(chain_id));
        }
        let key = StoreKey::Escrow { chain_id, token_id };
        let current = self.stores.escrow.get_or_default(store, &key)?;
        let amount = current
            .amount
            .checked_add(amount)
            .ok_or(TokenError::Overflow("escrow amount"))?;
        self.stores
            .escrow
            .set(store, &key, &EscrowRecord { amount })?;
        Ok(())
    }

    /// Moves `amount` between two escrow buckets of the same token. Moving
    /// nothing touches neither bucket.
    pub(crate) fn move_escrow(
        &self,
        store: &mut dyn KvStore,
        from: ChainId,
        to: ChainId,
        token_id: TokenId,
        amount: u64,
    ) -> TokenResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit_escrow(store, from, token_id, amount)?;
        self.credit_escrow_with_create(store, to, token_id, amount)
    }
}
