//! Fixtures shared by unit tests, integration tests, and benches. Built
//! only for tests or with the `test-utils` feature.
//!
//! [`RecordingFee`] and [`StaticInterop`] stand in for the host's fee and
//! interoperability modules. Both record every call so tests can assert on
//! what the ledger asked of its collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::TokenConfig;
use crate::error::{StoreError, StoreResult, TokenError, TokenResult};
use crate::events::{EventQueue, EventRecord};
use crate::identifiers::{Address, ChainId, TokenId};
use crate::interop::{ChannelData, FeeMethod, InteroperabilityMethod, OwnChainAccount, SendRequest};
use crate::ledger::{MethodContext, TokenMethod};
use crate::storage::{KvStore, MemoryStore};

pub const OWN_CHAIN: ChainId = ChainId::from_bytes([4, 0, 0, 1]);
pub const PARTNER_CHAIN: ChainId = ChainId::from_bytes([4, 0, 0, 2]);
pub const THIRD_CHAIN: ChainId = ChainId::from_bytes([4, 0, 0, 3]);

/// Issued by [`OWN_CHAIN`].
pub const NATIVE_TOKEN: TokenId = TokenId::from_bytes([4, 0, 0, 1, 0, 0, 0, 0]);
/// Issued by [`PARTNER_CHAIN`].
pub const FOREIGN_TOKEN: TokenId = TokenId::from_bytes([4, 0, 0, 2, 0, 0, 0, 0]);
/// Issued by [`THIRD_CHAIN`].
pub const THIRD_TOKEN: TokenId = TokenId::from_bytes([4, 0, 0, 3, 0, 0, 0, 0]);
/// Network base token, issued by the mainchain `04000000`.
pub const BASE_TOKEN: TokenId = TokenId::from_bytes([4, 0, 0, 0, 0, 0, 0, 0]);

pub const ALICE: Address = Address::from_bytes([0xA1; 20]);
pub const BOB: Address = Address::from_bytes([0xB0; 20]);
pub const CAROL: Address = Address::from_bytes([0xC0; 20]);
pub const RELAYER: Address = Address::from_bytes([0xEE; 20]);

pub const USER_FEE: u64 = 5;
pub const ESCROW_FEE: u64 = 7;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Key the [`RecordingFee`] ledger lives under, outside the token module's
/// prefix so token substore scans never see it.
pub const FEE_CHARGES_KEY: &[u8] = b"fee:charges";

/// Fee collaborator that records every charge in the store it is handed,
/// so charges commit and roll back with the operation that made them.
#[derive(Debug, Default)]
pub struct RecordingFee {
    failing: Mutex<bool>,
}

impl RecordingFee {
    /// Charges committed to `store`, oldest first.
    pub fn charges(&self, store: &dyn KvStore) -> Vec<u64> {
        read_charges(store).unwrap_or_else(|err| panic!("fee ledger unreadable: {err}"))
    }

    /// Makes every following `pay_fee` call fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }
}

fn read_charges(store: &dyn KvStore) -> StoreResult<Vec<u64>> {
    match store.get(FEE_CHARGES_KEY)? {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(Vec::new()),
    }
}

impl FeeMethod for RecordingFee {
    fn pay_fee(&self, store: &mut dyn KvStore, amount: u64) -> TokenResult<()> {
        if *self.failing.lock() {
            return Err(TokenError::Fee(format!("fee payer cannot cover {amount}")));
        }
        let mut charges = read_charges(store)?;
        charges.push(amount);
        store.set(FEE_CHARGES_KEY, bincode::serialize(&charges).map_err(StoreError::from)?)?;
        Ok(())
    }
}

/// Interoperability collaborator with fixed channels.
#[derive(Debug)]
pub struct StaticInterop {
    own_chain_id: ChainId,
    default_fee_token: TokenId,
    fee_tokens: Mutex<BTreeMap<ChainId, TokenId>>,
    accepting: Mutex<bool>,
    sent: Mutex<Vec<SendRequest>>,
    terminated: Mutex<Vec<ChainId>>,
}

impl StaticInterop {
    pub fn new(own_chain_id: ChainId, default_fee_token: TokenId) -> Self {
        Self {
            own_chain_id,
            default_fee_token,
            fee_tokens: Mutex::new(BTreeMap::new()),
            accepting: Mutex::new(true),
            sent: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    /// Overrides the message fee token of the channel to `chain_id`.
    pub fn set_fee_token(&self, chain_id: ChainId, token_id: TokenId) {
        self.fee_tokens.lock().insert(chain_id, token_id);
    }

    /// Controls the result of `send`.
    pub fn set_accepting(&self, accepting: bool) {
        *self.accepting.lock() = accepting;
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.sent.lock().clone()
    }

    pub fn terminated(&self) -> Vec<ChainId> {
        self.terminated.lock().clone()
    }
}

impl InteroperabilityMethod for StaticInterop {
    fn get_own_chain_account(&self) -> TokenResult<OwnChainAccount> {
        Ok(OwnChainAccount {
            chain_id: self.own_chain_id,
            name: "own".to_string(),
            nonce: self.sent.lock().len() as u64,
        })
    }

    fn get_channel(&self, chain_id: ChainId) -> TokenResult<ChannelData> {
        Ok(ChannelData {
            message_fee_token_id: self.get_message_fee_token_id(chain_id)?,
            min_return_fee_per_byte: 1_000,
        })
    }

    fn get_message_fee_token_id(&self, chain_id: ChainId) -> TokenResult<TokenId> {
        Ok(self
            .fee_tokens
            .lock()
            .get(&chain_id)
            .copied()
            .unwrap_or(self.default_fee_token))
    }

    fn send(&self, request: SendRequest) -> TokenResult<bool> {
        if !*self.accepting.lock() {
            return Ok(false);
        }
        self.sent.lock().push(request);
        Ok(true)
    }

    fn terminate_chain(&self, chain_id: ChainId) -> TokenResult<()> {
        self.terminated.lock().push(chain_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A ledger on [`OWN_CHAIN`] with recording collaborators.
pub fn fixture() -> (TokenMethod, Arc<RecordingFee>, Arc<StaticInterop>) {
    let fee = Arc::new(RecordingFee::default());
    let interop = Arc::new(StaticInterop::new(OWN_CHAIN, BASE_TOKEN));
    let config = TokenConfig::new(OWN_CHAIN).with_fees(USER_FEE, ESCROW_FEE);
    let method = match TokenMethod::new(config, interop.clone(), fee.clone()) {
        Ok(method) => method,
        Err(err) => panic!("fixture config rejected: {err}"),
    };
    (method, fee, interop)
}

/// A ledger plus an in-memory store and event queue to run it against.
pub struct Harness {
    pub method: TokenMethod,
    pub fee: Arc<RecordingFee>,
    pub interop: Arc<StaticInterop>,
    pub store: MemoryStore,
    pub events: EventQueue,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let (method, fee, interop) = fixture();
        Self {
            method,
            fee,
            interop,
            store: MemoryStore::new(),
            events: EventQueue::new(),
        }
    }

    /// Runs `op` as one unit of work against the harness store.
    pub fn run<T>(
        &mut self,
        op: impl FnOnce(&TokenMethod, &mut MethodContext<'_>) -> TokenResult<T>,
    ) -> TokenResult<T> {
        let mut ctx = MethodContext::new(&mut self.store, &mut self.events);
        op(&self.method, &mut ctx)
    }

    /// Initializes [`NATIVE_TOKEN`] and mints `amount` to each holder.
    pub fn with_native_balances(mut self, holders: &[(Address, u64)]) -> Self {
        let holders = holders.to_vec();
        let outcome = self.run(|method, ctx| {
            method.initialize_token(ctx, NATIVE_TOKEN)?;
            for (address, amount) in holders {
                method.mint(ctx, address, NATIVE_TOKEN, amount)?;
            }
            Ok(())
        });
        if let Err(err) = outcome {
            panic!("seeding native balances failed: {err}");
        }
        self
    }

    pub fn available(&self, address: Address, token_id: TokenId) -> u64 {
        self.method
            .get_available_balance(&self.store, address, token_id)
            .unwrap_or_else(|err| panic!("balance query failed: {err}"))
    }

    pub fn supply(&self, token_id: TokenId) -> u64 {
        self.method
            .get_total_supply(&self.store, token_id)
            .unwrap_or_else(|err| panic!("supply query failed: {err}"))
    }

    pub fn escrow(&self, chain_id: ChainId, token_id: TokenId) -> u64 {
        self.method
            .get_escrowed_amount(&self.store, chain_id, token_id)
            .unwrap_or_else(|err| panic!("escrow query failed: {err}"))
    }

    /// Fee charges committed to the harness store.
    pub fn fee_charges(&self) -> Vec<u64> {
        self.fee.charges(&self.store)
    }

    pub fn last_event(&self) -> &EventRecord {
        match self.events.last() {
            Some(record) => record,
            None => panic!("no event recorded"),
        }
    }
}
