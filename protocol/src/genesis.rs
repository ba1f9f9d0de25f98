//! # Genesis Reconciliation
//!
//! A chain starts from a [`GenesisStore`] snapshot of the four substores.
//! Before a single record is written the snapshot has to prove itself
//! consistent:
//!
//! 1. every substore is strictly sorted by its key tuple (no duplicates);
//! 2. user accounts are non-empty, with locked balances sorted by module,
//!    unique, and non-zero;
//! 3. supply and escrow entries only exist for native tokens, and nothing
//!    is escrowed against the own chain;
//! 4. supported-token lists are sorted, unique, and belong to their chain;
//! 5. for every native token, the stored supply equals the sum of all user
//!    balances (available + locked) and escrow amounts, and no supply record
//!    exists for a token nobody holds.
//!
//! Any violation rejects the whole snapshot. The same supply proof is
//! available on a live store through [`TokenMethod::verify_conservation`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::is_valid_module_name;
use crate::error::{GenesisError, TokenError, TokenResult};
use crate::identifiers::{Address, ChainId, TokenId};
use crate::ledger::TokenMethod;
use crate::storage::{
    EscrowRecord, KvStore, LockedBalance, StoreKey, StoreTransaction, SupplyRecord,
    SupportedTokensRecord, UserAccount,
};

// ---------------------------------------------------------------------------
// Snapshot Types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisUserEntry {
    pub address: Address,
    pub token_id: TokenId,
    pub available_balance: u64,
    #[serde(default)]
    pub locked_balances: Vec<LockedBalance>,
}

impl GenesisUserEntry {
    fn total(&self) -> Option<u64> {
        self.locked_balances
            .iter()
            .try_fold(self.available_balance, |acc, l| acc.checked_add(l.amount))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSupplyEntry {
    pub token_id: TokenId,
    pub total_supply: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisEscrowEntry {
    pub escrow_chain_id: ChainId,
    pub token_id: TokenId,
    pub amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSupportedTokensEntry {
    pub chain_id: ChainId,
    pub supported_token_ids: Vec<TokenId>,
}

/// Initial token state of a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisStore {
    #[serde(default)]
    pub user_substore: Vec<GenesisUserEntry>,
    #[serde(default)]
    pub supply_substore: Vec<GenesisSupplyEntry>,
    #[serde(default)]
    pub escrow_substore: Vec<GenesisEscrowEntry>,
    #[serde(default)]
    pub supported_tokens_substore: Vec<GenesisSupportedTokensEntry>,
    /// Whether the global "all tokens supported" flag is set.
    #[serde(default)]
    pub all_tokens_supported: bool,
}

/// Fails with [`GenesisError::Unsorted`] unless `keys` strictly increase.
fn ensure_strictly_sorted<K: Ord>(
    substore: &'static str,
    keys: impl Iterator<Item = K>,
) -> Result<(), GenesisError> {
    let mut previous: Option<K> = None;
    for (index, key) in keys.enumerate() {
        if previous.as_ref().is_some_and(|prev| *prev >= key) {
            return Err(GenesisError::Unsorted { substore, index });
        }
        previous = Some(key);
    }
    Ok(())
}

impl GenesisStore {
    pub fn from_json(json: &str) -> TokenResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TokenError::InvalidConfig(format!("genesis snapshot: {e}")))
    }

    pub fn to_json_pretty(&self) -> TokenResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TokenError::InvalidConfig(format!("genesis snapshot: {e}")))
    }

    /// Structural checks followed by the supply proof.
    pub fn validate(&self, own_chain_id: ChainId) -> Result<(), GenesisError> {
        ensure_strictly_sorted(
            "user",
            self.user_substore.iter().map(|e| (e.address, e.token_id)),
        )?;
        ensure_strictly_sorted("supply", self.supply_substore.iter().map(|e| e.token_id))?;
        ensure_strictly_sorted(
            "escrow",
            self.escrow_substore
                .iter()
                .map(|e| (e.escrow_chain_id, e.token_id)),
        )?;
        ensure_strictly_sorted(
            "supportedTokens",
            self.supported_tokens_substore.iter().map(|e| e.chain_id),
        )?;

        for entry in &self.user_substore {
            validate_user(entry)?;
        }
        for entry in &self.supply_substore {
            if !entry.token_id.is_native_to(own_chain_id) {
                return Err(GenesisError::NonNativeSupply(entry.token_id));
            }
        }
        for entry in &self.escrow_substore {
            if !entry.token_id.is_native_to(own_chain_id) {
                return Err(GenesisError::NonNativeEscrow {
                    chain_id: entry.escrow_chain_id,
                    token_id: entry.token_id,
                });
            }
            if entry.escrow_chain_id == own_chain_id {
                return Err(GenesisError::SelfEscrow(entry.token_id));
            }
        }
        for entry in &self.supported_tokens_substore {
            validate_supported(entry, own_chain_id)?;
        }

        self.verify_supply(own_chain_id)
    }

    /// Supply proof over the snapshot.
    ///
    /// Every native token with holders or escrow needs a matching supply
    /// record, and a supply record with neither is rejected whatever its
    /// value.
    pub fn verify_supply(&self, own_chain_id: ChainId) -> Result<(), GenesisError> {
        self.prove_supply(own_chain_id, false)
    }

    /// Supply proof shared by genesis validation and live conservation
    /// checks. `allow_idle_tokens` accepts a zero supply record with no
    /// holders, the state `initialize_token` leaves behind.
    fn prove_supply(
        &self,
        own_chain_id: ChainId,
        allow_idle_tokens: bool,
    ) -> Result<(), GenesisError> {
        let mut computed: BTreeMap<TokenId, u64> = BTreeMap::new();
        let mut add = |token_id: TokenId, amount: Option<u64>| -> Result<(), GenesisError> {
            let sum = computed.entry(token_id).or_insert(0);
            let current = *sum;
            *sum = amount
                .and_then(|amount| current.checked_add(amount))
                .ok_or(GenesisError::SupplyOverflow(token_id))?;
            Ok(())
        };
        for entry in &self.user_substore {
            if entry.token_id.is_native_to(own_chain_id) {
                add(entry.token_id, entry.total())?;
            }
        }
        for entry in &self.escrow_substore {
            if entry.token_id.is_native_to(own_chain_id) {
                add(entry.token_id, Some(entry.amount))?;
            }
        }

        let stored: BTreeMap<TokenId, u64> = self
            .supply_substore
            .iter()
            .map(|e| (e.token_id, e.total_supply))
            .collect();
        for (token_id, computed) in &computed {
            match stored.get(token_id) {
                None => return Err(GenesisError::MissingSupply(*token_id)),
                Some(stored) if stored != computed => {
                    return Err(GenesisError::SupplyMismatch {
                        token_id: *token_id,
                        stored: *stored,
                        computed: *computed,
                    })
                }
                Some(_) => {}
            }
        }
        for (token_id, stored) in &stored {
            if computed.contains_key(token_id) {
                continue;
            }
            if *stored != 0 {
                return Err(GenesisError::SupplyMismatch {
                    token_id: *token_id,
                    stored: *stored,
                    computed: 0,
                });
            }
            if !allow_idle_tokens {
                return Err(GenesisError::OrphanSupply(*token_id));
            }
        }
        Ok(())
    }
}

fn validate_user(entry: &GenesisUserEntry) -> Result<(), GenesisError> {
    if entry.available_balance == 0 && entry.locked_balances.is_empty() {
        return Err(GenesisError::EmptyAccount {
            address: entry.address,
            token_id: entry.token_id,
        });
    }
    for (index, locked) in entry.locked_balances.iter().enumerate() {
        if !is_valid_module_name(&locked.module) {
            return Err(GenesisError::InvalidModuleName(locked.module.clone()));
        }
        if locked.amount == 0 {
            return Err(GenesisError::ZeroLockedAmount {
                address: entry.address,
                token_id: entry.token_id,
                module: locked.module.clone(),
            });
        }
        if index > 0 && entry.locked_balances[index - 1].module >= locked.module {
            return Err(GenesisError::LockedBalancesUnsorted {
                address: entry.address,
                token_id: entry.token_id,
            });
        }
    }
    Ok(())
}

fn validate_supported(
    entry: &GenesisSupportedTokensEntry,
    own_chain_id: ChainId,
) -> Result<(), GenesisError> {
    if entry.chain_id == own_chain_id {
        return Err(GenesisError::SupportedOwnChain(own_chain_id));
    }
    if entry
        .supported_token_ids
        .windows(2)
        .any(|pair| pair[0] >= pair[1])
    {
        return Err(GenesisError::SupportedTokensUnsorted {
            chain_id: entry.chain_id,
        });
    }
    if let Some(token_id) = entry
        .supported_token_ids
        .iter()
        .find(|token_id| token_id.chain_id() != entry.chain_id)
    {
        return Err(GenesisError::SupportedTokenChainMismatch {
            chain_id: entry.chain_id,
            token_id: *token_id,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Ledger Integration
// ---------------------------------------------------------------------------

impl TokenMethod {
    /// Validates `genesis` and writes it to `store` in one transaction.
    pub fn init_genesis_state(
        &self,
        store: &mut dyn KvStore,
        genesis: &GenesisStore,
    ) -> TokenResult<()> {
        genesis.validate(self.own_chain_id())?;

        let stores = self.stores();
        let mut tx = StoreTransaction::new(store);
        for entry in &genesis.user_substore {
            let account = UserAccount {
                available_balance: entry.available_balance,
                locked_balances: entry.locked_balances.clone(),
            };
            let key = StoreKey::User {
                address: entry.address,
                token_id: entry.token_id,
            };
            stores.user.set(&mut tx, &key, &account)?;
        }
        for entry in &genesis.supply_substore {
            let key = StoreKey::Supply {
                token_id: entry.token_id,
            };
            let record = SupplyRecord {
                total_supply: entry.total_supply,
            };
            stores.supply.set(&mut tx, &key, &record)?;
        }
        for entry in &genesis.escrow_substore {
            let key = StoreKey::Escrow {
                chain_id: entry.escrow_chain_id,
                token_id: entry.token_id,
            };
            stores
                .escrow
                .set(&mut tx, &key, &EscrowRecord { amount: entry.amount })?;
        }
        for entry in &genesis.supported_tokens_substore {
            let key = StoreKey::SupportedTokens {
                chain_id: entry.chain_id,
            };
            let record = SupportedTokensRecord {
                supported_token_ids: entry.supported_token_ids.clone(),
            };
            stores.supported_tokens.set(&mut tx, &key, &record)?;
        }
        if genesis.all_tokens_supported {
            stores.supported_tokens.set(
                &mut tx,
                &StoreKey::AllTokensSupported,
                &SupportedTokensRecord::all(),
            )?;
        }
        let written = tx.pending();
        tx.commit()?;

        info!(
            chain_id = %self.own_chain_id(),
            users = genesis.user_substore.len(),
            supplies = genesis.supply_substore.len(),
            escrows = genesis.escrow_substore.len(),
            records = written,
            "token genesis state initialized"
        );
        Ok(())
    }

    /// Snapshot of the current token state, in key order.
    pub fn export_genesis(&self, store: &dyn KvStore) -> TokenResult<GenesisStore> {
        let stores = self.stores();
        let mut genesis = GenesisStore::default();

        for (key, account) in stores.user.iterate(store, &[])? {
            if let StoreKey::User { address, token_id } = key {
                genesis.user_substore.push(GenesisUserEntry {
                    address,
                    token_id,
                    available_balance: account.available_balance,
                    locked_balances: account.locked_balances,
                });
            }
        }
        for (key, supply) in stores.supply.iterate(store, &[])? {
            if let StoreKey::Supply { token_id } = key {
                genesis.supply_substore.push(GenesisSupplyEntry {
                    token_id,
                    total_supply: supply.total_supply,
                });
            }
        }
        for (key, escrow) in stores.escrow.iterate(store, &[])? {
            if let StoreKey::Escrow { chain_id, token_id } = key {
                genesis.escrow_substore.push(GenesisEscrowEntry {
                    escrow_chain_id: chain_id,
                    token_id,
                    amount: escrow.amount,
                });
            }
        }
        for (key, record) in stores.supported_tokens.iterate(store, &[])? {
            match key {
                StoreKey::AllTokensSupported => genesis.all_tokens_supported = true,
                StoreKey::SupportedTokens { chain_id } => {
                    genesis
                        .supported_tokens_substore
                        .push(GenesisSupportedTokensEntry {
                            chain_id,
                            supported_token_ids: record.supported_token_ids,
                        })
                }
                _ => {}
            }
        }
        Ok(genesis)
    }

    /// Re-runs the supply proof against a live store.
    ///
    /// Runtime operations may leave drained accounts and initialized but
    /// unminted tokens in place, so unlike [`GenesisStore::validate`] this
    /// accepts empty accounts and zero supply records with no holders.
    pub fn verify_conservation(&self, store: &dyn KvStore) -> TokenResult<()> {
        let snapshot = self.export_genesis(store)?;
        snapshot.prove_supply(self.own_chain_id(), true)?;
        Ok(())
    }
}
