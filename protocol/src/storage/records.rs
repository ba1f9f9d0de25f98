//! # Store Records
//!
//! The four record types persisted by the token module. Records are encoded
//! with bincode, whose fixed-int little-endian layout is deterministic, so
//! every node produces identical bytes for identical state.

use serde::{Deserialize, Serialize};

use crate::error::{StoreResult, TokenError, TokenResult};
use crate::identifiers::{Address, TokenId};

/// Amount earmarked for one module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBalance {
    pub module: String,
    pub amount: u64,
}

/// Balance of one address in one token.
///
/// `locked_balances` is kept sorted by module name, one entry per module,
/// and never holds a zero amount.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub available_balance: u64,
    pub locked_balances: Vec<LockedBalance>,
}

impl UserAccount {
    pub fn with_available(available_balance: u64) -> Self {
        Self {
            available_balance,
            locked_balances: Vec::new(),
        }
    }

    /// An account with nothing available and nothing locked.
    pub fn is_empty(&self) -> bool {
        self.available_balance == 0 && self.locked_balances.is_empty()
    }

    pub fn locked_amount(&self, module: &str) -> u64 {
        self.locked_balances
            .binary_search_by(|l| l.module.as_str().cmp(module))
            .map(|i| self.locked_balances[i].amount)
            .unwrap_or(0)
    }

    /// Sum of all locked amounts, overflow-checked.
    pub fn total_locked(&self) -> TokenResult<u64> {
        self.locked_balances.iter().try_fold(0u64, |acc, l| {
            acc.checked_add(l.amount)
                .ok_or(TokenError::Overflow("locked balance total"))
        })
    }

    /// Available plus locked, overflow-checked.
    pub fn total(&self) -> TokenResult<u64> {
        self.total_locked()?
            .checked_add(self.available_balance)
            .ok_or(TokenError::Overflow("account total"))
    }

    pub(crate) fn credit_available(&mut self, amount: u64) -> TokenResult<()> {
        self.available_balance = self
            .available_balance
            .checked_add(amount)
            .ok_or(TokenError::Overflow("available balance"))?;
        Ok(())
    }

    /// Adds `amount` to the entry for `module`, inserting it in sorted position.
    pub(crate) fn add_locked(&mut self, module: &str, amount: u64) -> TokenResult<()> {
        match self
            .locked_balances
            .binary_search_by(|l| l.module.as_str().cmp(module))
        {
            Ok(i) => {
                let entry = &mut self.locked_balances[i];
                entry.amount = entry
                    .amount
                    .checked_add(amount)
                    .ok_or(TokenError::Overflow("locked balance"))?;
            }
            Err(i) => self.locked_balances.insert(
                i,
                LockedBalance {
                    module: module.to_string(),
                    amount,
                },
            ),
        }
        Ok(())
    }

    /// Removes `amount` from the entry for `module`, dropping the entry at zero.
    pub(crate) fn remove_locked(
        &mut self,
        address: Address,
        token_id: TokenId,
        module: &str,
        amount: u64,
    ) -> TokenResult<()> {
        let index = self
            .locked_balances
            .binary_search_by(|l| l.module.as_str().cmp(module))
            .map_err(|_| TokenError::InsufficientLockedAmount {
                address,
                token_id,
                module: module.to_string(),
                locked: 0,
                required: amount,
            })?;
        let entry = &mut self.locked_balances[index];
        if entry.amount < amount {
            return Err(TokenError::InsufficientLockedAmount {
                address,
                token_id,
                module: module.to_string(),
                locked: entry.amount,
                required: amount,
            });
        }
        entry.amount -= amount;
        if entry.amount == 0 {
            self.locked_balances.remove(index);
        }
        Ok(())
    }
}

/// Total supply of a native token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyRecord {
    pub total_supply: u64,
}

/// Native tokens held in trust for one partner chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub amount: u64,
}

/// Tokens of one chain accepted by this chain. An empty list means every
/// token of that chain is supported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedTokensRecord {
    pub supported_token_ids: Vec<TokenId>,
}

impl SupportedTokensRecord {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn supports_all(&self) -> bool {
        self.supported_token_ids.is_empty()
    }

    pub fn contains(&self, token_id: &TokenId) -> bool {
        self.supported_token_ids.binary_search(token_id).is_ok()
    }

    /// Inserts in sorted position; returns `false` if already present.
    pub(crate) fn insert(&mut self, token_id: TokenId) -> bool {
        match self.supported_token_ids.binary_search(&token_id) {
            Ok(_) => false,
            Err(i) => {
                self.supported_token_ids.insert(i, token_id);
                true
            }
        }
    }

    /// Removes the token; returns `false` if it was not listed.
    pub(crate) fn remove(&mut self, token_id: &TokenId) -> bool {
        match self.supported_token_ids.binary_search(token_id) {
            Ok(i) => {
                self.supported_token_ids.remove(i);
                true
            }
            Err(_) => false,
        }
    }
}

/// Binary record encoding.
pub trait Record: Sized + Serialize + for<'de> Deserialize<'de> {
    fn encode(&self) -> StoreResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn decode(bytes: &[u8]) -> StoreResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl Record for UserAccount {}
impl Record for SupplyRecord {}
impl Record for EscrowRecord {}
impl Record for SupportedTokensRecord {}
