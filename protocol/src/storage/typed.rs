//! Typed handles over the four token substores.
//!
//! A handle knows its substore and record type; callers pass the store to
//! operate on. Absence is reported as [`StoreError::NotFound`] by `get` and
//! as `None` by `find`, so call sites choose explicitly how to treat it.

use std::marker::PhantomData;

use super::keys::{StoreKey, Substore, MODULE_PREFIX_LENGTH, SUBSTORE_PREFIX_LENGTH};
use super::kv::KvStore;
use super::records::{EscrowRecord, Record, SupplyRecord, SupportedTokensRecord, UserAccount};
use crate::error::{StoreError, StoreResult};

/// Handle on one substore holding records of type `R`.
#[derive(Debug)]
pub struct TypedStore<R> {
    substore: Substore,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for TypedStore<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for TypedStore<R> {}

impl<R: Record> TypedStore<R> {
    pub const fn new(substore: Substore) -> Self {
        Self {
            substore,
            _record: PhantomData,
        }
    }

    pub fn substore(&self) -> Substore {
        self.substore
    }

    fn check(&self, key: &StoreKey) -> StoreResult<Vec<u8>> {
        if key.substore() != self.substore {
            return Err(StoreError::MalformedKey(format!(
                "{:?} used on {} substore",
                key,
                self.substore.name()
            )));
        }
        Ok(key.encode())
    }

    pub fn get(&self, store: &dyn KvStore, key: &StoreKey) -> StoreResult<R> {
        self.find(store, key)?.ok_or(StoreError::NotFound)
    }

    pub fn find(&self, store: &dyn KvStore, key: &StoreKey) -> StoreResult<Option<R>> {
        let raw = self.check(key)?;
        store.get(&raw)?.map(|bytes| R::decode(&bytes)).transpose()
    }

    pub fn has(&self, store: &dyn KvStore, key: &StoreKey) -> StoreResult<bool> {
        let raw = self.check(key)?;
        store.has(&raw)
    }

    pub fn set(&self, store: &mut dyn KvStore, key: &StoreKey, record: &R) -> StoreResult<()> {
        let raw = self.check(key)?;
        store.set(&raw, record.encode()?)
    }

    pub fn delete(&self, store: &mut dyn KvStore, key: &StoreKey) -> StoreResult<()> {
        let raw = self.check(key)?;
        store.delete(&raw)
    }

    /// Every record of the substore whose key suffix starts with
    /// `suffix_prefix`, in key order.
    pub fn iterate(
        &self,
        store: &dyn KvStore,
        suffix_prefix: &[u8],
    ) -> StoreResult<Vec<(StoreKey, R)>> {
        let mut prefix = self.substore.scan_prefix();
        prefix.extend_from_slice(suffix_prefix);
        let header = MODULE_PREFIX_LENGTH + SUBSTORE_PREFIX_LENGTH;
        store
            .iterate(&prefix)?
            .into_iter()
            .map(|(key, value)| {
                let key = StoreKey::from_suffix(self.substore, &key[header..])?;
                Ok((key, R::decode(&value)?))
            })
            .collect()
    }
}

impl<R: Record + Default> TypedStore<R> {
    pub fn get_or_default(&self, store: &dyn KvStore, key: &StoreKey) -> StoreResult<R> {
        Ok(self.find(store, key)?.unwrap_or_default())
    }
}

/// The four substore handles of the token module.
#[derive(Clone, Copy, Debug)]
pub struct TokenStores {
    pub user: TypedStore<UserAccount>,
    pub supply: TypedStore<SupplyRecord>,
    pub escrow: TypedStore<EscrowRecord>,
    pub supported_tokens: TypedStore<SupportedTokensRecord>,
}

impl Default for TokenStores {
    fn default() -> Self {
        Self {
            user: TypedStore::new(Substore::User),
            supply: TypedStore::new(Substore::Supply),
            escrow: TypedStore::new(Substore::Escrow),
            supported_tokens: TypedStore::new(Substore::SupportedTokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{Address, ChainId, TokenId};
    use crate::storage::kv::MemoryStore;

    fn user_key(byte: u8) -> StoreKey {
        StoreKey::User {
            address: Address::from_bytes([byte; 20]),
            token_id: TokenId::from_bytes([4, 0, 0, 1, 0, 0, 0, 0]),
        }
    }

    #[test]
    fn get_reports_not_found() {
        let store = MemoryStore::new();
        let stores = TokenStores::default();
        assert!(matches!(
            stores.user.get(&store, &user_key(1)),
            Err(StoreError::NotFound)
        ));
        assert_eq!(stores.user.find(&store, &user_key(1)).unwrap(), None);
    }

    #[test]
    fn wrong_substore_key_rejected() {
        let mut store = MemoryStore::new();
        let stores = TokenStores::default();
        let escrow_key = StoreKey::Escrow {
            chain_id: ChainId::from_bytes([4, 0, 0, 2]),
            token_id: TokenId::from_bytes([4, 0, 0, 1, 0, 0, 0, 0]),
        };
        assert!(matches!(
            stores
                .user
                .set(&mut store, &escrow_key, &UserAccount::default()),
            Err(StoreError::MalformedKey(_))
        ));
    }

    #[test]
    fn iterate_decodes_keys_in_order() {
        let mut store = MemoryStore::new();
        let stores = TokenStores::default();
        stores
            .user
            .set(&mut store, &user_key(2), &UserAccount::with_available(20))
            .unwrap();
        stores
            .user
            .set(&mut store, &user_key(1), &UserAccount::with_available(10))
            .unwrap();
        stores
            .supply
            .set(
                &mut store,
                &StoreKey::Supply {
                    token_id: TokenId::from_bytes([4, 0, 0, 1, 0, 0, 0, 0]),
                },
                &SupplyRecord { total_supply: 30 },
            )
            .unwrap();

        let entries = stores.user.iterate(&store, &[]).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, user_key(1));
        assert_eq!(entries[1].1.available_balance, 20);

        let only_two = stores.user.iterate(&store, &[2u8; 20]).unwrap();
        assert_eq!(only_two.len(), 1);
    }
}
