//! Read-only method surface used by other modules and by RPC/CLI layers.
//!
//! Queries take a plain store reference and never write. Missing records
//! read as zero.

use serde::Serialize;

use super::TokenMethod;
use crate::error::TokenResult;
use crate::identifiers::{Address, ChainId, TokenId};
use crate::storage::{KvStore, LockedBalance, StoreKey, UserAccount};

/// One entry of [`TokenMethod::get_all_balances`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token_id: TokenId,
    pub account: UserAccount,
}

impl TokenMethod {
    pub fn get_available_balance(
        &self,
        store: &dyn KvStore,
        address: Address,
        token_id: TokenId,
    ) -> TokenResult<u64> {
        let key = StoreKey::User { address, token_id };
        Ok(self
            .stores()
            .user
            .find(store, &key)?
            .map_or(0, |account| account.available_balance))
    }

    pub fn get_locked_amount(
        &self,
        store: &dyn KvStore,
        address: Address,
        token_id: TokenId,
        module: &str,
    ) -> TokenResult<u64> {
        let key = StoreKey::User { address, token_id };
        Ok(self
            .stores()
            .user
            .find(store, &key)?
            .map_or(0, |account| account.locked_amount(module)))
    }

    pub fn get_locked_amounts(
        &self,
        store: &dyn KvStore,
        address: Address,
        token_id: TokenId,
    ) -> TokenResult<Vec<LockedBalance>> {
        let key = StoreKey::User { address, token_id };
        Ok(self
            .stores()
            .user
            .find(store, &key)?
            .map(|account| account.locked_balances)
            .unwrap_or_default())
    }

    /// Every account held by `address`, in token order.
    pub fn get_all_balances(
        &self,
        store: &dyn KvStore,
        address: Address,
    ) -> TokenResult<Vec<TokenBalance>> {
        self.stores()
            .user
            .iterate(store, address.as_bytes())?
            .into_iter()
            .filter_map(|(key, account)| match key {
                StoreKey::User { token_id, .. } => Some(Ok(TokenBalance { token_id, account })),
                _ => None,
            })
            .collect()
    }

    pub fn get_total_supply(&self, store: &dyn KvStore, token_id: TokenId) -> TokenResult<u64> {
        let key = StoreKey::Supply { token_id };
        Ok(self
            .stores()
            .supply
            .find(store, &key)?
            .map_or(0, |supply| supply.total_supply))
    }

    /// Total supply of every initialized token, in token order.
    pub fn get_all_supplies(&self, store: &dyn KvStore) -> TokenResult<Vec<(TokenId, u64)>> {
        Ok(self
            .stores()
            .supply
            .iterate(store, &[])?
            .into_iter()
            .filter_map(|(key, supply)| match key {
                StoreKey::Supply { token_id } => Some((token_id, supply.total_supply)),
                _ => None,
            })
            .collect())
    }

    pub fn get_escrowed_amount(
        &self,
        store: &dyn KvStore,
        chain_id: ChainId,
        token_id: TokenId,
    ) -> TokenResult<u64> {
        self.escrowed_amount(store, chain_id, token_id)
    }

    /// Every escrow bucket as `(chain, token, amount)`, in key order.
    pub fn get_escrowed_amounts(
        &self,
        store: &dyn KvStore,
    ) -> TokenResult<Vec<(ChainId, TokenId, u64)>> {
        Ok(self
            .stores()
            .escrow
            .iterate(store, &[])?
            .into_iter()
            .filter_map(|(key, escrow)| match key {
                StoreKey::Escrow { chain_id, token_id } => Some((chain_id, token_id, escrow.amount)),
                _ => None,
            })
            .collect())
    }

    /// The supported token list of `chain_id`: `None` if nothing of that
    /// chain is supported, `Some(vec![])` if everything is.
    pub fn get_supported_tokens(
        &self,
        store: &dyn KvStore,
        chain_id: ChainId,
    ) -> TokenResult<Option<Vec<TokenId>>> {
        let key = StoreKey::SupportedTokens { chain_id };
        Ok(self
            .stores()
            .supported_tokens
            .find(store, &key)?
            .map(|record| record.supported_token_ids))
    }

    pub fn user_account_exists(
        &self,
        store: &dyn KvStore,
        address: Address,
        token_id: TokenId,
    ) -> TokenResult<bool> {
        Ok(self
            .stores()
            .user
            .has(store, &StoreKey::User { address, token_id })?)
    }

    pub fn escrow_account_exists(
        &self,
        store: &dyn KvStore,
        chain_id: ChainId,
        token_id: TokenId,
    ) -> TokenResult<bool> {
        Ok(self
            .stores()
            .escrow
            .has(store, &StoreKey::Escrow { chain_id, token_id })?)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::*;

    #[test]
    fn missing_records_read_as_zero() {
        let h = Harness::new();
        assert_eq!(h.available(ALICE, NATIVE_TOKEN), 0);
        assert_eq!(h.supply(NATIVE_TOKEN), 0);
        assert_eq!(h.escrow(PARTNER_CHAIN, NATIVE_TOKEN), 0);
        assert!(!h
            .method
            .user_account_exists(&h.store, ALICE, NATIVE_TOKEN)
            .unwrap());
    }

    #[test]
    fn all_balances_are_scoped_to_one_address() {
        let mut h = Harness::new().with_native_balances(&[(ALICE, 10), (BOB, 20)]);
        h.run(|m, ctx| {
            m.credit_available_with_create(ctx.store_mut(), ALICE, FOREIGN_TOKEN, 3)?;
            m.lock(ctx, ALICE, "pos", NATIVE_TOKEN, 4)
        })
        .unwrap();

        let balances = h.method.get_all_balances(&h.store, ALICE).unwrap();
        let tokens: Vec<_> = balances.iter().map(|b| b.token_id).collect();
        assert_eq!(tokens, vec![NATIVE_TOKEN, FOREIGN_TOKEN]);
        assert_eq!(balances[0].account.available_balance, 6);
        assert_eq!(balances[0].account.locked_amount("pos"), 4);

        assert_eq!(
            h.method.get_all_supplies(&h.store).unwrap(),
            vec![(NATIVE_TOKEN, 30)]
        );
    }
}
