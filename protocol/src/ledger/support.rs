//! Supported-token administration.
//!
//! Foreign tokens may only be received if supported. Support is tracked at
//! three levels: a global "all tokens" flag, a per-chain record whose empty
//! list means "every token of that chain", and explicit token lists. Tokens
//! native to this chain and the network base token are always supported and
//! never appear in the store.
//!
//! While the global flag is set, per-chain and per-token edits are refused;
//! the flag has to be cleared with `remove_all_tokens_support` first.

use super::{MethodContext, TokenMethod};
use crate::error::{TokenError, TokenResult};
use crate::events::TokenEvent;
use crate::identifiers::{ChainId, TokenId};
use crate::storage::{KvStore, StoreKey, SupportedTokensRecord};

impl TokenMethod {
    pub fn support_all_tokens(&self, ctx: &mut MethodContext<'_>) -> TokenResult<()> {
        self.execute(ctx, TokenEvent::AllTokensSupported, |ctx| {
            self.stores().supported_tokens.set(
                ctx.store_mut(),
                &StoreKey::AllTokensSupported,
                &SupportedTokensRecord::all(),
            )?;
            Ok(())
        })
    }

    /// Clears the global flag and every per-chain record.
    pub fn remove_all_tokens_support(&self, ctx: &mut MethodContext<'_>) -> TokenResult<()> {
        self.execute(ctx, TokenEvent::AllTokensSupportRemoved, |ctx| {
            let stores = self.stores();
            let keys: Vec<StoreKey> = stores
                .supported_tokens
                .iterate(ctx.store(), &[])?
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            for key in keys {
                stores.supported_tokens.delete(ctx.store_mut(), &key)?;
            }
            Ok(())
        })
    }

    pub fn support_all_tokens_from_chain_id(
        &self,
        ctx: &mut MethodContext<'_>,
        chain_id: ChainId,
    ) -> TokenResult<()> {
        if chain_id == self.own_chain_id() {
            return Ok(());
        }
        self.execute(
            ctx,
            TokenEvent::AllTokensFromChainSupported { chain_id },
            |ctx| {
                self.ensure_not_globally_supported(ctx.store())?;
                self.stores().supported_tokens.set(
                    ctx.store_mut(),
                    &StoreKey::SupportedTokens { chain_id },
                    &SupportedTokensRecord::all(),
                )?;
                Ok(())
            },
        )
    }

    pub fn remove_all_tokens_support_from_chain_id(
        &self,
        ctx: &mut MethodContext<'_>,
        chain_id: ChainId,
    ) -> TokenResult<()> {
        if chain_id == self.own_chain_id() {
            return Err(TokenError::CannotRemoveOwnChainSupport(chain_id));
        }
        self.execute(
            ctx,
            TokenEvent::AllTokensFromChainSupportRemoved { chain_id },
            |ctx| {
                self.ensure_not_globally_supported(ctx.store())?;
                self.stores()
                    .supported_tokens
                    .delete(ctx.store_mut(), &StoreKey::SupportedTokens { chain_id })?;
                Ok(())
            },
        )
    }

    /// Adds one foreign token to its chain's list. Does nothing for tokens
    /// that are always supported or already covered by chain-wide support.
    pub fn support_token_id(&self, ctx: &mut MethodContext<'_>, token_id: TokenId) -> TokenResult<()> {
        if self.is_always_supported(token_id) {
            return Ok(());
        }
        self.execute(ctx, TokenEvent::TokenIdSupported { token_id }, |ctx| {
            self.ensure_not_globally_supported(ctx.store())?;
            let key = StoreKey::SupportedTokens {
                chain_id: token_id.chain_id(),
            };
            let stores = self.stores();
            let mut record = match stores.supported_tokens.find(ctx.store(), &key)? {
                Some(record) if record.supports_all() => return Ok(()),
                Some(record) => record,
                None => SupportedTokensRecord::default(),
            };
            if record.insert(token_id) {
                stores.supported_tokens.set(ctx.store_mut(), &key, &record)?;
            }
            Ok(())
        })
    }

    /// Removes one foreign token from its chain's list. The chain record is
    /// deleted once its list is empty, since an empty list would otherwise
    /// read as chain-wide support.
    pub fn remove_support(&self, ctx: &mut MethodContext<'_>, token_id: TokenId) -> TokenResult<()> {
        if self.is_always_supported(token_id) {
            return Err(TokenError::CannotRemoveNativeSupport(token_id));
        }
        self.execute(ctx, TokenEvent::TokenIdSupportRemoved { token_id }, |ctx| {
            self.ensure_not_globally_supported(ctx.store())?;
            let key = StoreKey::SupportedTokens {
                chain_id: token_id.chain_id(),
            };
            let stores = self.stores();
            let Some(mut record) = stores.supported_tokens.find(ctx.store(), &key)? else {
                return Ok(());
            };
            if record.supports_all() {
                return Err(TokenError::ChainWideSupport(token_id));
            }
            if record.remove(&token_id) {
                if record.supported_token_ids.is_empty() {
                    stores.supported_tokens.delete(ctx.store_mut(), &key)?;
                } else {
                    stores.supported_tokens.set(ctx.store_mut(), &key, &record)?;
                }
            }
            Ok(())
        })
    }

    /// Whether `token_id` may be received by this chain.
    pub fn is_token_supported(&self, store: &dyn KvStore, token_id: TokenId) -> TokenResult<bool> {
        if self.is_always_supported(token_id) {
            return Ok(true);
        }
        let stores = self.stores();
        if stores
            .supported_tokens
            .has(store, &StoreKey::AllTokensSupported)?
        {
            return Ok(true);
        }
        let key = StoreKey::SupportedTokens {
            chain_id: token_id.chain_id(),
        };
        Ok(stores
            .supported_tokens
            .find(store, &key)?
            .is_some_and(|record| record.supports_all() || record.contains(&token_id)))
    }

    fn is_always_supported(&self, token_id: TokenId) -> bool {
        self.is_native_token(token_id) || token_id == self.config().base_token_id
    }

    fn ensure_not_globally_supported(&self, store: &dyn KvStore) -> TokenResult<()> {
        if self
            .stores()
            .supported_tokens
            .has(store, &StoreKey::AllTokensSupported)?
        {
            return Err(TokenError::AllTokensSupported);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::TokenError;
    use crate::identifiers::TokenId;
    use crate::test_utils::*;

    const FOREIGN_TOKEN_2: TokenId = TokenId::from_bytes([4, 0, 0, 2, 0, 0, 0, 9]);

    #[test]
    fn native_and_base_tokens_always_supported() {
        let h = Harness::new();
        assert!(h.method.is_token_supported(&h.store, NATIVE_TOKEN).unwrap());
        assert!(h.method.is_token_supported(&h.store, BASE_TOKEN).unwrap());
        assert!(!h.method.is_token_supported(&h.store, FOREIGN_TOKEN).unwrap());
    }

    #[test]
    fn native_support_cannot_be_removed() {
        let mut h = Harness::new();
        assert!(matches!(
            h.run(|m, ctx| m.remove_support(ctx, NATIVE_TOKEN)),
            Err(TokenError::CannotRemoveNativeSupport(_))
        ));
        assert!(matches!(
            h.run(|m, ctx| m.remove_support(ctx, BASE_TOKEN)),
            Err(TokenError::CannotRemoveNativeSupport(_))
        ));
        assert!(matches!(
            h.run(|m, ctx| m.remove_all_tokens_support_from_chain_id(ctx, OWN_CHAIN)),
            Err(TokenError::CannotRemoveOwnChainSupport(_))
        ));
        h.run(|m, ctx| m.support_token_id(ctx, NATIVE_TOKEN)).unwrap();
        assert!(h.store.is_empty());
        assert!(h.events.is_empty());
    }

    #[test]
    fn token_list_is_maintained_sorted() {
        let mut h = Harness::new();
        h.run(|m, ctx| {
            m.support_token_id(ctx, FOREIGN_TOKEN_2)?;
            m.support_token_id(ctx, FOREIGN_TOKEN)
        })
        .unwrap();
        assert_eq!(
            h.method
                .get_supported_tokens(&h.store, PARTNER_CHAIN)
                .unwrap(),
            Some(vec![FOREIGN_TOKEN, FOREIGN_TOKEN_2])
        );
        assert!(h.method.is_token_supported(&h.store, FOREIGN_TOKEN).unwrap());

        h.run(|m, ctx| m.remove_support(ctx, FOREIGN_TOKEN)).unwrap();
        assert!(!h.method.is_token_supported(&h.store, FOREIGN_TOKEN).unwrap());

        h.run(|m, ctx| m.remove_support(ctx, FOREIGN_TOKEN_2)).unwrap();
        assert_eq!(
            h.method
                .get_supported_tokens(&h.store, PARTNER_CHAIN)
                .unwrap(),
            None
        );
        assert!(!h.method.is_token_supported(&h.store, FOREIGN_TOKEN_2).unwrap());
    }

    #[test]
    fn chain_wide_support_covers_every_token() {
        let mut h = Harness::new();
        h.run(|m, ctx| m.support_all_tokens_from_chain_id(ctx, PARTNER_CHAIN))
            .unwrap();
        assert!(h.method.is_token_supported(&h.store, FOREIGN_TOKEN_2).unwrap());
        assert!(!h.method.is_token_supported(&h.store, THIRD_TOKEN).unwrap());

        // adding to a chain-wide record keeps it chain-wide
        h.run(|m, ctx| m.support_token_id(ctx, FOREIGN_TOKEN)).unwrap();
        assert_eq!(
            h.method
                .get_supported_tokens(&h.store, PARTNER_CHAIN)
                .unwrap(),
            Some(vec![])
        );

        assert!(matches!(
            h.run(|m, ctx| m.remove_support(ctx, FOREIGN_TOKEN)),
            Err(TokenError::ChainWideSupport(_))
        ));

        h.run(|m, ctx| m.remove_all_tokens_support_from_chain_id(ctx, PARTNER_CHAIN))
            .unwrap();
        assert!(!h.method.is_token_supported(&h.store, FOREIGN_TOKEN).unwrap());
    }

    #[test]
    fn global_flag_blocks_finer_edits() {
        let mut h = Harness::new();
        h.run(|m, ctx| m.support_token_id(ctx, THIRD_TOKEN)).unwrap();
        h.run(|m, ctx| m.support_all_tokens(ctx)).unwrap();
        assert!(h.method.is_token_supported(&h.store, FOREIGN_TOKEN).unwrap());

        assert!(matches!(
            h.run(|m, ctx| m.support_token_id(ctx, FOREIGN_TOKEN)),
            Err(TokenError::AllTokensSupported)
        ));
        assert!(matches!(
            h.run(|m, ctx| m.support_all_tokens_from_chain_id(ctx, PARTNER_CHAIN)),
            Err(TokenError::AllTokensSupported)
        ));
        assert!(matches!(
            h.run(|m, ctx| m.remove_support(ctx, THIRD_TOKEN)),
            Err(TokenError::AllTokensSupported)
        ));
        assert!(h.last_event().no_revert);

        h.run(|m, ctx| m.remove_all_tokens_support(ctx)).unwrap();
        assert!(h.store.is_empty());
        assert!(!h.method.is_token_supported(&h.store, THIRD_TOKEN).unwrap());
    }
}
