//! Recovery of balances stranded on a terminated chain.
//!
//! The dispatcher proves that a user account existed in the token substore
//! of a terminated chain and hands over the raw key and value. Only tokens
//! native to this chain can be recovered, and never more than this chain
//! holds in escrow for the terminated one.

use crate::error::{TokenError, TokenResult};
use crate::events::{TokenEvent, TokenEventResult};
use crate::identifiers::{Address, ChainId, TokenId};
use crate::ledger::{MethodContext, TokenMethod};
use crate::storage::{Record, Substore, UserAccount};

/// A proven entry of a terminated chain's store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoverContext {
    pub terminated_chain_id: ChainId,
    pub substore_prefix: [u8; 2],
    pub store_key: Vec<u8>,
    pub store_value: Vec<u8>,
}

/// The account a proof claims, decoded.
struct RecoveredAccount {
    address: Address,
    token_id: TokenId,
    total_amount: u64,
}

impl RecoverContext {
    fn key_fields(&self) -> Option<(Address, TokenId)> {
        if self.substore_prefix != Substore::User.prefix()
            || self.store_key.len() != Substore::User.suffix_length()
        {
            return None;
        }
        let (address, token_id) = self.store_key.split_at(Address::LENGTH);
        Some((
            Address::from_slice(address).ok()?,
            TokenId::from_slice(token_id).ok()?,
        ))
    }

    fn decode(&self) -> TokenResult<RecoveredAccount> {
        let (address, token_id) = self.key_fields().ok_or_else(|| {
            TokenError::InvalidRecoveryInput(format!(
                "store key {} under substore {} is not a user account key",
                hex::encode(&self.store_key),
                hex::encode(self.substore_prefix)
            ))
        })?;
        let account = UserAccount::decode(&self.store_value)
            .map_err(|e| TokenError::InvalidRecoveryInput(format!("store value: {e}")))?;
        let total_amount = account
            .total()
            .map_err(|_| TokenError::InvalidRecoveryInput("account total overflows".to_string()))?;
        Ok(RecoveredAccount {
            address,
            token_id,
            total_amount,
        })
    }
}

fn classify_recover_failure(err: &TokenError) -> TokenEventResult {
    match err {
        TokenError::InsufficientEscrow { .. } => TokenEventResult::RecoverFailInsufficientEscrow,
        _ => TokenEventResult::RecoverFailInvalidInputs,
    }
}

impl TokenMethod {
    /// Reinstates a native-token account proven on a terminated chain,
    /// paying it out of that chain's escrow.
    pub fn recover(&self, ctx: &mut MethodContext<'_>, recover: &RecoverContext) -> TokenResult<()> {
        let decoded = recover.decode();
        let event = TokenEvent::Recover {
            terminated_chain_id: recover.terminated_chain_id,
            address: recover.key_fields().map(|(address, _)| address),
            token_id: recover.key_fields().map(|(_, token_id)| token_id),
            amount: decoded.as_ref().map_or(0, |account| account.total_amount),
        };
        self.execute_with(ctx, event, classify_recover_failure, |ctx| {
            let account = decoded?;
            if !self.is_native_token(account.token_id) {
                return Err(TokenError::InvalidRecoveryInput(format!(
                    "token {} is not native to this chain",
                    account.token_id
                )));
            }
            self.debit_escrow(
                ctx.store_mut(),
                recover.terminated_chain_id,
                account.token_id,
                account.total_amount,
            )?;
            self.credit_available_with_create(
                ctx.store_mut(),
                account.address,
                account.token_id,
                account.total_amount,
            )
        })
    }
}
