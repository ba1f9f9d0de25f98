//! Collaborators for running the ledger outside a host chain.
//!
//! The offline tool never executes transactions, so there is no fee payer
//! and no channel to send messages on. Reads of channel data answer with
//! the network base token; anything that would move value is refused.

use token_protocol::interop::{
    ChannelData, FeeMethod, InteroperabilityMethod, OwnChainAccount, SendRequest,
};
use token_protocol::storage::KvStore;
use token_protocol::{ChainId, TokenConfig, TokenError, TokenId, TokenResult};

#[derive(Debug)]
pub struct OfflineInterop {
    own_chain_id: ChainId,
    base_token_id: TokenId,
}

impl OfflineInterop {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            own_chain_id: config.own_chain_id,
            base_token_id: config.base_token_id,
        }
    }
}

impl InteroperabilityMethod for OfflineInterop {
    fn get_own_chain_account(&self) -> TokenResult<OwnChainAccount> {
        Ok(OwnChainAccount {
            chain_id: self.own_chain_id,
            name: "offline".to_string(),
            nonce: 0,
        })
    }

    fn get_channel(&self, chain_id: ChainId) -> TokenResult<ChannelData> {
        Ok(ChannelData {
            message_fee_token_id: self.get_message_fee_token_id(chain_id)?,
            min_return_fee_per_byte: 0,
        })
    }

    fn get_message_fee_token_id(&self, _chain_id: ChainId) -> TokenResult<TokenId> {
        Ok(self.base_token_id)
    }

    fn send(&self, request: SendRequest) -> TokenResult<bool> {
        Err(TokenError::Interop(format!(
            "no channel to chain {} in offline mode",
            request.receiving_chain_id
        )))
    }

    fn terminate_chain(&self, chain_id: ChainId) -> TokenResult<()> {
        Err(TokenError::Interop(format!(
            "cannot terminate chain {chain_id} in offline mode"
        )))
    }
}

#[derive(Debug, Default)]
pub struct OfflineFee;

impl FeeMethod for OfflineFee {
    fn pay_fee(&self, _store: &mut dyn KvStore, amount: u64) -> TokenResult<()> {
        Err(TokenError::Fee(format!(
            "no fee payer for {amount} in offline mode"
        )))
    }
}
