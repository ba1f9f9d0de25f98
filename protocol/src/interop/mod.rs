//! # Cross-Chain Settlement
//!
//! Value moves between chains through escrow. A token always has one home
//! chain; when it leaves home, the home chain parks it in an escrow bucket
//! for the destination, and when it comes back (or a relayer is paid with
//! it) the bucket is drawn down again.
//!
//! ```text
//!   chain A (home of T)                            chain B
//!   ┌────────────────────────┐   transferCrossChain  ┌─────────────────┐
//!   │ alice.available  -= x  │ ────────── CCM ─────► │ bob.available   │
//!   │ escrow[B, T]     += x  │                       │            += x │
//!   └────────────────────────┘                       └─────────────────┘
//! ```
//!
//! ## Layout
//!
//! ```text
//! mod.rs      — collaborator contracts and cross-chain message types
//! transfer.rs — outbound transfers and message-fee payment
//! command.rs  — inbound transferCrossChain message execution
//! hooks.rs    — hooks the dispatcher runs around message execution/forwarding
//! recover.rs  — reinstating balances proven on a terminated chain
//! ```
//!
//! Relay mechanics (certificates, inbox/outbox proofs) are the dispatcher's
//! business. This module only sees the narrow [`InteroperabilityMethod`]
//! and [`FeeMethod`] contracts below.

pub mod command;
pub mod hooks;
pub mod recover;
pub mod transfer;

use serde::{Deserialize, Serialize};

use crate::config::{is_valid_module_name, MAX_DATA_LENGTH};
use crate::error::{TokenError, TokenResult};
use crate::identifiers::{Address, ChainId, TokenId};
use crate::storage::KvStore;

pub use recover::RecoverContext;

// ---------------------------------------------------------------------------
// Collaborator Contracts
// ---------------------------------------------------------------------------

/// Charges the fee payer of the active transaction.
pub trait FeeMethod: Send + Sync {
    /// Debits `amount` from the active transaction's fee payer. Fails when
    /// the payer cannot cover it.
    ///
    /// `store` is the write buffer of the operation being charged. The debit
    /// must go through it so it commits or rolls back with that operation.
    fn pay_fee(&self, store: &mut dyn KvStore, amount: u64) -> TokenResult<()>;
}

/// Interoperability state of the own chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnChainAccount {
    pub chain_id: ChainId,
    pub name: String,
    pub nonce: u64,
}

/// Channel to a partner chain, as far as the token module cares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelData {
    pub message_fee_token_id: TokenId,
    pub min_return_fee_per_byte: u64,
}

/// An outbound message handed to the interoperability layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub sender: Address,
    pub module: String,
    pub cross_chain_command: String,
    pub receiving_chain_id: ChainId,
    pub fee: u64,
    pub params: Vec<u8>,
}

/// Interoperability methods consumed by the token module.
pub trait InteroperabilityMethod: Send + Sync {
    fn get_own_chain_account(&self) -> TokenResult<OwnChainAccount>;

    fn get_channel(&self, chain_id: ChainId) -> TokenResult<ChannelData>;

    fn get_message_fee_token_id(&self, chain_id: ChainId) -> TokenResult<TokenId>;

    /// Queues a cross-chain message. Returns `false` if the message was not
    /// accepted.
    fn send(&self, request: SendRequest) -> TokenResult<bool>;

    fn terminate_chain(&self, chain_id: ChainId) -> TokenResult<()>;
}

// ---------------------------------------------------------------------------
// Cross-Chain Messages
// ---------------------------------------------------------------------------

/// Delivery status of a cross-chain message. Anything but `Ok` means the
/// message bounced back to its origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CcmStatus {
    #[default]
    Ok,
    ModuleNotSupported,
    CrossChainCommandNotSupported,
    ChannelUnavailable,
    RecoveredTerminatedChain,
    FailedCcm,
}

/// Cross-chain message envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainMessage {
    pub module: String,
    pub cross_chain_command: String,
    pub nonce: u64,
    pub fee: u64,
    pub sending_chain_id: ChainId,
    pub receiving_chain_id: ChainId,
    pub params: Vec<u8>,
    pub status: CcmStatus,
}

impl CrossChainMessage {
    /// Whether this message carries a token transfer.
    pub fn is_token_transfer(&self) -> bool {
        self.module == crate::config::MODULE_NAME
            && self.cross_chain_command == crate::config::CROSS_CHAIN_COMMAND_NAME_TRANSFER
    }
}

/// What the dispatcher passes to a hook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossChainMessageContext {
    pub ccm: CrossChainMessage,
    /// Sender of the transaction that delivered the message (the relayer).
    pub transaction_sender: Address,
}

/// Payload of a `transferCrossChain` message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainTransferMessageParams {
    pub token_id: TokenId,
    pub amount: u64,
    pub sender_address: Address,
    pub recipient_address: Address,
    pub data: String,
}

impl CrossChainTransferMessageParams {
    pub fn encode(&self) -> TokenResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| TokenError::InvalidMessage(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> TokenResult<Self> {
        let params: Self =
            bincode::deserialize(bytes).map_err(|e| TokenError::InvalidMessage(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> TokenResult<()> {
        validate_data(&self.data)
    }
}

/// Parameters of the local `transfer` command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub token_id: TokenId,
    pub amount: u64,
    pub recipient_address: Address,
    pub data: String,
}

impl TransferParams {
    pub fn validate(&self) -> TokenResult<()> {
        validate_data(&self.data)
    }
}

/// Parameters of the `transferCrossChain` command submitted by a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCrossChainParams {
    pub token_id: TokenId,
    pub amount: u64,
    pub receiving_chain_id: ChainId,
    pub recipient_address: Address,
    pub data: String,
    pub message_fee: u64,
    pub message_fee_token_id: TokenId,
}

impl TransferCrossChainParams {
    pub fn validate(&self, own_chain_id: ChainId) -> TokenResult<()> {
        validate_data(&self.data)?;
        if self.receiving_chain_id == own_chain_id {
            return Err(TokenError::SameChain(own_chain_id));
        }
        Ok(())
    }
}

pub(crate) fn validate_data(data: &str) -> TokenResult<()> {
    if data.len() > MAX_DATA_LENGTH {
        return Err(TokenError::DataTooLong {
            length: data.len(),
            max: MAX_DATA_LENGTH,
        });
    }
    Ok(())
}

pub(crate) fn validate_module(module: &str) -> TokenResult<()> {
    if !is_valid_module_name(module) {
        return Err(TokenError::InvalidModuleName(module.to_string()));
    }
    Ok(())
}
