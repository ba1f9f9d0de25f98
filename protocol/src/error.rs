//! Error types for the token ledger.
//!
//! Failures fall into three families and every variant of [`TokenError`]
//! belongs to exactly one of them:
//!
//! - **caller input** — malformed lengths, oversized data, wrong chain.
//!   Rejected before the store is touched.
//! - **insufficient resource** — balance, locked amount, or escrow shortfall,
//!   plus arithmetic overflow. Rejected after a read-only check.
//! - **protocol consistency** — unsupported or non-native tokens, corrupt
//!   snapshots, bad recovery proofs. These abort the enclosing transaction.
//!
//! Each error knows which [`TokenEventResult`] it is reported with, so the
//! failure event emitted for an operation always matches the error returned.

use thiserror::Error;

use crate::events::TokenEventResult;
use crate::identifiers::{Address, ChainId, TokenId};

/// Errors raised by the key-value store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key has no record. Callers that treat absence as a default
    /// match on this variant explicitly.
    #[error("record not found")]
    NotFound,

    #[error("codec error: {0}")]
    Codec(String),

    #[error("malformed store key: {0}")]
    MalformedKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sled::Error> for StoreError {
    fn from(e: sled::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::Codec(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Reasons a genesis snapshot is rejected. Any of these is fatal to startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenesisError {
    #[error("{substore} substore is not strictly sorted at index {index}")]
    Unsorted { substore: &'static str, index: usize },

    #[error("user account {address}/{token_id} is empty")]
    EmptyAccount { address: Address, token_id: TokenId },

    #[error("locked balances of {address}/{token_id} are not sorted by module or contain duplicates")]
    LockedBalancesUnsorted { address: Address, token_id: TokenId },

    #[error("locked balance of module {module} for {address}/{token_id} is zero")]
    ZeroLockedAmount {
        address: Address,
        token_id: TokenId,
        module: String,
    },

    #[error("invalid module name {0:?} in locked balances")]
    InvalidModuleName(String),

    #[error("supply record for non-native token {0}")]
    NonNativeSupply(TokenId),

    #[error("escrow record for non-native token {token_id} on chain {chain_id}")]
    NonNativeEscrow { chain_id: ChainId, token_id: TokenId },

    #[error("escrow record held against the own chain for token {0}")]
    SelfEscrow(TokenId),

    #[error("supported token list of chain {chain_id} is not sorted or has duplicates")]
    SupportedTokensUnsorted { chain_id: ChainId },

    #[error("supported token {token_id} does not belong to chain {chain_id}")]
    SupportedTokenChainMismatch { chain_id: ChainId, token_id: TokenId },

    #[error("supported token entry for own chain {0}")]
    SupportedOwnChain(ChainId),

    #[error("computed supply of {0} overflows 64 bits")]
    SupplyOverflow(TokenId),

    #[error("token {token_id}: stored supply {stored} does not match computed {computed}")]
    SupplyMismatch {
        token_id: TokenId,
        stored: u64,
        computed: u64,
    },

    #[error("native token {0} has balances but no supply record")]
    MissingSupply(TokenId),

    #[error("supply record for token {0} with no holders or escrow")]
    OrphanSupply(TokenId),
}

/// Errors returned by ledger operations, hooks, and the recovery procedure.
#[derive(Debug, Error)]
pub enum TokenError {
    // -- caller input -------------------------------------------------------
    #[error("invalid {field} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid hex for {field}: {value:?}")]
    InvalidHex { field: &'static str, value: String },

    #[error("data field is {length} bytes, limit is {max}")]
    DataTooLong { length: usize, max: usize },

    #[error("invalid module name {0:?}")]
    InvalidModuleName(String),

    #[error("receiving chain {0} is the own chain")]
    SameChain(ChainId),

    #[error("token {token_id} is native to neither this chain nor chain {receiving_chain_id}")]
    InvalidTokenId {
        token_id: TokenId,
        receiving_chain_id: ChainId,
    },

    #[error("token {0} is not native to this chain")]
    NotNativeToken(TokenId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- insufficient resource ----------------------------------------------
    #[error("insufficient balance for {address}/{token_id}: available {available}, required {required}")]
    InsufficientBalance {
        address: Address,
        token_id: TokenId,
        available: u64,
        required: u64,
    },

    #[error("insufficient locked amount for module {module} on {address}/{token_id}: locked {locked}, required {required}")]
    InsufficientLockedAmount {
        address: Address,
        token_id: TokenId,
        module: String,
        locked: u64,
        required: u64,
    },

    #[error("insufficient escrow of {token_id} for chain {chain_id}: escrowed {escrowed}, required {required}")]
    InsufficientEscrow {
        chain_id: ChainId,
        token_id: TokenId,
        escrowed: u64,
        required: u64,
    },

    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    // -- protocol consistency -----------------------------------------------
    #[error("token {0} is not supported on this chain")]
    UnsupportedToken(TokenId),

    #[error("token {0} is already initialized")]
    TokenAlreadyInitialized(TokenId),

    #[error("supply of token {0} is not initialized")]
    SupplyNotInitialized(TokenId),

    #[error("no user account {address}/{token_id}")]
    AccountNotFound { address: Address, token_id: TokenId },

    #[error("all tokens are supported; clear the global flag first")]
    AllTokensSupported,

    #[error("support for token {0} cannot be removed")]
    CannotRemoveNativeSupport(TokenId),

    #[error("support for the tokens of own chain {0} cannot be removed")]
    CannotRemoveOwnChainSupport(ChainId),

    #[error("support for token {0} cannot be removed while all tokens of its chain are supported")]
    ChainWideSupport(TokenId),

    #[error("invalid recovery input: {0}")]
    InvalidRecoveryInput(String),

    #[error("invalid cross-chain message: {0}")]
    InvalidMessage(String),

    #[error("genesis reconciliation failed: {0}")]
    Genesis(#[from] GenesisError),

    #[error("fee payment failed: {0}")]
    Fee(String),

    #[error("interoperability call failed: {0}")]
    Interop(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type TokenResult<T> = Result<T, TokenError>;

impl TokenError {
    /// The event result code this error is reported with.
    pub fn event_result(&self) -> TokenEventResult {
        match self {
            TokenError::InsufficientBalance { .. } | TokenError::AccountNotFound { .. } => {
                TokenEventResult::FailInsufficientBalance
            }
            TokenError::InsufficientLockedAmount { .. } => {
                TokenEventResult::FailInsufficientLockedAmount
            }
            TokenError::InsufficientEscrow { .. } => TokenEventResult::FailInsufficientEscrow,
            TokenError::Overflow(_) => TokenEventResult::FailOverflow,
            TokenError::InvalidTokenId { .. } | TokenError::NotNativeToken(_) => {
                TokenEventResult::FailInvalidTokenId
            }
            TokenError::UnsupportedToken(_) => TokenEventResult::FailUnsupportedToken,
            TokenError::InvalidRecoveryInput(_) => TokenEventResult::RecoverFailInvalidInputs,
            _ => TokenEventResult::FailProtocolViolation,
        }
    }

    /// The chain whose escrow could not cover a relayed amount, if this error
    /// was caused by one. The interoperability dispatcher uses this to flag
    /// the sending chain instead of treating the failure as local.
    pub fn offending_chain(&self) -> Option<ChainId> {
        match self {
            TokenError::InsufficientEscrow { chain_id, .. } => Some(*chain_id),
            _ => None,
        }
    }

    /// Returns `true` for shortfalls detected by a read-only balance check.
    pub fn is_insufficient_resource(&self) -> bool {
        matches!(
            self,
            TokenError::InsufficientBalance { .. }
                | TokenError::InsufficientLockedAmount { .. }
                | TokenError::InsufficientEscrow { .. }
                | TokenError::Overflow(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escrow_shortfall_names_offending_chain() {
        let chain = ChainId::from_bytes([4, 0, 0, 2]);
        let err = TokenError::InsufficientEscrow {
            chain_id: chain,
            token_id: TokenId::from_bytes([4, 0, 0, 1, 0, 0, 0, 0]),
            escrowed: 5,
            required: 10,
        };
        assert_eq!(err.offending_chain(), Some(chain));
        assert_eq!(err.event_result(), TokenEventResult::FailInsufficientEscrow);
        assert!(err.is_insufficient_resource());
    }

    #[test]
    fn store_errors_are_protocol_violations() {
        let err = TokenError::from(StoreError::Backend("disk".into()));
        assert_eq!(err.event_result(), TokenEventResult::FailProtocolViolation);
        assert_eq!(err.offending_chain(), None);
    }
}
