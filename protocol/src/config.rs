//! # Module Configuration & Constants
//!
//! Every magic number of the token module lives here. These values are
//! consensus-critical: two nodes that disagree on any of them will disagree
//! on state, so they are fixed at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};

use crate::error::TokenError;
use crate::identifiers::{ChainId, TokenId};

// ---------------------------------------------------------------------------
// Module Identity
// ---------------------------------------------------------------------------

/// Name under which the token module registers with the host and the
/// interoperability layer.
pub const MODULE_NAME: &str = "token";

/// Command name carried by cross-chain messages that move tokens.
pub const CROSS_CHAIN_COMMAND_NAME_TRANSFER: &str = "transferCrossChain";

/// Command name of the local transfer command.
pub const COMMAND_NAME_TRANSFER: &str = "transfer";

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum size of the free-form `data` field of a transfer, in bytes.
pub const MAX_DATA_LENGTH: usize = 64;

/// Module names used as keys of locked balances must fit these bounds.
pub const MIN_MODULE_NAME_LENGTH: usize = 1;
pub const MAX_MODULE_NAME_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Default fee for creating a user account, in the smallest unit of the
/// fee token. 0.05 of a token with 8 decimals.
pub const DEFAULT_USER_ACCOUNT_INITIALIZATION_FEE: u64 = 5_000_000;

/// Default fee for opening an escrow account towards a new partner chain.
pub const DEFAULT_ESCROW_ACCOUNT_INITIALIZATION_FEE: u64 = 5_000_000;

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

/// Per-chain configuration of the token module.
///
/// Built once at startup and owned by the [`TokenMethod`](crate::ledger::TokenMethod)
/// instance. Fields are public for construction; the ledger only ever reads
/// them through a shared reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    /// Identifier of the chain executing this ledger.
    pub own_chain_id: ChainId,
    /// The network base token. Always supported, never removable.
    pub base_token_id: TokenId,
    #[serde(default = "default_user_fee")]
    pub user_account_initialization_fee: u64,
    #[serde(default = "default_escrow_fee")]
    pub escrow_account_initialization_fee: u64,
}

fn default_user_fee() -> u64 {
    DEFAULT_USER_ACCOUNT_INITIALIZATION_FEE
}

fn default_escrow_fee() -> u64 {
    DEFAULT_ESCROW_ACCOUNT_INITIALIZATION_FEE
}

impl TokenConfig {
    /// Configuration with default fees and the network base token derived
    /// from `own_chain_id`.
    pub fn new(own_chain_id: ChainId) -> Self {
        Self {
            own_chain_id,
            base_token_id: TokenId::base_for(own_chain_id),
            user_account_initialization_fee: DEFAULT_USER_ACCOUNT_INITIALIZATION_FEE,
            escrow_account_initialization_fee: DEFAULT_ESCROW_ACCOUNT_INITIALIZATION_FEE,
        }
    }

    pub fn with_fees(mut self, user_fee: u64, escrow_fee: u64) -> Self {
        self.user_account_initialization_fee = user_fee;
        self.escrow_account_initialization_fee = escrow_fee;
        self
    }

    /// Checks that the base token sits on this chain's network mainchain.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.base_token_id != TokenId::base_for(self.own_chain_id) {
            return Err(TokenError::InvalidConfig(format!(
                "base token {} is not the base token of network {:02x}",
                self.base_token_id,
                self.own_chain_id.network_byte()
            )));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, TokenError> {
        let config: TokenConfig =
            serde_json::from_str(json).map_err(|e| TokenError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Validates a module name used as a locked-balance key.
pub fn is_valid_module_name(name: &str) -> bool {
    (MIN_MODULE_NAME_LENGTH..=MAX_MODULE_NAME_LENGTH).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
