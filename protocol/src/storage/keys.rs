//! # Store Keys
//!
//! All token records live under one module-scoped prefix, split into four
//! substores. A key is the plain concatenation
//!
//! ```text
//! module prefix (4B) ‖ substore prefix (2B) ‖ fixed-width fields
//! ```
//!
//! | Substore          | Prefix   | Fields                         | Width |
//! |-------------------|----------|--------------------------------|-------|
//! | `User`            | `0x0000` | address (20) ‖ token id (8)    | 28    |
//! | `Supply`          | `0x8000` | token id (8)                   | 8     |
//! | `Escrow`          | `0xc000` | escrow chain id (4) ‖ token (8)| 12    |
//! | `SupportedTokens` | `0xe000` | chain id (4), or empty for ALL | 4 / 0 |
//!
//! No delimiters and no length prefixes: byte order on the raw key is the
//! tuple order of the fields, which is what genesis sorting and prefix
//! scans rely on.

use std::sync::OnceLock;

use crate::config::MODULE_NAME;
use crate::error::{StoreError, StoreResult};
use crate::identifiers::{Address, ChainId, TokenId};

pub const MODULE_PREFIX_LENGTH: usize = 4;
pub const SUBSTORE_PREFIX_LENGTH: usize = 2;

/// First four bytes of `BLAKE3(MODULE_NAME)`.
pub fn module_prefix() -> &'static [u8; MODULE_PREFIX_LENGTH] {
    static PREFIX: OnceLock<[u8; MODULE_PREFIX_LENGTH]> = OnceLock::new();
    PREFIX.get_or_init(|| {
        let digest = blake3::hash(MODULE_NAME.as_bytes());
        let mut prefix = [0u8; MODULE_PREFIX_LENGTH];
        prefix.copy_from_slice(&digest.as_bytes()[..MODULE_PREFIX_LENGTH]);
        prefix
    })
}

/// The four key spaces owned by the token module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Substore {
    User,
    Supply,
    Escrow,
    SupportedTokens,
}

impl Substore {
    pub const fn prefix(self) -> [u8; SUBSTORE_PREFIX_LENGTH] {
        match self {
            Substore::User => [0x00, 0x00],
            Substore::Supply => [0x80, 0x00],
            Substore::Escrow => [0xc0, 0x00],
            Substore::SupportedTokens => [0xe0, 0x00],
        }
    }

    pub fn from_prefix(prefix: &[u8]) -> Option<Substore> {
        [
            Substore::User,
            Substore::Supply,
            Substore::Escrow,
            Substore::SupportedTokens,
        ]
        .into_iter()
        .find(|s| s.prefix() == prefix)
    }

    /// Byte width of the key suffix after the substore prefix.
    pub const fn suffix_length(self) -> usize {
        match self {
            Substore::User => Address::LENGTH + TokenId::LENGTH,
            Substore::Supply => TokenId::LENGTH,
            Substore::Escrow => ChainId::LENGTH + TokenId::LENGTH,
            Substore::SupportedTokens => ChainId::LENGTH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Substore::User => "user",
            Substore::Supply => "supply",
            Substore::Escrow => "escrow",
            Substore::SupportedTokens => "supportedTokens",
        }
    }

    /// Full key prefix (module ‖ substore) for range scans.
    pub fn scan_prefix(self) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(MODULE_PREFIX_LENGTH + SUBSTORE_PREFIX_LENGTH);
        prefix.extend_from_slice(module_prefix());
        prefix.extend_from_slice(&self.prefix());
        prefix
    }
}

/// A decoded store key. One variant per record kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreKey {
    User { address: Address, token_id: TokenId },
    Supply { token_id: TokenId },
    Escrow { chain_id: ChainId, token_id: TokenId },
    SupportedTokens { chain_id: ChainId },
    AllTokensSupported,
}

impl StoreKey {
    pub fn substore(&self) -> Substore {
        match self {
            StoreKey::User { .. } => Substore::User,
            StoreKey::Supply { .. } => Substore::Supply,
            StoreKey::Escrow { .. } => Substore::Escrow,
            StoreKey::SupportedTokens { .. } | StoreKey::AllTokensSupported => {
                Substore::SupportedTokens
            }
        }
    }

    /// Key bytes after the substore prefix.
    pub fn suffix(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.substore().suffix_length());
        match self {
            StoreKey::User { address, token_id } => {
                out.extend_from_slice(address.as_bytes());
                out.extend_from_slice(token_id.as_bytes());
            }
            StoreKey::Supply { token_id } => out.extend_from_slice(token_id.as_bytes()),
            StoreKey::Escrow { chain_id, token_id } => {
                out.extend_from_slice(chain_id.as_bytes());
                out.extend_from_slice(token_id.as_bytes());
            }
            StoreKey::SupportedTokens { chain_id } => out.extend_from_slice(chain_id.as_bytes()),
            StoreKey::AllTokensSupported => {}
        }
        out
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut key = self.substore().scan_prefix();
        key.extend_from_slice(&self.suffix());
        key
    }

    /// Decodes a key given its substore and suffix bytes.
    pub fn from_suffix(substore: Substore, suffix: &[u8]) -> StoreResult<StoreKey> {
        let malformed = || {
            StoreError::MalformedKey(format!(
                "{} key suffix of {} bytes",
                substore.name(),
                suffix.len()
            ))
        };
        if substore == Substore::SupportedTokens && suffix.is_empty() {
            return Ok(StoreKey::AllTokensSupported);
        }
        if suffix.len() != substore.suffix_length() {
            return Err(malformed());
        }
        let key = match substore {
            Substore::User => StoreKey::User {
                address: Address::from_slice(&suffix[..Address::LENGTH])
                    .map_err(|_| malformed())?,
                token_id: TokenId::from_slice(&suffix[Address::LENGTH..])
                    .map_err(|_| malformed())?,
            },
            Substore::Supply => StoreKey::Supply {
                token_id: TokenId::from_slice(suffix).map_err(|_| malformed())?,
            },
            Substore::Escrow => StoreKey::Escrow {
                chain_id: ChainId::from_slice(&suffix[..ChainId::LENGTH])
                    .map_err(|_| malformed())?,
                token_id: TokenId::from_slice(&suffix[ChainId::LENGTH..])
                    .map_err(|_| malformed())?,
            },
            Substore::SupportedTokens => StoreKey::SupportedTokens {
                chain_id: ChainId::from_slice(suffix).map_err(|_| malformed())?,
            },
        };
        Ok(key)
    }

    /// Decodes a full key, including module and substore prefixes.
    pub fn decode(bytes: &[u8]) -> StoreResult<StoreKey> {
        let header = MODULE_PREFIX_LENGTH + SUBSTORE_PREFIX_LENGTH;
        if bytes.len() < header || &bytes[..MODULE_PREFIX_LENGTH] != module_prefix() {
            return Err(StoreError::MalformedKey(
                "missing token module prefix".to_string(),
            ));
        }
        let substore = Substore::from_prefix(&bytes[MODULE_PREFIX_LENGTH..header])
            .ok_or_else(|| StoreError::MalformedKey("unknown substore prefix".to_string()))?;
        StoreKey::from_suffix(substore, &bytes[header..])
    }
}
