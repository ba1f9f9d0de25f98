//! # Fixed-Width Identifiers
//!
//! Every identifier in the token ledger is a fixed number of raw bytes:
//!
//! | Type       | Width | Layout                                   |
//! |------------|-------|------------------------------------------|
//! | `ChainId`  | 4     | network byte + 3 chain bytes             |
//! | `LocalId`  | 4     | issuer-chosen token number               |
//! | `TokenId`  | 8     | `ChainId ‖ LocalId`                      |
//! | `Address`  | 20    | truncated public-key hash                |
//!
//! Store keys are plain concatenations of these values, so the widths are
//! load-bearing: they are what makes the key order total and range scans
//! meaningful.
//!
//! In human-readable formats (JSON config, genesis snapshots) identifiers
//! are hex strings. In binary formats (bincode store records) they are the
//! raw bytes, with no length prefix.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

macro_rules! fixed_bytes_id {
    ($(#[$meta:meta])* $name:ident, $len:expr, $label:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Width of this identifier in bytes.
            pub const LENGTH: usize = $len;

            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Builds the identifier from a slice, rejecting any other length.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, TokenError> {
                let arr: [u8; $len] =
                    bytes.try_into().map_err(|_| TokenError::InvalidLength {
                        field: $label,
                        expected: $len,
                        actual: bytes.len(),
                    })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, TokenError> {
                let bytes = hex::decode(s).map_err(|_| TokenError::InvalidHex {
                    field: $label,
                    value: s.to_string(),
                })?;
                Self::from_slice(&bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = TokenError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    struct HexVisitor;

                    impl<'de> Visitor<'de> for HexVisitor {
                        type Value = $name;

                        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                            write!(f, "a {}-byte hex string", $len)
                        }

                        fn visit_str<E: de::Error>(self, v: &str) -> Result<$name, E> {
                            $name::from_hex(v).map_err(E::custom)
                        }
                    }

                    deserializer.deserialize_str(HexVisitor)
                } else {
                    <[u8; $len]>::deserialize(deserializer).map($name)
                }
            }
        }
    };
}

fixed_bytes_id!(
    /// Identifier of a chain in the interoperable network.
    ChainId,
    4,
    "chainID"
);

fixed_bytes_id!(
    /// Chain-local part of a token identifier.
    LocalId,
    4,
    "localID"
);

fixed_bytes_id!(
    /// Token identifier: the issuing chain followed by the local token number.
    ///
    /// A token is *native* to the chain whose identifier forms its first
    /// four bytes. Only the native chain can mint it or hold it in escrow.
    TokenId,
    8,
    "tokenID"
);

fixed_bytes_id!(
    /// Account address. Always exactly 20 bytes.
    Address,
    20,
    "address"
);

impl ChainId {
    /// The network byte shared by every chain of one interoperable network.
    pub fn network_byte(&self) -> u8 {
        self.0[0]
    }

    /// The mainchain of the network this chain belongs to.
    pub fn mainchain(&self) -> ChainId {
        ChainId([self.0[0], 0, 0, 0])
    }
}

impl TokenId {
    pub fn new(chain_id: ChainId, local_id: LocalId) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(chain_id.as_bytes());
        bytes[4..].copy_from_slice(local_id.as_bytes());
        Self(bytes)
    }

    /// The chain that issued this token.
    pub fn chain_id(&self) -> ChainId {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.0[..4]);
        ChainId(bytes)
    }

    pub fn local_id(&self) -> LocalId {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.0[4..]);
        LocalId(bytes)
    }

    /// Splits the identifier into its chain and local components.
    pub fn split(&self) -> (ChainId, LocalId) {
        (self.chain_id(), self.local_id())
    }

    pub fn is_native_to(&self, chain_id: ChainId) -> bool {
        self.chain_id() == chain_id
    }

    /// The network base token: local id zero on the mainchain of `chain_id`.
    pub fn base_for(chain_id: ChainId) -> TokenId {
        TokenId::new(chain_id.mainchain(), LocalId::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_id_splits_into_chain_and_local() {
        let token = TokenId::from_hex("0400000100000002").unwrap();
        assert_eq!(token.chain_id(), ChainId::from_bytes([4, 0, 0, 1]));
        assert_eq!(token.local_id(), LocalId::from_bytes([0, 0, 0, 2]));
        assert_eq!(
            TokenId::new(token.chain_id(), token.local_id()),
            token
        );
    }

    #[test]
    fn native_check_uses_chain_prefix() {
        let own = ChainId::from_bytes([4, 0, 0, 1]);
        let other = ChainId::from_bytes([4, 0, 0, 2]);
        let token = TokenId::new(own, LocalId::from_bytes([0, 0, 0, 9]));
        assert!(token.is_native_to(own));
        assert!(!token.is_native_to(other));
    }

    #[test]
    fn base_token_lives_on_mainchain() {
        let chain = ChainId::from_bytes([4, 0, 0, 7]);
        let base = TokenId::base_for(chain);
        assert_eq!(base.to_hex(), "0400000000000000");
        assert_eq!(base.chain_id(), chain.mainchain());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = Address::from_slice(&[0u8; 19]).unwrap_err();
        assert!(matches!(
            err,
            TokenError::InvalidLength {
                expected: 20,
                actual: 19,
                ..
            }
        ));
        assert!(TokenId::from_hex("0400").is_err());
        assert!(ChainId::from_hex("zz000000").is_err());
    }

    #[test]
    fn json_uses_hex_strings() {
        let token = TokenId::from_hex("0400000100000000").unwrap();
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"0400000100000000\"");
        let back: TokenId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn bincode_uses_raw_bytes() {
        let address = Address::from_bytes([0xAB; 20]);
        let bytes = bincode::serialize(&address).unwrap();
        assert_eq!(bytes, vec![0xAB; 20]);
    }

    #[test]
    fn ordering_matches_byte_order() {
        let a = ChainId::from_bytes([0, 0, 0, 1]);
        let b = ChainId::from_bytes([0, 0, 1, 0]);
        assert!(a < b);
    }
}
