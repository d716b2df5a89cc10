//! Core primitive types for the weft node
//!
//! This crate defines the basic types shared across the weft project.

#![warn(missing_docs)]

use core::fmt::{self, Debug, Display, Formatter};
use core::str::FromStr;

/// Common error type for all weft operations
pub mod error;
pub use error::*;

/// Re-exports from alloy-primitives to ensure consistent usage
pub use alloy_primitives::{I256, Sign, U256};

/// Result type used throughout the weft codebase
pub type Result<T> = core::result::Result<T, Error>;

/// A 32-byte overlay address identifying a peer in the network
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress(pub [u8; 32]);

impl PeerAddress {
    /// Creates a new PeerAddress from raw bytes
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the full address as a lowercase hex string
    pub fn encode_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for PeerAddress {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Debug for PeerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PeerAddress({})", hex::encode(&self.0[..4]))
    }
}

impl Display for PeerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..4]))
    }
}

impl FromStr for PeerAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::other(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::other("peer address must be exactly 32 bytes"));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PeerAddress {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PeerAddress {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
