use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash32::Hash32;

/// Unique identifier of a [`crate::order::SwapOrder`] / [`crate::state::SwapState`].
pub type OrderId = Hash32;

/// Hash of a preimage, committed on both chains.
pub type SecretHash = Hash32;

/// A transaction hash, EVM or UTXO — both chains use 32-byte txids.
pub type TxHash = Hash32;

/// A block hash, used by the UTXO reorg check.
pub type BlockHash = Hash32;

/// An opaque, chain-agnostic address.
///
/// EVM addresses and UTXO addresses have different wire formats (20-byte hex
/// vs. base58/bech32 strings), but the core never constructs or validates
/// either — it receives them from callers and compares them for equality, so
/// a single string newtype is sufficient and keeps the chain-specific
/// encoding out of the core's types.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
