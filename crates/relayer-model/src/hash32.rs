use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A fixed 32-byte value rendered as `0x`-prefixed hex.
///
/// Used for order ids, secret hashes, transaction hashes and block hashes -
/// anywhere a 32-byte identifier is needed. Keeping one newtype instead of
/// four prevents accidentally mixing up which 32 bytes a function expects.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hash32(#[serde(with = "hex_bytes")] [u8; 32]);

impl Hash32 {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({self})")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Hash32ParseError {
    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

impl FromStr for Hash32 {
    type Err = Hash32ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| Hash32ParseError::WrongLength(v.len()))?;
        Ok(Self(bytes))
    }
}

mod hex_bytes {
    use serde::{Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("expected 32 bytes, got {}", v.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hex() {
        let h = Hash32::new([7u8; 32]);
        let s = h.to_string();
        assert_eq!(s.parse::<Hash32>().unwrap(), h);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("0x1234".parse::<Hash32>().is_err());
    }

    #[test]
    fn serde_round_trip() {
        let h = Hash32::new([9u8; 32]);
        let json = serde_json::to_string(&h).unwrap();
        let back: Hash32 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
