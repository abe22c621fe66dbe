use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chain::Chain,
    ids::{Address, OrderId, SecretHash},
};

/// One side of a swap: the chain, the token being moved, and the amount.
///
/// `token` is `None` for a chain's native asset (ETH, BTC-equivalent); the
/// core never needs to know more about a token than an opaque reference
/// since it does not price or validate tokens itself - that belongs to a
/// separate order-validation concern, not this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub chain: Chain,
    pub token: Option<Address>,
    pub amount: u128,
}

/// A signed swap order as submitted by a maker.
///
/// Immutable once accepted — the Order Manager never mutates a `SwapOrder`,
/// only the `SwapState` derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOrder {
    pub order_id: OrderId,
    pub maker: Address,
    pub maker_asset: Asset,
    pub taker_asset: Asset,
    pub secret_hash: SecretHash,
    /// Unix timestamp the swap is timelocked until, EVM side semantics;
    /// the destination-side timelock is derived by the Order Manager, see
    /// [`crate::chain::Timelock`].
    pub timelock: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Raw signature bytes. The core never verifies this; signature
    /// verification is an external collaborator's responsibility.
    #[serde(with = "hex_vec")]
    pub signature: Vec<u8>,
    /// Whether the maker allows the resolver to fill this order in parts.
    #[serde(default)]
    pub allow_partial_fill: bool,
}

mod hex_vec {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(D::Error::custom)
    }
}
