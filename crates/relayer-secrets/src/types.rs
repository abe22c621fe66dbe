use chrono::{DateTime, Utc};
use relayer_model::{Hash32, OrderId, SecretHash};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretStatus {
    Pending,
    Ready,
    Revealed,
    Expired,
}

impl SecretStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretStatus::Pending => "pending",
            SecretStatus::Ready => "ready",
            SecretStatus::Revealed => "revealed",
            SecretStatus::Expired => "expired",
        }
    }
}

/// An encrypted preimage keyed by `(order_id, index)`. `index` is `0` for a
/// whole-order secret and the leaf position for a partial-fill secret.
///
/// `Debug` is hand-written below to never print `ciphertext` — the
/// `db_url: SECRET` redaction pattern, applied to key material instead of a
/// connection string.
pub struct StoredSecret {
    pub order_id: OrderId,
    pub index: u32,
    pub secret_hash: SecretHash,
    pub(crate) ciphertext: Vec<u8>,
    pub status: SecretStatus,
    pub reveal_at: Option<DateTime<Utc>>,
    pub stored_at: DateTime<Utc>,
    pub revealed_at: Option<DateTime<Utc>>,
    pub partial_fill_index: Option<u32>,
}

impl std::fmt::Debug for StoredSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSecret")
            .field("order_id", &self.order_id)
            .field("index", &self.index)
            .field("secret_hash", &self.secret_hash)
            .field("ciphertext", &"REDACTED")
            .field("status", &self.status.as_str())
            .field("reveal_at", &self.reveal_at)
            .finish()
    }
}

/// Returned by `coordinate_partial_reveal`: the revealed plaintext together
/// with the proof an on-chain verifier needs to accept it against the
/// committed Merkle root.
pub struct PartialFillInfo {
    pub plaintext: zeroize::Zeroizing<Vec<u8>>,
    pub proof: Vec<Hash32>,
    pub fill_amount: u128,
}
