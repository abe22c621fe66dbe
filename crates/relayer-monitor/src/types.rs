use chrono::{DateTime, Utc};
use relayer_model::{Chain, OrderId, TxHash};

/// What a [`MonitoredTx`] is standing in for, so the monitor can pick the
/// right confirmation threshold and the right event to emit once it lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackedEventKind {
    EscrowFunding,
    Redeem,
    Refund,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Confirmed,
    /// The chain reorganized past this tx's block; the order manager is
    /// notified via `Event::Reorg` and re-derives the consequence.
    Reorged,
}

/// A transaction the Event Monitor has been asked to watch, independent of
/// whatever log-decoding the per-chain poll loop does. Registered by the
/// Order Manager (or the facade on its behalf) whenever it broadcasts or
/// observes a transaction it cares about.
#[derive(Clone, Debug)]
pub struct MonitoredTx {
    pub tx_hash: TxHash,
    pub chain: Chain,
    pub order_id: Option<OrderId>,
    pub kind: TrackedEventKind,
    pub required_confirmations: u32,
    pub status: TxStatus,
    pub confirmations: u32,
    pub block_height: Option<u64>,
    /// Recorded the first time the tx is seen confirmed; compared against
    /// the chain's current view of that height on every later poll to
    /// detect a reorg that replaced this tx's block.
    pub confirmed_block_hash: Option<relayer_model::BlockHash>,
    pub registered_at: DateTime<Utc>,
}

impl MonitoredTx {
    pub fn new(
        tx_hash: TxHash,
        chain: Chain,
        order_id: Option<OrderId>,
        kind: TrackedEventKind,
        required_confirmations: u32,
    ) -> Self {
        Self {
            tx_hash,
            chain,
            order_id,
            kind,
            required_confirmations,
            status: TxStatus::Pending,
            confirmations: 0,
            block_height: None,
            confirmed_block_hash: None,
            registered_at: Utc::now(),
        }
    }
}
