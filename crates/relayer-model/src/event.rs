use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chain::Chain,
    ids::{Address, OrderId, TxHash},
};

/// The unified event stream schema published by the Relayer Facade.
///
/// Each variant is a concrete, exhaustively-handled case rather than a
/// loosely-typed `{type: String, data: Value}` pair — see the "event
/// emitter with loose string keys" design note.
#[derive(Clone, Debug, Serialize, Deserialize, strum::EnumDiscriminants)]
#[strum_discriminants(name(EventKind))]
#[strum_discriminants(derive(strum::Display))]
#[strum_discriminants(strum(serialize_all = "snake_case"))]
pub enum Event {
    OrderCreated {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
    AuctionStarted {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
    BidPlaced {
        order_id: OrderId,
        resolver: Address,
        price: u128,
        timestamp: DateTime<Utc>,
    },
    AuctionSettled {
        order_id: OrderId,
        winner: Option<Address>,
        final_price: u128,
        timestamp: DateTime<Utc>,
    },
    EscrowCreated {
        order_id: OrderId,
        chain: Chain,
        escrow_addr: Address,
        tx_hash: TxHash,
        block_height: u64,
        timestamp: DateTime<Utc>,
    },
    EscrowFunded {
        order_id: OrderId,
        chain: Chain,
        tx_hash: TxHash,
        confirmations: u32,
        timestamp: DateTime<Utc>,
    },
    SecretReady {
        order_id: OrderId,
        index: u32,
        reveal_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    SecretRevealed {
        order_id: OrderId,
        index: u32,
        timestamp: DateTime<Utc>,
    },
    FundsRedeemed {
        order_id: OrderId,
        chain: Chain,
        tx_hash: TxHash,
        block_height: u64,
        timestamp: DateTime<Utc>,
    },
    SwapRefunded {
        order_id: OrderId,
        chain: Chain,
        tx_hash: TxHash,
        timestamp: DateTime<Utc>,
    },
    SwapExpired {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
    SwapCompleted {
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
    TxConfirmed {
        order_id: Option<OrderId>,
        chain: Chain,
        tx_hash: TxHash,
        block_height: u64,
        timestamp: DateTime<Utc>,
    },
    Reorg {
        chain: Chain,
        from_height: u64,
        timestamp: DateTime<Utc>,
    },
    MonitoringError {
        chain: Chain,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Raised when an order is marked `Failed` after exhausting recovery
    /// options (e.g. an unresolvable desync between the two chain
    /// monitors); surfaced as a first-class event so subscribers can alert
    /// on it instead of only reading logs.
    DesyncError {
        order_id: OrderId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    SubscriberLagged {
        skipped: u64,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            Event::OrderCreated { order_id, .. }
            | Event::AuctionStarted { order_id, .. }
            | Event::BidPlaced { order_id, .. }
            | Event::AuctionSettled { order_id, .. }
            | Event::EscrowCreated { order_id, .. }
            | Event::EscrowFunded { order_id, .. }
            | Event::SecretReady { order_id, .. }
            | Event::SecretRevealed { order_id, .. }
            | Event::FundsRedeemed { order_id, .. }
            | Event::SwapRefunded { order_id, .. }
            | Event::SwapExpired { order_id, .. }
            | Event::SwapCompleted { order_id, .. }
            | Event::DesyncError { order_id, .. } => Some(*order_id),
            Event::TxConfirmed { order_id, .. } => *order_id,
            Event::Reorg { .. } | Event::MonitoringError { .. } | Event::SubscriberLagged { .. } => {
                None
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::OrderCreated { timestamp, .. }
            | Event::AuctionStarted { timestamp, .. }
            | Event::BidPlaced { timestamp, .. }
            | Event::AuctionSettled { timestamp, .. }
            | Event::EscrowCreated { timestamp, .. }
            | Event::EscrowFunded { timestamp, .. }
            | Event::SecretReady { timestamp, .. }
            | Event::SecretRevealed { timestamp, .. }
            | Event::FundsRedeemed { timestamp, .. }
            | Event::SwapRefunded { timestamp, .. }
            | Event::SwapExpired { timestamp, .. }
            | Event::SwapCompleted { timestamp, .. }
            | Event::TxConfirmed { timestamp, .. }
            | Event::Reorg { timestamp, .. }
            | Event::MonitoringError { timestamp, .. }
            | Event::DesyncError { timestamp, .. }
            | Event::SubscriberLagged { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_name_is_snake_case() {
        let event = Event::SwapCompleted {
            order_id: OrderId::ZERO,
            timestamp: Utc::now(),
        };
        assert_eq!(event.kind().to_string(), "swap_completed");
    }
}
