use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use relayer_model::{Address, OrderId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceFn {
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuctionStatus {
    Active,
    Ended,
    Settled,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bid {
    pub resolver: Address,
    pub price: u128,
    pub timestamp: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Caller-supplied idempotency key. A retry with the same `request_id`
    /// returns the original bid instead of being re-evaluated; omitting it
    /// gives up idempotent-retry protection but not duplicate rejection.
    pub request_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Auction {
    pub order_id: OrderId,
    pub starting_price: u128,
    pub ending_price: u128,
    pub reserve_price: u128,
    pub duration: Duration,
    pub price_fn: PriceFn,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub current_price: u128,
    pub bids: Vec<Bid>,
    pub best_bid: Option<usize>,
    pub status: AuctionStatus,
    pub ended_at: Option<DateTime<Utc>>,
    /// Maps an accepted bid's `request_id` to its index in `bids`, so a
    /// retried `placeBid` call can be answered idempotently.
    pub seen_requests: HashMap<String, usize>,
}

impl Auction {
    pub fn best_bid(&self) -> Option<&Bid> {
        self.best_bid.map(|i| &self.bids[i])
    }
}

/// Overrides for [`crate::engine::AuctionEngine::start`]; any field left
/// `None` falls back to the engine's configured default or the
/// `expectedRate`-derived value.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuctionParams {
    pub starting_price: Option<u128>,
    pub ending_price: Option<u128>,
    pub duration: Option<Duration>,
    pub price_fn: Option<PriceFn>,
}

#[derive(Clone, Copy, Debug)]
pub struct SettleResult {
    pub winner: Option<Address>,
    pub final_price: u128,
    pub participants: usize,
    pub duration: Duration,
}
