use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use relayer_model::{Address, Asset, Event, OrderId};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::{
    error::AuctionError,
    metrics::Metrics,
    rate_source::RateSource,
    types::{Auction, AuctionParams, AuctionStatus, Bid, PriceFn, SettleResult},
};

#[derive(Clone, Copy, Debug)]
pub struct AuctionEngineConfig {
    pub max_concurrent_auctions: usize,
    pub default_duration: Duration,
    /// `reservePrice = startingPrice * reserve_ratio`, expressed as a
    /// percentage in basis points to avoid floating point in the stored
    /// config (e.g. 9_000 = 90%).
    pub reserve_ratio_bps: u32,
    pub min_bid_increment: u128,
    pub bid_timeout_window: Duration,
    pub reprice_tick_interval: Duration,
    pub cleanup_tick_interval: Duration,
    pub cleanup_retention: Duration,
    pub event_channel_capacity: usize,
}

impl Default for AuctionEngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_auctions: 256,
            default_duration: Duration::from_secs(180),
            reserve_ratio_bps: 9_000,
            min_bid_increment: 1,
            bid_timeout_window: Duration::from_secs(15),
            reprice_tick_interval: Duration::from_secs(10),
            cleanup_tick_interval: Duration::from_secs(60),
            cleanup_retention: Duration::from_secs(3600),
            event_channel_capacity: 1024,
        }
    }
}

struct State {
    auctions: HashMap<OrderId, Auction>,
}

/// Runs one independent Dutch auction per order: linear or exponential
/// price decay from `startingPrice` to `endingPrice`, clamped at
/// `reservePrice`, with bids accepted while active (or briefly past
/// `endTime` inside `bidTimeoutWindow`).
pub struct AuctionEngine {
    rate_source: Arc<dyn RateSource>,
    config: AuctionEngineConfig,
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
}

impl AuctionEngine {
    pub fn new(rate_source: Arc<dyn RateSource>, config: AuctionEngineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            rate_source,
            config,
            state: Mutex::new(State {
                auctions: HashMap::new(),
            }),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }

    pub async fn start(
        &self,
        order_id: OrderId,
        maker_asset: &Asset,
        taker_asset: &Asset,
        params: Option<AuctionParams>,
    ) -> Result<Auction, AuctionError> {
        let mut state = self.state.lock().await;
        if state.auctions.contains_key(&order_id) {
            return Err(AuctionError::Duplicate(order_id));
        }
        let active_count = state
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active)
            .count();
        if active_count >= self.config.max_concurrent_auctions {
            return Err(AuctionError::Capacity(self.config.max_concurrent_auctions));
        }

        let params = params.unwrap_or_default();
        let expected_rate = self
            .rate_source
            .expected_rate(maker_asset, taker_asset)
            .await?;

        let starting_price = params
            .starting_price
            .unwrap_or_else(|| scale(expected_rate, 11_000));
        let ending_price = params
            .ending_price
            .unwrap_or_else(|| scale(expected_rate, 10_100));
        let duration = params.duration.unwrap_or(self.config.default_duration);
        let price_fn = params.price_fn.unwrap_or(PriceFn::Linear);
        let reserve_price = scale(starting_price, self.config.reserve_ratio_bps);

        let start_time = Utc::now();
        let end_time = start_time
            + chrono::Duration::from_std(duration).map_err(|e| AuctionError::RateSource(e.to_string()))?;

        let auction = Auction {
            order_id,
            starting_price,
            ending_price,
            reserve_price,
            duration,
            price_fn,
            start_time,
            end_time,
            current_price: starting_price,
            bids: Vec::new(),
            best_bid: None,
            status: AuctionStatus::Active,
            ended_at: None,
            seen_requests: HashMap::new(),
        };
        state.auctions.insert(order_id, auction.clone());
        let active_count = state
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active)
            .count();
        drop(state);

        Metrics::get().set_active(active_count as i64);
        self.emit(Event::AuctionStarted {
            order_id,
            timestamp: Utc::now(),
        });
        Ok(auction)
    }

    pub async fn current_price(&self, order_id: OrderId) -> Result<u128, AuctionError> {
        let state = self.state.lock().await;
        let auction = state
            .auctions
            .get(&order_id)
            .ok_or(AuctionError::NotFound(order_id))?;
        Ok(compute_price(auction, Utc::now()))
    }

    pub async fn place_bid(
        &self,
        order_id: OrderId,
        resolver: Address,
        price: u128,
        expires_at: Option<chrono::DateTime<Utc>>,
        request_id: Option<String>,
    ) -> Result<Bid, AuctionError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let auction = state
            .auctions
            .get_mut(&order_id)
            .ok_or(AuctionError::NotFound(order_id))?;

        if let Some(request_id) = request_id.as_deref() {
            if let Some(&existing) = auction.seen_requests.get(request_id) {
                return Ok(auction.bids[existing].clone());
            }
        }
        let duplicate_window = chrono::Duration::seconds(1);
        if auction
            .bids
            .iter()
            .any(|b| b.resolver == resolver && b.price == price && (now - b.timestamp).abs() < duplicate_window)
        {
            return Err(AuctionError::BidRejected {
                order_id,
                reason: "duplicate bid: same resolver and price within one second".into(),
            });
        }

        let timeout_window = chrono::Duration::from_std(self.config.bid_timeout_window)
            .unwrap_or(chrono::Duration::zero());
        let within_timeout_window =
            auction.status == AuctionStatus::Ended && now <= auction.end_time + timeout_window;
        if auction.status != AuctionStatus::Active && !within_timeout_window {
            return Err(AuctionError::BidRejected {
                order_id,
                reason: format!("auction is not accepting bids (status {:?})", auction.status),
            });
        }

        let current = compute_price(auction, now);
        if price < auction.reserve_price {
            return Err(AuctionError::BidRejected {
                order_id,
                reason: "price below reserve price".into(),
            });
        }
        if price < current {
            return Err(AuctionError::BidRejected {
                order_id,
                reason: "price below current price".into(),
            });
        }
        if let Some(best) = auction.best_bid() {
            if price < best.price + self.config.min_bid_increment {
                return Err(AuctionError::BidRejected {
                    order_id,
                    reason: "price below best bid plus minimum increment".into(),
                });
            }
        }

        let bid = Bid {
            resolver: resolver.clone(),
            price,
            timestamp: now,
            expires_at,
            request_id: request_id.clone(),
        };
        auction.bids.push(bid.clone());
        let new_index = auction.bids.len() - 1;
        if let Some(request_id) = request_id {
            auction.seen_requests.insert(request_id, new_index);
        }
        auction.best_bid = Some(match auction.best_bid {
            None => new_index,
            Some(current_best) => {
                if is_better_bid(&auction.bids[new_index], new_index, &auction.bids[current_best], current_best) {
                    new_index
                } else {
                    current_best
                }
            }
        });
        let settle_immediately = within_timeout_window;
        drop(state);

        self.emit(Event::BidPlaced {
            order_id,
            resolver,
            price,
            timestamp: now,
        });

        if settle_immediately {
            self.settle(order_id).await?;
        }
        Ok(bid)
    }

    pub async fn settle(&self, order_id: OrderId) -> Result<SettleResult, AuctionError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let auction = state
            .auctions
            .get_mut(&order_id)
            .ok_or(AuctionError::NotFound(order_id))?;
        if auction.status == AuctionStatus::Settled {
            return Err(AuctionError::WrongStatus {
                order_id,
                status: "settled",
                expected: "active or ended",
            });
        }
        if auction.status == AuctionStatus::Cancelled {
            return Err(AuctionError::WrongStatus {
                order_id,
                status: "cancelled",
                expected: "active or ended",
            });
        }

        let eligible: Vec<usize> = auction
            .bids
            .iter()
            .enumerate()
            .filter(|(_, b)| b.expires_at.is_none_or(|e| e >= now))
            .map(|(i, _)| i)
            .collect();

        let winner_index = eligible.into_iter().reduce(|best, candidate| {
            if is_better_bid(&auction.bids[candidate], candidate, &auction.bids[best], best) {
                candidate
            } else {
                best
            }
        });

        let final_price = winner_index
            .map(|i| auction.bids[i].price)
            .unwrap_or_else(|| compute_price(auction, now));
        let winner = winner_index.map(|i| auction.bids[i].resolver.clone());
        let participants = auction.bids.len();
        let duration = (now - auction.start_time)
            .to_std()
            .unwrap_or(Duration::ZERO);

        auction.status = AuctionStatus::Settled;
        auction.ended_at = Some(now);
        let active_count = state
            .auctions
            .values()
            .filter(|a| a.status == AuctionStatus::Active)
            .count();
        drop(state);

        Metrics::get().set_active(active_count as i64);
        Metrics::get().record_settlement(winner.as_ref(), duration);
        self.emit(Event::AuctionSettled {
            order_id,
            winner: winner.clone(),
            final_price,
            timestamp: now,
        });

        Ok(SettleResult {
            winner,
            final_price,
            participants,
            duration,
        })
    }

    pub async fn cancel(&self, order_id: OrderId, reason: impl Into<String>) -> Result<(), AuctionError> {
        let mut state = self.state.lock().await;
        let auction = state
            .auctions
            .get_mut(&order_id)
            .ok_or(AuctionError::NotFound(order_id))?;
        if auction.status == AuctionStatus::Settled {
            return Err(AuctionError::WrongStatus {
                order_id,
                status: "settled",
                expected: "not yet settled",
            });
        }
        auction.status = AuctionStatus::Cancelled;
        auction.ended_at = Some(Utc::now());
        let _ = reason.into();
        Ok(())
    }

    /// The 10s repricing ticker: recomputes `current_price` for every
    /// active auction and flips it to `ended` once `end_time` has passed.
    pub async fn tick_reprice(&self) {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        for auction in state.auctions.values_mut() {
            if auction.status != AuctionStatus::Active {
                continue;
            }
            auction.current_price = compute_price(auction, now);
            if now >= auction.end_time {
                auction.status = AuctionStatus::Ended;
            }
        }
    }

    /// The 60s cleanup tick: drops settled/cancelled auctions older than
    /// the configured retention (default 1h).
    pub async fn tick_cleanup(&self) {
        let now = Utc::now();
        let retention = chrono::Duration::from_std(self.config.cleanup_retention).unwrap_or_default();
        let mut state = self.state.lock().await;
        state.auctions.retain(|_, auction| {
            !matches!(auction.status, AuctionStatus::Settled | AuctionStatus::Cancelled)
                || auction.ended_at.is_none_or(|ended| now - ended < retention)
        });
    }

    pub async fn get(&self, order_id: OrderId) -> Option<Auction> {
        self.state.lock().await.auctions.get(&order_id).cloned()
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let reprice_self = self.clone();
        let reprice_cancel = cancel.clone();
        let reprice_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(reprice_self.config.reprice_tick_interval);
            loop {
                tokio::select! {
                    _ = reprice_cancel.cancelled() => break,
                    _ = ticker.tick() => reprice_self.tick_reprice().await,
                }
            }
        });

        let cleanup_self = self.clone();
        let cleanup_cancel = cancel.clone();
        let cleanup_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cleanup_self.config.cleanup_tick_interval);
            loop {
                tokio::select! {
                    _ = cleanup_cancel.cancelled() => break,
                    _ = ticker.tick() => cleanup_self.tick_cleanup().await,
                }
            }
        });

        let _ = tokio::join!(reprice_task, cleanup_task);
    }
}

fn scale(value: u128, bps: u32) -> u128 {
    value.saturating_mul(bps as u128) / 10_000
}

/// Implements the tie-break rule: higher price wins; on a price tie, the
/// earlier timestamp wins; on a further tie, the earlier list position
/// wins.
fn is_better_bid(candidate: &Bid, candidate_index: usize, current: &Bid, current_index: usize) -> bool {
    match candidate.price.cmp(&current.price) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => match candidate.timestamp.cmp(&current.timestamp) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => candidate_index < current_index,
        },
    }
}

/// Pure function of elapsed time since `start_time`, applying the
/// auction's linear or exponential decay formula, clamped at
/// `reserve_price`.
pub fn compute_price(auction: &Auction, now: chrono::DateTime<Utc>) -> u128 {
    let elapsed = (now - auction.start_time).to_std().unwrap_or(Duration::ZERO);
    let t = elapsed.min(auction.duration).as_secs_f64();
    let total = auction.duration.as_secs_f64().max(f64::EPSILON);
    let start = auction.starting_price as f64;
    let end = auction.ending_price as f64;

    let raw = match auction.price_fn {
        PriceFn::Linear => start - (start - end) * (t / total),
        PriceFn::Exponential => {
            const K: f64 = 3.0;
            end + (start - end) * (-K * t / total).exp()
        }
    };

    let price = raw.round().max(0.0) as u128;
    price.max(auction.reserve_price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_auction(price_fn: PriceFn) -> Auction {
        Auction {
            order_id: fixture_order_id(),
            starting_price: 1_100,
            ending_price: 1_010,
            reserve_price: 1_000,
            duration: Duration::from_secs(100),
            price_fn,
            start_time: Utc::now(),
            end_time: Utc::now() + chrono::Duration::seconds(100),
            current_price: 1_100,
            bids: Vec::new(),
            best_bid: None,
            status: AuctionStatus::Active,
            ended_at: None,
            seen_requests: HashMap::new(),
        }
    }

    fn fixture_order_id() -> OrderId {
        OrderId::new([1u8; 32])
    }

    #[test]
    fn linear_price_decays_from_start_to_end() {
        let auction = fixture_auction(PriceFn::Linear);
        let at_start = compute_price(&auction, auction.start_time);
        let at_half = compute_price(&auction, auction.start_time + chrono::Duration::seconds(50));
        let at_end = compute_price(&auction, auction.start_time + chrono::Duration::seconds(100));
        assert_eq!(at_start, 1_100);
        assert_eq!(at_end, 1_010);
        assert!(at_half < at_start && at_half > at_end);
    }

    #[test]
    fn price_never_drops_below_reserve() {
        let auction = fixture_auction(PriceFn::Linear);
        let far_past_end = compute_price(&auction, auction.start_time + chrono::Duration::seconds(10_000));
        assert_eq!(far_past_end, auction.reserve_price);
    }

    #[test]
    fn exponential_decay_is_monotonic() {
        let auction = fixture_auction(PriceFn::Exponential);
        let p0 = compute_price(&auction, auction.start_time);
        let p1 = compute_price(&auction, auction.start_time + chrono::Duration::seconds(30));
        let p2 = compute_price(&auction, auction.start_time + chrono::Duration::seconds(70));
        assert!(p0 >= p1 && p1 >= p2);
    }

    #[test]
    fn tie_break_prefers_earlier_timestamp_then_earlier_position() {
        let now = Utc::now();
        let a = Bid {
            resolver: Address::new("resolver-a"),
            price: 100,
            timestamp: now,
            expires_at: None,
            request_id: None,
        };
        let b = Bid {
            resolver: Address::new("resolver-b"),
            price: 100,
            timestamp: now + chrono::Duration::seconds(1),
            expires_at: None,
            request_id: None,
        };
        assert!(!is_better_bid(&b, 1, &a, 0));
        assert!(is_better_bid(&a, 0, &b, 1));
    }
}
