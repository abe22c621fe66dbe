pub mod engine;
pub mod error;
pub mod metrics;
pub mod rate_source;
pub mod types;

pub use engine::{AuctionEngine, AuctionEngineConfig};
pub use error::AuctionError;
pub use rate_source::{FixedRateSource, RateSource};
pub use types::{Auction, AuctionParams, AuctionStatus, Bid, PriceFn, SettleResult};

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use relayer_model::{Address, Asset, Chain, Event, OrderId};

    use super::*;

    fn order_id(byte: u8) -> OrderId {
        OrderId::new([byte; 32])
    }

    fn evm_asset(amount: u128) -> Asset {
        Asset {
            chain: Chain::Evm { chain_id: 1 },
            token: None,
            amount,
        }
    }

    fn engine_with_fast_reprice() -> AuctionEngine {
        let config = AuctionEngineConfig {
            max_concurrent_auctions: 2,
            default_duration: Duration::from_millis(100),
            bid_timeout_window: Duration::from_millis(50),
            ..AuctionEngineConfig::default()
        };
        AuctionEngine::new(Arc::new(FixedRateSource), config)
    }

    #[tokio::test]
    async fn starting_an_auction_twice_is_rejected() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        engine
            .start(id, &evm_asset(100), &evm_asset(100), None)
            .await
            .unwrap();
        let err = engine
            .start(id, &evm_asset(100), &evm_asset(100), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Duplicate(_)));
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let engine = engine_with_fast_reprice();
        engine
            .start(order_id(1), &evm_asset(100), &evm_asset(100), None)
            .await
            .unwrap();
        engine
            .start(order_id(2), &evm_asset(100), &evm_asset(100), None)
            .await
            .unwrap();
        let err = engine
            .start(order_id(3), &evm_asset(100), &evm_asset(100), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::Capacity(2)));
    }

    #[tokio::test]
    async fn bid_below_reserve_price_is_rejected() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        let auction = engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        let err = engine
            .place_bid(id, Address::new("resolver-a"), auction.reserve_price - 1, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::BidRejected { .. }));
    }

    #[tokio::test]
    async fn higher_bid_replaces_lower_best_bid() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        let auction = engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        let price = auction.starting_price;
        engine
            .place_bid(id, Address::new("resolver-a"), price, None, None)
            .await
            .unwrap();
        engine
            .place_bid(id, Address::new("resolver-b"), price + 5, None, None)
            .await
            .unwrap();
        let current = engine.get(id).await.unwrap();
        assert_eq!(current.best_bid().unwrap().resolver, Address::new("resolver-b"));
    }

    #[tokio::test]
    async fn exact_duplicate_bid_within_a_second_is_rejected() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        let auction = engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        let price = auction.starting_price;
        engine
            .place_bid(id, Address::new("resolver-a"), price, None, None)
            .await
            .unwrap();
        let err = engine
            .place_bid(id, Address::new("resolver-a"), price, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::BidRejected { .. }));
    }

    #[tokio::test]
    async fn retrying_with_the_same_request_id_is_idempotent() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        let auction = engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        let price = auction.starting_price;
        let first = engine
            .place_bid(id, Address::new("resolver-a"), price, None, Some("req-1".into()))
            .await
            .unwrap();
        let retried = engine
            .place_bid(id, Address::new("resolver-a"), price, None, Some("req-1".into()))
            .await
            .unwrap();
        assert_eq!(first, retried);
        assert_eq!(engine.get(id).await.unwrap().bids.len(), 1);
    }

    #[tokio::test]
    async fn settle_with_no_bids_returns_none_winner() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        let result = engine.settle(id).await.unwrap();
        assert!(result.winner.is_none());
    }

    #[tokio::test]
    async fn cancel_after_settle_is_rejected() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        engine.settle(id).await.unwrap();
        let err = engine.cancel(id, "too late").await.unwrap_err();
        assert!(matches!(err, AuctionError::WrongStatus { .. }));
    }

    #[tokio::test]
    async fn settling_emits_auction_settled_event() {
        let engine = engine_with_fast_reprice();
        let id = order_id(1);
        let mut events = engine.subscribe();
        engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        engine.settle(id).await.unwrap();

        let mut saw_settled = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::AuctionSettled { order_id, .. } if order_id == id) {
                saw_settled = true;
            }
        }
        assert!(saw_settled);
    }

    #[tokio::test]
    async fn cleanup_tick_drops_old_settled_auctions() {
        let engine = AuctionEngine::new(
            Arc::new(FixedRateSource),
            AuctionEngineConfig {
                cleanup_retention: Duration::from_millis(0),
                ..AuctionEngineConfig::default()
            },
        );
        let id = order_id(1);
        engine
            .start(id, &evm_asset(1_000), &evm_asset(1_000), None)
            .await
            .unwrap();
        engine.settle(id).await.unwrap();
        engine.tick_cleanup().await;
        assert!(engine.get(id).await.is_none());
    }
}
