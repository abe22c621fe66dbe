pub mod error;
pub mod manager;
pub mod store;

pub use error::OrderError;
pub use manager::{OrderManager, OrderManagerConfig};
pub use store::{NullStateStore, StateStore};

#[cfg(feature = "persistence")]
pub use store::PostgresStateStore;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use relayer_auction::{AuctionEngine, AuctionEngineConfig, FixedRateSource};
    use relayer_model::{Address, Asset, Chain, Event, Hash32, OrderId, SwapOrder, SwapStatus, UtxoNetwork};
    use relayer_secrets::{SecretCipher, SecretCoordinator, SecretCoordinatorConfig};

    use super::*;

    fn order_id(byte: u8) -> OrderId {
        OrderId::new([byte; 32])
    }

    fn manager() -> OrderManager {
        let auctions = Arc::new(AuctionEngine::new(Arc::new(FixedRateSource), AuctionEngineConfig::default()));
        let cipher = SecretCipher::new([7u8; 32]);
        let secrets = Arc::new(SecretCoordinator::new(cipher, SecretCoordinatorConfig::default(), None));
        OrderManager::new(OrderManagerConfig::default(), auctions, secrets)
    }

    fn fixture_order(byte: u8) -> SwapOrder {
        let now = Utc::now();
        SwapOrder {
            order_id: order_id(byte),
            maker: Address::new("maker-1"),
            maker_asset: Asset {
                chain: Chain::Evm { chain_id: 1 },
                token: None,
                amount: 1_000,
            },
            taker_asset: Asset {
                chain: Chain::Utxo { network: UtxoNetwork::Mainnet },
                token: None,
                amount: 1_000,
            },
            secret_hash: Hash32::new([byte; 32]),
            timelock: now + chrono::Duration::hours(2),
            expires_at: now + chrono::Duration::hours(1),
            signature: vec![1, 2, 3],
            allow_partial_fill: false,
        }
    }

    #[tokio::test]
    async fn create_order_rejects_same_chain_legs() {
        let manager = manager();
        let mut order = fixture_order(1);
        order.taker_asset.chain = order.maker_asset.chain;
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid { .. }));
    }

    #[tokio::test]
    async fn create_order_rejects_expiry_after_timelock() {
        let manager = manager();
        let mut order = fixture_order(1);
        order.expires_at = order.timelock + chrono::Duration::minutes(1);
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid { .. }));
    }

    #[tokio::test]
    async fn create_order_twice_is_rejected() {
        let manager = manager();
        let order = fixture_order(1);
        manager.create_order(order.clone()).await.unwrap();
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Duplicate(_)));
    }

    #[tokio::test]
    async fn happy_path_walks_through_every_milestone_to_completed() {
        let manager = manager();
        let order = fixture_order(1);
        let id = order.order_id;
        let src_chain = order.maker_asset.chain;
        let dst_chain = order.taker_asset.chain;
        manager.create_order(order).await.unwrap();
        manager.start_auction(id, None).await.unwrap();

        manager
            .on_auction_settled(id, Some(Address::new("resolver-a")))
            .await
            .unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::ResolverChosen);

        manager
            .on_escrow_created(id, src_chain, Address::new("src-escrow"), Hash32::new([9; 32]), 10)
            .await
            .unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::SrcPending);

        manager.on_tx_confirmed(id, src_chain, Hash32::new([9; 32])).await.unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::SrcFunded);

        manager
            .on_escrow_created(id, dst_chain, Address::new("dst-escrow"), Hash32::new([10; 32]), 11)
            .await
            .unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::DstPending);

        manager.on_tx_confirmed(id, dst_chain, Hash32::new([10; 32])).await.unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::DstFunded);

        manager.on_secret_ready(id).await.unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::SecretReady);

        manager.on_secret_revealed(id).await.unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::SecretRevealed);

        manager
            .on_funds_redeemed(id, dst_chain, Hash32::new([11; 32]), 12)
            .await
            .unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::DstRedeemed);

        manager
            .on_funds_redeemed(id, src_chain, Hash32::new([12; 32]), 13)
            .await
            .unwrap();
        let final_state = manager.get(id).await.unwrap();
        assert_eq!(final_state.status, SwapStatus::Completed);
        assert!(final_state.is_terminal());
    }

    #[tokio::test]
    async fn auction_with_no_bids_fails_the_order() {
        let manager = manager();
        let order = fixture_order(1);
        let id = order.order_id;
        manager.create_order(order).await.unwrap();
        manager.start_auction(id, None).await.unwrap();
        manager.on_auction_settled(id, None).await.unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::Failed);
    }

    #[tokio::test]
    async fn reorg_on_source_chain_rewinds_funded_order_to_resolver_chosen() {
        let manager = manager();
        let order = fixture_order(1);
        let id = order.order_id;
        let src_chain = order.maker_asset.chain;
        manager.create_order(order).await.unwrap();
        manager.start_auction(id, None).await.unwrap();
        manager.on_auction_settled(id, Some(Address::new("resolver-a"))).await.unwrap();
        manager
            .on_escrow_created(id, src_chain, Address::new("src-escrow"), Hash32::new([9; 32]), 10)
            .await
            .unwrap();
        manager.on_tx_confirmed(id, src_chain, Hash32::new([9; 32])).await.unwrap();
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::SrcFunded);

        manager.on_reorg(src_chain).await;
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::ResolverChosen);
    }

    #[tokio::test]
    async fn sweep_expirations_is_a_no_op_before_expiry() {
        let manager = manager();
        let order = fixture_order(1);
        let id = order.order_id;
        manager.create_order(order).await.unwrap();
        manager.sweep_expirations().await;
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::Created);
    }

    #[tokio::test]
    async fn desync_marks_order_failed_and_emits_event() {
        let manager = manager();
        let order = fixture_order(1);
        let id = order.order_id;
        let mut events = manager.subscribe();
        manager.create_order(order).await.unwrap();
        manager.on_desync(id, "receipt block hash mismatch").await;
        assert_eq!(manager.get(id).await.unwrap().status, SwapStatus::Failed);

        let mut saw_desync = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::DesyncError { order_id, .. } if order_id == id) {
                saw_desync = true;
            }
        }
        assert!(saw_desync);
    }

    #[tokio::test]
    async fn list_by_maker_and_status_reflect_current_state() {
        let manager = manager();
        let order = fixture_order(1);
        let maker = order.maker.clone();
        manager.create_order(order).await.unwrap();

        let by_maker = manager.list_by_maker(&maker).await;
        assert_eq!(by_maker.len(), 1);
        let by_status = manager.list_by_status(SwapStatus::Created).await;
        assert_eq!(by_status.len(), 1);
        assert!(manager.list_by_status(SwapStatus::Completed).await.is_empty());
    }
}
