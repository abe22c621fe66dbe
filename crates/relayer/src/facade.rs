//! The Relayer Facade: the single entry point that owns the event monitor,
//! auction engine, secret coordinator and order manager, and the glue that
//! keeps them in sync. No individual collaborator crate reacts to another's
//! events - wiring that together is this module's whole job.

use std::sync::Arc;

use relayer_auction::{AuctionEngine, AuctionError, Bid};
use relayer_chain::{EvmClient, UtxoClient};
use relayer_model::{
    Address, Chain, ChainKind, Event, OrderId, RelayerError, SwapOrder, SwapState, SwapStatus, TxHash,
};
use relayer_monitor::{EventMonitor, MonitoredTx, MonitorConfig, TrackedEventKind};
use relayer_orders::{NullStateStore, OrderError, OrderManager, OrderManagerConfig, StateStore};
use relayer_secrets::{MerkleSecretTree, PartialFillInfo, SecretCipher, SecretCoordinator, SecretCoordinatorConfig};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

/// Wires the monitor, auction engine, secret coordinator and order manager
/// together and exposes the single public surface a caller (CLI, RPC
/// server, test harness) needs to drive an atomic swap from submission to
/// completion.
pub struct RelayerFacade {
    monitor: Arc<EventMonitor>,
    auctions: Arc<AuctionEngine>,
    secrets: Arc<SecretCoordinator>,
    orders: Arc<OrderManager>,
    events: broadcast::Sender<Event>,
    evm_confirmations: u32,
    utxo_confirmations: u32,
}

impl RelayerFacade {
    pub fn new(
        evm: Arc<dyn EvmClient>,
        utxo: Arc<dyn UtxoClient>,
        monitor_config: MonitorConfig,
        secret_cipher: SecretCipher,
        secret_config: SecretCoordinatorConfig,
        auction_config: relayer_auction::AuctionEngineConfig,
        order_config: OrderManagerConfig,
        event_channel_capacity: usize,
    ) -> Arc<Self> {
        Self::with_order_store(
            evm,
            utxo,
            monitor_config,
            secret_cipher,
            secret_config,
            auction_config,
            order_config,
            event_channel_capacity,
            Arc::new(NullStateStore),
        )
    }

    /// Same as [`Self::new`] but with an explicit [`StateStore`] for the
    /// Order Manager - e.g. a `relayer_orders::PostgresStateStore` built by
    /// the caller from a `db_url`, when the `persistence` feature is
    /// enabled. Call `order_store.load_all` indirectly via
    /// [`OrderManager::restore`] before [`Self::run`] to recover in-flight
    /// swaps across a restart.
    #[allow(clippy::too_many_arguments)]
    pub fn with_order_store(
        evm: Arc<dyn EvmClient>,
        utxo: Arc<dyn UtxoClient>,
        monitor_config: MonitorConfig,
        secret_cipher: SecretCipher,
        secret_config: SecretCoordinatorConfig,
        auction_config: relayer_auction::AuctionEngineConfig,
        order_config: OrderManagerConfig,
        event_channel_capacity: usize,
        order_store: Arc<dyn StateStore>,
    ) -> Arc<Self> {
        let evm_confirmations = monitor_config.evm_required_confirmations;
        let utxo_confirmations = monitor_config.utxo_required_confirmations;

        let monitor = Arc::new(EventMonitor::new(evm, utxo, monitor_config));
        let auctions = Arc::new(AuctionEngine::new(
            Arc::new(relayer_auction::FixedRateSource),
            auction_config,
        ));
        let secrets = Arc::new(SecretCoordinator::new(secret_cipher, secret_config, None));
        let orders = Arc::new(OrderManager::with_store(
            order_config,
            auctions.clone(),
            secrets.clone(),
            order_store,
        ));
        let (events, _) = broadcast::channel(event_channel_capacity);

        Arc::new(Self {
            monitor,
            auctions,
            secrets,
            orders,
            events,
            evm_confirmations,
            utxo_confirmations,
        })
    }

    /// Rebuilds the Order Manager's indexes from its configured
    /// [`StateStore`]. No-op (returns 0) when no store was supplied. Call
    /// before [`Self::run`].
    pub async fn restore(&self) -> Result<usize, RelayerError> {
        Ok(self.orders.restore().await?)
    }

    /// Subscribes to the unified event stream: every event published by any
    /// collaborator, forwarded verbatim, in addition to the facade's own
    /// reactions to them.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Admits a new swap order without starting its auction. Call
    /// [`Self::start_auction`] to move it on.
    pub async fn create_order(&self, order: SwapOrder) -> Result<SwapState, RelayerError> {
        Ok(self.orders.create_order(order).await?)
    }

    /// Starts the Dutch auction for an admitted order, optionally
    /// overriding the engine's defaults for this auction only.
    pub async fn start_auction(
        &self,
        order_id: OrderId,
        params: Option<relayer_auction::AuctionParams>,
    ) -> Result<(), RelayerError> {
        Ok(self.orders.start_auction(order_id, params).await?)
    }

    /// Submits a new swap order and immediately starts its Dutch auction
    /// with the engine's defaults. A convenience wrapper over
    /// [`Self::create_order`] + [`Self::start_auction`] for callers with no
    /// need to override auction parameters.
    pub async fn submit_order(&self, order: SwapOrder) -> Result<SwapState, RelayerError> {
        let order_id = order.order_id;
        let state = self.create_order(order).await?;
        self.start_auction(order_id, None).await?;
        Ok(state)
    }

    pub async fn get_order(&self, order_id: OrderId) -> Option<SwapState> {
        self.orders.get(order_id).await
    }

    pub async fn list_orders_by_maker(&self, maker: &Address) -> Vec<SwapState> {
        self.orders.list_by_maker(maker).await
    }

    pub async fn list_orders_by_resolver(&self, resolver: &Address) -> Vec<SwapState> {
        self.orders.list_by_resolver(resolver).await
    }

    pub async fn list_orders_by_status(&self, status: SwapStatus) -> Vec<SwapState> {
        self.orders.list_by_status(status).await
    }

    pub async fn place_bid(
        &self,
        order_id: OrderId,
        resolver: Address,
        price: u128,
        expires_at: Option<chrono::DateTime<chrono::Utc>>,
        request_id: Option<String>,
    ) -> Result<Bid, AuctionError> {
        self.auctions
            .place_bid(order_id, resolver, price, expires_at, request_id)
            .await
    }

    pub async fn current_auction_price(&self, order_id: OrderId) -> Result<u128, AuctionError> {
        self.auctions.current_price(order_id).await
    }

    /// Settles an auction, picking its best bid as the winning resolver.
    /// The resulting `Event::AuctionSettled` is what the bridge reacts to to
    /// advance the order to `ResolverChosen` (or `Failed`, if there was no
    /// bid) - this method only decides the winner, it does not itself touch
    /// order state.
    pub async fn settle_auction(&self, order_id: OrderId) -> Result<relayer_auction::SettleResult, AuctionError> {
        self.auctions.settle(order_id).await
    }

    pub async fn cancel_auction(&self, order_id: OrderId, reason: impl Into<String>) -> Result<(), AuctionError> {
        self.auctions.cancel(order_id, reason).await
    }

    /// Registers a transaction hash for the monitor to track towards
    /// confirmation.
    ///
    /// EVM escrow creation is discovered automatically from decoded logs, so
    /// `escrow_addr` only matters for a UTXO `EscrowFunding` registration -
    /// the UTXO chain has no log-decoding path, so the caller (the party
    /// that constructed and broadcast the funding transaction) must supply
    /// the escrow address itself. In that case the order is advanced to its
    /// escrow-pending state immediately, with `block_height` recorded as 0
    /// until `on_tx_confirmed` bumps the tracked confirmation count; the
    /// recorded `TxRef.block_height` is not retroactively corrected once the
    /// UTXO transaction actually confirms.
    pub async fn register_tx(
        &self,
        tx_hash: TxHash,
        chain: Chain,
        order_id: Option<OrderId>,
        kind: TrackedEventKind,
        escrow_addr: Option<Address>,
    ) -> Result<(), RelayerError> {
        let required_confirmations = match chain.kind() {
            ChainKind::Evm => self.evm_confirmations,
            ChainKind::Utxo => self.utxo_confirmations,
        };
        let tx = MonitoredTx::new(tx_hash, chain, order_id, kind, required_confirmations);
        self.monitor.register(tx).await?;

        if chain.kind() == ChainKind::Utxo && kind == TrackedEventKind::EscrowFunding {
            if let (Some(order_id), Some(escrow_addr)) = (order_id, escrow_addr) {
                self.orders
                    .on_escrow_created(order_id, chain, escrow_addr, tx_hash, 0)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn tx_status(&self, tx_hash: TxHash) -> Option<MonitoredTx> {
        self.monitor.status_of(tx_hash).await
    }

    pub async fn store_secret(
        &self,
        order_id: OrderId,
        secret: &[u8],
        index: u32,
        partial_fill_index: Option<u32>,
    ) -> Result<(), relayer_secrets::SecretError> {
        self.secrets.store(order_id, secret, index, partial_fill_index).await
    }

    pub async fn setup_partial_fill(
        &self,
        order_id: OrderId,
        max_fills: u32,
    ) -> Result<MerkleSecretTree, relayer_secrets::SecretError> {
        self.secrets.setup_partial_fill(order_id, max_fills).await
    }

    /// Schedules a stored secret to leak once the dual condition (its
    /// destination leg funded, and `delay` elapsed since scheduling) is
    /// met. `index` 0 is scheduled automatically as the destination leg
    /// confirms; a partial-fill order's remaining indices must be
    /// scheduled explicitly through this call.
    pub async fn schedule_reveal(
        &self,
        order_id: OrderId,
        index: u32,
        delay: Option<std::time::Duration>,
    ) -> Result<(), relayer_secrets::SecretError> {
        self.secrets.schedule_reveal(order_id, index, delay).await
    }

    pub async fn coordinate_partial_reveal(
        &self,
        order_id: OrderId,
        fill_index: u32,
        fill_amount: u128,
    ) -> Result<PartialFillInfo, relayer_secrets::SecretError> {
        self.secrets.coordinate_partial_reveal(order_id, fill_index, fill_amount).await
    }

    /// Reveals a stored secret. This only unlocks the plaintext; the order's
    /// state machine advances once the bridge observes the resulting
    /// `Event::SecretRevealed` and calls `OrderManager::on_secret_revealed`.
    pub async fn reveal_secret(
        &self,
        order_id: OrderId,
        index: u32,
    ) -> Result<Zeroizing<Vec<u8>>, relayer_secrets::SecretError> {
        self.secrets.reveal(order_id, index).await
    }

    /// Runs every collaborator's background loop plus the bridge that keeps
    /// them in sync, until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tokio::join!(
            self.monitor.clone().run(cancel.clone()),
            self.auctions.clone().run(cancel.clone()),
            self.secrets.clone().run(cancel.clone()),
            self.orders.clone().run(cancel.clone()),
            self.clone().run_bridge(cancel.clone()),
        );
    }

    /// Forwards every event published by any collaborator onto the
    /// facade's own unified stream, and reacts to the ones that require the
    /// order manager to advance a swap's state machine. No collaborator
    /// crate knows about any other; this loop is the only place that does.
    async fn run_bridge(self: Arc<Self>, cancel: CancellationToken) {
        let mut monitor_sub = self.monitor.subscribe();
        let mut auction_sub = self.auctions.subscribe();
        let mut secret_sub = self.secrets.subscribe();
        let mut order_sub = self.orders.subscribe();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = monitor_sub.recv() => {
                    match event {
                        Some(event) => self.handle_event(EventSource::Monitor, event).await,
                        None => break,
                    }
                }
                event = recv_broadcast(&mut auction_sub) => {
                    match event {
                        Some(event) => self.handle_event(EventSource::Auction, event).await,
                        None => break,
                    }
                }
                event = recv_broadcast(&mut secret_sub) => {
                    match event {
                        Some(event) => self.handle_event(EventSource::Secret, event).await,
                        None => break,
                    }
                }
                event = recv_broadcast(&mut order_sub) => {
                    match event {
                        Some(event) => self.handle_event(EventSource::Order, event).await,
                        None => break,
                    }
                }
            }
        }
    }

    /// `source` distinguishes the raw on-chain signal from the order
    /// manager's own derived notification for the two variants both sides
    /// emit (`FundsRedeemed`, `SwapRefunded`) - without it, reacting to the
    /// manager's own confirmation would call back into the manager and loop
    /// forever.
    async fn handle_event(&self, source: EventSource, event: Event) {
        let _ = self.events.send(event.clone());

        match event {
            Event::EscrowCreated {
                order_id,
                chain,
                escrow_addr,
                tx_hash,
                block_height,
                ..
            } => {
                let result = self.orders.on_escrow_created(order_id, chain, escrow_addr, tx_hash, block_height).await;
                self.react(order_id, result).await;

                // EVM escrows are discovered from a decoded log, which says
                // nothing about confirmation depth; start tracking the same
                // tx_hash so a later `TxConfirmed` can advance the order
                // past its pending state. A UTXO registration that reached
                // here through `register_tx` is already tracked - the
                // duplicate is harmless and ignored.
                let required_confirmations = match chain.kind() {
                    ChainKind::Evm => self.evm_confirmations,
                    ChainKind::Utxo => self.utxo_confirmations,
                };
                let tx = MonitoredTx::new(tx_hash, chain, Some(order_id), TrackedEventKind::EscrowFunding, required_confirmations);
                if let Err(err) = self.monitor.register(tx).await {
                    tracing::debug!(%tx_hash, %err, "escrow funding tx already tracked");
                }
            }
            Event::TxConfirmed {
                order_id: Some(order_id),
                chain,
                tx_hash,
                ..
            } => {
                let result = self.orders.on_tx_confirmed(order_id, chain, tx_hash).await;
                self.react(order_id, result).await;
            }
            Event::AuctionSettled { order_id, winner, .. } => {
                let result = self.orders.on_auction_settled(order_id, winner).await;
                self.react(order_id, result).await;
            }
            Event::SecretReady { order_id, .. } => {
                let result = self.orders.on_secret_ready(order_id).await;
                self.react(order_id, result).await;
            }
            Event::SecretRevealed { order_id, .. } => {
                let result = self.orders.on_secret_revealed(order_id).await;
                self.react(order_id, result).await;
            }
            Event::FundsRedeemed {
                order_id,
                chain,
                tx_hash,
                block_height,
                ..
            } if matches!(source, EventSource::Monitor) => {
                let result = self.orders.on_funds_redeemed(order_id, chain, tx_hash, block_height).await;
                self.react(order_id, result).await;
            }
            Event::SwapRefunded {
                order_id, chain, tx_hash, ..
            } if matches!(source, EventSource::Monitor) => {
                let result = self.orders.on_swap_refunded(order_id, chain, tx_hash).await;
                self.react(order_id, result).await;
            }
            Event::Reorg { chain, .. } => {
                self.orders.on_reorg(chain).await;
            }
            _ => {}
        }
    }

    /// Logs a rejected bridged event and, if the order manager reports the
    /// order as desynced, applies that verdict explicitly - the manager's
    /// state-machine methods only report a desync, they never mark the
    /// order `Failed` on their own.
    async fn react(&self, order_id: OrderId, result: Result<(), OrderError>) {
        if let Err(err) = result {
            tracing::warn!(%order_id, %err, "order manager rejected bridged event");
            if let OrderError::Desync { reason, .. } = err {
                self.orders.on_desync(order_id, reason).await;
            }
        }
    }
}

/// Which collaborator an event reached the bridge from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventSource {
    Monitor,
    Auction,
    Secret,
    Order,
}

/// Turns a raw `broadcast::Receiver<Event>` into the same `Option<Event>`
/// shape `monitor::Subscription` exposes, folding a `Lagged` error into a
/// synthesized `Event::SubscriberLagged` instead of losing it.
async fn recv_broadcast(receiver: &mut broadcast::Receiver<Event>) -> Option<Event> {
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                return Some(Event::SubscriberLagged {
                    skipped,
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use relayer_auction::AuctionEngineConfig;
    use relayer_chain::{
        log::{Log, TxReceipt, UtxoTx},
        mock::{MockEvmClient, MockUtxoClient},
        topics,
    };
    use relayer_model::{Asset, Hash32, UtxoNetwork};

    use super::*;

    /// The happy-path scenario from the design's end-to-end property list:
    /// an order walks every milestone to `Completed` driven entirely by
    /// events a resolver and the two chain clients would actually produce,
    /// with the bridge as the only thing that knows how to connect them.
    #[tokio::test]
    async fn happy_path_reaches_completed_through_the_bridge() {
        let evm = Arc::new(MockEvmClient::new());
        let utxo = Arc::new(MockUtxoClient::new());

        let monitor_config = MonitorConfig {
            evm_poll_interval: Duration::from_millis(15),
            utxo_poll_interval: Duration::from_millis(15),
            evm_required_confirmations: 2,
            utxo_required_confirmations: 2,
            ..MonitorConfig::default()
        };
        let secret_config = SecretCoordinatorConfig {
            default_reveal_delay: Duration::from_millis(0),
            reveal_tick_interval: Duration::from_millis(15),
            ..SecretCoordinatorConfig::default()
        };
        let auction_config = AuctionEngineConfig {
            default_duration: Duration::from_secs(30),
            ..AuctionEngineConfig::default()
        };

        let facade = RelayerFacade::new(
            evm.clone(),
            utxo.clone(),
            monitor_config,
            SecretCipher::new([1u8; 32]),
            secret_config,
            auction_config,
            OrderManagerConfig::default(),
            1024,
        );

        let cancel = CancellationToken::new();
        let run_handle = tokio::spawn(facade.clone().run(cancel.clone()));

        let now = chrono::Utc::now();
        let order_id = Hash32::new([0x42; 32]);
        let order = SwapOrder {
            order_id,
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
            secret_hash: Hash32::new([0x01; 32]),
            timelock: now + chrono::Duration::hours(2),
            expires_at: now + chrono::Duration::hours(1),
            signature: vec![1, 2, 3],
            allow_partial_fill: false,
        };
        let src_chain = order.maker_asset.chain;
        let dst_chain = order.taker_asset.chain;

        facade.submit_order(order).await.unwrap();
        facade
            .place_bid(order_id, Address::new("resolver-a"), 5_000, None, None)
            .await
            .unwrap();
        facade.settle_auction(order_id).await.unwrap();

        await_status(&facade, order_id, SwapStatus::ResolverChosen).await;

        // Source (EVM) escrow creation is discovered from a decoded log.
        let src_tx = TxHash::new([0xaa; 32]);
        evm.set_tip(20);
        evm.push_log(Log {
            address: Address::new("0xescrow"),
            topics: vec![topics::escrow_created(), order_id],
            data: escrow_created_data(1_000),
            block_number: 10,
            log_index: 0,
            transaction_hash: src_tx,
        });
        evm.set_receipt(
            src_tx,
            TxReceipt {
                block_height: Some(10),
                block_hash: Some(Hash32::new([0x10; 32])),
                status: true,
            },
        );
        await_status(&facade, order_id, SwapStatus::SrcFunded).await;

        // Destination (UTXO) escrow creation is supplied directly by the
        // caller since there is no log-decoding path on that chain.
        let dst_tx = TxHash::new([0xbb; 32]);
        facade
            .register_tx(
                dst_tx,
                dst_chain,
                Some(order_id),
                TrackedEventKind::EscrowFunding,
                Some(Address::new("dst-escrow")),
            )
            .await
            .unwrap();
        await_status(&facade, order_id, SwapStatus::DstPending).await;

        utxo.set_tip(20);
        utxo.set_tx(
            dst_tx,
            UtxoTx {
                block_height: Some(15),
                confirmations: 6,
            },
        );
        await_status(&facade, order_id, SwapStatus::DstFunded).await;

        // Dual leakage condition satisfied (destination funded, no further
        // delay configured): the reveal ticker fires on its own.
        await_status(&facade, order_id, SwapStatus::SecretRevealed).await;

        let dst_redeem_tx = TxHash::new([0xcc; 32]);
        facade
            .register_tx(dst_redeem_tx, dst_chain, Some(order_id), TrackedEventKind::Redeem, None)
            .await
            .unwrap();
        utxo.set_tx(
            dst_redeem_tx,
            UtxoTx {
                block_height: Some(16),
                confirmations: 6,
            },
        );
        await_status(&facade, order_id, SwapStatus::DstRedeemed).await;

        let src_redeem_tx = TxHash::new([0xdd; 32]);
        facade
            .register_tx(src_redeem_tx, src_chain, Some(order_id), TrackedEventKind::Redeem, None)
            .await
            .unwrap();
        evm.set_receipt(
            src_redeem_tx,
            TxReceipt {
                block_height: Some(18),
                block_hash: Some(Hash32::new([0x20; 32])),
                status: true,
            },
        );
        await_status(&facade, order_id, SwapStatus::Completed).await;

        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), run_handle).await;
    }

    fn escrow_created_data(amount: u128) -> Vec<u8> {
        let mut resolver_word = [0u8; 32];
        resolver_word[12..32].copy_from_slice(&[0xaa; 20]);
        let mut amount_word = [0u8; 32];
        amount_word[16..32].copy_from_slice(&amount.to_be_bytes());
        let secret_hash_word = [0x01u8; 32];
        let mut timelock_word = [0u8; 32];
        timelock_word[24..32].copy_from_slice(&1_900_000_000u64.to_be_bytes());

        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(&resolver_word);
        data.extend_from_slice(&amount_word);
        data.extend_from_slice(&secret_hash_word);
        data.extend_from_slice(&timelock_word);
        data
    }

    /// Polls `get_order` until it reports `want`, failing the test if it
    /// doesn't arrive within a generous bound — the bridge runs on real
    /// background tickers in this test, not a simulated clock.
    async fn await_status(facade: &RelayerFacade, order_id: OrderId, want: SwapStatus) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(state) = facade.get_order(order_id).await {
                if state.status == want {
                    return;
                }
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "timed out waiting for {want:?}, last status was {:?}",
                    state.status
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
