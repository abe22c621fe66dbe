use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

use chrono::Utc;
use relayer_auction::AuctionEngine;
use relayer_model::{
    Address, Chain, Event, OrderId, SwapOrder, SwapState, SwapStatus, Timelock, TxHash, TxRef,
};
use relayer_secrets::SecretCoordinator;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::{
    error::OrderError,
    store::{NullStateStore, StateStore},
};

#[derive(Clone, Copy, Debug)]
pub struct OrderManagerConfig {
    pub evm_chain: Chain,
    pub utxo_chain: Chain,
    pub min_amount_evm: u128,
    pub min_amount_utxo: u128,
    /// Subtracted from the maker's EVM-side timelock to derive the
    /// destination-chain timelock, so the resolver always has strictly less
    /// time to redeem on the destination than the maker has to refund on the
    /// source.
    pub safety_buffer: Duration,
    pub max_order_lifetime: Duration,
    pub expiry_tick_interval: Duration,
    pub event_channel_capacity: usize,
}

impl Default for OrderManagerConfig {
    fn default() -> Self {
        Self {
            evm_chain: Chain::Evm { chain_id: 1 },
            utxo_chain: Chain::Utxo {
                network: relayer_model::UtxoNetwork::Mainnet,
            },
            min_amount_evm: 1,
            min_amount_utxo: 1,
            safety_buffer: Duration::from_secs(600),
            max_order_lifetime: Duration::from_secs(24 * 3600),
            expiry_tick_interval: Duration::from_secs(30),
            event_channel_capacity: 1024,
        }
    }
}

struct State {
    orders: HashMap<OrderId, SwapState>,
    by_maker: HashMap<Address, HashSet<OrderId>>,
    by_resolver: HashMap<Address, HashSet<OrderId>>,
    by_status: HashMap<SwapStatus, HashSet<OrderId>>,
    expirations: BTreeMap<chrono::DateTime<Utc>, HashSet<OrderId>>,
}

impl State {
    fn index(&mut self, order: &SwapState) {
        self.by_maker.entry(order.maker.clone()).or_default().insert(order.order_id);
        if let Some(resolver) = &order.resolver {
            self.by_resolver.entry(resolver.clone()).or_default().insert(order.order_id);
        }
        self.by_status.entry(order.status).or_default().insert(order.order_id);
        self.expirations.entry(order.expires_at).or_default().insert(order.order_id);
    }

    fn deindex_status(&mut self, order_id: OrderId, status: SwapStatus) {
        if let Some(set) = self.by_status.get_mut(&status) {
            set.remove(&order_id);
        }
    }

    /// Call after mutating `resolver` or `status` on an already-indexed
    /// order: removes and re-adds the affected secondary indexes.
    fn reindex_resolver_and_status(&mut self, order_id: OrderId, old_status: SwapStatus, order: &SwapState) {
        self.deindex_status(order_id, old_status);
        self.by_status.entry(order.status).or_default().insert(order_id);
        if let Some(resolver) = &order.resolver {
            self.by_resolver.entry(resolver.clone()).or_default().insert(order_id);
        }
    }
}

/// Owns every [`SwapState`] and drives it through the transition graph in
/// response to events from its collaborators. Other components never see a
/// `SwapState` directly; they are told only what happened (a bid, a
/// confirmed tx, a revealed secret) and the Order Manager decides what that
/// means for the order.
pub struct OrderManager {
    config: OrderManagerConfig,
    auctions: Arc<AuctionEngine>,
    secrets: Arc<SecretCoordinator>,
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
    store: Arc<dyn StateStore>,
}

impl OrderManager {
    pub fn new(config: OrderManagerConfig, auctions: Arc<AuctionEngine>, secrets: Arc<SecretCoordinator>) -> Self {
        Self::with_store(config, auctions, secrets, Arc::new(NullStateStore))
    }

    /// Same as [`Self::new`] but with an explicit [`StateStore`] - the
    /// in-memory indexes remain authoritative for every call in this module;
    /// the store is a write-behind mirror consulted only by [`Self::restore`]
    /// at startup.
    pub fn with_store(
        config: OrderManagerConfig,
        auctions: Arc<AuctionEngine>,
        secrets: Arc<SecretCoordinator>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            config,
            auctions,
            secrets,
            state: Mutex::new(State {
                orders: HashMap::new(),
                by_maker: HashMap::new(),
                by_resolver: HashMap::new(),
                by_status: HashMap::new(),
                expirations: BTreeMap::new(),
            }),
            events,
            store,
        }
    }

    /// Rebuilds every index from the configured [`StateStore`]. Call once at
    /// startup, before `run` or any mutating call, so a restart does not
    /// lose or duplicate a `TxConfirmed` for an order that was already
    /// in-flight.
    pub async fn restore(&self) -> Result<usize, OrderError> {
        let states = self.store.load_all().await?;
        let mut locked = self.state.lock().await;
        let count = states.len();
        for state in states {
            locked.index(&state);
            locked.orders.insert(state.order_id, state);
        }
        Ok(count)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }

    /// Mirrors the current state of `order_id` to the configured store. Best
    /// effort: a failure is logged, not propagated - the in-memory state the
    /// caller already observed stays authoritative.
    async fn persist(&self, order_id: OrderId) {
        let snapshot = self.state.lock().await.orders.get(&order_id).cloned();
        if let Some(state) = snapshot {
            if let Err(err) = self.store.upsert(&state).await {
                tracing::warn!(%order_id, %err, "failed to persist swap state");
            }
        }
    }

    /// Validates and admits a new order, deriving the destination-chain
    /// timelock and registering it for the expiry sweep. Does not start the
    /// auction itself - that is a separate call once the caller is ready.
    pub async fn create_order(&self, order: SwapOrder) -> Result<SwapState, OrderError> {
        self.validate(&order)?;

        let src_chain = order.maker_asset.chain;
        let dst_chain = order.taker_asset.chain;
        let src_timelock = Timelock::Timestamp(order.timelock);
        let buffer = chrono::Duration::from_std(self.config.safety_buffer)
            .map_err(|e| OrderError::invalid(e.to_string()))?;
        let dst_timelock = Timelock::Timestamp(order.timelock - buffer);

        let now = Utc::now();
        let state = SwapState {
            order_id: order.order_id,
            status: SwapStatus::Created,
            src_chain,
            dst_chain,
            maker: order.maker.clone(),
            resolver: None,
            maker_asset: order.maker_asset.clone(),
            taker_asset: order.taker_asset.clone(),
            src_escrow_addr: None,
            dst_escrow_addr: None,
            src_txs: Vec::new(),
            dst_txs: Vec::new(),
            src_timelock,
            dst_timelock,
            expires_at: order.expires_at,
            allow_partial_fill: order.allow_partial_fill,
            partial_fills: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let mut locked = self.state.lock().await;
        if locked.orders.contains_key(&order.order_id) {
            return Err(OrderError::Duplicate(order.order_id));
        }
        locked.index(&state);
        locked.orders.insert(order.order_id, state.clone());
        drop(locked);

        self.emit(Event::OrderCreated {
            order_id: order.order_id,
            timestamp: now,
        });
        self.persist(order.order_id).await;
        Ok(state)
    }

    fn validate(&self, order: &SwapOrder) -> Result<(), OrderError> {
        if order.maker_asset.chain == order.taker_asset.chain {
            return Err(OrderError::invalid_for(
                order.order_id,
                "maker and taker assets must be on different chains",
            ));
        }
        for asset in [&order.maker_asset, &order.taker_asset] {
            if asset.amount == 0 {
                return Err(OrderError::invalid_for(order.order_id, "asset amount must be positive"));
            }
            let min = match asset.chain.kind() {
                relayer_model::ChainKind::Evm => self.config.min_amount_evm,
                relayer_model::ChainKind::Utxo => self.config.min_amount_utxo,
            };
            if asset.amount < min {
                return Err(OrderError::invalid_for(
                    order.order_id,
                    format!("amount {} below minimum {min} for chain {}", asset.amount, asset.chain),
                ));
            }
        }
        let now = Utc::now();
        if order.timelock <= now {
            return Err(OrderError::invalid_for(order.order_id, "timelock must be in the future"));
        }
        if order.expires_at <= now {
            return Err(OrderError::invalid_for(order.order_id, "expiresAt must be in the future"));
        }
        if order.expires_at >= order.timelock {
            return Err(OrderError::invalid_for(
                order.order_id,
                "expiresAt must be before the timelock",
            ));
        }
        let max_lifetime = chrono::Duration::from_std(self.config.max_order_lifetime)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        if order.expires_at - now > max_lifetime {
            tracing::warn!(
                order_id = %order.order_id,
                "order lifetime exceeds the configured maximum",
            );
        }
        if order.signature.is_empty() {
            tracing::warn!(order_id = %order.order_id, "order signature is empty");
        }
        Ok(())
    }

    pub async fn get(&self, order_id: OrderId) -> Option<SwapState> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn list_by_maker(&self, maker: &Address) -> Vec<SwapState> {
        let state = self.state.lock().await;
        state
            .by_maker
            .get(maker)
            .into_iter()
            .flatten()
            .filter_map(|id| state.orders.get(id).cloned())
            .collect()
    }

    pub async fn list_by_resolver(&self, resolver: &Address) -> Vec<SwapState> {
        let state = self.state.lock().await;
        state
            .by_resolver
            .get(resolver)
            .into_iter()
            .flatten()
            .filter_map(|id| state.orders.get(id).cloned())
            .collect()
    }

    pub async fn list_by_status(&self, status: SwapStatus) -> Vec<SwapState> {
        let state = self.state.lock().await;
        state
            .by_status
            .get(&status)
            .into_iter()
            .flatten()
            .filter_map(|id| state.orders.get(id).cloned())
            .collect()
    }

    /// Starts the Dutch auction for an admitted order, optionally
    /// overriding the engine's defaults for this auction only.
    pub async fn start_auction(
        &self,
        order_id: OrderId,
        params: Option<relayer_auction::AuctionParams>,
    ) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        if order.status != SwapStatus::Created {
            return Err(OrderError::WrongStatus {
                order_id,
                status: status_str(order.status),
                expected: "created",
            });
        }
        let old = order.status;
        order.status = SwapStatus::AuctionStarted;
        order.updated_at = Utc::now();
        let maker_asset = order.maker_asset.clone();
        let taker_asset = order.taker_asset.clone();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);

        self.auctions.start(order_id, &maker_asset, &taker_asset, params).await?;
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to `AuctionSettled`: with a winner, the order moves to
    /// `resolverChosen`; with none, the order fails outright - an auction
    /// that closes with no bids has nowhere else to go.
    pub async fn on_auction_settled(&self, order_id: OrderId, winner: Option<Address>) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        let old = order.status;
        match winner {
            Some(resolver) => {
                order.resolver = Some(resolver);
                order.status = SwapStatus::ResolverChosen;
            }
            None => order.status = SwapStatus::Failed,
        }
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);

        if snapshot.status == SwapStatus::Failed {
            self.emit_failed(order_id, "auction settled with no bids");
        }
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to `EscrowCreated` / `TxConfirmed` (confirmed=false) on either
    /// leg: advances the order into the corresponding `*Pending` state.
    pub async fn on_escrow_created(
        &self,
        order_id: OrderId,
        chain: Chain,
        escrow_addr: Address,
        tx_hash: TxHash,
        block_height: u64,
    ) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        let old = order.status;
        let tx = TxRef {
            tx_hash,
            block_height,
            confirmations: 0,
        };
        if chain == order.src_chain {
            if order.status != SwapStatus::ResolverChosen {
                return Err(wrong_status(order_id, old, "resolverChosen"));
            }
            order.src_escrow_addr = Some(escrow_addr);
            order.src_txs.push(tx);
            order.status = SwapStatus::SrcPending;
        } else if chain == order.dst_chain {
            if order.status != SwapStatus::SrcFunded {
                return Err(wrong_status(order_id, old, "srcFunded"));
            }
            order.dst_escrow_addr = Some(escrow_addr);
            order.dst_txs.push(tx);
            order.status = SwapStatus::DstPending;
        } else {
            return Err(OrderError::Desync {
                order_id,
                reason: format!("escrow event on unrelated chain {chain}"),
            });
        }
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to a `TxConfirmed` event reaching the configured confirmation
    /// threshold on either leg's escrow transaction, flipping `*Pending` to
    /// `*Funded`.
    pub async fn on_tx_confirmed(&self, order_id: OrderId, chain: Chain, tx_hash: TxHash) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        let old = order.status;

        if chain == order.src_chain && order.status == SwapStatus::SrcPending {
            mark_confirmed(&mut order.src_txs, tx_hash);
            order.status = SwapStatus::SrcFunded;
        } else if chain == order.dst_chain && order.status == SwapStatus::DstPending {
            mark_confirmed(&mut order.dst_txs, tx_hash);
            order.status = SwapStatus::DstFunded;
        } else {
            // Confirmations beyond the threshold or for an already-funded
            // leg are expected noise, not desyncs.
            return Ok(());
        }
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);

        self.persist(order_id).await;
        if snapshot.status == SwapStatus::DstFunded {
            self.secrets.schedule_reveal(order_id, 0, None).await?;
        }
        Ok(())
    }

    /// Reacts to `SecretReady`: the coordinator has scheduled the reveal
    /// timer, so the order has a known, not-yet-elapsed reveal time.
    pub async fn on_secret_ready(&self, order_id: OrderId) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        if order.status != SwapStatus::DstFunded {
            return Err(wrong_status(order_id, order.status, "dstFunded"));
        }
        let old = order.status;
        order.status = SwapStatus::SecretReady;
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to `SecretRevealed`: marks the order `secretRevealed`, ready
    /// for the resolver to redeem on the destination chain.
    pub async fn on_secret_revealed(&self, order_id: OrderId) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        if order.status != SwapStatus::SecretReady {
            return Err(wrong_status(order_id, order.status, "secretReady"));
        }
        let old = order.status;
        order.status = SwapStatus::SecretRevealed;
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to `Redeemed` observed on either leg. The destination redeem
    /// (the resolver claiming the funds it funded with the revealed secret)
    /// moves `secretRevealed` to `dstRedeemed`; the source redeem (the maker
    /// using the same preimage to claim the resolver's source-side deposit)
    /// is the terminal success condition and moves `dstRedeemed` to
    /// `completed`. A redeem on a chain the order isn't waiting on is a
    /// desync, not silently ignored - it means the monitor or the resolver
    /// disagrees with this order's own state machine about what happened.
    pub async fn on_funds_redeemed(&self, order_id: OrderId, chain: Chain, tx_hash: TxHash, block_height: u64) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        let old = order.status;

        if chain == order.dst_chain && order.status == SwapStatus::SecretRevealed {
            order.dst_txs.push(TxRef {
                tx_hash,
                block_height,
                confirmations: 1,
            });
            order.status = SwapStatus::DstRedeemed;
        } else if chain == order.src_chain && order.status == SwapStatus::DstRedeemed {
            order.src_txs.push(TxRef {
                tx_hash,
                block_height,
                confirmations: 1,
            });
            order.status = SwapStatus::Completed;
        } else {
            return Err(wrong_status(order_id, old, "secretRevealed (dst) or dstRedeemed (src)"));
        }
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);

        self.emit(Event::FundsRedeemed {
            order_id,
            chain,
            tx_hash,
            block_height,
            timestamp: snapshot.updated_at,
        });
        if snapshot.status == SwapStatus::Completed {
            self.emit(Event::SwapCompleted {
                order_id,
                timestamp: snapshot.updated_at,
            });
        }
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to `SwapRefunded`: a timelock elapsed before redemption and
    /// the corresponding leg was refunded back to its depositor.
    pub async fn on_swap_refunded(&self, order_id: OrderId, chain: Chain, tx_hash: TxHash) -> Result<(), OrderError> {
        let mut locked = self.state.lock().await;
        let order = locked.orders.get_mut(&order_id).ok_or(OrderError::NotFound(order_id))?;
        let old = order.status;
        order.status = SwapStatus::Refunded;
        order.updated_at = Utc::now();
        let snapshot = order.clone();
        locked.reindex_resolver_and_status(order_id, old, &snapshot);
        drop(locked);

        self.emit(Event::SwapRefunded {
            order_id,
            chain,
            tx_hash,
            timestamp: snapshot.updated_at,
        });
        self.persist(order_id).await;
        Ok(())
    }

    /// Reacts to a `Reorg` on either chain: any order whose affected leg is
    /// still unconfirmed is rewound one milestone - a funded leg downgrades
    /// to its prior pending milestone, and a pending leg rewinds further
    /// still, all in one consistent sweep over every in-flight order on the
    /// reorged chain.
    pub async fn on_reorg(&self, chain: Chain) {
        let mut locked = self.state.lock().await;
        let affected: Vec<OrderId> = locked
            .orders
            .values()
            .filter(|o| {
                !o.is_terminal()
                    && ((o.src_chain == chain && matches!(o.status, SwapStatus::SrcPending | SwapStatus::SrcFunded))
                        || (o.dst_chain == chain
                            && matches!(o.status, SwapStatus::DstPending | SwapStatus::DstFunded)))
            })
            .map(|o| o.order_id)
            .collect();

        for order_id in &affected {
            let order = locked.orders.get_mut(order_id).expect("just collected");
            let old = order.status;
            order.status = match old {
                // A confirmed leg's tx was reorged out: it drops back to
                // its own pending milestone, not past it.
                SwapStatus::SrcFunded => SwapStatus::SrcPending,
                SwapStatus::DstFunded => SwapStatus::DstPending,
                // The escrow-creation tx itself vanished: there is no
                // pending milestone to fall back to on this leg, so the
                // order rewinds to the state it was in before that tx was
                // ever observed.
                SwapStatus::SrcPending => SwapStatus::ResolverChosen,
                SwapStatus::DstPending => SwapStatus::SrcFunded,
                other => other,
            };
            order.updated_at = Utc::now();
            let snapshot = order.clone();
            locked.reindex_resolver_and_status(*order_id, old, &snapshot);
        }
        drop(locked);

        for order_id in affected {
            self.persist(order_id).await;
        }
    }

    /// Reacts to a monitor-reported desync for a specific order: the order
    /// is marked `failed` and the incident surfaced as an event.
    pub async fn on_desync(&self, order_id: OrderId, reason: impl Into<String>) {
        let reason = reason.into();
        let mut locked = self.state.lock().await;
        if let Some(order) = locked.orders.get_mut(&order_id) {
            let old = order.status;
            order.status = SwapStatus::Failed;
            order.updated_at = Utc::now();
            let snapshot = order.clone();
            locked.reindex_resolver_and_status(order_id, old, &snapshot);
        }
        drop(locked);
        self.emit(Event::DesyncError {
            order_id,
            reason,
            timestamp: Utc::now(),
        });
        self.persist(order_id).await;
    }

    fn emit_failed(&self, order_id: OrderId, reason: &str) {
        self.emit(Event::DesyncError {
            order_id,
            reason: reason.to_owned(),
            timestamp: Utc::now(),
        });
    }

    /// The periodic expiry sweep: any non-terminal order whose `expiresAt`
    /// has passed is marked `expired`.
    pub async fn sweep_expirations(&self) {
        let now = Utc::now();
        let mut locked = self.state.lock().await;
        let due: Vec<OrderId> = locked
            .expirations
            .range(..=now)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();

        let mut expired = Vec::new();
        for order_id in due {
            if let Some(order) = locked.orders.get_mut(&order_id) {
                if order.is_terminal() {
                    continue;
                }
                let old = order.status;
                order.status = SwapStatus::Expired;
                order.updated_at = now;
                let snapshot = order.clone();
                locked.reindex_resolver_and_status(order_id, old, &snapshot);
                expired.push(order_id);
            }
        }
        locked.expirations.retain(|at, _| *at > now);
        drop(locked);

        for order_id in expired {
            self.emit(Event::SwapExpired { order_id, timestamp: now });
            self.persist(order_id).await;
        }
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.expiry_tick_interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.sweep_expirations().await,
            }
        }
    }
}

fn mark_confirmed(txs: &mut [TxRef], tx_hash: TxHash) {
    if let Some(tx) = txs.iter_mut().find(|t| t.tx_hash == tx_hash) {
        tx.confirmations = tx.confirmations.max(1);
    }
}

fn wrong_status(order_id: OrderId, status: SwapStatus, expected: &'static str) -> OrderError {
    OrderError::WrongStatus {
        order_id,
        status: status_str(status),
        expected,
    }
}

fn status_str(status: SwapStatus) -> &'static str {
    match status {
        SwapStatus::Created => "created",
        SwapStatus::AuctionStarted => "auctionStarted",
        SwapStatus::ResolverChosen => "resolverChosen",
        SwapStatus::SrcPending => "srcPending",
        SwapStatus::SrcFunded => "srcFunded",
        SwapStatus::DstPending => "dstPending",
        SwapStatus::DstFunded => "dstFunded",
        SwapStatus::SecretReady => "secretReady",
        SwapStatus::SecretRevealed => "secretRevealed",
        SwapStatus::DstRedeemed => "dstRedeemed",
        SwapStatus::Completed => "completed",
        SwapStatus::Refunding => "refunding",
        SwapStatus::Refunded => "refunded",
        SwapStatus::Expired => "expired",
        SwapStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use relayer_auction::AuctionEngineConfig;
    use relayer_model::{Asset, Hash32, UtxoNetwork};
    use relayer_secrets::{SecretCipher, SecretCoordinatorConfig};

    use super::*;

    fn manager() -> OrderManager {
        let auctions = Arc::new(AuctionEngine::new(
            Arc::new(relayer_auction::FixedRateSource),
            AuctionEngineConfig::default(),
        ));
        let secrets = Arc::new(SecretCoordinator::new(
            SecretCipher::new([7u8; 32]),
            SecretCoordinatorConfig::default(),
            None,
        ));
        OrderManager::new(OrderManagerConfig::default(), auctions, secrets)
    }

    fn fixture_order(byte: u8) -> SwapOrder {
        let now = Utc::now();
        SwapOrder {
            order_id: Hash32::new([byte; 32]),
            maker: Address::new("maker"),
            maker_asset: Asset {
                chain: Chain::Evm { chain_id: 1 },
                token: None,
                amount: 1_000,
            },
            taker_asset: Asset {
                chain: Chain::Utxo {
                    network: UtxoNetwork::Mainnet,
                },
                token: None,
                amount: 1_000,
            },
            secret_hash: Hash32::new([0xAB; 32]),
            timelock: now + chrono::Duration::hours(2),
            expires_at: now + chrono::Duration::hours(1),
            signature: vec![1, 2, 3],
            allow_partial_fill: false,
        }
    }

    #[tokio::test]
    async fn create_order_derives_a_dst_timelock_with_the_safety_buffer() {
        let manager = manager();
        let order = fixture_order(1);
        let src_timelock = order.timelock;
        let state = manager.create_order(order).await.unwrap();
        match (state.src_timelock, state.dst_timelock) {
            (Timelock::Timestamp(src), Timelock::Timestamp(dst)) => {
                assert_eq!(src, src_timelock);
                assert!(src - dst >= chrono::Duration::from_std(manager.config.safety_buffer).unwrap());
            }
            other => panic!("expected both timelocks to be timestamps, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_order_rejects_same_chain_legs() {
        let manager = manager();
        let mut order = fixture_order(2);
        order.taker_asset.chain = order.maker_asset.chain;
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid { .. }));
    }

    #[tokio::test]
    async fn create_order_rejects_timelock_at_now() {
        let manager = manager();
        let mut order = fixture_order(3);
        order.timelock = Utc::now();
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid { .. }));
    }

    #[tokio::test]
    async fn create_order_rejects_expires_at_past_the_timelock() {
        let manager = manager();
        let mut order = fixture_order(4);
        order.expires_at = order.timelock + chrono::Duration::minutes(1);
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid { .. }));
    }

    #[tokio::test]
    async fn create_order_rejects_amount_below_chain_minimum() {
        let mut config = OrderManagerConfig::default();
        config.min_amount_evm = 500;
        let auctions = Arc::new(AuctionEngine::new(
            Arc::new(relayer_auction::FixedRateSource),
            AuctionEngineConfig::default(),
        ));
        let secrets = Arc::new(SecretCoordinator::new(
            SecretCipher::new([7u8; 32]),
            SecretCoordinatorConfig::default(),
            None,
        ));
        let manager = OrderManager::new(config, auctions, secrets);
        let mut order = fixture_order(5);
        order.maker_asset.amount = 100;
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Invalid { .. }));
    }

    #[tokio::test]
    async fn duplicate_order_id_is_rejected() {
        let manager = manager();
        let order = fixture_order(6);
        manager.create_order(order.clone()).await.unwrap();
        let err = manager.create_order(order).await.unwrap_err();
        assert!(matches!(err, OrderError::Duplicate(_)));
    }

    #[tokio::test]
    async fn auction_settled_with_no_winner_fails_the_order() {
        let manager = manager();
        let order = fixture_order(7);
        let order_id = order.order_id;
        manager.create_order(order).await.unwrap();
        manager.start_auction(order_id, None).await.unwrap();

        manager.on_auction_settled(order_id, None).await.unwrap();
        let state = manager.get(order_id).await.unwrap();
        assert_eq!(state.status, SwapStatus::Failed);
    }

    #[tokio::test]
    async fn auction_settled_with_winner_moves_to_resolver_chosen() {
        let manager = manager();
        let order = fixture_order(8);
        let order_id = order.order_id;
        manager.create_order(order).await.unwrap();
        manager.start_auction(order_id, None).await.unwrap();

        let resolver = Address::new("resolver-x");
        manager.on_auction_settled(order_id, Some(resolver.clone())).await.unwrap();
        let state = manager.get(order_id).await.unwrap();
        assert_eq!(state.status, SwapStatus::ResolverChosen);
        assert_eq!(state.resolver, Some(resolver.clone()));
        assert!(manager.list_by_resolver(&resolver).await.iter().any(|s| s.order_id == order_id));
    }

    #[tokio::test]
    async fn reorg_of_a_confirmed_leg_downgrades_one_milestone_to_pending() {
        let manager = manager();
        let order = fixture_order(9);
        let order_id = order.order_id;
        let src_chain = order.maker_asset.chain;
        manager.create_order(order).await.unwrap();
        manager.start_auction(order_id, None).await.unwrap();
        manager
            .on_auction_settled(order_id, Some(Address::new("resolver-y")))
            .await
            .unwrap();
        manager
            .on_escrow_created(order_id, src_chain, Address::new("escrow"), TxHash::new([1u8; 32]), 10)
            .await
            .unwrap();
        manager.on_tx_confirmed(order_id, src_chain, TxHash::new([1u8; 32])).await.unwrap();
        assert_eq!(manager.get(order_id).await.unwrap().status, SwapStatus::SrcFunded);

        manager.on_reorg(src_chain).await;
        assert_eq!(manager.get(order_id).await.unwrap().status, SwapStatus::SrcPending);
    }

    #[tokio::test]
    async fn reorg_of_the_escrow_creation_tx_rewinds_to_resolver_chosen() {
        let manager = manager();
        let order = fixture_order(12);
        let order_id = order.order_id;
        let src_chain = order.maker_asset.chain;
        manager.create_order(order).await.unwrap();
        manager.start_auction(order_id, None).await.unwrap();
        manager
            .on_auction_settled(order_id, Some(Address::new("resolver-z")))
            .await
            .unwrap();
        manager
            .on_escrow_created(order_id, src_chain, Address::new("escrow"), TxHash::new([2u8; 32]), 10)
            .await
            .unwrap();
        assert_eq!(manager.get(order_id).await.unwrap().status, SwapStatus::SrcPending);

        manager.on_reorg(src_chain).await;
        assert_eq!(manager.get(order_id).await.unwrap().status, SwapStatus::ResolverChosen);
    }

    #[tokio::test]
    async fn reorg_does_not_touch_terminal_orders() {
        let manager = manager();
        let order = fixture_order(10);
        let order_id = order.order_id;
        let src_chain = order.maker_asset.chain;
        manager.create_order(order).await.unwrap();
        manager.start_auction(order_id, None).await.unwrap();
        manager.on_auction_settled(order_id, None).await.unwrap();
        assert_eq!(manager.get(order_id).await.unwrap().status, SwapStatus::Failed);

        manager.on_reorg(src_chain).await;
        assert_eq!(manager.get(order_id).await.unwrap().status, SwapStatus::Failed);
    }

    #[tokio::test]
    async fn sweep_expirations_expires_non_terminal_orders_past_their_deadline() {
        let manager = manager();
        let mut order = fixture_order(11);
        order.expires_at = Utc::now() + chrono::Duration::milliseconds(10);
        let order_id = order.order_id;
        manager.create_order(order).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        manager.sweep_expirations().await;

        let state = manager.get(order_id).await.unwrap();
        assert_eq!(state.status, SwapStatus::Expired);
        assert!(manager.list_by_status(SwapStatus::Expired).await.iter().any(|s| s.order_id == order_id));
    }
}
