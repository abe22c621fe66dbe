use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use relayer_chain::{EvmClient, KnownEvent, UtxoClient, classify};
use relayer_model::{Address, BlockHash, Chain, Event, EventKind, RelayerError, TxHash};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::{
    decode,
    metrics::Metrics,
    retry::{RetryConfig, retry_with_backoff},
    subscription::Subscription,
    types::{MonitoredTx, TrackedEventKind, TxStatus},
};

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub evm_chain: Chain,
    pub utxo_chain: Chain,
    pub evm_poll_interval: Duration,
    pub utxo_poll_interval: Duration,
    pub evm_escrow_addresses: Vec<Address>,
    pub evm_required_confirmations: u32,
    pub utxo_required_confirmations: u32,
    /// Bound on how far back a detected reorg is allowed to rewind the UTXO
    /// cursor.
    pub max_reorg_depth: u64,
    pub retry: RetryConfig,
    pub event_channel_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            evm_chain: Chain::Evm { chain_id: 1 },
            utxo_chain: Chain::Utxo {
                network: relayer_model::UtxoNetwork::Mainnet,
            },
            evm_poll_interval: Duration::from_secs(12),
            utxo_poll_interval: Duration::from_secs(30),
            evm_escrow_addresses: Vec::new(),
            evm_required_confirmations: 12,
            utxo_required_confirmations: 6,
            max_reorg_depth: 6,
            retry: RetryConfig::default(),
            event_channel_capacity: 1024,
        }
    }
}

struct State {
    evm_cursor: u64,
    utxo_cursor: u64,
    /// Bounded window of recently-seen UTXO block hashes, used to detect a
    /// reorg at the tracked cursor height.
    utxo_block_hashes: HashMap<u64, BlockHash>,
    monitored: HashMap<TxHash, MonitoredTx>,
}

/// The two-chain event monitor: polls the EVM and UTXO chains independently,
/// decodes the three escrow events on the EVM side, tracks confirmations for
/// every registered transaction on both sides, and detects reorgs.
///
/// A `Mutex`-wrapped single-writer actor: all mutable state lives behind
/// one lock, polled from a background task per chain, with callers reading
/// through `status_of` and `subscribe` rather than touching the state
/// directly.
pub struct EventMonitor {
    evm: Arc<dyn EvmClient>,
    utxo: Arc<dyn UtxoClient>,
    config: MonitorConfig,
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
}

impl EventMonitor {
    pub fn new(evm: Arc<dyn EvmClient>, utxo: Arc<dyn UtxoClient>, config: MonitorConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            evm,
            utxo,
            config,
            state: Mutex::new(State {
                evm_cursor: 0,
                utxo_cursor: 0,
                utxo_block_hashes: HashMap::new(),
                monitored: HashMap::new(),
            }),
            events,
        }
    }

    /// Begins tracking a transaction's confirmation progress. Returns
    /// `Duplicate` if the tx hash is already registered.
    pub async fn register(&self, tx: MonitoredTx) -> Result<(), RelayerError> {
        let mut state = self.state.lock().await;
        if state.monitored.contains_key(&tx.tx_hash) {
            return Err(RelayerError::Duplicate {
                order_id: tx.order_id,
                reason: format!("tx {} already registered", tx.tx_hash),
            });
        }
        state.monitored.insert(tx.tx_hash, tx);
        Ok(())
    }

    pub async fn status_of(&self, tx_hash: TxHash) -> Option<MonitoredTx> {
        self.state.lock().await.monitored.get(&tx_hash).cloned()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }

    fn emit(&self, event: Event) {
        Metrics::get().record_event(&EventKind::from(&event).to_string());
        if let Event::Reorg { chain, .. } = &event {
            Metrics::get().record_reorg(&chain.to_string());
        }
        // No receivers yet (or all lagged off) is not an error condition.
        let _ = self.events.send(event);
    }

    async fn update_retry_queue_depth(&self) {
        let pending = self
            .state
            .lock()
            .await
            .monitored
            .values()
            .filter(|tx| tx.status == TxStatus::Pending)
            .count();
        Metrics::get().set_retry_queue_depth(pending);
    }

    /// Runs both poll loops until `cancel` fires. Intended to be spawned as
    /// a single background task owning this monitor.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let evm_self = self.clone();
        let evm_cancel = cancel.clone();
        let evm_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(evm_self.config.evm_poll_interval);
            loop {
                tokio::select! {
                    _ = evm_cancel.cancelled() => break,
                    _ = ticker.tick() => evm_self.poll_evm_once().await,
                }
            }
        });

        let utxo_self = self.clone();
        let utxo_cancel = cancel.clone();
        let utxo_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(utxo_self.config.utxo_poll_interval);
            loop {
                tokio::select! {
                    _ = utxo_cancel.cancelled() => break,
                    _ = ticker.tick() => utxo_self.poll_utxo_once().await,
                }
            }
        });

        let _ = tokio::join!(evm_task, utxo_task);
    }

    pub async fn poll_evm_once(&self) {
        let tip = match retry_with_backoff(self.config.retry, "evm.tip_height", || {
            self.evm.tip_height()
        })
        .await
        {
            Ok(tip) => tip,
            Err(err) => {
                self.emit(Event::MonitoringError {
                    chain: self.config.evm_chain,
                    reason: err.to_string(),
                    timestamp: Utc::now(),
                });
                return;
            }
        };

        let from = {
            let state = self.state.lock().await;
            state.evm_cursor + 1
        };
        if from > tip {
            self.recompute_evm_confirmations(tip).await;
            self.update_retry_queue_depth().await;
            return;
        }

        let addresses = self.config.evm_escrow_addresses.clone();
        let logs = match retry_with_backoff(self.config.retry, "evm.get_logs", || {
            self.evm.get_logs(from, tip, &addresses)
        })
        .await
        {
            Ok(logs) => logs,
            Err(err) => {
                self.emit(Event::MonitoringError {
                    chain: self.config.evm_chain,
                    reason: err.to_string(),
                    timestamp: Utc::now(),
                });
                return;
            }
        };

        let mut logs = logs;
        logs.sort_by_key(|l| (l.block_number, l.log_index));

        for log in &logs {
            let Some(topic0) = log.topics.first() else {
                continue;
            };
            match classify(topic0) {
                Some(KnownEvent::EscrowCreated) => match decode::escrow_created(&log.topics, &log.data) {
                    Ok(decoded) => self.emit(Event::EscrowCreated {
                        order_id: decoded.order_id,
                        chain: self.config.evm_chain,
                        escrow_addr: log.address.clone(),
                        tx_hash: log.transaction_hash,
                        block_height: log.block_number,
                        timestamp: Utc::now(),
                    }),
                    Err(reason) => self.emit_decode_error(&reason),
                },
                Some(KnownEvent::Redeemed) => match decode::redeemed(&log.topics, &log.data) {
                    Ok(decoded) => self.emit(Event::FundsRedeemed {
                        order_id: decoded.order_id,
                        chain: self.config.evm_chain,
                        tx_hash: log.transaction_hash,
                        block_height: log.block_number,
                        timestamp: Utc::now(),
                    }),
                    Err(reason) => self.emit_decode_error(&reason),
                },
                Some(KnownEvent::Refunded) => match decode::refunded(&log.topics) {
                    Ok(decoded) => self.emit(Event::SwapRefunded {
                        order_id: decoded.order_id,
                        chain: self.config.evm_chain,
                        tx_hash: log.transaction_hash,
                        timestamp: Utc::now(),
                    }),
                    Err(reason) => self.emit_decode_error(&reason),
                },
                None => {
                    tracing::debug!(topic = %topic0, "ignoring log with unknown topic0");
                }
            }
        }

        {
            let mut state = self.state.lock().await;
            state.evm_cursor = tip;
        }
        Metrics::get().set_cursor(&self.config.evm_chain.to_string(), tip);
        self.recompute_evm_confirmations(tip).await;
        self.update_retry_queue_depth().await;
    }

    fn emit_decode_error(&self, reason: &str) {
        tracing::warn!(reason, "failed to decode a classified log");
        self.emit(Event::MonitoringError {
            chain: self.config.evm_chain,
            reason: reason.to_owned(),
            timestamp: Utc::now(),
        });
    }

    async fn recompute_evm_confirmations(&self, tip: u64) {
        let tx_hashes: Vec<TxHash> = {
            let state = self.state.lock().await;
            state
                .monitored
                .values()
                .filter(|tx| tx.chain.kind() == relayer_model::ChainKind::Evm)
                .filter(|tx| tx.status != TxStatus::Reorged)
                .map(|tx| tx.tx_hash)
                .collect()
        };

        for tx_hash in tx_hashes {
            let receipt = match retry_with_backoff(self.config.retry, "evm.get_tx_receipt", || {
                self.evm.get_tx_receipt(tx_hash)
            })
            .await
            {
                Ok(Some(receipt)) => receipt,
                Ok(None) => continue,
                Err(err) => {
                    self.emit(Event::MonitoringError {
                        chain: self.config.evm_chain,
                        reason: err.to_string(),
                        timestamp: Utc::now(),
                    });
                    continue;
                }
            };

            let mut state = self.state.lock().await;
            let Some(tracked) = state.monitored.get_mut(&tx_hash) else {
                continue;
            };

            let reorged = match (tracked.confirmed_block_hash, receipt.block_hash) {
                (Some(prev_hash), Some(current_hash)) => prev_hash != current_hash,
                _ => false,
            };
            if reorged {
                tracked.status = TxStatus::Reorged;
                let from_height = receipt.block_height.unwrap_or(tip);
                let order_id = tracked.order_id;
                let chain = self.config.evm_chain;
                drop(state);
                self.emit(Event::Reorg {
                    chain,
                    from_height,
                    timestamp: Utc::now(),
                });
                if let Some(order_id) = order_id {
                    self.emit(Event::DesyncError {
                        order_id,
                        reason: format!("tx {tx_hash} reorged out at height {from_height}"),
                        timestamp: Utc::now(),
                    });
                }
                continue;
            }

            let block_height = match receipt.block_height {
                Some(h) => h,
                None => continue,
            };
            tracked.block_height = Some(block_height);
            tracked.confirmed_block_hash = tracked.confirmed_block_hash.or(receipt.block_hash);
            tracked.confirmations = tip.saturating_sub(block_height) as u32 + 1;

            let newly_confirmed =
                tracked.status == TxStatus::Pending && tracked.confirmations >= tracked.required_confirmations;
            if newly_confirmed {
                tracked.status = TxStatus::Confirmed;
            }
            let (kind, order_id, confirmations) =
                (tracked.kind, tracked.order_id, tracked.confirmations);
            drop(state);

            // Emitted exactly once, on the pending->confirmed transition -
            // see the "no duplicate TxConfirmed" invariant. Re-checking an
            // already-confirmed tx on later polls still happens (for reorg
            // detection above) but must not re-announce the same milestone.
            if newly_confirmed {
                self.emit(Event::TxConfirmed {
                    order_id,
                    chain: self.config.evm_chain,
                    tx_hash,
                    block_height,
                    timestamp: Utc::now(),
                });
                self.emit_kind_confirmed(
                    self.config.evm_chain,
                    kind,
                    order_id,
                    tx_hash,
                    confirmations,
                    Some(block_height),
                );
            }
        }
    }

    fn emit_kind_confirmed(
        &self,
        chain: Chain,
        kind: TrackedEventKind,
        order_id: Option<relayer_model::OrderId>,
        tx_hash: TxHash,
        confirmations: u32,
        block_height: Option<u64>,
    ) {
        let Some(order_id) = order_id else { return };
        let timestamp = Utc::now();
        match kind {
            TrackedEventKind::EscrowFunding => self.emit(Event::EscrowFunded {
                order_id,
                chain,
                tx_hash,
                confirmations,
                timestamp,
            }),
            TrackedEventKind::Redeem => {
                let Some(block_height) = block_height else {
                    tracing::warn!(%tx_hash, "redeem confirmed without a known block height, dropping event");
                    return;
                };
                self.emit(Event::FundsRedeemed {
                    order_id,
                    chain,
                    tx_hash,
                    block_height,
                    timestamp,
                });
            }
            TrackedEventKind::Refund => self.emit(Event::SwapRefunded {
                order_id,
                chain,
                tx_hash,
                timestamp,
            }),
        }
    }

    pub async fn poll_utxo_once(&self) {
        let tip = match retry_with_backoff(self.config.retry, "utxo.tip_height", || {
            self.utxo.tip_height()
        })
        .await
        {
            Ok(tip) => tip,
            Err(err) => {
                self.emit(Event::MonitoringError {
                    chain: self.config.utxo_chain,
                    reason: err.to_string(),
                    timestamp: Utc::now(),
                });
                return;
            }
        };

        if let Err(err) = self.check_utxo_reorg(tip).await {
            self.emit(Event::MonitoringError {
                chain: self.config.utxo_chain,
                reason: err.to_string(),
                timestamp: Utc::now(),
            });
            return;
        }

        let from = {
            let state = self.state.lock().await;
            state.utxo_cursor + 1
        };
        for height in from..=tip {
            let hash = match retry_with_backoff(self.config.retry, "utxo.get_block_hash", || {
                self.utxo.get_block_hash(height)
            })
            .await
            {
                Ok(Some(hash)) => hash,
                Ok(None) => break,
                Err(err) => {
                    self.emit(Event::MonitoringError {
                        chain: self.config.utxo_chain,
                        reason: err.to_string(),
                        timestamp: Utc::now(),
                    });
                    break;
                }
            };
            let mut state = self.state.lock().await;
            state.utxo_block_hashes.insert(height, hash);
            state.utxo_cursor = height;
            let cutoff = height.saturating_sub(self.config.max_reorg_depth * 2);
            state.utxo_block_hashes.retain(|h, _| *h >= cutoff);
            drop(state);
            Metrics::get().set_cursor(&self.config.utxo_chain.to_string(), height);
        }

        self.recompute_utxo_confirmations().await;
        self.update_retry_queue_depth().await;
    }

    /// Compares the currently-recorded hash at the tracked cursor height
    /// against a fresh lookup; a mismatch means the chain reorganized and
    /// the cursor (and any monitored tx whose block has been superseded)
    /// must be rewound.
    async fn check_utxo_reorg(&self, tip: u64) -> Result<(), relayer_chain::ClientError> {
        let (cursor, recorded) = {
            let state = self.state.lock().await;
            (state.utxo_cursor, state.utxo_block_hashes.get(&state.utxo_cursor).copied())
        };
        let Some(recorded) = recorded else {
            return Ok(());
        };
        let current = retry_with_backoff(self.config.retry, "utxo.get_block_hash", || {
            self.utxo.get_block_hash(cursor)
        })
        .await?;
        if current == Some(recorded) {
            return Ok(());
        }

        let new_cursor = cursor.saturating_sub(self.config.max_reorg_depth);
        tracing::warn!(
            chain = %self.config.utxo_chain,
            old_cursor = cursor,
            new_cursor,
            tip,
            "utxo reorg detected, rewinding cursor",
        );

        let mut state = self.state.lock().await;
        state.utxo_cursor = new_cursor;
        state.utxo_block_hashes.retain(|h, _| *h <= new_cursor);
        for tracked in state.monitored.values_mut() {
            if tracked.chain.kind() == relayer_model::ChainKind::Utxo
                && tracked.block_height.is_some_and(|h| h > new_cursor)
            {
                tracked.status = TxStatus::Reorged;
            }
        }
        drop(state);

        self.emit(Event::Reorg {
            chain: self.config.utxo_chain,
            from_height: new_cursor,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn recompute_utxo_confirmations(&self) {
        let tx_hashes: Vec<TxHash> = {
            let state = self.state.lock().await;
            state
                .monitored
                .values()
                .filter(|tx| tx.chain.kind() == relayer_model::ChainKind::Utxo)
                .filter(|tx| tx.status != TxStatus::Reorged)
                .map(|tx| tx.tx_hash)
                .collect()
        };

        for tx_hash in tx_hashes {
            let tx = match retry_with_backoff(self.config.retry, "utxo.get_tx", || {
                self.utxo.get_tx(tx_hash)
            })
            .await
            {
                Ok(Some(tx)) => tx,
                Ok(None) => continue,
                Err(err) => {
                    self.emit(Event::MonitoringError {
                        chain: self.config.utxo_chain,
                        reason: err.to_string(),
                        timestamp: Utc::now(),
                    });
                    continue;
                }
            };

            let mut state = self.state.lock().await;
            let Some(tracked) = state.monitored.get_mut(&tx_hash) else {
                continue;
            };
            tracked.block_height = tx.block_height;
            tracked.confirmations = tx.confirmations;
            let newly_confirmed =
                tracked.status == TxStatus::Pending && tx.confirmations >= tracked.required_confirmations;
            if newly_confirmed {
                tracked.status = TxStatus::Confirmed;
            }
            let (kind, order_id, confirmations, block_height) =
                (tracked.kind, tracked.order_id, tracked.confirmations, tracked.block_height);
            drop(state);

            // See the EVM side of this: emitted once, on the transition,
            // not on every later poll of an already-confirmed tx.
            if newly_confirmed {
                if let Some(block_height) = block_height {
                    self.emit(Event::TxConfirmed {
                        order_id,
                        chain: self.config.utxo_chain,
                        tx_hash,
                        block_height,
                        timestamp: Utc::now(),
                    });
                }
                self.emit_kind_confirmed(
                    self.config.utxo_chain,
                    kind,
                    order_id,
                    tx_hash,
                    confirmations,
                    block_height,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relayer_chain::{
        log::{Log, TxReceipt, UtxoTx},
        mock::{MockEvmClient, MockUtxoClient},
        topics,
    };
    use relayer_model::{Address, Hash32, OrderId};

    use super::*;

    fn monitor(config: MonitorConfig) -> (Arc<MockEvmClient>, Arc<MockUtxoClient>, EventMonitor) {
        let evm = Arc::new(MockEvmClient::new());
        let utxo = Arc::new(MockUtxoClient::new());
        let monitor = EventMonitor::new(evm.clone(), utxo.clone(), config);
        (evm, utxo, monitor)
    }

    fn order_id(byte: u8) -> OrderId {
        Hash32::new([byte; 32])
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

    #[tokio::test]
    async fn evm_log_decodes_into_escrow_created_and_advances_the_cursor() {
        let (evm, _utxo, monitor) = monitor(MonitorConfig::default());
        let mut sub = monitor.subscribe();
        let oid = order_id(1);
        let tx_hash = TxHash::new([9u8; 32]);

        evm.set_tip(5);
        evm.push_log(Log {
            address: Address::new("0xescrow"),
            topics: vec![topics::escrow_created(), oid],
            data: escrow_created_data(1_000),
            block_number: 3,
            log_index: 0,
            transaction_hash: tx_hash,
        });

        monitor.poll_evm_once().await;

        let event = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        match event {
            Event::EscrowCreated { order_id: got, block_height, .. } => {
                assert_eq!(got, oid);
                assert_eq!(block_height, 3);
            }
            other => panic!("expected EscrowCreated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirmation_is_emitted_exactly_once_on_the_pending_to_confirmed_transition() {
        let config = MonitorConfig {
            evm_required_confirmations: 2,
            ..MonitorConfig::default()
        };
        let (evm, _utxo, monitor) = monitor(config);
        let mut sub = monitor.subscribe();
        let oid = order_id(2);
        let tx_hash = TxHash::new([7u8; 32]);

        monitor
            .register(MonitoredTx::new(tx_hash, Chain::Evm { chain_id: 1 }, Some(oid), TrackedEventKind::EscrowFunding, 2))
            .await
            .unwrap();

        evm.set_tip(10);
        evm.set_receipt(
            tx_hash,
            TxReceipt {
                block_height: Some(9),
                block_hash: Some(Hash32::new([0x11; 32])),
                status: true,
            },
        );
        monitor.poll_evm_once().await;
        monitor.poll_evm_once().await;
        monitor.poll_evm_once().await;

        let mut confirmed_count = 0;
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await {
            if matches!(event, Event::TxConfirmed { tx_hash: got, .. } if got == tx_hash) {
                confirmed_count += 1;
            }
        }
        assert_eq!(confirmed_count, 1, "TxConfirmed must be emitted exactly once");
    }

    #[tokio::test]
    async fn utxo_reorg_rewinds_the_cursor_and_emits_reorg() {
        let config = MonitorConfig {
            max_reorg_depth: 6,
            ..MonitorConfig::default()
        };
        let (_evm, utxo, monitor) = monitor(config);
        let mut sub = monitor.subscribe();

        utxo.set_tip(10);
        for h in 1..=10u64 {
            utxo.set_block_hash(h, BlockHash::new([h as u8; 32]));
        }
        monitor.poll_utxo_once().await;
        // drain whatever non-reorg noise accumulated.
        while tokio::time::timeout(Duration::from_millis(20), sub.recv()).await.is_ok() {}

        // The chain reorganized: the hash recorded at the cursor no longer
        // matches what a fresh lookup returns.
        utxo.set_block_hash(10, BlockHash::new([0xFF; 32]));
        utxo.set_tip(11);
        monitor.poll_utxo_once().await;

        let mut saw_reorg = false;
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await {
            if let Event::Reorg { from_height, .. } = event {
                saw_reorg = true;
                assert_eq!(from_height, 4);
            }
        }
        assert!(saw_reorg, "expected a Reorg event after the block hash mismatch");
    }

    #[tokio::test]
    async fn monitoring_error_is_emitted_after_retries_exhaust_on_transient_rpc_failures() {
        let config = MonitorConfig {
            retry: crate::retry::RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(1),
                factor: 1,
            },
            ..MonitorConfig::default()
        };
        let (evm, _utxo, monitor) = monitor(config);
        let mut sub = monitor.subscribe();

        evm.fail_next_calls(10);
        monitor.poll_evm_once().await;

        let event = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert!(matches!(event, Event::MonitoringError { .. }));
    }
}
