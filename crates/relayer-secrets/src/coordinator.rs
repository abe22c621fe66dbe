use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use rand::RngCore;
use relayer_model::{Event, OrderId};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::{
    crypto::SecretCipher,
    error::SecretError,
    merkle::MerkleSecretTree,
    types::{PartialFillInfo, SecretStatus, StoredSecret},
};

#[derive(Clone, Copy, Debug)]
pub struct SecretCoordinatorConfig {
    pub default_reveal_delay: Duration,
    pub max_secret_age: Duration,
    /// How long a Merkle secret tree accepts `coordinate_partial_reveal`
    /// calls after `setup_partial_fill`, independent of `max_secret_age`.
    pub partial_fill_timeout: Duration,
    pub reveal_tick_interval: Duration,
    pub cleanup_tick_interval: Duration,
    pub event_channel_capacity: usize,
}

impl Default for SecretCoordinatorConfig {
    fn default() -> Self {
        Self {
            default_reveal_delay: Duration::from_secs(300),
            max_secret_age: Duration::from_secs(24 * 3600),
            partial_fill_timeout: Duration::from_secs(3600),
            reveal_tick_interval: Duration::from_secs(10),
            cleanup_tick_interval: Duration::from_secs(3600),
            event_channel_capacity: 1024,
        }
    }
}

/// Receives a preimage the instant the reveal scheduler auto-reveals it, so
/// the resolver path has the secret without it ever passing through the
/// public event stream (the event stream only ever carries `SecretRevealed`,
/// a signal with no plaintext attached).
pub trait RevealSink: Send + Sync {
    fn deliver(&self, order_id: OrderId, index: u32, secret: &[u8]);
}

struct State {
    secrets: HashMap<(OrderId, u32), StoredSecret>,
    trees: HashMap<OrderId, (MerkleSecretTree, chrono::DateTime<Utc>)>,
}

/// Stores encrypted preimages, builds Merkle trees for partial-fill orders,
/// and reveals secrets exactly once the dual leakage condition is met:
/// destination funding already observed (enforced by the caller only
/// invoking `schedule_reveal` after `DstFunded`) and the reveal delay has
/// elapsed (enforced here).
pub struct SecretCoordinator {
    cipher: SecretCipher,
    config: SecretCoordinatorConfig,
    state: Mutex<State>,
    events: broadcast::Sender<Event>,
    sink: Option<Arc<dyn RevealSink>>,
}

impl SecretCoordinator {
    pub fn new(cipher: SecretCipher, config: SecretCoordinatorConfig, sink: Option<Arc<dyn RevealSink>>) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            cipher,
            config,
            state: Mutex::new(State {
                secrets: HashMap::new(),
                trees: HashMap::new(),
            }),
            events,
            sink,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn emit(&self, event: Event) {
        let _ = self.events.send(event);
    }

    /// `store(orderId, secret, index=0, partialFillIndex?)`. Rejects unless
    /// `secret` is exactly 32 bytes and `(order_id, index)` is unseen.
    pub async fn store(
        &self,
        order_id: OrderId,
        secret: &[u8],
        index: u32,
        partial_fill_index: Option<u32>,
    ) -> Result<(), SecretError> {
        let mut state = self.state.lock().await;
        self.store_locked(&mut state, order_id, secret, index, partial_fill_index)
    }

    fn store_locked(
        &self,
        state: &mut State,
        order_id: OrderId,
        secret: &[u8],
        index: u32,
        partial_fill_index: Option<u32>,
    ) -> Result<(), SecretError> {
        if secret.len() != 32 {
            return Err(SecretError::WrongLength(secret.len()));
        }
        if state.secrets.contains_key(&(order_id, index)) {
            return Err(SecretError::AlreadyStored { order_id, index });
        }
        let mut secret_hash_bytes = [0u8; 32];
        secret_hash_bytes.copy_from_slice(&Sha256::digest(secret));
        let ciphertext = self.cipher.encrypt(secret)?;
        state.secrets.insert(
            (order_id, index),
            StoredSecret {
                order_id,
                index,
                secret_hash: relayer_model::Hash32::new(secret_hash_bytes),
                ciphertext,
                status: SecretStatus::Pending,
                reveal_at: None,
                stored_at: Utc::now(),
                revealed_at: None,
                partial_fill_index,
            },
        );
        Ok(())
    }

    /// `scheduleReveal(orderId, index=0, delaySeconds?)`. Requires status
    /// `pending`.
    pub async fn schedule_reveal(
        &self,
        order_id: OrderId,
        index: u32,
        delay: Option<Duration>,
    ) -> Result<(), SecretError> {
        let mut state = self.state.lock().await;
        let secret = state
            .secrets
            .get_mut(&(order_id, index))
            .ok_or(SecretError::NotFound { order_id, index })?;
        if secret.status != SecretStatus::Pending {
            return Err(SecretError::WrongStatus {
                order_id,
                index,
                status: secret.status.as_str(),
                expected: "pending",
            });
        }
        let delay = delay.unwrap_or(self.config.default_reveal_delay);
        let reveal_at = Utc::now()
            + chrono::Duration::from_std(delay).map_err(|e| SecretError::Crypto(e.to_string()))?;
        secret.reveal_at = Some(reveal_at);
        secret.status = SecretStatus::Ready;
        drop(state);

        self.emit(Event::SecretReady {
            order_id,
            index,
            reveal_at,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// `reveal(orderId, index=0) -> plaintext`. Requires status `ready` and
    /// `now >= revealAt`; flips status to `revealed` and delivers the
    /// plaintext exactly once.
    pub async fn reveal(&self, order_id: OrderId, index: u32) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        let plaintext = {
            let mut state = self.state.lock().await;
            self.reveal_locked(&mut state, order_id, index)?
        };
        self.emit(Event::SecretRevealed {
            order_id,
            index,
            timestamp: Utc::now(),
        });
        if let Some(sink) = &self.sink {
            sink.deliver(order_id, index, &plaintext);
        }
        Ok(plaintext)
    }

    fn reveal_locked(
        &self,
        state: &mut State,
        order_id: OrderId,
        index: u32,
    ) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        let secret = state
            .secrets
            .get_mut(&(order_id, index))
            .ok_or(SecretError::NotFound { order_id, index })?;
        if secret.status != SecretStatus::Ready {
            return Err(SecretError::WrongStatus {
                order_id,
                index,
                status: secret.status.as_str(),
                expected: "ready",
            });
        }
        let reveal_at = secret.reveal_at.expect("ready secret always has reveal_at");
        if Utc::now() < reveal_at {
            return Err(SecretError::TooEarly { order_id, index });
        }
        let plaintext = self.cipher.decrypt(&secret.ciphertext)?;
        secret.status = SecretStatus::Revealed;
        secret.revealed_at = Some(Utc::now());
        secret.ciphertext.fill(0);
        Ok(plaintext)
    }

    /// `setupPartialFill(orderId, totalAmount, maxFills) -> MerkleSecretTree`.
    /// Generates `maxFills + 1` random preimages (the extra leaf covers any
    /// remainder left uncovered by explicit fills), stores each, and returns
    /// the tree.
    pub async fn setup_partial_fill(
        &self,
        order_id: OrderId,
        max_fills: u32,
    ) -> Result<MerkleSecretTree, SecretError> {
        let mut state = self.state.lock().await;
        if state.trees.contains_key(&order_id) {
            return Err(SecretError::TreeAlreadyExists(order_id));
        }

        let leaf_count = max_fills as usize + 1;
        let mut secrets = Vec::with_capacity(leaf_count);
        let mut rng = rand::thread_rng();
        for _ in 0..leaf_count {
            let mut secret = [0u8; 32];
            rng.fill_bytes(&mut secret);
            secrets.push(secret);
        }

        let tree = MerkleSecretTree::build(&secrets);
        for (index, secret) in secrets.iter().enumerate() {
            self.store_locked(&mut state, order_id, secret, index as u32, Some(index as u32))?;
        }
        state.trees.insert(order_id, (tree.clone(), Utc::now()));
        Ok(tree)
    }

    /// `coordinatePartialReveal(orderId, fillIndex, fillAmount) -> PartialFillInfo`.
    pub async fn coordinate_partial_reveal(
        &self,
        order_id: OrderId,
        fill_index: u32,
        fill_amount: u128,
    ) -> Result<PartialFillInfo, SecretError> {
        let proof = {
            let state = self.state.lock().await;
            let (tree, created_at) = state
                .trees
                .get(&order_id)
                .ok_or(SecretError::NoTree(order_id))?;
            let timeout = chrono::Duration::from_std(self.config.partial_fill_timeout).unwrap_or_default();
            if Utc::now() > *created_at + timeout {
                return Err(SecretError::PartialFillExpired(order_id));
            }
            tree.proof(fill_index as usize)
                .ok_or(SecretError::FillIndexOutOfRange(fill_index, tree.leaves.len()))?
        };
        let plaintext = self.reveal(order_id, fill_index).await?;
        Ok(PartialFillInfo {
            plaintext,
            proof,
            fill_amount,
        })
    }

    /// The ~10s reveal ticker: any `ready` secret past its `revealAt` is
    /// revealed exactly once.
    pub async fn tick_reveals(&self) {
        let due: Vec<(OrderId, u32)> = {
            let state = self.state.lock().await;
            let now = Utc::now();
            state
                .secrets
                .values()
                .filter(|s| s.status == SecretStatus::Ready && s.reveal_at.is_some_and(|at| at <= now))
                .map(|s| (s.order_id, s.index))
                .collect()
        };
        for (order_id, index) in due {
            if let Err(err) = self.reveal(order_id, index).await {
                tracing::warn!(%order_id, index, error = %err, "scheduled reveal failed");
            }
        }
    }

    /// The ~1h cleanup tick: secrets older than `maxSecretAge` are marked
    /// `expired`; secrets past `2 * maxSecretAge` are discarded outright.
    pub async fn tick_cleanup(&self) {
        let now = Utc::now();
        let max_age = chrono::Duration::from_std(self.config.max_secret_age)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let mut state = self.state.lock().await;
        state.secrets.retain(|_, s| now - s.stored_at < max_age * 2);
        for secret in state.secrets.values_mut() {
            if now - secret.stored_at >= max_age && secret.status != SecretStatus::Revealed {
                secret.status = SecretStatus::Expired;
                secret.ciphertext.fill(0);
            }
        }
    }

    pub async fn status_of(&self, order_id: OrderId, index: u32) -> Option<SecretStatus> {
        self.state
            .lock()
            .await
            .secrets
            .get(&(order_id, index))
            .map(|s| s.status)
    }

    /// Runs both tickers until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let reveal_self = self.clone();
        let reveal_cancel = cancel.clone();
        let reveal_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(reveal_self.config.reveal_tick_interval);
            loop {
                tokio::select! {
                    _ = reveal_cancel.cancelled() => break,
                    _ = ticker.tick() => reveal_self.tick_reveals().await,
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

        let _ = tokio::join!(reveal_task, cleanup_task);
    }
}
