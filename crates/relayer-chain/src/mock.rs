//! In-memory test doubles for [`crate::evm::EvmClient`] and
//! [`crate::utxo::UtxoClient`]. These are hand-written rather than
//! `mockall`-generated because the monitor's tests need to mutate the
//! backing state (advance the tip, push a log) between polls, which reads
//! more clearly as a small fake than as a sequence of `.expect_*()` calls.

use std::sync::Mutex;

use async_trait::async_trait;
use relayer_model::{Address, BlockHash, TxHash};

use crate::{
    error::ClientError,
    evm::EvmClient,
    log::{Log, TxReceipt, UtxoTx},
    utxo::UtxoClient,
};

#[derive(Default)]
struct EvmState {
    tip: u64,
    logs: Vec<Log>,
    receipts: std::collections::HashMap<TxHash, TxReceipt>,
    fail_next: u32,
}

/// A fake EVM client whose tip height, logs, and receipts are injected by
/// the test, and which can be told to fail its next N calls with a
/// transient error to exercise retry/backoff.
#[derive(Default)]
pub struct MockEvmClient {
    state: Mutex<EvmState>,
}

impl MockEvmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tip(&self, tip: u64) {
        self.state.lock().unwrap().tip = tip;
    }

    pub fn push_log(&self, log: Log) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn set_receipt(&self, tx_hash: TxHash, receipt: TxReceipt) {
        self.state.lock().unwrap().receipts.insert(tx_hash, receipt);
    }

    pub fn fail_next_calls(&self, count: u32) {
        self.state.lock().unwrap().fail_next = count;
    }

    fn maybe_fail(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ClientError::transient("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EvmClient for MockEvmClient {
    async fn tip_height(&self) -> Result<u64, ClientError> {
        self.maybe_fail()?;
        Ok(self.state.lock().unwrap().tip)
    }

    async fn get_logs(
        &self,
        from_height: u64,
        to_height: u64,
        addresses: &[Address],
    ) -> Result<Vec<Log>, ClientError> {
        self.maybe_fail()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .logs
            .iter()
            .filter(|l| {
                l.block_number >= from_height
                    && l.block_number <= to_height
                    && (addresses.is_empty() || addresses.contains(&l.address))
            })
            .cloned()
            .collect())
    }

    async fn get_tx_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ClientError> {
        self.maybe_fail()?;
        Ok(self.state.lock().unwrap().receipts.get(&tx_hash).cloned())
    }

    async fn broadcast(&self, _raw_tx: &[u8]) -> Result<TxHash, ClientError> {
        self.maybe_fail()?;
        Ok(TxHash::ZERO)
    }
}

#[derive(Default)]
struct UtxoState {
    tip: u64,
    txs: std::collections::HashMap<TxHash, UtxoTx>,
    block_hashes: std::collections::HashMap<u64, BlockHash>,
    fail_next: u32,
}

/// A fake UTXO client with the same injectable-failure behavior as
/// [`MockEvmClient`].
#[derive(Default)]
pub struct MockUtxoClient {
    state: Mutex<UtxoState>,
}

impl MockUtxoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tip(&self, tip: u64) {
        self.state.lock().unwrap().tip = tip;
    }

    pub fn set_tx(&self, txid: TxHash, tx: UtxoTx) {
        self.state.lock().unwrap().txs.insert(txid, tx);
    }

    pub fn set_block_hash(&self, height: u64, hash: BlockHash) {
        self.state.lock().unwrap().block_hashes.insert(height, hash);
    }

    pub fn fail_next_calls(&self, count: u32) {
        self.state.lock().unwrap().fail_next = count;
    }

    fn maybe_fail(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ClientError::transient("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl UtxoClient for MockUtxoClient {
    async fn tip_height(&self) -> Result<u64, ClientError> {
        self.maybe_fail()?;
        Ok(self.state.lock().unwrap().tip)
    }

    async fn get_tx(&self, txid: TxHash) -> Result<Option<UtxoTx>, ClientError> {
        self.maybe_fail()?;
        Ok(self.state.lock().unwrap().txs.get(&txid).cloned())
    }

    async fn get_block_hash(&self, height: u64) -> Result<Option<BlockHash>, ClientError> {
        self.maybe_fail()?;
        Ok(self.state.lock().unwrap().block_hashes.get(&height).copied())
    }

    async fn broadcast(&self, _raw_tx: &[u8]) -> Result<TxHash, ClientError> {
        self.maybe_fail()?;
        Ok(TxHash::ZERO)
    }
}
