use std::time::Duration;

use async_trait::async_trait;
use relayer_model::{Address, Hash32, TxHash};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    error::ClientError,
    log::{Log, TxReceipt},
    rpc::JsonRpcTransport,
};

/// Maximum block range `get_logs` will request in a single RPC call;
/// batches larger ranges internally rather than ever widening this.
pub const MAX_LOG_RANGE: u64 = 100;

/// The minimal EVM chain client the core needs. No signing, no gas
/// estimation, no mempool inspection - only what the event monitor and the
/// order manager's confirmation tracking require.
#[async_trait]
pub trait EvmClient: Send + Sync {
    async fn tip_height(&self) -> Result<u64, ClientError>;

    /// Returns logs in `[from_height, to_height]` from the given contract
    /// addresses, internally chunked to [`MAX_LOG_RANGE`]-block windows.
    async fn get_logs(
        &self,
        from_height: u64,
        to_height: u64,
        addresses: &[Address],
    ) -> Result<Vec<Log>, ClientError>;

    async fn get_tx_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ClientError>;

    /// Used only by external collaborators (e.g. the resolver) - the core
    /// itself never broadcasts.
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<TxHash, ClientError>;
}

pub struct JsonRpcEvmClient {
    transport: JsonRpcTransport,
}

impl JsonRpcEvmClient {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            transport: JsonRpcTransport::new(url, timeout),
        }
    }

    async fn get_logs_single_range(
        &self,
        from_height: u64,
        to_height: u64,
        addresses: &[Address],
    ) -> Result<Vec<Log>, ClientError> {
        #[derive(Deserialize)]
        struct RawLog {
            address: String,
            topics: Vec<String>,
            data: String,
            #[serde(rename = "blockNumber")]
            block_number: String,
            #[serde(rename = "logIndex")]
            log_index: String,
            #[serde(rename = "transactionHash")]
            transaction_hash: String,
        }

        let filter = json!({
            "fromBlock": format!("0x{:x}", from_height),
            "toBlock": format!("0x{:x}", to_height),
            "address": addresses.iter().map(Address::as_str).collect::<Vec<_>>(),
        });
        let raw: Vec<RawLog> = self
            .transport
            .call("eth_getLogs", [filter])
            .await?;

        raw.into_iter()
            .map(|l| {
                Ok(Log {
                    address: Address::new(l.address),
                    topics: l
                        .topics
                        .iter()
                        .map(|t| parse_hash(t))
                        .collect::<Result<_, _>>()?,
                    data: hex::decode(l.data.trim_start_matches("0x"))
                        .map_err(|e| ClientError::permanent(format!("bad log data: {e}")))?,
                    block_number: parse_hex_u64(&l.block_number)?,
                    log_index: parse_hex_u64(&l.log_index)?,
                    transaction_hash: parse_hash(&l.transaction_hash)?,
                })
            })
            .collect()
    }
}

fn parse_hash(s: &str) -> Result<Hash32, ClientError> {
    s.parse()
        .map_err(|e| ClientError::permanent(format!("bad 32-byte hash {s}: {e}")))
}

fn parse_hex_u64(s: &str) -> Result<u64, ClientError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ClientError::permanent(format!("bad hex integer {s}: {e}")))
}

#[async_trait]
impl EvmClient for JsonRpcEvmClient {
    async fn tip_height(&self) -> Result<u64, ClientError> {
        let hex: String = self
            .transport
            .call("eth_blockNumber", Vec::<serde_json::Value>::new())
            .await?;
        parse_hex_u64(&hex)
    }

    async fn get_logs(
        &self,
        from_height: u64,
        to_height: u64,
        addresses: &[Address],
    ) -> Result<Vec<Log>, ClientError> {
        if from_height > to_height {
            return Ok(Vec::new());
        }
        let mut logs = Vec::new();
        let mut start = from_height;
        while start <= to_height {
            let end = (start + MAX_LOG_RANGE - 1).min(to_height);
            logs.extend(self.get_logs_single_range(start, end, addresses).await?);
            start = end + 1;
        }
        Ok(logs)
    }

    async fn get_tx_receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>, ClientError> {
        #[derive(Deserialize)]
        struct RawReceipt {
            #[serde(rename = "blockNumber")]
            block_number: Option<String>,
            #[serde(rename = "blockHash")]
            block_hash: Option<String>,
            status: Option<String>,
        }

        let raw: Option<RawReceipt> = self
            .transport
            .call("eth_getTransactionReceipt", [tx_hash.to_string()])
            .await?;
        raw.map(|r| {
            Ok(TxReceipt {
                block_height: r.block_number.as_deref().map(parse_hex_u64).transpose()?,
                block_hash: r.block_hash.as_deref().map(parse_hash).transpose()?,
                status: r.status.as_deref() == Some("0x1"),
            })
        })
        .transpose()
    }

    async fn broadcast(&self, raw_tx: &[u8]) -> Result<TxHash, ClientError> {
        let tx_hex = format!("0x{}", hex::encode(raw_tx));
        let tx_hash: String = self
            .transport
            .call("eth_sendRawTransaction", [tx_hex])
            .await?;
        parse_hash(&tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_range_batching_respects_cap() {
        // 250 blocks should split into three windows of at most 100.
        let from = 1_000u64;
        let to = 1_249u64;
        let mut windows = Vec::new();
        let mut start = from;
        while start <= to {
            let end = (start + MAX_LOG_RANGE - 1).min(to);
            windows.push((start, end));
            start = end + 1;
        }
        assert_eq!(windows, vec![(1000, 1099), (1100, 1199), (1200, 1249)]);
        for (s, e) in &windows {
            assert!(e - s < MAX_LOG_RANGE);
        }
    }
}
