use relayer_model::{Address, Hash32, TxHash};

/// A decoded EVM log entry, uniform regardless of which event it is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash32>,
    pub data: Vec<u8>,
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: TxHash,
}

/// Receipt of a mined EVM transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub block_height: Option<u64>,
    pub block_hash: Option<Hash32>,
    pub status: bool,
}

/// A UTXO-chain transaction's confirmation state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UtxoTx {
    pub block_height: Option<u64>,
    pub confirmations: u32,
}
