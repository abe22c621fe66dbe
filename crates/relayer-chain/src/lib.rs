//! Thin request/response wrappers over the EVM and UTXO chains, exposing
//! only the operations the relayer core needs. No signing, no mempool
//! inspection, no liquidity logic - those live in external collaborators.

pub mod arguments;
pub mod error;
pub mod evm;
pub mod log;
pub mod rpc;
pub mod topics;
pub mod utxo;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use arguments::Arguments;
pub use error::ClientError;
pub use evm::{EvmClient, JsonRpcEvmClient, MAX_LOG_RANGE};
pub use log::{Log, TxReceipt, UtxoTx};
pub use topics::{KnownEvent, classify};
pub use utxo::{JsonRpcUtxoClient, UtxoClient};
