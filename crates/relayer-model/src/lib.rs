//! Cross-cutting types shared by every relayer core component: order and
//! swap-state shapes, the published event schema, and the error taxonomy.
//!
//! This crate has no I/O and no async runtime dependency - it is the
//! `model`-crate analogue for the relayer core, kept deliberately inert so
//! every other crate can depend on it without pulling in RPC clients,
//! database drivers, or tokio tasks.

pub mod chain;
pub mod error;
pub mod event;
pub mod hash32;
pub mod ids;
pub mod order;
pub mod state;

pub use chain::{Chain, ChainKind, Timelock, UtxoNetwork};
pub use error::RelayerError;
pub use event::{Event, EventKind};
pub use hash32::Hash32;
pub use ids::{Address, BlockHash, OrderId, SecretHash, TxHash};
pub use order::{Asset, SwapOrder};
pub use state::{PartialFillState, SwapState, SwapStatus, TxRef};
