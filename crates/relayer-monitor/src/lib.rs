//! Watches both chains for HTLC lifecycle events and keeps per-transaction
//! confirmation state, independent of whatever the Order Manager does with
//! that information. See [`monitor::EventMonitor`] for the entry point.

pub mod arguments;
pub mod decode;
pub mod metrics;
pub mod monitor;
pub mod retry;
pub mod subscription;
pub mod types;

pub use arguments::Arguments;
pub use monitor::{EventMonitor, MonitorConfig};
pub use retry::RetryConfig;
pub use subscription::Subscription;
pub use types::{MonitoredTx, TrackedEventKind, TxStatus};
