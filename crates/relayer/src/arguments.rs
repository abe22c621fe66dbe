//! Top-level `clap::Parser` arguments for the `relayer` binary. Flattens
//! the chain-client and event-monitor arguments from their own crates and
//! adds the knobs that only make sense once everything is wired together.

use std::{net::SocketAddr, time::Duration};

use relayer_observe::arguments::duration_from_seconds;
use tracing::level_filters::LevelFilter;

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub chain: relayer_chain::Arguments,

    #[clap(flatten)]
    pub monitor: relayer_monitor::Arguments,

    #[clap(long, env, default_value = "0.0.0.0:9588")]
    pub metrics_address: SocketAddr,

    #[clap(long, env, default_value = "warn,relayer=debug")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    /// 32-byte AES-256-GCM key protecting stored secrets at rest, as hex
    /// (an optional `0x` prefix is accepted). Must be kept stable across
    /// restarts - rotating it orphans any secret stored under the old key.
    #[clap(long, env)]
    pub secret_cipher_key: String,

    #[clap(long, env, default_value = "256")]
    pub auction_max_concurrent: usize,

    #[clap(long, env, default_value = "180", value_parser = duration_from_seconds)]
    pub auction_default_duration: Duration,

    /// The floor price, expressed in basis points of the starting price,
    /// below which no bid is accepted.
    #[clap(long, env, default_value = "9000")]
    pub auction_reserve_ratio_bps: u32,

    #[clap(long, env, default_value = "1")]
    pub auction_min_bid_increment: u128,

    #[clap(long, env, default_value = "15", value_parser = duration_from_seconds)]
    pub auction_bid_timeout_window: Duration,

    #[clap(long, env, default_value = "10", value_parser = duration_from_seconds)]
    pub auction_reprice_tick_interval: Duration,

    #[clap(long, env, default_value = "60", value_parser = duration_from_seconds)]
    pub auction_cleanup_tick_interval: Duration,

    #[clap(long, env, default_value = "3600", value_parser = duration_from_seconds)]
    pub auction_cleanup_retention: Duration,

    #[clap(long, env, default_value = "300", value_parser = duration_from_seconds)]
    pub secret_default_reveal_delay: Duration,

    #[clap(long, env, default_value = "86400", value_parser = duration_from_seconds)]
    pub secret_max_age: Duration,

    #[clap(long, env, default_value = "3600", value_parser = duration_from_seconds)]
    pub secret_partial_fill_timeout: Duration,

    #[clap(long, env, default_value = "10", value_parser = duration_from_seconds)]
    pub secret_reveal_tick_interval: Duration,

    #[clap(long, env, default_value = "3600", value_parser = duration_from_seconds)]
    pub secret_cleanup_tick_interval: Duration,

    #[clap(long, env, default_value = "1")]
    pub order_min_amount_evm: u128,

    #[clap(long, env, default_value = "1")]
    pub order_min_amount_utxo: u128,

    /// Subtracted from the maker's source-chain timelock to derive the
    /// resolver's destination-chain timelock.
    #[clap(long, env, default_value = "1800", value_parser = duration_from_seconds)]
    pub order_safety_buffer: Duration,

    #[clap(long, env, default_value = "86400", value_parser = duration_from_seconds)]
    pub order_max_lifetime: Duration,

    #[clap(long, env, default_value = "5", value_parser = duration_from_seconds)]
    pub order_expiry_tick_interval: Duration,

    #[clap(long, env, default_value = "1024")]
    pub event_channel_capacity: usize,

    /// Postgres connection string for `SwapState` persistence. Only
    /// consulted when the binary is built with the `persistence` feature;
    /// without it (or when unset) the Order Manager runs fully in-memory.
    #[clap(long, env)]
    pub db_url: Option<String>,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.chain)?;
        write!(f, "{}", self.monitor)?;
        writeln!(f, "metrics_address: {}", self.metrics_address)?;
        writeln!(f, "log_filter: {}", self.log_filter)?;
        writeln!(f, "log_stderr_threshold: {}", self.log_stderr_threshold)?;
        writeln!(f, "secret_cipher_key: REDACTED")?;
        writeln!(f, "auction_max_concurrent: {}", self.auction_max_concurrent)?;
        writeln!(f, "auction_default_duration: {:?}", self.auction_default_duration)?;
        writeln!(f, "auction_reserve_ratio_bps: {}", self.auction_reserve_ratio_bps)?;
        writeln!(f, "auction_min_bid_increment: {}", self.auction_min_bid_increment)?;
        writeln!(f, "auction_bid_timeout_window: {:?}", self.auction_bid_timeout_window)?;
        writeln!(f, "auction_reprice_tick_interval: {:?}", self.auction_reprice_tick_interval)?;
        writeln!(f, "auction_cleanup_tick_interval: {:?}", self.auction_cleanup_tick_interval)?;
        writeln!(f, "auction_cleanup_retention: {:?}", self.auction_cleanup_retention)?;
        writeln!(f, "secret_default_reveal_delay: {:?}", self.secret_default_reveal_delay)?;
        writeln!(f, "secret_max_age: {:?}", self.secret_max_age)?;
        writeln!(f, "secret_partial_fill_timeout: {:?}", self.secret_partial_fill_timeout)?;
        writeln!(f, "secret_reveal_tick_interval: {:?}", self.secret_reveal_tick_interval)?;
        writeln!(f, "secret_cleanup_tick_interval: {:?}", self.secret_cleanup_tick_interval)?;
        writeln!(f, "order_min_amount_evm: {}", self.order_min_amount_evm)?;
        writeln!(f, "order_min_amount_utxo: {}", self.order_min_amount_utxo)?;
        writeln!(f, "order_safety_buffer: {:?}", self.order_safety_buffer)?;
        writeln!(f, "order_max_lifetime: {:?}", self.order_max_lifetime)?;
        writeln!(f, "order_expiry_tick_interval: {:?}", self.order_expiry_tick_interval)?;
        writeln!(f, "event_channel_capacity: {}", self.event_channel_capacity)?;
        writeln!(f, "db_url: {}", if self.db_url.is_some() { "REDACTED" } else { "none" })?;
        Ok(())
    }
}

impl Arguments {
    pub fn auction_config(&self) -> relayer_auction::AuctionEngineConfig {
        relayer_auction::AuctionEngineConfig {
            max_concurrent_auctions: self.auction_max_concurrent,
            default_duration: self.auction_default_duration,
            reserve_ratio_bps: self.auction_reserve_ratio_bps,
            min_bid_increment: self.auction_min_bid_increment,
            bid_timeout_window: self.auction_bid_timeout_window,
            reprice_tick_interval: self.auction_reprice_tick_interval,
            cleanup_tick_interval: self.auction_cleanup_tick_interval,
            cleanup_retention: self.auction_cleanup_retention,
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    pub fn secret_config(&self) -> relayer_secrets::SecretCoordinatorConfig {
        relayer_secrets::SecretCoordinatorConfig {
            default_reveal_delay: self.secret_default_reveal_delay,
            max_secret_age: self.secret_max_age,
            partial_fill_timeout: self.secret_partial_fill_timeout,
            reveal_tick_interval: self.secret_reveal_tick_interval,
            cleanup_tick_interval: self.secret_cleanup_tick_interval,
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    pub fn order_config(&self) -> relayer_orders::OrderManagerConfig {
        relayer_orders::OrderManagerConfig {
            evm_chain: relayer_model::Chain::Evm {
                chain_id: self.chain.evm_chain_id,
            },
            utxo_chain: relayer_model::Chain::Utxo {
                network: self.chain.utxo_network,
            },
            min_amount_evm: self.order_min_amount_evm,
            min_amount_utxo: self.order_min_amount_utxo,
            safety_buffer: self.order_safety_buffer,
            max_order_lifetime: self.order_max_lifetime,
            expiry_tick_interval: self.order_expiry_tick_interval,
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    pub fn monitor_config(&self) -> relayer_monitor::MonitorConfig {
        relayer_monitor::MonitorConfig {
            evm_chain: relayer_model::Chain::Evm {
                chain_id: self.chain.evm_chain_id,
            },
            utxo_chain: relayer_model::Chain::Utxo {
                network: self.chain.utxo_network,
            },
            evm_poll_interval: self.monitor.evm_poll_interval,
            utxo_poll_interval: self.monitor.utxo_poll_interval,
            evm_escrow_addresses: self.chain.evm_escrow_factory.iter().cloned().collect(),
            evm_required_confirmations: self.monitor.evm_confirmations,
            utxo_required_confirmations: self.monitor.utxo_confirmations,
            max_reorg_depth: self.monitor.max_reorg_depth,
            retry: self.monitor.retry_config(),
            event_channel_capacity: self.event_channel_capacity,
        }
    }
}
