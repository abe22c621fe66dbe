//! `clap::Parser` arguments for the event monitor.

use std::time::Duration;

use relayer_observe::arguments::duration_from_seconds;

#[derive(clap::Parser)]
pub struct Arguments {
    #[clap(long, env, default_value = "12", value_parser = duration_from_seconds)]
    pub evm_poll_interval: Duration,

    #[clap(long, env, default_value = "12")]
    pub evm_confirmations: u32,

    #[clap(long, env, default_value = "30", value_parser = duration_from_seconds)]
    pub utxo_poll_interval: Duration,

    #[clap(long, env, default_value = "6")]
    pub utxo_confirmations: u32,

    /// Bound on how far back a detected reorg is allowed to rewind the
    /// tracked cursor before the monitor halts the chain for manual
    /// resolution.
    #[clap(long, env, default_value = "6")]
    pub max_reorg_depth: u64,

    #[clap(long, env, default_value = "3")]
    pub retry_max_retries: u32,

    #[clap(long, env, default_value = "5", value_parser = duration_from_seconds)]
    pub retry_delay: Duration,

    #[clap(long, env, default_value = "2")]
    pub retry_backoff_multiplier: u32,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "evm_poll_interval: {:?}", self.evm_poll_interval)?;
        writeln!(f, "evm_confirmations: {}", self.evm_confirmations)?;
        writeln!(f, "utxo_poll_interval: {:?}", self.utxo_poll_interval)?;
        writeln!(f, "utxo_confirmations: {}", self.utxo_confirmations)?;
        writeln!(f, "max_reorg_depth: {}", self.max_reorg_depth)?;
        writeln!(f, "retry_max_retries: {}", self.retry_max_retries)?;
        writeln!(f, "retry_delay: {:?}", self.retry_delay)?;
        writeln!(f, "retry_backoff_multiplier: {}", self.retry_backoff_multiplier)?;
        Ok(())
    }
}

impl Arguments {
    pub fn retry_config(&self) -> crate::retry::RetryConfig {
        crate::retry::RetryConfig {
            max_retries: self.retry_max_retries,
            base_delay: self.retry_delay,
            factor: self.retry_backoff_multiplier,
        }
    }
}
