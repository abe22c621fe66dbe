//! `clap::Parser` arguments for the EVM/UTXO JSON-RPC clients, flattened
//! into the binary's top-level `Arguments` (see `relayer::Arguments`).

use std::time::Duration;

use relayer_model::{Address, UtxoNetwork};
use relayer_observe::arguments::{display_option, duration_from_seconds};
use url::Url;

fn parse_address(s: &str) -> Result<Address, std::convert::Infallible> {
    Ok(Address::new(s))
}

#[derive(clap::Parser)]
pub struct Arguments {
    /// JSON-RPC endpoint for the EVM chain.
    #[clap(long, env, default_value = "http://localhost:8545")]
    pub evm_rpc_url: Url,

    #[clap(long, env, default_value = "1")]
    pub evm_chain_id: u64,

    /// Address of the escrow factory contract whose `EscrowCreated`,
    /// `Redeemed`, and `Refunded` logs the monitor watches for.
    #[clap(long, env, value_parser = parse_address)]
    pub evm_escrow_factory: Option<Address>,

    /// JSON-RPC endpoint for the UTXO chain.
    #[clap(long, env, default_value = "http://localhost:8332")]
    pub utxo_rpc_url: Url,

    #[clap(long, env, default_value = "mainnet")]
    pub utxo_network: UtxoNetwork,

    /// Per-request timeout applied to every JSON-RPC call on either chain.
    #[clap(long, env, default_value = "15", value_parser = duration_from_seconds)]
    pub rpc_timeout: Duration,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "evm_rpc_url: {}", self.evm_rpc_url)?;
        writeln!(f, "evm_chain_id: {}", self.evm_chain_id)?;
        display_option(f, "evm_escrow_factory", &self.evm_escrow_factory)?;
        writeln!(f, "utxo_rpc_url: {}", self.utxo_rpc_url)?;
        writeln!(f, "utxo_network: {}", self.utxo_network)?;
        writeln!(f, "rpc_timeout: {:?}", self.rpc_timeout)?;
        Ok(())
    }
}
