use serde::{Deserialize, Serialize};

/// Which of the two supported chain families a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Evm,
    Utxo,
}

/// A concrete chain the relayer can interact with.
///
/// `Evm` carries the chain id (e.g. 1 for mainnet); `Utxo` carries the
/// network flavor (mainnet, testnet, regtest, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chain {
    Evm { chain_id: u64 },
    Utxo { network: UtxoNetwork },
}

impl Chain {
    pub fn kind(&self) -> ChainKind {
        match self {
            Chain::Evm { .. } => ChainKind::Evm,
            Chain::Utxo { .. } => ChainKind::Utxo,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chain::Evm { chain_id } => write!(f, "evm:{chain_id}"),
            Chain::Utxo { network } => write!(f, "utxo:{network}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoNetwork {
    Mainnet,
    Testnet,
    Regtest,
}

impl std::fmt::Display for UtxoNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UtxoNetwork::Mainnet => "mainnet",
            UtxoNetwork::Testnet => "testnet",
            UtxoNetwork::Regtest => "regtest",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UtxoNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(UtxoNetwork::Mainnet),
            "testnet" => Ok(UtxoNetwork::Testnet),
            "regtest" => Ok(UtxoNetwork::Regtest),
            other => Err(format!("unknown utxo network: {other}")),
        }
    }
}

/// A chain-specific "not before" expression.
///
/// On the EVM chain a timelock is a wall-clock unix timestamp; on the UTXO
/// chain it is conventionally a block height. The core only ever compares a
/// `Timelock` to the present, which requires knowing the current height for
/// the `Height` variant — see `Timelock::has_elapsed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Timelock {
    Timestamp(chrono::DateTime<chrono::Utc>),
    Height(u64),
}

impl Timelock {
    /// Whether the timelock has elapsed, given the current wall clock time
    /// and (if needed) the current height of the chain it was expressed on.
    pub fn has_elapsed(&self, now: chrono::DateTime<chrono::Utc>, current_height: Option<u64>) -> bool {
        match self {
            Timelock::Timestamp(t) => now >= *t,
            Timelock::Height(h) => current_height.is_some_and(|current| current >= *h),
        }
    }
}
