use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{Chain, Timelock},
    ids::{Address, OrderId, TxHash},
    order::Asset,
};

/// Status of a [`SwapState`], following the transition graph in the design.
///
/// `Completed`, `Failed`, `Expired` and `Refunded` are terminal: once
/// reached, no further transition is valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Created,
    AuctionStarted,
    ResolverChosen,
    SrcPending,
    SrcFunded,
    DstPending,
    DstFunded,
    SecretReady,
    SecretRevealed,
    DstRedeemed,
    Completed,
    Refunding,
    Refunded,
    Expired,
    Failed,
}

impl SwapStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SwapStatus::Completed | SwapStatus::Failed | SwapStatus::Expired | SwapStatus::Refunded
        )
    }
}

/// A record of an observed on-chain transaction relevant to a swap leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    pub tx_hash: TxHash,
    pub block_height: u64,
    pub confirmations: u32,
}

/// Progress of one partial fill of an order that allows partial fills.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFillState {
    pub index: u32,
    pub fill_amount: u128,
    pub status: SwapStatus,
}

/// The Order Manager's mutable view of a single swap.
///
/// Owned exclusively by the Order Manager; every other component refers to
/// it only by `order_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwapState {
    pub order_id: OrderId,
    pub status: SwapStatus,
    pub src_chain: Chain,
    pub dst_chain: Chain,
    pub maker: Address,
    pub resolver: Option<Address>,
    pub maker_asset: Asset,
    pub taker_asset: Asset,
    pub src_escrow_addr: Option<Address>,
    pub dst_escrow_addr: Option<Address>,
    pub src_txs: Vec<TxRef>,
    pub dst_txs: Vec<TxRef>,
    pub src_timelock: Timelock,
    pub dst_timelock: Timelock,
    pub expires_at: DateTime<Utc>,
    pub allow_partial_fill: bool,
    pub partial_fills: Vec<PartialFillState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SwapState {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
