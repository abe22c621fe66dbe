use async_trait::async_trait;
use relayer_model::Asset;

use crate::error::AuctionError;

/// Supplies the market benchmark price a new auction's `startingPrice` and
/// `endingPrice` are derived from. `expectedRate` is sourced from an
/// injected collaborator rather than a hardcoded premium, so a deployment
/// can back it with a price oracle, a DEX quote, or (in tests) a fixed
/// value.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// The benchmark price for trading `maker_asset` into `taker_asset`, in
    /// the same unit as `taker_asset.amount`.
    async fn expected_rate(&self, maker_asset: &Asset, taker_asset: &Asset) -> Result<u128, AuctionError>;
}

/// A `RateSource` that always returns the taker asset's nominal amount
/// unmodified — useful for tests and for deployments where order amounts
/// are already expressed at the expected exchange rate.
pub struct FixedRateSource;

#[async_trait]
impl RateSource for FixedRateSource {
    async fn expected_rate(&self, _maker_asset: &Asset, taker_asset: &Asset) -> Result<u128, AuctionError> {
        Ok(taker_asset.amount)
    }
}
