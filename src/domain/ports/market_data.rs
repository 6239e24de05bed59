use async_trait::async_trait;

use crate::domain::entities::asset::Asset;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::errors::TradingError;

/// Per-asset-class market data source.
///
/// One implementation per asset class; the core is agnostic to the
/// provider's request/response shapes.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Name of this data source, for logging.
    fn name(&self) -> &str;

    /// Fetch a fresh snapshot for the asset.
    ///
    /// A failure means the asset is unavailable for the cycle, never a
    /// cycle-wide abort.
    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError>;
}
