use async_trait::async_trait;

use crate::domain::entities::signal::TradeAction;
use crate::domain::errors::TradingError;

/// Order placement on a trading venue.
///
/// Assumed at-least-once from the venue's perspective; the trade executor
/// dedupes per (asset, action, cycle) before calling this port.
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    /// Name of this execution venue adapter, for logging.
    fn name(&self) -> &str;

    /// Place a market order. Returns the venue-assigned order id.
    async fn place(
        &self,
        venue: &str,
        symbol: &str,
        side: TradeAction,
        quantity: f64,
    ) -> Result<String, TradingError>;
}
