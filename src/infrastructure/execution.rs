//! Execution adapters.
//!
//! `PaperExecutionPort` fills every order instantly against the caller's
//! reference price, which is all the automated flow needs until real
//! venue connectivity lands.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::domain::entities::signal::TradeAction;
use crate::domain::errors::TradingError;
use crate::domain::ports::ExecutionPort;

pub struct PaperExecutionPort {
    sequence: AtomicU64,
}

impl PaperExecutionPort {
    pub fn new() -> Self {
        PaperExecutionPort {
            sequence: AtomicU64::new(1),
        }
    }
}

impl Default for PaperExecutionPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionPort for PaperExecutionPort {
    fn name(&self) -> &str {
        "paper"
    }

    async fn place(
        &self,
        venue: &str,
        symbol: &str,
        side: TradeAction,
        quantity: f64,
    ) -> Result<String, TradingError> {
        if quantity <= 0.0 {
            return Err(TradingError::execution_failure(
                symbol,
                "non-positive quantity",
            ));
        }
        let order_id = format!("paper-{}", self.sequence.fetch_add(1, Ordering::SeqCst));
        info!(venue, symbol, side = %side, quantity, order_id = %order_id, "Paper order filled");
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paper_orders_get_unique_ids() {
        let port = PaperExecutionPort::new();
        let a = port
            .place("binance", "BTC", TradeAction::Buy, 1.0)
            .await
            .unwrap();
        let b = port
            .place("binance", "BTC", TradeAction::Sell, 1.0)
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_paper_rejects_zero_quantity() {
        let port = PaperExecutionPort::new();
        let result = port.place("binance", "BTC", TradeAction::Buy, 0.0).await;
        assert!(result.is_err());
    }
}
