use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::domain::entities::signal::TradeAction;

/// Executed trade. Immutable once written; the append-only execution ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub asset_id: i64,
    pub action: TradeAction,
    pub quantity: f64,
    pub price: f64,
    pub venue: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn executed(
        asset_id: i64,
        symbol: &str,
        action: TradeAction,
        quantity: f64,
        price: f64,
        venue: impl Into<String>,
    ) -> Self {
        Trade {
            id: generate_id("trade", symbol),
            asset_id,
            action,
            quantity,
            price,
            venue: venue.into(),
            status: "executed".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Notional value of the trade.
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Generate a unique id of the form `{prefix}_{symbol}_{nanos}`.
pub fn generate_id(prefix: &str, symbol: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{}_{}_{}", prefix, symbol, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_notional() {
        let trade = Trade::executed(1, "BTC", TradeAction::Buy, 0.5, 40000.0, "binance");
        assert_eq!(trade.notional(), 20000.0);
        assert_eq!(trade.status, "executed");
        assert!(trade.id.starts_with("trade_BTC_"));
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id("trade", "BTC");
        let b = generate_id("trade", "BTC");
        assert_ne!(a, b);
    }
}
