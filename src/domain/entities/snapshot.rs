use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market snapshot for one asset, produced by a data provider fetch.
///
/// Ephemeral: superseded by the next fetch, cached only within the TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub asset_id: i64,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub change_pct: f64,
    pub market_cap: Option<f64>,
}

impl Snapshot {
    /// Position of the last price within the intraday [low, high] range.
    ///
    /// Returns None when the range is degenerate (high <= low or low <= 0).
    pub fn intraday_position(&self) -> Option<f64> {
        if self.high > self.low && self.low > 0.0 {
            Some((self.price - self.low) / (self.high - self.low))
        } else {
            None
        }
    }

    /// Crude intraday volatility estimate: range relative to last price.
    pub fn intraday_volatility(&self) -> f64 {
        if self.price > 0.0 && self.high >= self.low {
            (self.high - self.low) / self.price
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: f64, high: f64, low: f64) -> Snapshot {
        Snapshot {
            asset_id: 1,
            timestamp: Utc::now(),
            price,
            high,
            low,
            volume: 1000.0,
            change_pct: 1.0,
            market_cap: None,
        }
    }

    #[test]
    fn test_intraday_position_mid_range() {
        let s = snapshot(100.0, 110.0, 90.0);
        assert!((s.intraday_position().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_intraday_position_degenerate_range() {
        let s = snapshot(100.0, 100.0, 100.0);
        assert!(s.intraday_position().is_none());
    }

    #[test]
    fn test_intraday_volatility() {
        let s = snapshot(50000.0, 51000.0, 49000.0);
        assert!((s.intraday_volatility() - 0.04).abs() < 1e-9);
    }
}
