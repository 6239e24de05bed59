//! Per-asset-class capabilities.
//!
//! Scoring weights, exit-level adjustments, and trading windows differ by
//! asset class. Components depend on the `AssetClassSpec` interface and a
//! registry built at startup, never on the class tag directly.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::asset::AssetClass;

/// Blend weights for the composite score. Must sum to 1.0.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
}

/// Weekly trading window for one asset class, in wall-clock UTC.
#[derive(Debug, Clone)]
pub struct TradingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days: Vec<Weekday>,
}

impl TradingWindow {
    pub fn always_open() -> Self {
        TradingWindow {
            start: NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default(),
            // inclusive of every sub-second instant of the day
            end: NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or_default(),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ],
        }
    }

    pub fn weekdays(start: NaiveTime, end: NaiveTime) -> Self {
        TradingWindow {
            start,
            end,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let time = now.time();
        self.days.contains(&now.weekday()) && self.start <= time && time <= self.end
    }
}

/// Capabilities one asset class contributes to the cycle.
pub trait AssetClassSpec: Send + Sync {
    fn class(&self) -> AssetClass;

    fn score_weights(&self) -> ScoreWeights;

    /// Multiplier applied to the configured base stop-loss percentage.
    fn stop_loss_adjustment(&self) -> f64;

    /// Multiplier applied to the configured base take-profit percentage.
    fn take_profit_adjustment(&self) -> f64;

    fn trading_window(&self) -> TradingWindow;
}

pub struct CryptoSpec;

impl AssetClassSpec for CryptoSpec {
    fn class(&self) -> AssetClass {
        AssetClass::Crypto
    }

    fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            technical: 0.4,
            fundamental: 0.3,
            sentiment: 0.3,
        }
    }

    fn stop_loss_adjustment(&self) -> f64 {
        1.4
    }

    fn take_profit_adjustment(&self) -> f64 {
        1.3
    }

    fn trading_window(&self) -> TradingWindow {
        TradingWindow::always_open()
    }
}

pub struct StockSpec;

impl AssetClassSpec for StockSpec {
    fn class(&self) -> AssetClass {
        AssetClass::Stock
    }

    fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            technical: 0.3,
            fundamental: 0.5,
            sentiment: 0.2,
        }
    }

    fn stop_loss_adjustment(&self) -> f64 {
        1.2
    }

    fn take_profit_adjustment(&self) -> f64 {
        1.2
    }

    fn trading_window(&self) -> TradingWindow {
        TradingWindow::weekdays(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
        )
    }
}

pub struct EtfSpec;

impl AssetClassSpec for EtfSpec {
    fn class(&self) -> AssetClass {
        AssetClass::Etf
    }

    fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            technical: 0.2,
            fundamental: 0.6,
            sentiment: 0.2,
        }
    }

    fn stop_loss_adjustment(&self) -> f64 {
        1.0
    }

    fn take_profit_adjustment(&self) -> f64 {
        1.1
    }

    fn trading_window(&self) -> TradingWindow {
        TradingWindow::weekdays(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default(),
        )
    }
}

pub struct MetalSpec;

impl AssetClassSpec for MetalSpec {
    fn class(&self) -> AssetClass {
        AssetClass::Metal
    }

    fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            technical: 0.3,
            fundamental: 0.4,
            sentiment: 0.3,
        }
    }

    fn stop_loss_adjustment(&self) -> f64 {
        0.8
    }

    fn take_profit_adjustment(&self) -> f64 {
        1.0
    }

    fn trading_window(&self) -> TradingWindow {
        TradingWindow::always_open()
    }
}

/// Registry of asset-class capabilities, built once at startup.
pub struct AssetClassRegistry {
    specs: HashMap<AssetClass, Arc<dyn AssetClassSpec>>,
}

impl AssetClassRegistry {
    pub fn with_defaults() -> Self {
        let mut specs: HashMap<AssetClass, Arc<dyn AssetClassSpec>> = HashMap::new();
        specs.insert(AssetClass::Crypto, Arc::new(CryptoSpec));
        specs.insert(AssetClass::Stock, Arc::new(StockSpec));
        specs.insert(AssetClass::Etf, Arc::new(EtfSpec));
        specs.insert(AssetClass::Metal, Arc::new(MetalSpec));
        AssetClassRegistry { specs }
    }

    pub fn get(&self, class: AssetClass) -> Arc<dyn AssetClassSpec> {
        // with_defaults registers every variant; the fallback only matters
        // for a registry built with a custom subset.
        self.specs
            .get(&class)
            .cloned()
            .unwrap_or_else(|| Arc::new(CryptoSpec))
    }

    /// Whether any of the given classes is inside its trading window.
    pub fn any_window_open<I>(&self, classes: I, now: DateTime<Utc>) -> bool
    where
        I: IntoIterator<Item = AssetClass>,
    {
        classes
            .into_iter()
            .any(|class| self.get(class).trading_window().is_open_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_crypto_window_open_on_sunday_night() {
        // Sunday 2026-08-23 23:30 UTC
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 23, 30, 0).unwrap();
        assert!(CryptoSpec.trading_window().is_open_at(now));
        assert!(!StockSpec.trading_window().is_open_at(now));
    }

    #[test]
    fn test_always_open_covers_the_last_instant_of_day() {
        let now = Utc
            .with_ymd_and_hms(2026, 8, 23, 23, 59, 59)
            .unwrap()
            .with_nanosecond(900_000_000)
            .unwrap();
        assert!(CryptoSpec.trading_window().is_open_at(now));
    }

    #[test]
    fn test_stock_window_open_on_weekday_afternoon() {
        // Wednesday 2026-08-26 14:00 UTC
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 14, 0, 0).unwrap();
        assert!(StockSpec.trading_window().is_open_at(now));
    }

    #[test]
    fn test_stock_window_closed_before_open() {
        let now = Utc.with_ymd_and_hms(2026, 8, 26, 7, 59, 59).unwrap();
        assert!(!StockSpec.trading_window().is_open_at(now));
    }

    #[test]
    fn test_registry_any_window_open() {
        let registry = AssetClassRegistry::with_defaults();
        // Saturday afternoon: stocks closed, crypto open
        let now = Utc.with_ymd_and_hms(2026, 8, 22, 15, 0, 0).unwrap();
        assert!(!registry.any_window_open([AssetClass::Stock], now));
        assert!(registry.any_window_open([AssetClass::Stock, AssetClass::Crypto], now));
    }

    #[test]
    fn test_score_weights_sum_to_one() {
        let registry = AssetClassRegistry::with_defaults();
        for class in [
            AssetClass::Crypto,
            AssetClass::Stock,
            AssetClass::Etf,
            AssetClass::Metal,
        ] {
            let w = registry.get(class).score_weights();
            assert!((w.technical + w.fundamental + w.sentiment - 1.0).abs() < 1e-9);
        }
    }
}
