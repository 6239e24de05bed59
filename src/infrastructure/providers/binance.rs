//! Binance 24h ticker adapter for crypto assets.
//!
//! Primary crypto source; a failed request falls back to CoinGecko,
//! which also supplies market cap when it answers.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::domain::entities::asset::Asset;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::errors::TradingError;
use crate::domain::ports::MarketDataPort;
use crate::infrastructure::providers::coingecko::CoinGeckoAdapter;

const BINANCE_API_BASE: &str = "https://api.binance.com";

/// /api/v3/ticker/24hr row; Binance serializes numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    high_price: String,
    low_price: String,
    volume: String,
    price_change_percent: String,
}

pub struct BinanceAdapter {
    client: Client,
    api_base: String,
    fallback: CoinGeckoAdapter,
}

impl BinanceAdapter {
    pub fn new() -> Self {
        Self::with_base(BINANCE_API_BASE)
    }

    pub fn with_base(api_base: impl Into<String>) -> Self {
        BinanceAdapter {
            client: Client::new(),
            api_base: api_base.into(),
            fallback: CoinGeckoAdapter::new(),
        }
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<Ticker24h, reqwest::Error> {
        let url = format!(
            "{}/api/v3/ticker/24hr?symbol={}USDT",
            self.api_base, symbol
        );
        self.client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

impl Default for BinanceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_field(value: &str, symbol: &str, field: &str) -> Result<f64, TradingError> {
    value.parse::<f64>().map_err(|_| {
        TradingError::data_unavailable(symbol, format!("unparseable {} '{}'", field, value))
    })
}

#[async_trait]
impl MarketDataPort for BinanceAdapter {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        match self.fetch_ticker(&asset.symbol).await {
            Ok(ticker) => {
                let price = parse_field(&ticker.last_price, &asset.symbol, "lastPrice")?;
                if price <= 0.0 {
                    return Err(TradingError::data_unavailable(
                        &asset.symbol,
                        "non-positive price",
                    ));
                }
                Ok(Snapshot {
                    asset_id: asset.id,
                    timestamp: chrono::Utc::now(),
                    price,
                    high: parse_field(&ticker.high_price, &asset.symbol, "highPrice")?,
                    low: parse_field(&ticker.low_price, &asset.symbol, "lowPrice")?,
                    volume: parse_field(&ticker.volume, &asset.symbol, "volume")?,
                    change_pct: parse_field(
                        &ticker.price_change_percent,
                        &asset.symbol,
                        "priceChangePercent",
                    )?,
                    market_cap: None,
                })
            }
            Err(e) => {
                warn!(
                    symbol = %asset.symbol,
                    "Binance request failed, falling back to CoinGecko: {}",
                    e
                );
                self.fallback.fetch(asset).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_rejects_garbage() {
        assert!(parse_field("50000.0", "BTC", "lastPrice").is_ok());
        assert!(parse_field("n/a", "BTC", "lastPrice").is_err());
    }
}
