//! CoinGecko market data adapter for crypto assets.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

use crate::domain::entities::asset::Asset;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::errors::TradingError;
use crate::domain::ports::MarketDataPort;

const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// One row of /coins/markets.
#[derive(Debug, Deserialize)]
struct MarketRow {
    current_price: Option<f64>,
    high_24h: Option<f64>,
    low_24h: Option<f64>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap: Option<f64>,
}

pub struct CoinGeckoAdapter {
    client: Client,
    api_base: String,
    /// Ticker symbol to CoinGecko coin id.
    coin_ids: HashMap<String, String>,
}

impl CoinGeckoAdapter {
    pub fn new() -> Self {
        Self::with_base(COINGECKO_API_BASE)
    }

    pub fn with_base(api_base: impl Into<String>) -> Self {
        let mut coin_ids = HashMap::new();
        for (symbol, id) in [
            ("BTC", "bitcoin"),
            ("ETH", "ethereum"),
            ("SOL", "solana"),
            ("BNB", "binancecoin"),
            ("XRP", "ripple"),
            ("ADA", "cardano"),
            ("DOGE", "dogecoin"),
        ] {
            coin_ids.insert(symbol.to_string(), id.to_string());
        }
        CoinGeckoAdapter {
            client: Client::new(),
            api_base: api_base.into(),
            coin_ids,
        }
    }

    fn coin_id(&self, asset: &Asset) -> String {
        self.coin_ids
            .get(&asset.symbol)
            .cloned()
            .unwrap_or_else(|| asset.name.to_lowercase().replace(' ', "-"))
    }

    async fn fetch_row(&self, coin_id: &str) -> Result<MarketRow, reqwest::Error> {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&ids={}",
            self.api_base, coin_id
        );
        let rows: Vec<MarketRow> = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows.into_iter().next().unwrap_or(MarketRow {
            current_price: None,
            high_24h: None,
            low_24h: None,
            total_volume: None,
            price_change_percentage_24h: None,
            market_cap: None,
        }))
    }
}

impl Default for CoinGeckoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataPort for CoinGeckoAdapter {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        let coin_id = self.coin_id(asset);
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_row(&coin_id).await {
                Ok(row) => {
                    let price = row.current_price.filter(|p| *p > 0.0).ok_or_else(|| {
                        TradingError::data_unavailable(&asset.symbol, "no price in response")
                    })?;
                    return Ok(Snapshot {
                        asset_id: asset.id,
                        timestamp: chrono::Utc::now(),
                        price,
                        high: row.high_24h.unwrap_or(price),
                        low: row.low_24h.unwrap_or(price),
                        volume: row.total_volume.unwrap_or(0.0),
                        change_pct: row.price_change_percentage_24h.unwrap_or(0.0),
                        market_cap: row.market_cap,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < MAX_ATTEMPTS {
                        warn!(
                            symbol = %asset.symbol,
                            attempt,
                            "CoinGecko request failed, retrying: {}",
                            last_error
                        );
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(TradingError::data_unavailable(&asset.symbol, &last_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::asset::AssetClass;

    #[test]
    fn test_known_symbol_maps_to_coin_id() {
        let adapter = CoinGeckoAdapter::new();
        let asset = Asset::new(1, "BTC", "Bitcoin", AssetClass::Crypto, "binance", "USD");
        assert_eq!(adapter.coin_id(&asset), "bitcoin");
    }

    #[test]
    fn test_unknown_symbol_falls_back_to_slugged_name() {
        let adapter = CoinGeckoAdapter::new();
        let asset = Asset::new(
            2,
            "WEIRD",
            "Weird Coin",
            AssetClass::Crypto,
            "binance",
            "USD",
        );
        assert_eq!(adapter.coin_id(&asset), "weird-coin");
    }
}
