//! Bitpanda ticker adapter for precious metals.

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

const BITPANDA_API_BASE: &str = "https://api.bitpanda.com";
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Ticker entry keyed by `{SYMBOL}_EUR`; values arrive as strings.
#[derive(Debug, Deserialize, Default)]
struct TickerEntry {
    #[serde(default)]
    last_price: String,
    #[serde(default)]
    high: String,
    #[serde(default)]
    low: String,
    #[serde(default)]
    volume: String,
}

pub struct BitpandaAdapter {
    client: Client,
    api_base: String,
    api_key: String,
}

impl BitpandaAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(BITPANDA_API_BASE, api_key)
    }

    pub fn with_base(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        BitpandaAdapter {
            client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch_ticker(&self, pair: &str) -> Result<TickerEntry, reqwest::Error> {
        let url = format!("{}/v1/ticker?symbols={}", self.api_base, pair);
        let mut tickers: HashMap<String, TickerEntry> = self
            .client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(tickers.remove(pair).unwrap_or_default())
    }
}

fn parse_or_zero(value: &str) -> f64 {
    value.parse::<f64>().unwrap_or(0.0)
}

#[async_trait]
impl MarketDataPort for BitpandaAdapter {
    fn name(&self) -> &str {
        "bitpanda"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        let pair = format!("{}_EUR", asset.symbol);
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_ticker(&pair).await {
                Ok(ticker) => {
                    let price = parse_or_zero(&ticker.last_price);
                    if price <= 0.0 {
                        return Err(TradingError::data_unavailable(
                            &asset.symbol,
                            "no price in response",
                        ));
                    }
                    return Ok(Snapshot {
                        asset_id: asset.id,
                        timestamp: chrono::Utc::now(),
                        price,
                        high: parse_or_zero(&ticker.high).max(price),
                        low: {
                            let low = parse_or_zero(&ticker.low);
                            if low > 0.0 {
                                low.min(price)
                            } else {
                                price
                            }
                        },
                        volume: parse_or_zero(&ticker.volume),
                        // The ticker carries no daily change; momentum is
                        // neutral for metals.
                        change_pct: 0.0,
                        market_cap: None,
                    });
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < MAX_ATTEMPTS {
                        warn!(
                            symbol = %asset.symbol,
                            attempt,
                            "Bitpanda request failed, retrying: {}",
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

    #[test]
    fn test_parse_or_zero() {
        assert_eq!(parse_or_zero("2105.4"), 2105.4);
        assert_eq!(parse_or_zero(""), 0.0);
        assert_eq!(parse_or_zero("n/a"), 0.0);
    }
}
