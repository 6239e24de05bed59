//! Yahoo Finance chart adapter for ETFs.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::domain::entities::asset::Asset;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::errors::TradingError;
use crate::domain::ports::MarketDataPort;

const YAHOO_API_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<f64>,
    chart_previous_close: Option<f64>,
}

pub struct YahooFinanceAdapter {
    client: Client,
    api_base: String,
}

impl YahooFinanceAdapter {
    pub fn new() -> Self {
        Self::with_base(YAHOO_API_BASE)
    }

    pub fn with_base(api_base: impl Into<String>) -> Self {
        YahooFinanceAdapter {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    async fn fetch_meta(&self, symbol: &str) -> Result<ChartMeta, String> {
        let url = format!("{}/{}?interval=1d&range=5d", self.api_base, symbol);
        let response: ChartResponse = self
            .client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?
            .json()
            .await
            .map_err(|e| e.to_string())?;

        if let Some(error) = response.chart.error {
            return Err(error.description);
        }
        response
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0).meta)
                }
            })
            .ok_or_else(|| "empty chart result".to_string())
    }
}

impl Default for YahooFinanceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataPort for YahooFinanceAdapter {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_meta(&asset.symbol).await {
                Ok(meta) => {
                    let price = meta.regular_market_price.filter(|p| *p > 0.0).ok_or_else(
                        || TradingError::data_unavailable(&asset.symbol, "no price in response"),
                    )?;
                    let change_pct = meta
                        .chart_previous_close
                        .filter(|c| *c > 0.0)
                        .map(|close| (price - close) / close * 100.0)
                        .unwrap_or(0.0);
                    return Ok(Snapshot {
                        asset_id: asset.id,
                        timestamp: chrono::Utc::now(),
                        price,
                        high: meta.regular_market_day_high.unwrap_or(price),
                        low: meta.regular_market_day_low.unwrap_or(price),
                        volume: meta.regular_market_volume.unwrap_or(0.0),
                        change_pct,
                        market_cap: None,
                    });
                }
                Err(e) => {
                    last_error = e;
                    if attempt < MAX_ATTEMPTS {
                        warn!(
                            symbol = %asset.symbol,
                            attempt,
                            "Yahoo request failed, retrying: {}",
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
