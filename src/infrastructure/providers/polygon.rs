//! Polygon previous-day aggregate adapter for stocks.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::domain::entities::asset::Asset;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::errors::TradingError;
use crate::domain::ports::MarketDataPort;

const POLYGON_API_BASE: &str = "https://api.polygon.io";
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct PrevAggResponse {
    results: Option<Vec<PrevAgg>>,
}

/// Previous-day bar: close, open, high, low, volume.
#[derive(Debug, Deserialize)]
struct PrevAgg {
    c: f64,
    o: f64,
    h: f64,
    l: f64,
    v: f64,
}

pub struct PolygonAdapter {
    client: Client,
    api_base: String,
    api_key: String,
}

impl PolygonAdapter {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base(POLYGON_API_BASE, api_key)
    }

    pub fn with_base(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        PolygonAdapter {
            client: Client::new(),
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch_prev(&self, symbol: &str) -> Result<Option<PrevAgg>, reqwest::Error> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/prev?apiKey={}",
            self.api_base, symbol, self.api_key
        );
        let response: PrevAggResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.results.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        }))
    }
}

#[async_trait]
impl MarketDataPort for PolygonAdapter {
    fn name(&self) -> &str {
        "polygon"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_prev(&asset.symbol).await {
                Ok(Some(bar)) if bar.c > 0.0 && bar.o > 0.0 => {
                    return Ok(Snapshot {
                        asset_id: asset.id,
                        timestamp: chrono::Utc::now(),
                        price: bar.c,
                        high: bar.h,
                        low: bar.l,
                        volume: bar.v,
                        change_pct: (bar.c - bar.o) / bar.o * 100.0,
                        market_cap: None,
                    });
                }
                Ok(_) => {
                    return Err(TradingError::data_unavailable(
                        &asset.symbol,
                        "no previous-day bar",
                    ));
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < MAX_ATTEMPTS {
                        warn!(
                            symbol = %asset.symbol,
                            attempt,
                            "Polygon request failed, retrying: {}",
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
