//! Market data routing and caching.
//!
//! `MarketDataRouter` dispatches each asset to its class's provider,
//! bounds every upstream call with a timeout, and serves snapshots from a
//! short-lived cache so repeated asks within a cycle (or tightly spaced
//! cycles) do not hammer the providers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domain::entities::asset::{Asset, AssetClass};
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::errors::TradingError;
use crate::domain::ports::MarketDataPort;

struct CacheEntry {
    fetched_at: Instant,
    snapshot: Snapshot,
}

/// TTL cache for per-asset snapshots.
pub struct SnapshotCache {
    ttl: Duration,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        SnapshotCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, asset_id: i64) -> Option<Snapshot> {
        let entries = self.entries.read().await;
        let entry = entries.get(&asset_id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.snapshot.clone())
        } else {
            None
        }
    }

    pub async fn put(&self, snapshot: Snapshot) {
        let mut entries = self.entries.write().await;
        entries.insert(
            snapshot.asset_id,
            CacheEntry {
                fetched_at: Instant::now(),
                snapshot,
            },
        );
    }

}

/// Class-dispatching, cached, timeout-bounded market data source.
pub struct MarketDataRouter {
    sources: HashMap<AssetClass, Arc<dyn MarketDataPort>>,
    cache: SnapshotCache,
    fetch_timeout: Duration,
}

impl MarketDataRouter {
    pub fn new(cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        MarketDataRouter {
            sources: HashMap::new(),
            cache: SnapshotCache::new(cache_ttl),
            fetch_timeout,
        }
    }

    pub fn with_source(mut self, class: AssetClass, source: Arc<dyn MarketDataPort>) -> Self {
        self.sources.insert(class, source);
        self
    }
}

#[async_trait]
impl MarketDataPort for MarketDataRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        if let Some(snapshot) = self.cache.get(asset.id).await {
            debug!(symbol = %asset.symbol, "Snapshot served from cache");
            return Ok(snapshot);
        }

        let source = self.sources.get(&asset.class).ok_or_else(|| {
            TradingError::data_unavailable(
                &asset.symbol,
                format!("no data source for asset class {}", asset.class.name()),
            )
        })?;

        let snapshot = match tokio::time::timeout(self.fetch_timeout, source.fetch(asset)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    symbol = %asset.symbol,
                    source = source.name(),
                    timeout_secs = self.fetch_timeout.as_secs(),
                    "Market data fetch timed out"
                );
                return Err(TradingError::data_unavailable(
                    &asset.symbol,
                    "fetch timed out",
                ));
            }
        };

        self.cache.put(snapshot.clone()).await;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(asset_id: i64, price: f64) -> Snapshot {
        Snapshot {
            asset_id,
            timestamp: Utc::now(),
            price,
            high: price * 1.02,
            low: price * 0.98,
            volume: 1e5,
            change_pct: 1.0,
            market_cap: None,
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        price: f64,
    }

    #[async_trait]
    impl MarketDataPort for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(snapshot(asset.id, self.price))
        }
    }

    struct SlowSource;

    #[async_trait]
    impl MarketDataPort for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(snapshot(asset.id, 1.0))
        }
    }

    fn btc() -> Asset {
        Asset::new(1, "BTC", "Bitcoin", AssetClass::Crypto, "binance", "USD")
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            price: 50000.0,
        });
        let router = MarketDataRouter::new(Duration::from_secs(300), Duration::from_secs(10))
            .with_source(AssetClass::Crypto, source.clone());

        let first = router.fetch(&btc()).await.unwrap();
        let second = router.fetch(&btc()).await.unwrap();

        assert_eq!(first.price, second.price);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            price: 50000.0,
        });
        let router = MarketDataRouter::new(Duration::from_millis(0), Duration::from_secs(10))
            .with_source(AssetClass::Crypto, source.clone());

        router.fetch(&btc()).await.unwrap();
        router.fetch(&btc()).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_class_source_is_unavailable() {
        let router = MarketDataRouter::new(Duration::from_secs(300), Duration::from_secs(10));
        let err = router.fetch(&btc()).await.unwrap_err();
        assert!(matches!(err, TradingError::DataUnavailable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out() {
        let router = MarketDataRouter::new(Duration::from_secs(300), Duration::from_secs(10))
            .with_source(AssetClass::Crypto, Arc::new(SlowSource));
        let err = router.fetch(&btc()).await.unwrap_err();
        assert!(matches!(err, TradingError::DataUnavailable { .. }));
    }
}
