//! End-to-end cycle tests: scripted market data through scoring, signal
//! gating, execution, and exit monitoring against an in-memory store.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tamani::application::orchestrator::CycleOrchestrator;
use tamani::config::AppConfig;
use tamani::domain::entities::asset::{Asset, AssetClass};
use tamani::domain::entities::position::Position;
use tamani::domain::entities::signal::TradeAction;
use tamani::domain::entities::snapshot::Snapshot;
use tamani::domain::entities::trade::Trade;
use tamani::domain::errors::TradingError;
use tamani::domain::ports::{MarketDataPort, NotificationPort};
use tamani::domain::services::asset_class::AssetClassRegistry;
use tamani::domain::services::position_monitor::{PositionBook, PositionMonitor};
use tamani::domain::services::risk_ledger::RiskLedger;
use tamani::domain::services::scoring::{FundamentalStrategy, ScoringEngine, SentimentStrategy};
use tamani::domain::services::signal_generator::SignalGenerator;
use tamani::domain::services::trade_executor::TradeExecutor;
use tamani::infrastructure::execution::PaperExecutionPort;
use tamani::persistence::repository::{
    AssetRepository, PositionRepository, ScoreRepository, SystemStatusRepository, TradeRepository,
};
use tamani::persistence::{init_database, DbPool};

struct ScriptedMarket {
    snapshots: Mutex<HashMap<i64, Snapshot>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedMarket {
    fn new() -> Self {
        Self::with_delay(None)
    }

    fn with_delay(delay: Option<Duration>) -> Self {
        ScriptedMarket {
            snapshots: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    fn set(&self, snapshot: Snapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.asset_id, snapshot);
    }

    fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataPort for ScriptedMarket {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, asset: &Asset) -> Result<Snapshot, TradingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.snapshots
            .lock()
            .unwrap()
            .get(&asset.id)
            .cloned()
            .ok_or_else(|| TradingError::data_unavailable(&asset.symbol, "not scripted"))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

struct Fixed(f64);

impl FundamentalStrategy for Fixed {
    fn score(&self, _snapshot: &Snapshot) -> f64 {
        self.0
    }
}

impl SentimentStrategy for Fixed {
    fn score(&self, _asset: &Asset) -> f64 {
        self.0
    }
}

/// Snapshot that scores at the top of the scale: capped momentum and
/// volume shares, price at the session high, strong trend.
fn strong_snapshot(asset_id: i64, price: f64) -> Snapshot {
    Snapshot {
        asset_id,
        timestamp: Utc::now(),
        price,
        high: price,
        low: price * 0.98,
        volume: 1e6,
        change_pct: 5.0,
        market_cap: Some(2e9),
    }
}

/// Flat, thin snapshot that lands the composite in the exit band when the
/// fixed strategies are low.
fn weak_snapshot(asset_id: i64, price: f64) -> Snapshot {
    Snapshot {
        asset_id,
        timestamp: Utc::now(),
        price,
        high: price,
        low: price,
        volume: 0.0,
        change_pct: 0.0,
        market_cap: None,
    }
}

struct Harness {
    orchestrator: Arc<CycleOrchestrator>,
    market: Arc<ScriptedMarket>,
    notifier: Arc<RecordingNotifier>,
    book: Arc<PositionBook>,
    ledger: Arc<RiskLedger>,
    trades: Arc<TradeRepository>,
    positions: Arc<PositionRepository>,
    pool: DbPool,
}

async fn harness_built(
    config: AppConfig,
    assets: Vec<Asset>,
    market: Arc<ScriptedMarket>,
    strategy_score: f64,
    spent_today: f64,
) -> Harness {
    let pool = init_database("sqlite::memory:").await.unwrap();
    let asset_repo = AssetRepository::new(pool.clone());
    for asset in &assets {
        asset_repo.upsert(asset).await.unwrap();
    }

    let trades = Arc::new(TradeRepository::new(pool.clone()));
    let positions = Arc::new(PositionRepository::new(pool.clone()));
    let scores = Arc::new(ScoreRepository::new(pool.clone()));
    let status = Arc::new(SystemStatusRepository::new(pool.clone()));

    let registry = Arc::new(AssetClassRegistry::with_defaults());
    let book = Arc::new(PositionBook::new());
    let ledger = Arc::new(RiskLedger::rehydrated(config.risk_limits(), spent_today));
    let notifier = Arc::new(RecordingNotifier::default());

    let executor = Arc::new(TradeExecutor::new(
        Arc::new(PaperExecutionPort::new()),
        trades.clone(),
        positions.clone(),
        book.clone(),
        notifier.clone(),
        registry.clone(),
        config.exit_levels(),
    ));
    let monitor = PositionMonitor::new(
        book.clone(),
        executor.clone(),
        positions.clone(),
        notifier.clone(),
    );

    let orchestrator = Arc::new(CycleOrchestrator::new(
        config.clone(),
        assets,
        market.clone(),
        ScoringEngine::new(
            registry.clone(),
            Box::new(Fixed(strategy_score)),
            Box::new(Fixed(strategy_score)),
        ),
        SignalGenerator::new(config.signal_policy()),
        ledger.clone(),
        executor,
        monitor,
        book.clone(),
        registry,
        scores,
        trades.clone(),
        status,
        notifier.clone(),
    ));

    Harness {
        orchestrator,
        market,
        notifier,
        book,
        ledger,
        trades,
        positions,
        pool,
    }
}

async fn harness_with(config: AppConfig, strategy_score: f64, spent_today: f64) -> Harness {
    let assets = vec![Asset::new(
        1,
        "BTC",
        "Bitcoin",
        AssetClass::Crypto,
        "binance",
        "USD",
    )];
    harness_built(
        config,
        assets,
        Arc::new(ScriptedMarket::new()),
        strategy_score,
        spent_today,
    )
    .await
}

async fn harness(strategy_score: f64) -> Harness {
    harness_with(AppConfig::default(), strategy_score, 0.0).await
}

#[tokio::test]
async fn test_strong_score_opens_position_within_budget() {
    let h = harness(100.0).await;
    h.market.set(strong_snapshot(1, 100.0));

    let report = h.orchestrator.run_cycle().await.unwrap();

    assert!(!report.skipped);
    assert_eq!(report.scored, 1);
    assert_eq!(report.buys, 1);
    assert_eq!(h.book.count(), 1);

    // vol = 0.02, confidence 100: notional = 3 * 1.0 * 0.98
    assert!((h.ledger.daily_spent() - 2.94).abs() < 1e-9);

    let position = h.book.get(1).unwrap();
    assert!((position.entry_price - 100.0).abs() < 1e-9);
    // crypto exits: stop 100*(1 - 0.05*1.4), take 100*(1 + 0.12*1.3)
    assert!((position.stop_loss - 93.0).abs() < 1e-9);
    assert!((position.take_profit - 115.6).abs() < 1e-9);

    // the trade and the position are durable
    let notional = h
        .trades
        .daily_buy_notional(Utc::now().date_naive())
        .await
        .unwrap();
    assert!((notional - 2.94).abs() < 1e-6);
    assert_eq!(h.positions.get_open().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_open_position_blocks_second_entry() {
    let h = harness(100.0).await;
    h.market.set(strong_snapshot(1, 100.0));

    h.orchestrator.run_cycle().await.unwrap();
    let spent_after_first = h.ledger.daily_spent();

    h.market.set(strong_snapshot(1, 101.0));
    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.buys, 0);
    assert_eq!(h.book.count(), 1);
    assert!((h.ledger.daily_spent() - spent_after_first).abs() < 1e-9);
}

#[tokio::test]
async fn test_exhausted_budget_blocks_entry() {
    // 14.995 of the 15 cap already spent: sizing lands below the minimum
    // order notional
    let h = harness_with(AppConfig::default(), 100.0, 14.995).await;
    h.market.set(strong_snapshot(1, 100.0));

    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.buys, 0);
    assert_eq!(h.book.count(), 0);
    assert!((h.ledger.daily_spent() - 14.995).abs() < 1e-9);
}

#[tokio::test]
async fn test_rehydrated_budget_caps_entry_size() {
    let h = harness_with(AppConfig::default(), 100.0, 14.5).await;
    h.market.set(strong_snapshot(1, 100.0));

    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.buys, 1);
    // sized down to the remaining 0.5 instead of the unconstrained 2.94
    assert!((h.ledger.daily_spent() - 15.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_stop_loss_closes_position_and_allows_reentry() {
    let h = harness(100.0).await;
    h.market.set(strong_snapshot(1, 100.0));
    h.orchestrator.run_cycle().await.unwrap();
    assert_eq!(h.book.count(), 1);

    // price collapses below the 93.0 stop
    h.market.set(strong_snapshot(1, 92.0));
    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.exits, 1);
    assert_eq!(h.book.count(), 0);
    assert!(h.positions.get_open().await.unwrap().is_empty());

    // the asset is free for a fresh entry afterwards
    h.market.set(strong_snapshot(1, 95.0));
    let report = h.orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.buys, 1);
    assert_eq!(h.book.count(), 1);
}

#[tokio::test]
async fn test_take_profit_closes_position() {
    let h = harness(100.0).await;
    h.market.set(strong_snapshot(1, 100.0));
    h.orchestrator.run_cycle().await.unwrap();

    h.market.set(strong_snapshot(1, 116.0));
    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.exits, 1);
    assert_eq!(h.book.count(), 0);
}

#[tokio::test]
async fn test_weak_score_sells_open_position() {
    // fixed strategies at 0: composite = technical * 0.4 only
    let h = harness(0.0).await;
    let trade_id = {
        let trade = Trade::executed(1, "BTC", TradeAction::Buy, 0.02, 100.0, "binance");
        h.trades.append(&trade).await.unwrap();
        trade.id
    };
    let position = Position::open(&trade_id, 1, "BTC", 0.02, 100.0, 93.0, 115.6);
    h.positions.create(&position).await.unwrap();
    assert!(h.book.try_open(position));

    // flat snapshot: technical 52.5, composite 21, inside exit band
    h.market.set(weak_snapshot(1, 100.0));
    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.sells, 1);
    assert_eq!(h.book.count(), 0);
    assert!(h.positions.get_open().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_weak_score_without_position_is_noise() {
    let h = harness(0.0).await;
    h.market.set(weak_snapshot(1, 100.0));

    let report = h.orchestrator.run_cycle().await.unwrap();

    assert_eq!(report.signals, 0);
    assert_eq!(report.sells, 0);
}

#[tokio::test]
async fn test_unavailable_asset_skips_cycle_gracefully() {
    let h = harness(100.0).await;
    // nothing scripted: every fetch fails

    let report = h.orchestrator.run_cycle().await.unwrap();

    assert!(!report.skipped);
    assert_eq!(report.scored, 0);
    assert_eq!(report.buys, 0);
}

#[tokio::test]
async fn test_closed_market_skips_cycle_entirely() {
    let assets = vec![Asset::new(
        4,
        "AAPL",
        "Apple",
        AssetClass::Stock,
        "nasdaq",
        "USD",
    )];
    let h = harness_built(
        AppConfig::default(),
        assets,
        Arc::new(ScriptedMarket::new()),
        100.0,
        0.0,
    )
    .await;
    h.market.set(strong_snapshot(4, 100.0));

    // Saturday 15:00 UTC: the stock window is closed all day
    let saturday = Utc.with_ymd_and_hms(2026, 8, 22, 15, 0, 0).unwrap();
    let report = h.orchestrator.run_cycle_at(saturday).await.unwrap();

    // skipped with no side effects: no fetch, no status snapshot
    assert!(report.skipped);
    assert_eq!(h.market.fetch_count(), 0);
    let status_rows: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM system_status")
        .fetch_one(&h.pool)
        .await
        .unwrap();
    assert_eq!(status_rows.0, 0);

    // the same watchlist trades normally on a weekday afternoon
    let wednesday = Utc.with_ymd_and_hms(2026, 8, 26, 14, 0, 0).unwrap();
    let report = h.orchestrator.run_cycle_at(wednesday).await.unwrap();
    assert!(!report.skipped);
    assert_eq!(report.scored, 1);
    assert_eq!(h.market.fetch_count(), 1);
}

#[tokio::test]
async fn test_daily_report_labels_trigger_hour() {
    let h = harness(100.0).await;
    h.market.set(strong_snapshot(1, 100.0));
    h.orchestrator.run_cycle().await.unwrap();

    h.orchestrator.daily_report(9).await;

    let messages = h.notifier.messages();
    let report = messages.last().unwrap();
    assert!(report.contains("Daily report"));
    assert!(report.contains("09:00 UTC"));
    assert!(report.contains("Trades today: 1"));
    assert!(report.contains("Last trades:"));
    assert!(report.contains("BTC"));
}

#[tokio::test]
async fn test_overlapping_cycles_skip_instead_of_queue() {
    // a delayed market source keeps the first cycle in flight when the
    // second tick arrives
    let market = Arc::new(ScriptedMarket::with_delay(Some(Duration::from_millis(200))));
    market.set(strong_snapshot(1, 100.0));
    let assets = vec![Asset::new(
        1,
        "BTC",
        "Bitcoin",
        AssetClass::Crypto,
        "binance",
        "USD",
    )];
    let h = harness_built(AppConfig::default(), assets, market, 100.0, 0.0).await;

    let (first, second) = tokio::join!(h.orchestrator.run_cycle(), h.orchestrator.run_cycle());
    let first = first.unwrap();
    let second = second.unwrap();

    // exactly one of the overlapping ticks ran; the other was skipped
    assert_ne!(first.skipped, second.skipped);
    assert_eq!(h.book.count(), 1);
}
