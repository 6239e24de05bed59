use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tamani::application::orchestrator::CycleOrchestrator;
use tamani::application::watchlist::default_watchlist;
use tamani::config::AppConfig;
use tamani::domain::entities::asset::AssetClass;
use tamani::domain::ports::MarketDataPort;
use tamani::domain::services::asset_class::AssetClassRegistry;
use tamani::domain::services::position_monitor::{PositionBook, PositionMonitor};
use tamani::domain::services::risk_ledger::RiskLedger;
use tamani::domain::services::scoring::ScoringEngine;
use tamani::domain::services::signal_generator::SignalGenerator;
use tamani::domain::services::trade_executor::TradeExecutor;
use tamani::infrastructure::execution::PaperExecutionPort;
use tamani::infrastructure::market_data::MarketDataRouter;
use tamani::infrastructure::notification::notifier_from_config;
use tamani::infrastructure::providers::{
    BinanceAdapter, BitpandaAdapter, PolygonAdapter, YahooFinanceAdapter,
};
use tamani::persistence::init_database;
use tamani::persistence::repository::{
    AssetRepository, PositionRepository, ScoreRepository, SystemStatusRepository, TradeRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tamani=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    config.validate()?;
    info!("Tamani trading system starting");

    let pool = init_database(&config.database_url).await?;

    // Seed the watchlist
    let asset_repo = AssetRepository::new(pool.clone());
    let assets = {
        let existing = asset_repo.get_all().await?;
        if existing.is_empty() {
            let defaults = default_watchlist();
            for asset in &defaults {
                asset_repo.upsert(asset).await?;
            }
            info!("Seeded default watchlist ({} assets)", defaults.len());
            defaults
        } else {
            existing
        }
    };

    let trades = Arc::new(TradeRepository::new(pool.clone()));
    let positions = Arc::new(PositionRepository::new(pool.clone()));
    let scores = Arc::new(ScoreRepository::new(pool.clone()));
    let status = Arc::new(SystemStatusRepository::new(pool.clone()));

    // Rehydrate risk state and open positions from the store
    let spent_today = trades
        .daily_buy_notional(chrono::Utc::now().date_naive())
        .await?;
    let ledger = Arc::new(RiskLedger::rehydrated(config.risk_limits(), spent_today));
    let book = Arc::new(PositionBook::load(positions.get_open().await?));
    info!(
        open_positions = book.count(),
        spent_today, "State rehydrated from database"
    );

    let registry = Arc::new(AssetClassRegistry::with_defaults());
    let notifier = notifier_from_config(&config);

    let polygon_key = config.polygon_api_key.clone().unwrap_or_default();
    let bitpanda_key = config.bitpanda_api_key.clone().unwrap_or_default();
    let market_data: Arc<dyn MarketDataPort> = Arc::new(
        MarketDataRouter::new(
            Duration::from_secs(config.snapshot_cache_ttl_seconds),
            Duration::from_secs(config.fetch_timeout_seconds),
        )
        .with_source(AssetClass::Crypto, Arc::new(BinanceAdapter::new()))
        .with_source(AssetClass::Stock, Arc::new(PolygonAdapter::new(polygon_key)))
        .with_source(AssetClass::Etf, Arc::new(YahooFinanceAdapter::new()))
        .with_source(AssetClass::Metal, Arc::new(BitpandaAdapter::new(bitpanda_key))),
    );

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
        market_data,
        ScoringEngine::with_defaults(registry.clone()),
        SignalGenerator::new(config.signal_policy()),
        ledger,
        executor,
        monitor,
        book,
        registry,
        scores,
        trades,
        status,
        notifier.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(orchestrator.run(shutdown_rx));

    notifier.notify("Tamani trading system started").await;

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    let _ = shutdown_tx.send(true);
    let _ = runner.await;

    notifier.notify("Tamani trading system stopped").await;
    info!("Shutdown complete");
    Ok(())
}
