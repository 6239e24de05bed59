//! Cycle orchestration.
//!
//! `CycleOrchestrator` drives the periodic trading cycle: snapshot the
//! watchlist, score, generate signals, gate entries through the risk
//! ledger, execute, then sweep open positions for stop-loss/take-profit
//! exits. A cycle guard skips a tick when the previous cycle is still
//! running, so two cycles never interleave.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::domain::entities::asset::Asset;
use crate::domain::entities::signal::{Signal, TradeAction};
use crate::domain::errors::TradingError;
use crate::domain::ports::{MarketDataPort, NotificationPort};
use crate::domain::services::asset_class::AssetClassRegistry;
use crate::domain::services::position_monitor::{PositionBook, PositionMonitor};
use crate::domain::services::risk_ledger::RiskLedger;
use crate::domain::services::scoring::ScoringEngine;
use crate::domain::services::signal_generator::{ScoredAsset, SignalGenerator};
use crate::domain::services::trade_executor::TradeExecutor;
use crate::persistence::models::SystemStatusSnapshot;
use crate::persistence::repository::{ScoreRepository, SystemStatusRepository, TradeRepository};

/// Orders below this notional are noise and never placed.
const MIN_ORDER_NOTIONAL: f64 = 0.01;

/// Outcome of one cycle, for logs and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleReport {
    pub cycle_id: u64,
    pub scored: usize,
    pub signals: usize,
    pub buys: usize,
    pub sells: usize,
    pub exits: usize,
    pub skipped: bool,
}

impl CycleReport {
    fn skipped() -> Self {
        CycleReport {
            skipped: true,
            ..CycleReport::default()
        }
    }
}

pub struct CycleOrchestrator {
    config: AppConfig,
    assets: Vec<Asset>,
    market_data: Arc<dyn MarketDataPort>,
    scoring: ScoringEngine,
    signals: SignalGenerator,
    ledger: Arc<RiskLedger>,
    executor: Arc<TradeExecutor>,
    monitor: PositionMonitor,
    book: Arc<PositionBook>,
    registry: Arc<AssetClassRegistry>,
    scores: Arc<ScoreRepository>,
    trades: Arc<TradeRepository>,
    status: Arc<SystemStatusRepository>,
    notifier: Arc<dyn NotificationPort>,
    cycle_guard: tokio::sync::Mutex<()>,
    cycle_seq: AtomicU64,
}

impl CycleOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        assets: Vec<Asset>,
        market_data: Arc<dyn MarketDataPort>,
        scoring: ScoringEngine,
        signals: SignalGenerator,
        ledger: Arc<RiskLedger>,
        executor: Arc<TradeExecutor>,
        monitor: PositionMonitor,
        book: Arc<PositionBook>,
        registry: Arc<AssetClassRegistry>,
        scores: Arc<ScoreRepository>,
        trades: Arc<TradeRepository>,
        status: Arc<SystemStatusRepository>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        CycleOrchestrator {
            config,
            assets,
            market_data,
            scoring,
            signals,
            ledger,
            executor,
            monitor,
            book,
            registry,
            scores,
            trades,
            status,
            notifier,
            cycle_guard: tokio::sync::Mutex::new(()),
            cycle_seq: AtomicU64::new(1),
        }
    }

    /// Run one full trading cycle.
    ///
    /// If a previous cycle is still running, this tick is skipped rather
    /// than queued.
    pub async fn run_cycle(&self) -> Result<CycleReport, TradingError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle against the given wall-clock, which drives the
    /// trading-window gate.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, TradingError> {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("Previous cycle still running, skipping this tick");
            return Ok(CycleReport::skipped());
        };

        let cycle_id = self.cycle_seq.fetch_add(1, Ordering::SeqCst);
        if !self
            .registry
            .any_window_open(self.assets.iter().map(|a| a.class), now)
        {
            info!(cycle_id, "No watched asset class inside its trading window, skipping cycle");
            return Ok(CycleReport::skipped());
        }
        info!(cycle_id, "Trading cycle started");
        self.executor.begin_cycle();

        // Class trading windows gate which assets participate this cycle.
        let tradable: Vec<&Asset> = self
            .assets
            .iter()
            .filter(|asset| {
                let open = self
                    .registry
                    .get(asset.class)
                    .trading_window()
                    .is_open_at(now);
                if !open {
                    debug!(symbol = %asset.symbol, "Outside trading window, skipping");
                }
                open
            })
            .collect();

        let fetches = tradable.iter().map(|asset| async move {
            let result = self.market_data.fetch(asset).await;
            (*asset, result)
        });
        let results = futures_util::future::join_all(fetches).await;

        let mut scored = Vec::with_capacity(results.len());
        let mut prices = HashMap::new();
        for (asset, result) in results {
            match result {
                Ok(snapshot) => {
                    let score = self.scoring.score(asset, &snapshot);
                    if let Err(e) = self.scores.append(&score).await {
                        warn!(symbol = %asset.symbol, "Failed to persist score: {}", e);
                    }
                    prices.insert(asset.id, snapshot.price);
                    scored.push(ScoredAsset {
                        asset: asset.clone(),
                        snapshot,
                        score,
                    });
                }
                Err(e) => {
                    // One dark asset never takes down the cycle.
                    warn!(symbol = %asset.symbol, "Excluded from cycle: {}", e);
                }
            }
        }

        let signals = self.signals.generate(&scored, &self.book.open_asset_ids());
        info!(
            cycle_id,
            scored = scored.len(),
            signals = signals.len(),
            "Signals generated"
        );

        let mut buys = 0;
        let mut sells = 0;
        if self.config.enable_trading {
            let by_id: HashMap<i64, &ScoredAsset> =
                scored.iter().map(|entry| (entry.asset.id, entry)).collect();
            for signal in &signals {
                let Some(entry) = by_id.get(&signal.asset_id) else {
                    continue;
                };
                match signal.action {
                    TradeAction::Buy => {
                        if self.try_enter(entry, signal, cycle_id).await {
                            buys += 1;
                        }
                    }
                    TradeAction::Sell => {
                        if self
                            .monitor
                            .close_position(
                                &entry.asset,
                                signal.reference_price,
                                cycle_id,
                                "Weak score exit",
                            )
                            .await
                        {
                            sells += 1;
                        }
                    }
                }
            }
        } else {
            info!(cycle_id, "Trading disabled, signals not executed");
        }

        // Sweep exits with this cycle's fresh prices.
        let asset_map: HashMap<i64, Asset> = self
            .assets
            .iter()
            .map(|asset| (asset.id, asset.clone()))
            .collect();
        let exits = self
            .monitor
            .check_positions(&asset_map, &prices, cycle_id)
            .await;

        self.record_status().await;

        info!(cycle_id, buys, sells, exits, "Trading cycle finished");
        Ok(CycleReport {
            cycle_id,
            scored: scored.len(),
            signals: signals.len(),
            buys,
            sells,
            exits,
            skipped: false,
        })
    }

    /// Risk-gate a BUY signal and execute it.
    ///
    /// Gate order: open-position check, sizing against the remaining daily
    /// budget, concentration, then the atomic budget commit. A failed
    /// execution rolls the commit back.
    async fn try_enter(&self, entry: &ScoredAsset, signal: &Signal, cycle_id: u64) -> bool {
        let asset = &entry.asset;
        if self.book.has_open(asset.id) {
            debug!(symbol = %asset.symbol, "Position already open, skipping entry");
            return false;
        }
        if signal.reference_price <= 0.0 {
            warn!(symbol = %asset.symbol, "Non-positive reference price, skipping entry");
            return false;
        }

        let volatility = entry.snapshot.intraday_volatility();
        let remaining = self.ledger.remaining_daily_budget();
        let notional = self
            .ledger
            .size_position(signal.confidence, volatility, remaining);
        if notional < MIN_ORDER_NOTIONAL {
            debug!(
                symbol = %asset.symbol,
                notional,
                remaining,
                "Sized below minimum order, skipping entry"
            );
            return false;
        }
        if !self
            .ledger
            .check_concentration(notional, self.config.portfolio_value)
        {
            info!(
                symbol = %asset.symbol,
                notional,
                "Concentration limit reached, skipping entry"
            );
            return false;
        }
        if let Err(e) = self.ledger.commit(notional) {
            info!(symbol = %asset.symbol, "{}", e);
            return false;
        }

        let quantity = notional / signal.reference_price;
        match self
            .executor
            .execute(
                asset,
                TradeAction::Buy,
                quantity,
                signal.reference_price,
                cycle_id,
            )
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(symbol = %asset.symbol, "Entry failed, budget restored: {}", e);
                self.ledger.rollback(notional);
                false
            }
        }
    }

    async fn record_status(&self) {
        let unrealized = self.book.total_unrealized_pnl();
        let limits = self.ledger.limits();
        let status = SystemStatusSnapshot {
            timestamp: Utc::now(),
            total_equity: self.config.portfolio_value + unrealized,
            cash_balance: self.ledger.remaining_daily_budget(),
            risk_level: if limits.daily_cap > 0.0 {
                self.ledger.daily_spent() / limits.daily_cap
            } else {
                0.0
            },
            active_positions: self.book.count() as i64,
            daily_profit: unrealized,
        };
        if let Err(e) = self.status.append(&status).await {
            warn!("Failed to persist system status: {}", e);
        }
    }

    /// Hourly liveness probe: database reachability plus a one-line
    /// summary of the ledger and the book.
    pub async fn health_check(&self) {
        let today = Utc::now().date_naive();
        match self.trades.count_for_date(today).await {
            Ok(trades_today) => {
                info!(
                    trades_today,
                    open_positions = self.book.count(),
                    daily_spent = self.ledger.daily_spent(),
                    remaining_budget = self.ledger.remaining_daily_budget(),
                    "Health check passed"
                );
            }
            Err(e) => {
                error!("Health check failed, database unreachable: {}", e);
                self.notifier
                    .notify(&format!("CRITICAL: health check failed: {}", e))
                    .await;
            }
        }
    }

    /// Build and send the daily summary for the given trigger hour.
    pub async fn daily_report(&self, hour: u32) {
        let today = Utc::now().date_naive();
        let trades_today = match self.trades.count_for_date(today).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Daily report could not count trades: {}", e);
                0
            }
        };

        let mut lines = vec![
            format!("Daily report {} at {:02}:00 UTC", today, hour),
            format!("Trades today: {}", trades_today),
            format!(
                "Budget spent: {:.2} / {:.2}",
                self.ledger.daily_spent(),
                self.ledger.limits().daily_cap
            ),
            format!("Open positions: {}", self.book.count()),
        ];
        for position in self.book.snapshot() {
            lines.push(format!(
                "  {} qty {:.6} entry {:.2} now {:.2} (P&L {:+.2})",
                position.trade_id,
                position.quantity,
                position.entry_price,
                position.current_price,
                position.unrealized_pnl()
            ));
        }
        lines.push(format!(
            "Unrealized P&L: {:+.2}",
            self.book.total_unrealized_pnl()
        ));

        match self.trades.get_recent(5).await {
            Ok(records) => {
                let recent: Vec<_> = records
                    .into_iter()
                    .filter_map(|record| record.into_trade())
                    .collect();
                if !recent.is_empty() {
                    lines.push("Last trades:".to_string());
                    for trade in recent {
                        let symbol = self
                            .assets
                            .iter()
                            .find(|a| a.id == trade.asset_id)
                            .map(|a| a.symbol.as_str())
                            .unwrap_or("?");
                        lines.push(format!(
                            "  {} {:.6} {} @ {:.2} on {}",
                            trade.action, trade.quantity, symbol, trade.price, trade.venue
                        ));
                    }
                }
            }
            Err(e) => warn!("Daily report could not list recent trades: {}", e),
        }

        self.notifier.notify(&lines.join("\n")).await;
    }

    /// Main scheduling loop: the 15-minute cycle, the hourly health check,
    /// and daily reports at the configured hours. Runs until the shutdown
    /// signal flips.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut cycle_tick =
            scheduler_interval(Duration::from_secs(self.config.cycle_interval_seconds));
        let mut health_tick = scheduler_interval(Duration::from_secs(
            self.config.health_check_interval_seconds,
        ));
        let mut report_tick = scheduler_interval(Duration::from_secs(60));
        let mut last_report: Option<(NaiveDate, u32)> = None;

        info!(
            cycle_interval_secs = self.config.cycle_interval_seconds,
            report_hours = ?self.config.report_hours,
            "Orchestrator started"
        );

        loop {
            tokio::select! {
                _ = cycle_tick.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Trading cycle failed: {}", e);
                    }
                }
                _ = health_tick.tick() => {
                    self.health_check().await;
                }
                _ = report_tick.tick() => {
                    let now = Utc::now();
                    let hour = now.hour();
                    if self.config.report_hours.contains(&hour) {
                        let key = (now.date_naive(), hour);
                        if last_report != Some(key) {
                            self.daily_report(hour).await;
                            last_report = Some(key);
                        }
                    }
                }
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received, stopping orchestrator");
                        break;
                    }
                }
            }
        }
    }
}

/// Interval that drops ticks missed while a job overran. A trigger that
/// fired mid-job is never replayed as a back-to-back catch-up run.
fn scheduler_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_interval_drops_missed_ticks() {
        let mut tick = scheduler_interval(Duration::from_secs(900));
        tick.tick().await;

        // the job overran past two scheduled ticks; one late tick fires
        tokio::time::advance(Duration::from_secs(2000)).await;
        tick.tick().await;

        // the second missed tick is dropped, not replayed back-to-back:
        // the next tick waits for the next period boundary
        let start = tokio::time::Instant::now();
        tick.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(600));
    }
}
