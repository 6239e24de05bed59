//! Trade execution service: routes gated signals to the execution venue,
//! records trades, and opens positions on BUY fills.
//!
//! Execution is idempotent per (asset, action, cycle): a retried call for a
//! signal already executed in the current cycle returns the recorded trade
//! without touching the venue again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::domain::entities::asset::Asset;
use crate::domain::entities::position::Position;
use crate::domain::entities::signal::TradeAction;
use crate::domain::entities::trade::Trade;
use crate::domain::errors::TradingError;
use crate::domain::ports::{ExecutionPort, NotificationPort};
use crate::domain::services::asset_class::AssetClassRegistry;
use crate::domain::services::position_monitor::PositionBook;
use crate::persistence::repository::{PositionRepository, TradeRepository};

/// Base exit percentages; per-class multipliers come from the registry.
#[derive(Debug, Clone, Copy)]
pub struct ExitLevels {
    pub base_stop_loss_pct: f64,
    pub base_take_profit_pct: f64,
}

impl Default for ExitLevels {
    fn default() -> Self {
        ExitLevels {
            base_stop_loss_pct: 0.05,
            base_take_profit_pct: 0.12,
        }
    }
}

type CycleKey = (i64, TradeAction, u64);

pub struct TradeExecutor {
    port: Arc<dyn ExecutionPort>,
    trades: Arc<TradeRepository>,
    positions: Arc<PositionRepository>,
    book: Arc<PositionBook>,
    notifier: Arc<dyn NotificationPort>,
    registry: Arc<AssetClassRegistry>,
    exit_levels: ExitLevels,
    executed: Mutex<HashMap<CycleKey, Trade>>,
}

impl TradeExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        port: Arc<dyn ExecutionPort>,
        trades: Arc<TradeRepository>,
        positions: Arc<PositionRepository>,
        book: Arc<PositionBook>,
        notifier: Arc<dyn NotificationPort>,
        registry: Arc<AssetClassRegistry>,
        exit_levels: ExitLevels,
    ) -> Self {
        TradeExecutor {
            port,
            trades,
            positions,
            book,
            notifier,
            registry,
            exit_levels,
            executed: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the dedupe entries of previous cycles.
    pub fn begin_cycle(&self) {
        let mut executed = self.lock_executed();
        executed.clear();
    }

    fn lock_executed(&self) -> std::sync::MutexGuard<'_, HashMap<CycleKey, Trade>> {
        match self.executed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Stop-loss price for a BUY at the given price.
    pub fn stop_loss_for(&self, asset: &Asset, price: f64) -> f64 {
        let adjustment = self.registry.get(asset.class).stop_loss_adjustment();
        price * (1.0 - self.exit_levels.base_stop_loss_pct * adjustment)
    }

    /// Take-profit price for a BUY at the given price.
    pub fn take_profit_for(&self, asset: &Asset, price: f64) -> f64 {
        let adjustment = self.registry.get(asset.class).take_profit_adjustment();
        price * (1.0 + self.exit_levels.base_take_profit_pct * adjustment)
    }

    /// Execute a trade on the venue, record it, and open a position for
    /// BUY fills.
    ///
    /// A port failure leaves no trace: no trade row, no position, and the
    /// caller rolls back its budget commit. A persistence failure after a
    /// successful fill is a durability gap and raises a critical alert,
    /// but does not fail the call.
    pub async fn execute(
        &self,
        asset: &Asset,
        action: TradeAction,
        quantity: f64,
        price: f64,
        cycle_id: u64,
    ) -> Result<Trade, TradingError> {
        if quantity <= 0.0 {
            return Err(TradingError::execution_failure(
                &asset.symbol,
                "non-positive quantity",
            ));
        }

        let key = (asset.id, action, cycle_id);
        if let Some(trade) = self.lock_executed().get(&key) {
            warn!(
                symbol = %asset.symbol,
                action = %action,
                cycle_id,
                "Duplicate execute call in cycle, returning recorded trade"
            );
            return Ok(trade.clone());
        }

        if action == TradeAction::Buy && self.book.has_open(asset.id) {
            return Err(TradingError::execution_failure(
                &asset.symbol,
                "an open position already exists for this asset",
            ));
        }

        let order_id = self
            .port
            .place(&asset.venue, &asset.symbol, action, quantity)
            .await?;

        info!(
            symbol = %asset.symbol,
            action = %action,
            quantity,
            price,
            order_id = %order_id,
            "Order filled"
        );

        let trade = Trade::executed(asset.id, &asset.symbol, action, quantity, price, &asset.venue);
        if let Err(e) = self.trades.append(&trade).await {
            error!("Durability gap: trade {} executed but not recorded: {}", trade.id, e);
            self.notifier
                .notify(&format!(
                    "CRITICAL: {} {} {} @ {} executed on {} but could not be recorded: {}",
                    trade.action, trade.quantity, asset.symbol, trade.price, asset.venue, e
                ))
                .await;
        }

        if action == TradeAction::Buy {
            self.open_position(asset, &trade).await;
        }

        self.lock_executed().insert(key, trade.clone());

        self.notifier
            .notify(&format!(
                "Executed {} {:.6} {} @ {} {} on {}",
                trade.action, trade.quantity, asset.symbol, trade.price, asset.currency, asset.venue
            ))
            .await;

        Ok(trade)
    }

    async fn open_position(&self, asset: &Asset, trade: &Trade) {
        let position = Position::open(
            &trade.id,
            asset.id,
            &asset.symbol,
            trade.quantity,
            trade.price,
            self.stop_loss_for(asset, trade.price),
            self.take_profit_for(asset, trade.price),
        );

        if !self.book.try_open(position.clone()) {
            // The pre-placement check makes this unreachable in a
            // well-formed cycle; surface it loudly if it ever happens.
            error!(
                symbol = %asset.symbol,
                "Refusing to register second open position for asset"
            );
            return;
        }

        info!(
            symbol = %asset.symbol,
            position_id = %position.id,
            stop_loss = position.stop_loss,
            take_profit = position.take_profit,
            "Position opened"
        );

        if let Err(e) = self.positions.create(&position).await {
            error!(
                "Durability gap: position {} opened but not recorded: {}",
                position.id, e
            );
            self.notifier
                .notify(&format!(
                    "CRITICAL: position on {} opened but could not be recorded: {}",
                    asset.symbol, e
                ))
                .await;
        }
    }
}
