//! Open-position tracking and exit monitoring.
//!
//! `PositionBook` is the in-memory source of truth for open positions and
//! enforces at most one open position per asset. `PositionMonitor` walks
//! the book with the cycle's fresh prices and closes positions whose
//! stop-loss or take-profit level has been reached.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::domain::entities::asset::Asset;
use crate::domain::entities::position::Position;
use crate::domain::entities::signal::TradeAction;
use crate::domain::ports::NotificationPort;
use crate::domain::services::trade_executor::TradeExecutor;
use crate::persistence::repository::PositionRepository;

/// In-memory set of open positions, keyed by asset.
///
/// The per-asset key is what enforces the one-open-position-per-asset
/// rule: `try_open` refuses a second insert for the same asset.
#[derive(Default)]
pub struct PositionBook {
    inner: Mutex<HashMap<i64, Position>>,
}

impl PositionBook {
    pub fn new() -> Self {
        PositionBook::default()
    }

    /// Seed the book from persisted open positions at startup.
    pub fn load(positions: Vec<Position>) -> Self {
        let mut inner = HashMap::new();
        for position in positions {
            if !position.is_open() {
                continue;
            }
            if let Some(previous) = inner.insert(position.asset_id, position) {
                warn!(
                    position_id = %previous.id,
                    asset_id = previous.asset_id,
                    "Multiple open positions persisted for asset, keeping latest"
                );
            }
        }
        PositionBook {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Position>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register an open position. Returns false if the asset already has
    /// one, leaving the book unchanged.
    pub fn try_open(&self, position: Position) -> bool {
        let mut inner = self.lock();
        if inner.contains_key(&position.asset_id) {
            return false;
        }
        inner.insert(position.asset_id, position);
        true
    }

    pub fn has_open(&self, asset_id: i64) -> bool {
        self.lock().contains_key(&asset_id)
    }

    pub fn get(&self, asset_id: i64) -> Option<Position> {
        self.lock().get(&asset_id).cloned()
    }

    /// Mark the asset's open position with a fresh price and return the
    /// updated copy.
    pub fn update_price(&self, asset_id: i64, price: f64) -> Option<Position> {
        let mut inner = self.lock();
        let position = inner.get_mut(&asset_id)?;
        position.update_price(price);
        Some(position.clone())
    }

    /// Remove the asset's position from the book, closing it at the given
    /// price. Returns the closed position.
    pub fn close(&self, asset_id: i64, price: f64) -> Option<Position> {
        let mut inner = self.lock();
        let mut position = inner.remove(&asset_id)?;
        position.close(price);
        Some(position)
    }

    pub fn open_asset_ids(&self) -> HashSet<i64> {
        self.lock().keys().copied().collect()
    }

    pub fn snapshot(&self) -> Vec<Position> {
        self.lock().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Sum of unrealized P&L across all open positions.
    pub fn total_unrealized_pnl(&self) -> f64 {
        self.lock().values().map(|p| p.unrealized_pnl()).sum()
    }
}

/// Walks open positions each cycle and executes exits.
pub struct PositionMonitor {
    book: Arc<PositionBook>,
    executor: Arc<TradeExecutor>,
    positions: Arc<PositionRepository>,
    notifier: Arc<dyn NotificationPort>,
}

impl PositionMonitor {
    pub fn new(
        book: Arc<PositionBook>,
        executor: Arc<TradeExecutor>,
        positions: Arc<PositionRepository>,
        notifier: Arc<dyn NotificationPort>,
    ) -> Self {
        PositionMonitor {
            book,
            executor,
            positions,
            notifier,
        }
    }

    /// Refresh open positions with the cycle's prices and close any whose
    /// stop-loss or take-profit level is hit. Assets with no fresh price
    /// this cycle keep their last known price and are left alone.
    ///
    /// Returns the number of positions closed.
    pub async fn check_positions(
        &self,
        assets: &HashMap<i64, Asset>,
        prices: &HashMap<i64, f64>,
        cycle_id: u64,
    ) -> usize {
        let mut closed = 0;

        for stale in self.book.snapshot() {
            let Some(&price) = prices.get(&stale.asset_id) else {
                continue;
            };

            let Some(position) = self.book.update_price(stale.asset_id, price) else {
                continue;
            };
            if let Err(e) = self.positions.update_price(&position.id, price).await {
                warn!(position_id = %position.id, "Failed to persist price update: {}", e);
            }

            let reason = if position.should_stop_loss() {
                "stop-loss"
            } else if position.should_take_profit() {
                "take-profit"
            } else {
                continue;
            };

            let Some(asset) = assets.get(&position.asset_id) else {
                warn!(
                    asset_id = position.asset_id,
                    "Exit level hit but asset missing from watchlist, leaving position open"
                );
                continue;
            };

            info!(
                symbol = %asset.symbol,
                price,
                stop_loss = position.stop_loss,
                take_profit = position.take_profit,
                reason,
                "Exit level hit, closing position"
            );

            if self.close_position(asset, price, cycle_id, reason).await {
                closed += 1;
            }
        }

        closed
    }

    /// Sell out of the asset's open position and retire it from the book.
    ///
    /// A failed exit order leaves the position open; it is retried on the
    /// next cycle. Returns whether the position was closed.
    pub async fn close_position(
        &self,
        asset: &Asset,
        price: f64,
        cycle_id: u64,
        reason: &str,
    ) -> bool {
        let Some(position) = self.book.get(asset.id) else {
            return false;
        };

        match self
            .executor
            .execute(asset, TradeAction::Sell, position.quantity, price, cycle_id)
            .await
        {
            Ok(_) => {
                let Some(final_position) = self.book.close(asset.id, price) else {
                    return false;
                };
                let pnl = final_position.unrealized_pnl();
                if let Err(e) = self.positions.close(&final_position.id, price).await {
                    error!(
                        "Durability gap: position {} closed but not recorded: {}",
                        final_position.id, e
                    );
                    self.notifier
                        .notify(&format!(
                            "CRITICAL: position on {} closed but could not be recorded: {}",
                            asset.symbol, e
                        ))
                        .await;
                }
                self.notifier
                    .notify(&format!(
                        "{} on {}: sold {:.6} @ {} (P&L {:+.2})",
                        reason, asset.symbol, final_position.quantity, price, pnl
                    ))
                    .await;
                true
            }
            Err(e) => {
                // Position stays open, retried next cycle.
                warn!(
                    symbol = %asset.symbol,
                    reason,
                    "Exit order failed, will retry next cycle: {}",
                    e
                );
                false
            }
        }
    }
}
