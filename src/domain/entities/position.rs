use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::trade::generate_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    Open,
    Closed,
}

impl PositionState {
    pub fn name(&self) -> &'static str {
        match self {
            PositionState::Open => "open",
            PositionState::Closed => "closed",
        }
    }
}

/// Open or closed holding created from a BUY fill.
///
/// Stop-loss and take-profit are mandatory at open time; a position always
/// has an automatic exit path. Closing is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub trade_id: String,
    pub asset_id: i64,
    pub quantity: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub state: PositionState,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn open(
        trade_id: impl Into<String>,
        asset_id: i64,
        symbol: &str,
        quantity: f64,
        entry_price: f64,
        stop_loss: f64,
        take_profit: f64,
    ) -> Self {
        Position {
            id: generate_id("pos", symbol),
            trade_id: trade_id.into(),
            asset_id,
            quantity,
            entry_price,
            current_price: entry_price,
            stop_loss,
            take_profit,
            state: PositionState::Open,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// Whether the current price has reached the stop-loss level.
    pub fn should_stop_loss(&self) -> bool {
        self.is_open() && self.current_price <= self.stop_loss
    }

    /// Whether the current price has reached the take-profit level.
    pub fn should_take_profit(&self) -> bool {
        self.is_open() && self.current_price >= self.take_profit
    }

    /// Record a fresh market price.
    pub fn update_price(&mut self, price: f64) {
        self.current_price = price;
    }

    /// Unrealized P&L at the current price.
    pub fn unrealized_pnl(&self) -> f64 {
        self.quantity * (self.current_price - self.entry_price)
    }

    /// Mark the position closed at the given price. Terminal.
    pub fn close(&mut self, price: f64) {
        self.current_price = price;
        self.state = PositionState::Closed;
        self.closed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_position(entry: f64, stop: f64, take: f64) -> Position {
        Position::open("trade_1", 1, "BTC", 1.0, entry, stop, take)
    }

    #[test]
    fn test_stop_loss_triggers_at_or_below_threshold() {
        let mut pos = open_position(100.0, 95.0, 112.0);
        pos.current_price = 94.0;
        assert!(pos.should_stop_loss());
        assert!(!pos.should_take_profit());
    }

    #[test]
    fn test_take_profit_triggers_at_or_above_threshold() {
        let mut pos = open_position(100.0, 95.0, 112.0);
        pos.current_price = 113.0;
        assert!(pos.should_take_profit());
        assert!(!pos.should_stop_loss());
    }

    #[test]
    fn test_no_trigger_between_thresholds() {
        let pos = open_position(100.0, 95.0, 112.0);
        assert_eq!(pos.current_price, 100.0);
        assert!(!pos.should_stop_loss());
        assert!(!pos.should_take_profit());
    }

    #[test]
    fn test_closed_position_never_triggers() {
        let mut pos = open_position(100.0, 95.0, 112.0);
        pos.close(94.0);
        assert_eq!(pos.state, PositionState::Closed);
        assert!(pos.closed_at.is_some());
        assert!(!pos.should_stop_loss());
    }

    #[test]
    fn test_unrealized_pnl() {
        let mut pos = open_position(100.0, 95.0, 112.0);
        pos.current_price = 105.0;
        assert!((pos.unrealized_pnl() - 5.0).abs() < 1e-9);
    }
}
