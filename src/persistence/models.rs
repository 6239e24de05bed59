//! Database record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::entities::position::{Position, PositionState};
use crate::domain::entities::signal::TradeAction;
use crate::domain::entities::trade::Trade;

/// Trade row in the append-only execution ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradeRecord {
    pub id: String,
    pub asset_id: i64,
    pub action: String, // "BUY" or "SELL"
    pub quantity: f64,
    pub price: f64,
    pub venue: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    pub fn into_trade(self) -> Option<Trade> {
        let action = match self.action.as_str() {
            "BUY" => TradeAction::Buy,
            "SELL" => TradeAction::Sell,
            _ => return None,
        };
        Some(Trade {
            id: self.id,
            asset_id: self.asset_id,
            action,
            quantity: self.quantity,
            price: self.price,
            venue: self.venue,
            status: self.status,
            timestamp: self.timestamp,
        })
    }
}

/// Position row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PositionRecord {
    pub id: String,
    pub trade_id: String,
    pub asset_id: i64,
    pub quantity: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub status: String, // "open" or "closed"
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PositionRecord {
    pub fn into_position(self) -> Option<Position> {
        let state = match self.status.as_str() {
            "open" => PositionState::Open,
            "closed" => PositionState::Closed,
            _ => return None,
        };
        Some(Position {
            id: self.id,
            trade_id: self.trade_id,
            asset_id: self.asset_id,
            quantity: self.quantity,
            entry_price: self.entry_price,
            current_price: self.current_price,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            state,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
        })
    }
}

/// Write-only observability record for one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_equity: f64,
    pub cash_balance: f64,
    pub risk_level: f64,
    pub active_positions: i64,
    pub daily_profit: f64,
}
