//! Data access layer for assets, trades, scores, positions, and status.

use chrono::NaiveDate;
use sqlx::Row;
use tracing::{debug, error};

use super::models::*;
use super::{DatabaseError, DbPool};
use crate::domain::entities::asset::{Asset, AssetClass};
use crate::domain::entities::position::Position;
use crate::domain::entities::score::Score;
use crate::domain::entities::trade::Trade;

/// Watchlist asset repository
pub struct AssetRepository {
    pool: DbPool,
}

impl AssetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a watchlist asset.
    pub async fn upsert(&self, asset: &Asset) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO assets (id, symbol, name, asset_class, venue, currency)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                symbol = excluded.symbol,
                name = excluded.name,
                asset_class = excluded.asset_class,
                venue = excluded.venue,
                currency = excluded.currency
            "#,
        )
        .bind(asset.id)
        .bind(&asset.symbol)
        .bind(&asset.name)
        .bind(asset.class.name())
        .bind(&asset.venue)
        .bind(&asset.currency)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to upsert asset {}: {}", asset.symbol, e);
            DatabaseError::QueryError(format!("Failed to upsert asset: {}", e))
        })?;

        Ok(())
    }

    pub async fn get_all(&self) -> Result<Vec<Asset>, DatabaseError> {
        let rows = sqlx::query("SELECT id, symbol, name, asset_class, venue, currency FROM assets")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to get assets: {}", e)))?;

        let mut assets = Vec::with_capacity(rows.len());
        for row in rows {
            let class_name: String = row.get("asset_class");
            if let Some(class) = AssetClass::from_name(&class_name) {
                assets.push(Asset {
                    id: row.get("id"),
                    symbol: row.get("symbol"),
                    name: row.get("name"),
                    class,
                    venue: row.get("venue"),
                    currency: row.get("currency"),
                });
            }
        }
        Ok(assets)
    }
}

/// Trade ledger repository
pub struct TradeRepository {
    pool: DbPool,
}

impl TradeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append a trade to the ledger.
    pub async fn append(&self, trade: &Trade) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO trades (id, asset_id, action, quantity, price, venue, status, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&trade.id)
        .bind(trade.asset_id)
        .bind(trade.action.as_str())
        .bind(trade.quantity)
        .bind(trade.price)
        .bind(&trade.venue)
        .bind(&trade.status)
        .bind(trade.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to append trade {}: {}", trade.id, e);
            DatabaseError::QueryError(format!("Failed to append trade: {}", e))
        })?;

        debug!("Appended trade {} ({} asset {})", trade.id, trade.action, trade.asset_id);
        Ok(())
    }

    /// Sum of committed BUY notional for the given date, as one atomic
    /// read. Used to rehydrate the risk ledger after a restart.
    pub async fn daily_buy_notional(&self, date: NaiveDate) -> Result<f64, DatabaseError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity * price), 0.0) AS notional
            FROM trades
            WHERE action = 'BUY' AND DATE(timestamp) = ?1
            "#,
        )
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to sum daily trades: {}", e);
            DatabaseError::QueryError(format!("Failed to sum daily trades: {}", e))
        })?;

        Ok(row.get("notional"))
    }

    /// Number of trades executed on the given date.
    pub async fn count_for_date(&self, date: NaiveDate) -> Result<i64, DatabaseError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM trades WHERE DATE(timestamp) = ?1")
            .bind(date.format("%Y-%m-%d").to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("Failed to count trades: {}", e)))?;

        Ok(row.get("count"))
    }

    pub async fn get_recent(&self, limit: i64) -> Result<Vec<TradeRecord>, DatabaseError> {
        sqlx::query_as::<_, TradeRecord>(
            "SELECT * FROM trades ORDER BY timestamp DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryError(format!("Failed to get recent trades: {}", e)))
    }
}

/// Score history repository
pub struct ScoreRepository {
    pool: DbPool,
}

impl ScoreRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Append one score to the history.
    pub async fn append(&self, score: &Score) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO scores (asset_id, timestamp, technical, fundamental, sentiment, composite)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(score.asset_id)
        .bind(score.timestamp)
        .bind(score.technical)
        .bind(score.fundamental)
        .bind(score.sentiment)
        .bind(score.composite)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to append score for asset {}: {}", score.asset_id, e);
            DatabaseError::QueryError(format!("Failed to append score: {}", e))
        })?;

        Ok(())
    }
}

/// Position repository
pub struct PositionRepository {
    pool: DbPool,
}

impl PositionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, position: &Position) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO positions (
                id, trade_id, asset_id, quantity, entry_price, current_price,
                stop_loss, take_profit, status, opened_at, closed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&position.id)
        .bind(&position.trade_id)
        .bind(position.asset_id)
        .bind(position.quantity)
        .bind(position.entry_price)
        .bind(position.current_price)
        .bind(position.stop_loss)
        .bind(position.take_profit)
        .bind(position.state.name())
        .bind(position.opened_at)
        .bind(position.closed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create position {}: {}", position.id, e);
            DatabaseError::QueryError(format!("Failed to create position: {}", e))
        })?;

        debug!("Created position {} for asset {}", position.id, position.asset_id);
        Ok(())
    }

    pub async fn update_price(&self, id: &str, current_price: f64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE positions SET current_price = ?1 WHERE id = ?2 AND status = 'open'")
            .bind(current_price)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to update position {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to update position: {}", e))
            })?;

        Ok(())
    }

    /// Close an open position. Closing is terminal; a second close is a
    /// no-op at the store level.
    pub async fn close(&self, id: &str, final_price: f64) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE positions
            SET status = 'closed', current_price = ?1, closed_at = CURRENT_TIMESTAMP
            WHERE id = ?2 AND status = 'open'
            "#,
        )
        .bind(final_price)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to close position {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to close position: {}", e))
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "Position not found or already closed: {}",
                id
            )));
        }

        debug!("Closed position {}", id);
        Ok(())
    }

    pub async fn get_open(&self) -> Result<Vec<Position>, DatabaseError> {
        let records = sqlx::query_as::<_, PositionRecord>(
            "SELECT * FROM positions WHERE status = 'open' ORDER BY opened_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get open positions: {}", e);
            DatabaseError::QueryError(format!("Failed to get open positions: {}", e))
        })?;

        Ok(records
            .into_iter()
            .filter_map(PositionRecord::into_position)
            .collect())
    }
}

/// System status repository
pub struct SystemStatusRepository {
    pool: DbPool,
}

impl SystemStatusRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, status: &SystemStatusSnapshot) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO system_status (
                timestamp, total_equity, cash_balance, risk_level, active_positions, daily_profit
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(status.timestamp)
        .bind(status.total_equity)
        .bind(status.cash_balance)
        .bind(status.risk_level)
        .bind(status.active_positions)
        .bind(status.daily_profit)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to append system status: {}", e);
            DatabaseError::QueryError(format!("Failed to append system status: {}", e))
        })?;

        Ok(())
    }
}
