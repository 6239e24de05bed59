//! Error taxonomy for the trading cycle.
//!
//! DataUnavailable and ExecutionFailure are recovered per asset within a
//! cycle; BudgetExceeded is an expected gate outcome, not a fault.

use thiserror::Error;

use crate::persistence::DatabaseError;

#[derive(Debug, Error)]
pub enum TradingError {
    /// Per-asset fetch failure or timeout; the asset is excluded from the
    /// current cycle.
    #[error("market data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// Venue rejected or failed the order; any provisional budget commit
    /// must be rolled back by the caller.
    #[error("execution failed for {symbol}: {reason}")]
    ExecutionFailure { symbol: String, reason: String },

    /// The daily cap gate rejected a commit. Expected control flow.
    #[error("daily budget exceeded: requested {requested:.2}, remaining {remaining:.2}")]
    BudgetExceeded { requested: f64, remaining: f64 },

    #[error("persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    /// Fatal at startup; the system refuses to run.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TradingError {
    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        TradingError::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn execution_failure(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        TradingError::ExecutionFailure {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_exceeded_display() {
        let err = TradingError::BudgetExceeded {
            requested: 2.0,
            remaining: 0.5,
        };
        assert_eq!(
            err.to_string(),
            "daily budget exceeded: requested 2.00, remaining 0.50"
        );
    }

    #[test]
    fn test_data_unavailable_display() {
        let err = TradingError::data_unavailable("BTC", "timeout");
        assert_eq!(err.to_string(), "market data unavailable for BTC: timeout");
    }
}
