//! Risk ledger: the single authority gating every trade.
//!
//! Tracks daily spend against the cap, sizes positions from signal
//! confidence and volatility, and checks per-asset concentration. The day
//! rollover and every commit happen under one lock, so a check can never
//! interleave with another caller's commit.

use chrono::{NaiveDate, Utc};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::domain::errors::TradingError;

const EPSILON: f64 = 1e-9;

/// Configured risk limits, all in account currency.
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub daily_cap: f64,
    pub base_daily_allocation: f64,
    pub max_single_trade: f64,
    /// Maximum fraction of portfolio value in one asset.
    pub max_concentration: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            daily_cap: 15.0,
            base_daily_allocation: 3.0,
            max_single_trade: 10.0,
            max_concentration: 0.15,
        }
    }
}

#[derive(Debug)]
struct BudgetState {
    date: NaiveDate,
    spent: f64,
}

pub struct RiskLedger {
    limits: RiskLimits,
    state: Mutex<BudgetState>,
}

impl RiskLedger {
    pub fn new(limits: RiskLimits) -> Self {
        Self::rehydrated(limits, 0.0)
    }

    /// Build a ledger whose daily spend is bootstrapped from the persisted
    /// sum of today's committed trade notional.
    pub fn rehydrated(limits: RiskLimits, spent_today: f64) -> Self {
        if spent_today > 0.0 {
            info!(
                spent_today,
                daily_cap = limits.daily_cap,
                "Risk ledger rehydrated from persisted daily trades"
            );
        }
        RiskLedger {
            limits,
            state: Mutex::new(BudgetState {
                date: Utc::now().date_naive(),
                spent: spent_today.max(0.0),
            }),
        }
    }

    pub fn limits(&self) -> RiskLimits {
        self.limits
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BudgetState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Reset spend at the day boundary. Must be called with the lock held.
    fn roll_over(state: &mut BudgetState) {
        let today = Utc::now().date_naive();
        if state.date != today {
            debug!(previous_date = %state.date, spent = state.spent, "Daily budget rolled over");
            state.date = today;
            state.spent = 0.0;
        }
    }

    /// Cap minus spend for the current date.
    pub fn remaining_daily_budget(&self) -> f64 {
        let mut state = self.lock_state();
        Self::roll_over(&mut state);
        (self.limits.daily_cap - state.spent).max(0.0)
    }

    /// Spend committed so far today.
    pub fn daily_spent(&self) -> f64 {
        let mut state = self.lock_state();
        Self::roll_over(&mut state);
        state.spent
    }

    /// Size a position from confidence and volatility.
    ///
    /// `base_allocation * (confidence / 100) * (1 - min(0.5, volatility))`,
    /// capped at the max single-trade amount and at the caller-supplied
    /// remaining budget.
    pub fn size_position(&self, confidence: f64, volatility: f64, remaining_budget: f64) -> f64 {
        let damped = 1.0 - volatility.max(0.0).min(0.5);
        let size = self.limits.base_daily_allocation * (confidence.clamp(0.0, 100.0) / 100.0)
            * damped;
        size.min(self.limits.max_single_trade)
            .min(remaining_budget)
            .max(0.0)
    }

    /// Reject amounts that would exceed the concentration limit.
    pub fn check_concentration(&self, amount: f64, portfolio_value: f64) -> bool {
        if portfolio_value <= 0.0 {
            return false;
        }
        amount / portfolio_value <= self.limits.max_concentration + EPSILON
    }

    /// Atomically add to the daily spend, enforcing the cap.
    ///
    /// The cap check and the increment happen under one lock, closing the
    /// race between a remaining-budget read and a concurrent commit.
    pub fn commit(&self, amount: f64) -> Result<(), TradingError> {
        let mut state = self.lock_state();
        Self::roll_over(&mut state);
        if state.spent + amount > self.limits.daily_cap + EPSILON {
            return Err(TradingError::BudgetExceeded {
                requested: amount,
                remaining: (self.limits.daily_cap - state.spent).max(0.0),
            });
        }
        state.spent += amount;
        debug!(
            amount,
            daily_spent = state.spent,
            daily_cap = self.limits.daily_cap,
            "Budget committed"
        );
        Ok(())
    }

    /// Return a committed amount after a confirmed execution failure.
    pub fn rollback(&self, amount: f64) {
        let mut state = self.lock_state();
        Self::roll_over(&mut state);
        state.spent = (state.spent - amount).max(0.0);
        debug!(amount, daily_spent = state.spent, "Budget commit rolled back");
    }
}
