//! Runtime configuration, loaded from environment variables with
//! validated fallbacks to defaults.

use crate::domain::errors::TradingError;
use crate::domain::services::risk_ledger::RiskLimits;
use crate::domain::services::signal_generator::SignalPolicy;
use crate::domain::services::trade_executor::ExitLevels;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    /// Stand-in for the account's portfolio value until a real accounting
    /// feed exists; used by the concentration check.
    pub portfolio_value: f64,

    pub daily_budget_cap: f64,
    pub base_daily_allocation: f64,
    pub max_single_trade: f64,
    pub max_concentration: f64,

    pub entry_threshold: f64,
    pub exit_threshold: f64,

    pub base_stop_loss_pct: f64,
    pub base_take_profit_pct: f64,

    pub cycle_interval_seconds: u64,
    pub health_check_interval_seconds: u64,
    /// UTC hours at which the daily report fires.
    pub report_hours: Vec<u32>,

    pub snapshot_cache_ttl_seconds: u64,
    pub fetch_timeout_seconds: u64,

    pub enable_trading: bool,

    pub polygon_api_key: Option<String>,
    pub bitpanda_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "sqlite://data/tamani.db".to_string(),
            portfolio_value: 1000.0,

            daily_budget_cap: 15.0,
            base_daily_allocation: 3.0,
            max_single_trade: 10.0,
            max_concentration: 0.15,

            entry_threshold: 75.0,
            exit_threshold: 40.0,

            base_stop_loss_pct: 0.05,
            base_take_profit_pct: 0.12,

            cycle_interval_seconds: 900,            // 15 minutes
            health_check_interval_seconds: 3600,    // hourly
            report_hours: vec![9, 18, 22],

            snapshot_cache_ttl_seconds: 300,
            fetch_timeout_seconds: 10,

            enable_trading: true,

            polygon_api_key: None,
            bitpanda_api_key: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Invalid values are logged and fall back to the default, never
    /// aborting startup.
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                config.database_url = url;
            }
        }

        parse_positive_f64("PORTFOLIO_VALUE", &mut config.portfolio_value);
        parse_positive_f64("DAILY_BUDGET_CAP", &mut config.daily_budget_cap);
        parse_positive_f64("BASE_DAILY_ALLOCATION", &mut config.base_daily_allocation);
        parse_positive_f64("MAX_SINGLE_TRADE", &mut config.max_single_trade);

        if let Ok(raw) = std::env::var("MAX_CONCENTRATION") {
            match raw.parse::<f64>() {
                Ok(value) if (0.0..=1.0).contains(&value) => config.max_concentration = value,
                Ok(value) => tracing::warn!(
                    "Invalid MAX_CONCENTRATION value: {} (must be between 0.0 and 1.0), using default: {}",
                    value,
                    config.max_concentration
                ),
                Err(e) => tracing::warn!(
                    "Failed to parse MAX_CONCENTRATION '{}': {}, using default: {}",
                    raw,
                    e,
                    config.max_concentration
                ),
            }
        }

        parse_score_threshold("ENTRY_THRESHOLD", &mut config.entry_threshold);
        parse_score_threshold("EXIT_THRESHOLD", &mut config.exit_threshold);
        if config.exit_threshold >= config.entry_threshold {
            tracing::warn!(
                "EXIT_THRESHOLD {} >= ENTRY_THRESHOLD {}, using defaults",
                config.exit_threshold,
                config.entry_threshold
            );
            config.entry_threshold = 75.0;
            config.exit_threshold = 40.0;
        }

        parse_fraction("BASE_STOP_LOSS_PCT", &mut config.base_stop_loss_pct);
        parse_fraction("BASE_TAKE_PROFIT_PCT", &mut config.base_take_profit_pct);

        parse_positive_u64("CYCLE_INTERVAL_SECONDS", &mut config.cycle_interval_seconds);
        parse_positive_u64(
            "HEALTH_CHECK_INTERVAL_SECONDS",
            &mut config.health_check_interval_seconds,
        );
        parse_positive_u64(
            "SNAPSHOT_CACHE_TTL_SECONDS",
            &mut config.snapshot_cache_ttl_seconds,
        );
        parse_positive_u64("FETCH_TIMEOUT_SECONDS", &mut config.fetch_timeout_seconds);

        if let Ok(raw) = std::env::var("REPORT_HOURS") {
            let hours: Vec<u32> = raw
                .split(',')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .filter(|h| *h < 24)
                .collect();
            if hours.is_empty() {
                tracing::warn!(
                    "REPORT_HOURS '{}' has no valid hours, using default: {:?}",
                    raw,
                    config.report_hours
                );
            } else {
                config.report_hours = hours;
            }
        }

        if let Ok(enabled) = std::env::var("ENABLE_TRADING") {
            config.enable_trading = enabled.to_lowercase() == "true" || enabled == "1";
        }

        config.polygon_api_key = std::env::var("POLYGON_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());
        config.bitpanda_api_key = std::env::var("BITPANDA_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty());
        config.telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty());
        config.telegram_chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty());

        config
    }

    /// Refuse to start without the credentials the authenticated
    /// providers need. Notification credentials are optional; the log
    /// fallback covers them.
    pub fn validate(&self) -> Result<(), TradingError> {
        let mut missing = Vec::new();
        if self.polygon_api_key.is_none() {
            missing.push("POLYGON_API_KEY");
        }
        if self.bitpanda_api_key.is_none() {
            missing.push("BITPANDA_API_KEY");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TradingError::InvalidConfiguration(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn risk_limits(&self) -> RiskLimits {
        RiskLimits {
            daily_cap: self.daily_budget_cap,
            base_daily_allocation: self.base_daily_allocation,
            max_single_trade: self.max_single_trade,
            max_concentration: self.max_concentration,
        }
    }

    pub fn signal_policy(&self) -> SignalPolicy {
        SignalPolicy {
            entry_threshold: self.entry_threshold,
            exit_threshold: self.exit_threshold,
        }
    }

    pub fn exit_levels(&self) -> ExitLevels {
        ExitLevels {
            base_stop_loss_pct: self.base_stop_loss_pct,
            base_take_profit_pct: self.base_take_profit_pct,
        }
    }
}

fn parse_positive_f64(name: &str, target: &mut f64) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<f64>() {
            Ok(value) if value > 0.0 => *target = value,
            Ok(value) => {
                tracing::warn!(
                    "Invalid {} value: {} (must be positive), using default: {}",
                    name,
                    value,
                    target
                );
            }
            Err(e) => {
                tracing::warn!("Failed to parse {} '{}': {}, using default: {}", name, raw, e, target);
            }
        }
    }
}

fn parse_positive_u64(name: &str, target: &mut u64) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<u64>() {
            Ok(value) if value > 0 => *target = value,
            Ok(_) => {
                tracing::warn!("Invalid {} value: 0, using default: {}", name, target);
            }
            Err(e) => {
                tracing::warn!("Failed to parse {} '{}': {}, using default: {}", name, raw, e, target);
            }
        }
    }
}

fn parse_score_threshold(name: &str, target: &mut f64) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<f64>() {
            Ok(value) if (0.0..=100.0).contains(&value) => *target = value,
            Ok(value) => {
                tracing::warn!(
                    "Invalid {} value: {} (must be between 0 and 100), using default: {}",
                    name,
                    value,
                    target
                );
            }
            Err(e) => {
                tracing::warn!("Failed to parse {} '{}': {}, using default: {}", name, raw, e, target);
            }
        }
    }
}

fn parse_fraction(name: &str, target: &mut f64) {
    if let Ok(raw) = std::env::var(name) {
        match raw.parse::<f64>() {
            Ok(value) if value > 0.0 && value < 1.0 => *target = value,
            Ok(value) => {
                tracing::warn!(
                    "Invalid {} value: {} (must be between 0 and 1), using default: {}",
                    name,
                    value,
                    target
                );
            }
            Err(e) => {
                tracing::warn!("Failed to parse {} '{}': {}, using default: {}", name, raw, e, target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.daily_budget_cap, 15.0);
        assert_eq!(config.entry_threshold, 75.0);
        assert_eq!(config.exit_threshold, 40.0);
        assert_eq!(config.cycle_interval_seconds, 900);
        assert_eq!(config.report_hours, vec![9, 18, 22]);
        assert!(config.enable_trading);
    }

    #[test]
    fn test_validate_requires_provider_keys() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_err());

        config.polygon_api_key = Some("pk".to_string());
        config.bitpanda_api_key = Some("bk".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_risk_limits_mapping() {
        let config = AppConfig::default();
        let limits = config.risk_limits();
        assert_eq!(limits.daily_cap, 15.0);
        assert_eq!(limits.max_concentration, 0.15);
    }
}
