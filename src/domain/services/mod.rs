pub mod asset_class;
pub mod position_monitor;
pub mod risk_ledger;
pub mod scoring;
pub mod signal_generator;
pub mod trade_executor;
