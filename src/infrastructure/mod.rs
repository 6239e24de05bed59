pub mod execution;
pub mod market_data;
pub mod notification;
pub mod providers;
