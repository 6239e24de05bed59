//! Boundary interfaces to external collaborators.
//!
//! The core depends on these traits only; concrete venue, data-provider,
//! and notification adapters live in the infrastructure layer. This keeps
//! the cycle logic testable against deterministic fakes.

pub mod execution;
pub mod market_data;
pub mod notification;

pub use execution::ExecutionPort;
pub use market_data::MarketDataPort;
pub use notification::NotificationPort;
