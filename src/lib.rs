//! Tamani Trading System Library
//!
//! Periodic scoring of a multi-class asset watchlist with risk-gated
//! signal execution and automated position exits.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
