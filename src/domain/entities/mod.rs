pub mod asset;
pub mod position;
pub mod score;
pub mod signal;
pub mod snapshot;
pub mod trade;
