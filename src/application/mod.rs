pub mod orchestrator;
pub mod watchlist;
