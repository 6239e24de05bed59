//! Default multi-class watchlist.

use crate::domain::entities::asset::{Asset, AssetClass};

/// Assets tracked when no custom watchlist is seeded.
pub fn default_watchlist() -> Vec<Asset> {
    vec![
        Asset::new(1, "BTC", "Bitcoin", AssetClass::Crypto, "binance", "USD"),
        Asset::new(2, "ETH", "Ethereum", AssetClass::Crypto, "binance", "USD"),
        Asset::new(3, "SOL", "Solana", AssetClass::Crypto, "binance", "USD"),
        Asset::new(4, "AAPL", "Apple", AssetClass::Stock, "nasdaq", "USD"),
        Asset::new(5, "MSFT", "Microsoft", AssetClass::Stock, "nasdaq", "USD"),
        Asset::new(6, "SPY", "SPDR S&P 500", AssetClass::Etf, "nyse", "USD"),
        Asset::new(7, "XAU", "Gold", AssetClass::Metal, "bitpanda", "EUR"),
        Asset::new(8, "XAG", "Silver", AssetClass::Metal, "bitpanda", "EUR"),
    ]
}
