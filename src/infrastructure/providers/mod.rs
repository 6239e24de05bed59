pub mod binance;
pub mod bitpanda;
pub mod coingecko;
pub mod polygon;
pub mod yahoo;

pub use binance::BinanceAdapter;
pub use bitpanda::BitpandaAdapter;
pub use coingecko::CoinGeckoAdapter;
pub use polygon::PolygonAdapter;
pub use yahoo::YahooFinanceAdapter;
