use serde::{Deserialize, Serialize};

/// Asset class of a watched instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Crypto,
    Stock,
    Etf,
    Metal,
}

impl AssetClass {
    pub fn name(&self) -> &'static str {
        match self {
            AssetClass::Crypto => "crypto",
            AssetClass::Stock => "stock",
            AssetClass::Etf => "etf",
            AssetClass::Metal => "metal",
        }
    }

    pub fn from_name(name: &str) -> Option<AssetClass> {
        match name {
            "crypto" => Some(AssetClass::Crypto),
            "stock" => Some(AssetClass::Stock),
            "etf" => Some(AssetClass::Etf),
            "metal" => Some(AssetClass::Metal),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Watched instrument. Created at watchlist load, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub class: AssetClass,
    pub venue: String,
    pub currency: String,
}

impl Asset {
    pub fn new(
        id: i64,
        symbol: impl Into<String>,
        name: impl Into<String>,
        class: AssetClass,
        venue: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Asset {
            id,
            symbol: symbol.into(),
            name: name.into(),
            class,
            venue: venue.into(),
            currency: currency.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_class_name_roundtrip() {
        for class in [
            AssetClass::Crypto,
            AssetClass::Stock,
            AssetClass::Etf,
            AssetClass::Metal,
        ] {
            assert_eq!(AssetClass::from_name(class.name()), Some(class));
        }
    }

    #[test]
    fn test_asset_class_from_unknown_name() {
        assert_eq!(AssetClass::from_name("bond"), None);
    }

    #[test]
    fn test_asset_new() {
        let asset = Asset::new(1, "BTC", "Bitcoin", AssetClass::Crypto, "binance", "USD");
        assert_eq!(asset.symbol, "BTC");
        assert_eq!(asset.class, AssetClass::Crypto);
    }
}
