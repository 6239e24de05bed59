use serde::{Deserialize, Serialize};

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Directional trading signal, produced and consumed within one cycle.
#[derive(Debug, Clone)]
pub struct Signal {
    pub asset_id: i64,
    pub action: TradeAction,
    /// Signal strength in [0, 100], drives position sizing.
    pub confidence: f64,
    pub reference_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_action_display() {
        assert_eq!(TradeAction::Buy.to_string(), "BUY");
        assert_eq!(TradeAction::Sell.to_string(), "SELL");
    }
}
