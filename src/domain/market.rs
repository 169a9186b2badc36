//! Per-tick market classification.

use serde::{Deserialize, Serialize};

/// Direction of the base-asset price over the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Up,
    Down,
    Stable,
}

/// Transaction cost tier derived from the mean gas price (Gwei).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasConditions {
    High,
    Medium,
    Low,
}

/// Market view recomputed every tick; never carried between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketConditions {
    pub is_favorable: bool,
    pub volatility: f64,
    pub price_trend: PriceTrend,
    pub profit_potential: f64,
    pub gas_conditions: GasConditions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_conditions_wire_format() {
        let mc = MarketConditions {
            is_favorable: true,
            volatility: 0.01,
            price_trend: PriceTrend::Up,
            profit_potential: 3.5,
            gas_conditions: GasConditions::Low,
        };
        let json = serde_json::to_value(mc).unwrap();
        assert_eq!(json["isFavorable"], true);
        assert_eq!(json["priceTrend"], "up");
        assert_eq!(json["gasConditions"], "low");
        assert_eq!(json["profitPotential"], 3.5);
    }
}
