//! Output ledger records produced by the simulator.

use super::MarketConditions;
use serde::{Serialize, Serializer};

/// Kind of transition a step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Enter,
    Swap,
    Borrow,
    Lend,
    Exit,
    Reenter,
}

/// Risk snapshot embedded by value in every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskMetrics {
    pub volatility: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub projected_health_factor: f64,
    pub safety_margin: f64,
}

/// Human-readable balances, formatted once when the step is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetails {
    pub current_capital: String,
    pub eth_balance: String,
    pub wst_eth_balance: String,
    pub borrowed_eth: String,
    #[serde(rename = "totalValueUSD")]
    pub total_value_usd: String,
    #[serde(rename = "profitLossUSD")]
    pub profit_loss_usd: String,
}

/// Exact balances behind [`StepDetails`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Balances {
    pub eth: f64,
    pub wsteth: f64,
    pub borrowed_eth: f64,
}

/// Immutable record of one state transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyStep {
    pub loop_no: u32,
    pub date: String,
    pub time: String,
    pub step_type: StepType,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub eth_price: f64,
    pub wsteth_price: f64,
    pub gas_price: f64,
    /// `f64::INFINITY` while nothing is borrowed; serialized as `null`.
    #[serde(serialize_with = "finite_or_null")]
    pub health_factor: f64,
    pub profit_loss: f64,
    pub cumulative_profit_loss: f64,
    pub details: StepDetails,
    pub market_conditions: MarketConditions,
    pub risk_metrics: RiskMetrics,
    /// Set when at least one price on this tick was carried forward.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub carried_forward: bool,
    #[serde(skip)]
    pub balances: Balances,
}

impl StrategyStep {
    /// Mark-to-market value of the position at this step's prices.
    pub fn total_value_usd(&self) -> f64 {
        self.balances.eth * self.eth_price + self.balances.wsteth * self.wsteth_price
            - self.balances.borrowed_eth * self.eth_price
    }
}

/// JSON has no infinity; emit `null` for non-finite ratios.
pub(crate) fn finite_or_null<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}
