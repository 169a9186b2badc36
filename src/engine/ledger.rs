//! Step builder: values a position snapshot and packages it as a
//! [`StrategyStep`].

use crate::domain::money::{format_units, format_usd};
use crate::domain::{Balances, MarketConditions, StepDetails, StepType, StrategyStep, Timestamp};
use regex::Regex;
use std::sync::OnceLock;

use super::position::valuate;
use super::RiskEngine;

/// Task label of the terminal summary step.
pub const STRATEGY_COMPLETE: &str = "Strategy Complete";
/// Task label of the first step.
pub const INITIALIZE_STRATEGY: &str = "Initialize Strategy";

/// Prices observed on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPrices {
    pub eth: f64,
    pub wsteth: f64,
    pub gas: f64,
    /// True when any of the three was carried forward from an earlier day.
    pub carried_forward: bool,
}

/// Everything needed to materialize one step.
#[derive(Debug, Clone)]
pub struct StepInput {
    pub loop_no: u32,
    pub timestamp: Timestamp,
    pub step_type: StepType,
    pub task: String,
    pub reason: Option<String>,
    pub prices: TickPrices,
    pub balances: Balances,
    pub market: MarketConditions,
}

#[derive(Debug, Clone, Copy)]
pub struct StepBuilder {
    risk: RiskEngine,
    initial_capital: f64,
}

impl StepBuilder {
    pub fn new(risk: RiskEngine, initial_capital: f64) -> Self {
        Self {
            risk,
            initial_capital,
        }
    }

    pub fn build(&self, input: StepInput) -> StrategyStep {
        let prices = input.prices;
        let metrics = valuate(&input.balances, prices.eth, prices.wsteth, self.initial_capital);

        let mut profit_loss = metrics.profit_loss_pct;
        if input.task == STRATEGY_COMPLETE {
            if let Some(pct) = input.reason.as_deref().and_then(extract_percent) {
                profit_loss = pct;
            }
        }

        let health_factor = self
            .risk
            .calculate_health_factor(metrics.collateral_value_usd, metrics.borrow_value_usd);
        let risk_metrics =
            self.risk
                .assess_risk(profit_loss, input.market.volatility, health_factor);

        StrategyStep {
            loop_no: input.loop_no,
            date: input.timestamp.date_string(),
            time: input.timestamp.time_string(),
            step_type: input.step_type,
            task: input.task,
            reason: input.reason,
            eth_price: prices.eth,
            wsteth_price: prices.wsteth,
            gas_price: prices.gas,
            health_factor,
            profit_loss,
            cumulative_profit_loss: profit_loss,
            details: StepDetails {
                current_capital: format_usd(self.initial_capital),
                eth_balance: format_units(input.balances.eth, 4),
                wst_eth_balance: format_units(input.balances.wsteth, 4),
                borrowed_eth: format_units(input.balances.borrowed_eth, 4),
                total_value_usd: format_usd(metrics.total_value_usd),
                profit_loss_usd: format_usd(metrics.profit_loss_usd),
            },
            market_conditions: input.market,
            risk_metrics,
            carried_forward: prices.carried_forward,
            balances: input.balances,
        }
    }
}

fn percent_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(-?\d+\.?\d*)%").ok())
        .as_ref()
}

/// First `NN.NN%` figure in `text`.
pub fn extract_percent(text: &str) -> Option<f64> {
    percent_pattern()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
