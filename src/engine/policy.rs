//! Strategy policy: every threshold the analyzer, risk engine and simulator read.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which rule admits a new loop after the first one has been exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReentryRule {
    /// Re-entry uses the same test as the first entry.
    #[default]
    EntryConditions,
    /// Re-entry uses the stricter `should_reenter_loop` test.
    Dedicated,
}

impl FromStr for ReentryRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry-conditions" => Ok(ReentryRule::EntryConditions),
            "dedicated" => Ok(ReentryRule::Dedicated),
            other => Err(format!(
                "must be entry-conditions or dedicated, got {}",
                other
            )),
        }
    }
}

/// What the simulator does when a series has no point for the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPricePolicy {
    /// Abort the run with `SimulationError::MissingPrice`.
    #[default]
    Fail,
    /// Reuse the last known price and flag the step.
    CarryForward,
}

impl FromStr for MissingPricePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(MissingPricePolicy::Fail),
            "carry-forward" => Ok(MissingPricePolicy::CarryForward),
            other => Err(format!("must be fail or carry-forward, got {}", other)),
        }
    }
}

/// Immutable policy value injected into each component at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyPolicy {
    /// Share of collateral value counted toward solvency (wstETH on Aave).
    pub liquidation_threshold: f64,
    pub min_health_factor: f64,
    /// Health factor new borrows are sized for.
    pub target_health_factor: f64,
    /// Entry ceiling, and the point at which borrow size scales to zero.
    pub max_volatility: f64,
    pub critical_volatility: f64,
    /// Loss (percent of capital) beyond which a position is unwound.
    pub safety_margin_pct: f64,
    /// Profit (percent) locked in when the trend turns down.
    pub profit_lock_pct: f64,
    pub min_profit_potential_pct: f64,
    /// Volatility below which the market counts as favorable.
    pub favorable_volatility: f64,
    /// Relative move over the window that marks a trend.
    pub trend_threshold: f64,
    pub high_gas_gwei: f64,
    pub medium_gas_gwei: f64,
    pub lookback_days: i64,
    /// Hard ceiling on the number of loops opened in one run.
    pub max_loops: u32,
    pub reentry_rule: ReentryRule,
    pub missing_price: MissingPricePolicy,
}

impl Default for StrategyPolicy {
    fn default() -> Self {
        Self {
            liquidation_threshold: 0.825,
            min_health_factor: 1.1,
            target_health_factor: 1.5,
            max_volatility: 0.2,
            critical_volatility: 0.3,
            safety_margin_pct: 5.0,
            profit_lock_pct: 2.0,
            min_profit_potential_pct: 1.0,
            favorable_volatility: 0.05,
            trend_threshold: 0.02,
            high_gas_gwei: 100.0,
            medium_gas_gwei: 50.0,
            lookback_days: 7,
            max_loops: 5,
            reentry_rule: ReentryRule::EntryConditions,
            missing_price: MissingPricePolicy::Fail,
        }
    }
}
