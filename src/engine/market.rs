//! Market analyzer: volatility, trend, gas tier and profit potential over a
//! rolling lookback window.

use crate::domain::{GasConditions, HistoricalData, MarketConditions, PriceTrend, SeriesKind, Timestamp};

use super::StrategyPolicy;

/// Population standard deviation of day-over-day returns.
///
/// Fewer than two prices yields zero. Returns off a non-positive base are
/// skipped.
pub fn calculate_volatility(prices: &[f64]) -> f64 {
    if prices.len() < 2 {
        return 0.0;
    }
    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Compare the first and last price of the window against `threshold`.
pub fn determine_trend(prices: &[f64], threshold: f64) -> PriceTrend {
    let (Some(first), Some(last)) = (prices.first(), prices.last()) else {
        return PriceTrend::Stable;
    };
    if prices.len() < 2 || *first <= 0.0 {
        return PriceTrend::Stable;
    }
    let change = (last - first) / first;
    if change > threshold {
        PriceTrend::Up
    } else if change < -threshold {
        PriceTrend::Down
    } else {
        PriceTrend::Stable
    }
}

/// Tier a gas price (Gwei).
pub fn classify_gas(gas_gwei: f64, policy: &StrategyPolicy) -> GasConditions {
    if gas_gwei > policy.high_gas_gwei {
        GasConditions::High
    } else if gas_gwei > policy.medium_gas_gwei {
        GasConditions::Medium
    } else {
        GasConditions::Low
    }
}

/// Spread-based profit estimate in percent.
///
/// Derivative premium over the base asset, +2 when both assets trend up,
/// -2 when both trend down, -1 under high gas, +1 under low gas.
pub fn estimate_profit_potential(
    eth_price: f64,
    wsteth_price: f64,
    eth_trend: PriceTrend,
    wsteth_trend: PriceTrend,
    gas: GasConditions,
) -> f64 {
    let mut potential = if eth_price > 0.0 {
        (wsteth_price - eth_price) / eth_price * 100.0
    } else {
        0.0
    };

    match (eth_trend, wsteth_trend) {
        (PriceTrend::Up, PriceTrend::Up) => potential += 2.0,
        (PriceTrend::Down, PriceTrend::Down) => potential -= 2.0,
        _ => {}
    }

    match gas {
        GasConditions::High => potential -= 1.0,
        GasConditions::Low => potential += 1.0,
        GasConditions::Medium => {}
    }

    potential
}

/// Stateless analyzer bound to one policy.
#[derive(Debug, Clone, Copy)]
pub struct MarketAnalyzer {
    policy: StrategyPolicy,
}

impl MarketAnalyzer {
    pub fn new(policy: StrategyPolicy) -> Self {
        Self { policy }
    }

    /// Classify the market as of `at`, looking back `policy.lookback_days`.
    pub fn analyze(&self, data: &HistoricalData, at: Timestamp) -> MarketConditions {
        let days = self.policy.lookback_days;
        let eth_window = data.series(SeriesKind::Eth).window_prices(at, days);
        let wsteth_window = data.series(SeriesKind::WstEth).window_prices(at, days);
        let gas_window = data.series(SeriesKind::Gas).window_prices(at, days);

        let volatility = calculate_volatility(&eth_window);
        let price_trend = determine_trend(&eth_window, self.policy.trend_threshold);
        let wsteth_trend = determine_trend(&wsteth_window, self.policy.trend_threshold);

        let avg_gas = if gas_window.is_empty() {
            0.0
        } else {
            gas_window.iter().sum::<f64>() / gas_window.len() as f64
        };
        let gas_conditions = classify_gas(avg_gas, &self.policy);

        let profit_potential = match (eth_window.last(), wsteth_window.last()) {
            (Some(eth), Some(wst)) => {
                estimate_profit_potential(*eth, *wst, price_trend, wsteth_trend, gas_conditions)
            }
            _ => 0.0,
        };

        MarketConditions {
            is_favorable: volatility < self.policy.favorable_volatility
                && price_trend != PriceTrend::Down,
            volatility,
            price_trend,
            profit_potential,
            gas_conditions,
        }
    }
}
