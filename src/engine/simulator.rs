//! Day-by-day replay of the leveraged-staking loop.
//!
//! The simulator walks the base-asset day grid, queries the market analyzer
//! and the risk engine once per tick, mutates one [`PositionState`] and
//! appends a [`StrategyStep`] for every transition.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::money::format_usd;
use crate::domain::{
    HistoricalData, MarketConditions, SeriesKind, StepType, StrategyStep, Timestamp,
};

use super::ledger::{StepBuilder, StepInput, TickPrices, INITIALIZE_STRATEGY, STRATEGY_COMPLETE};
use super::position::PositionState;
use super::{MarketAnalyzer, MissingPricePolicy, ReentryRule, RiskEngine, StrategyPolicy};

/// Inputs of one simulation run.
///
/// `start_date` and `end_date` are carried for callers; the run always spans
/// the ETH series.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParams {
    pub initial_capital: f64,
    pub historical_data: HistoricalData,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl SimulationParams {
    pub fn new(initial_capital: f64, historical_data: HistoricalData) -> Self {
        Self {
            initial_capital,
            historical_data,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("No ETH price data")]
    NoEthPriceData,
    #[error("No wstETH price data")]
    NoWstEthPriceData,
    #[error("No gas price data")]
    NoGasPriceData,
    #[error("Missing {series} price at timestamp {timestamp}")]
    MissingPrice {
        series: SeriesKind,
        timestamp: Timestamp,
    },
}

impl SimulationError {
    fn empty_series(kind: SeriesKind) -> Self {
        match kind {
            SeriesKind::Eth => SimulationError::NoEthPriceData,
            SeriesKind::WstEth => SimulationError::NoWstEthPriceData,
            SeriesKind::Gas => SimulationError::NoGasPriceData,
        }
    }
}

/// Run the strategy over `params.historical_data`.
///
/// Fails before emitting anything if a series is empty, or (under
/// [`MissingPricePolicy::Fail`]) the first time a grid day has no price.
pub fn simulate_strategy(
    params: &SimulationParams,
    policy: &StrategyPolicy,
) -> Result<Vec<StrategyStep>, SimulationError> {
    StrategySimulator::new(*policy, params.initial_capital).run(&params.historical_data)
}

/// What the simulator sees on one grid day.
#[derive(Debug, Clone, Copy)]
struct Tick {
    at: Timestamp,
    prices: TickPrices,
    market: MarketConditions,
}

/// Owns the state machine for one run.
#[derive(Debug)]
pub struct StrategySimulator {
    policy: StrategyPolicy,
    analyzer: MarketAnalyzer,
    risk: RiskEngine,
    builder: StepBuilder,
    initial_capital: f64,
}

impl StrategySimulator {
    pub fn new(policy: StrategyPolicy, initial_capital: f64) -> Self {
        let risk = RiskEngine::new(policy);
        Self {
            policy,
            analyzer: MarketAnalyzer::new(policy),
            risk,
            builder: StepBuilder::new(risk, initial_capital),
            initial_capital,
        }
    }

    pub fn run(&self, data: &HistoricalData) -> Result<Vec<StrategyStep>, SimulationError> {
        // Checked in eth, wsteth, gas order so the first empty series is named.
        let first = |kind: SeriesKind| {
            data.series(kind)
                .first()
                .ok_or_else(|| SimulationError::empty_series(kind))
        };
        let first_eth = first(SeriesKind::Eth)?;
        let first_wst = first(SeriesKind::WstEth)?;
        let first_gas = first(SeriesKind::Gas)?;
        let last_eth = data.series(SeriesKind::Eth).last().unwrap_or(first_eth);

        let start = first_eth.timestamp;
        let end = last_eth.timestamp;
        let mut state = PositionState::funded(self.initial_capital, first_eth.price);
        let mut steps = Vec::new();

        steps.push(self.builder.build(StepInput {
            loop_no: 0,
            timestamp: start,
            step_type: StepType::Enter,
            task: INITIALIZE_STRATEGY.to_string(),
            reason: None,
            prices: TickPrices {
                eth: first_eth.price,
                wsteth: first_wst.price,
                gas: first_gas.price,
                carried_forward: false,
            },
            balances: state.balances(),
            market: self.analyzer.analyze(data, start),
        }));

        let mut now = start;
        while now <= end {
            let tick = Tick {
                at: now,
                prices: self.prices_at(data, now)?,
                market: self.analyzer.analyze(data, now),
            };
            if state.in_position {
                self.check_exit(&mut state, &mut steps, tick);
            } else {
                self.check_entry(&mut state, &mut steps, tick);
            }
            match now.next_day() {
                Some(next) => now = next,
                None => break,
            }
        }

        // Stamp the summary on the last grid day so it always has prices.
        let prices = self.prices_at(data, end)?;
        let final_value = state
            .metrics(prices.eth, prices.wsteth, self.initial_capital)
            .total_value_usd;
        let summary = format!(
            "Final strategy result: {:.2}% profit/loss | Final Total Value: {}",
            state.last_exit_profit_pct,
            format_usd(final_value)
        );
        steps.push(self.builder.build(StepInput {
            loop_no: state.loop_count,
            timestamp: end,
            step_type: StepType::Exit,
            task: STRATEGY_COMPLETE.to_string(),
            reason: Some(summary),
            prices,
            balances: state.balances(),
            market: self.analyzer.analyze(data, end),
        }));

        info!(
            steps = steps.len(),
            loops = state.loop_count,
            final_value,
            "Simulation complete"
        );
        Ok(steps)
    }

    fn check_entry(&self, state: &mut PositionState, steps: &mut Vec<StrategyStep>, tick: Tick) {
        let Tick { at: now, prices, market } = tick;
        if state.loop_count >= self.policy.max_loops {
            debug!(timestamp = %now, loops = state.loop_count, "Loop ceiling reached, holding");
            return;
        }

        let current = state.metrics(prices.eth, prices.wsteth, self.initial_capital);
        let reentering = state.loop_count > 0;
        let admitted = match (reentering, self.policy.reentry_rule) {
            (true, ReentryRule::Dedicated) => self
                .risk
                .should_reenter_loop(&market, state.last_exit_profit_pct),
            _ => self.risk.should_enter_loop(&market, current.profit_loss_pct),
        };
        if !admitted {
            return;
        }

        let loop_no = state.loop_count + 1;
        if reentering {
            debug!(timestamp = %now, loop_no, "Re-entering position");
            let mut reenter = self.step(
                state,
                tick,
                StepType::Reenter,
                format!("Re-enter Position - Loop {}", loop_no),
                Some(format!(
                    "Conditions favorable after exit at {:.2}%",
                    state.last_exit_profit_pct
                )),
            );
            reenter.loop_no = loop_no;
            steps.push(reenter);
        }

        let swapped = state.open_loop(prices.eth, prices.wsteth);
        debug!(timestamp = %now, loop_no, swapped, "Swapped ETH to wstETH");
        steps.push(self.step(
            state,
            tick,
            StepType::Swap,
            format!("Swap ETH to wstETH - Loop {}", loop_no),
            None,
        ));

        let borrow = self.risk.calculate_optimal_borrow_amount(
            state.wsteth_balance * prices.wsteth,
            prices.eth,
            market.volatility,
        );
        state.borrow(borrow);
        debug!(timestamp = %now, loop_no, borrow, "Borrowed ETH against collateral");
        steps.push(self.step(
            state,
            tick,
            StepType::Borrow,
            format!("Borrow ETH Against Collateral - Loop {}", loop_no),
            Some(format!("Borrowed {:.4} ETH optimally", borrow)),
        ));
    }

    fn check_exit(&self, state: &mut PositionState, steps: &mut Vec<StrategyStep>, tick: Tick) {
        let Tick { at: now, prices, market } = tick;
        let current = state.metrics(prices.eth, prices.wsteth, self.initial_capital);
        let health_factor = self
            .risk
            .calculate_health_factor(current.collateral_value_usd, current.borrow_value_usd);
        let decision = self
            .risk
            .should_exit_loop(health_factor, &market, current.profit_loss_pct);
        if !decision.should_exit {
            return;
        }

        let repaid = state.repay_and_unwind(prices.eth, prices.wsteth, current.profit_loss_pct);
        debug!(
            timestamp = %now,
            loop_no = state.loop_count,
            repaid,
            profit_loss_pct = current.profit_loss_pct,
            reason = %decision.reason,
            "Exited position"
        );
        steps.push(self.step(
            state,
            tick,
            StepType::Exit,
            "Exit Position".to_string(),
            Some(decision.reason),
        ));
    }

    fn step(
        &self,
        state: &PositionState,
        tick: Tick,
        step_type: StepType,
        task: String,
        reason: Option<String>,
    ) -> StrategyStep {
        self.builder.build(StepInput {
            loop_no: state.loop_count,
            timestamp: tick.at,
            step_type,
            task,
            reason,
            prices: tick.prices,
            balances: state.balances(),
            market: tick.market,
        })
    }

    fn prices_at(&self, data: &HistoricalData, at: Timestamp) -> Result<TickPrices, SimulationError> {
        let mut carried_forward = false;
        let mut lookup = |kind: SeriesKind| -> Result<f64, SimulationError> {
            let series = data.series(kind);
            if let Some(price) = series.price_at(at) {
                return Ok(price);
            }
            let missing = SimulationError::MissingPrice {
                series: kind,
                timestamp: at,
            };
            match self.policy.missing_price {
                MissingPricePolicy::Fail => Err(missing),
                MissingPricePolicy::CarryForward => {
                    let price = series.price_at_or_before(at).ok_or(missing)?;
                    debug!(series = %kind, timestamp = %at, price, "Carrying price forward");
                    carried_forward = true;
                    Ok(price)
                }
            }
        };

        let eth = lookup(SeriesKind::Eth)?;
        let wsteth = lookup(SeriesKind::WstEth)?;
        let gas = lookup(SeriesKind::Gas)?;
        Ok(TickPrices {
            eth,
            wsteth,
            gas,
            carried_forward,
        })
    }
}
