use crate::domain::{StrategyStep, Timestamp};
use crate::engine::{simulate_strategy, SimulationError, SimulationParams, StrategyPolicy, StrategyStats};
use crate::orchestration::loader::{LoadError, MarketDataLoader, MarketSnapshot};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// A validated request to replay the strategy over a date range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub steps: Vec<StrategyStep>,
    pub stats: StrategyStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_data: Option<MarketSnapshot>,
}

#[derive(Clone)]
pub struct Orchestrator {
    loader: MarketDataLoader,
    policy: StrategyPolicy,
}

impl Orchestrator {
    pub fn new(loader: MarketDataLoader, policy: StrategyPolicy) -> Self {
        Self { loader, policy }
    }

    pub fn loader(&self) -> &MarketDataLoader {
        &self.loader
    }

    pub fn policy(&self) -> &StrategyPolicy {
        &self.policy
    }

    /// Load market history for the request's range, replay it and attach the
    /// market snapshot.
    pub async fn run(&self, request: &SimulationRequest) -> Result<SimulationReport, OrchestrationError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("simulation", %run_id);
        async move {
            let start = Timestamp::from_date(request.start_date);
            let end = Timestamp::from_date(request.end_date);
            let data = self.loader.load_historical(start, end).await?;
            let market_data = self.loader.load_market_snapshot(&data.gas_prices).await?;

            let mut params = SimulationParams::new(request.initial_capital, data);
            params.start_date = Some(request.start_date.to_string());
            params.end_date = Some(request.end_date.to_string());
            let steps = simulate_strategy(&params, &self.policy)?;
            let stats = StrategyStats::from_steps(&steps);

            info!(
                steps = steps.len(),
                loops = stats.total_loops,
                total_profit = stats.total_profit,
                "Simulation finished"
            );
            Ok::<_, OrchestrationError>(SimulationReport {
                run_id,
                steps,
                stats,
                market_data: Some(market_data),
            })
        }
        .instrument(span)
        .await
    }

    /// Replay caller-supplied history. No market snapshot is attached.
    pub fn run_historical(&self, params: &SimulationParams) -> Result<SimulationReport, OrchestrationError> {
        let run_id = Uuid::new_v4();
        let _guard = info_span!("simulation", %run_id).entered();

        let steps = simulate_strategy(params, &self.policy)?;
        let stats = StrategyStats::from_steps(&steps);
        info!(steps = steps.len(), loops = stats.total_loops, "Historical simulation finished");
        Ok(SimulationReport {
            run_id,
            steps,
            stats,
            market_data: None,
        })
    }
}

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
