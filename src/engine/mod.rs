//! Pure computation engine for the loop simulation.
//!
//! Nothing in here performs I/O: every component takes a [`StrategyPolicy`]
//! at construction and is a deterministic function of its inputs.

pub mod ledger;
pub mod market;
pub mod policy;
pub mod position;
pub mod risk;
pub mod simulator;
pub mod stats;

pub use ledger::{StepBuilder, StepInput, TickPrices};
pub use market::MarketAnalyzer;
pub use policy::{MissingPricePolicy, ReentryRule, StrategyPolicy};
pub use position::{PositionMetrics, PositionState};
pub use risk::{ExitDecision, RiskEngine};
pub use simulator::{simulate_strategy, SimulationError, SimulationParams, StrategySimulator};
pub use stats::{DecisionPoint, StrategyStats};
