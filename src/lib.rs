pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{
    CsvDataSource, DataSourceError, LlamaDataSource, MarketDataSource, MockDataSource,
};
pub use db::{init_db, ResponseCache};
pub use domain::{Asset, HistoricalData, PricePoint, StepType, StrategyStep, Timestamp};
pub use engine::{simulate_strategy, SimulationError, SimulationParams, StrategyPolicy};
pub use error::AppError;
pub use orchestration::{MarketDataLoader, Orchestrator, SimulationReport};
