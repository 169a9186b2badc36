//! Wiring between the data sources, the cache and the simulator.

pub mod loader;
pub mod orchestrator;

pub use loader::{GasStats, LoadError, MarketDataLoader, MarketSnapshot};
pub use orchestrator::{OrchestrationError, Orchestrator, SimulationReport, SimulationRequest};
