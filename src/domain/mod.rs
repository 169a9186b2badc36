//! Domain types for the loop simulator.
//!
//! This module provides:
//! - Time and asset primitives (`Timestamp`, `Asset`)
//! - Daily price series and read-only lookup views
//! - Per-tick market classification
//! - Output ledger records (`StrategyStep`) and their currency formatting

pub mod market;
pub mod money;
pub mod price;
pub mod primitives;
pub mod step;

pub use market::{GasConditions, MarketConditions, PriceTrend};
pub use price::{HistoricalData, PricePoint, PriceSeries, SeriesKind};
pub use primitives::{Asset, Timestamp, SECONDS_PER_DAY};
pub use step::{Balances, RiskMetrics, StepDetails, StepType, StrategyStep};
