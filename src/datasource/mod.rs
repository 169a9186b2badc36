//! Data source abstraction for fetching price, gas, TVL and staking-yield history.

use crate::domain::{Asset, PricePoint, Timestamp};
use async_trait::async_trait;
use std::fmt;

pub mod csv_file;
pub mod interpolate;
pub mod llama;
pub mod mock;

pub use csv_file::CsvDataSource;
pub use interpolate::interpolate_daily;
pub use llama::{LlamaDataSource, LlamaEndpoints};
pub use mock::MockDataSource;

/// Source of the market history a simulation is replayed over.
///
/// Series come back sorted by timestamp but may have gaps; callers put them
/// on a daily grid with [`interpolate_daily`].
#[async_trait]
pub trait MarketDataSource: Send + Sync + fmt::Debug {
    /// USD prices of `asset` between `from` and `to` (inclusive).
    async fn fetch_price_history(
        &self,
        asset: Asset,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError>;

    /// Daily average gas price in Gwei between `from` and `to` (inclusive).
    async fn fetch_gas_history(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError>;

    /// Current Ethereum TVL (USD) of a lending protocol, e.g. `aave-v3`.
    async fn fetch_protocol_tvl(&self, protocol: &str) -> Result<f64, DataSourceError>;

    /// Current staking APY in percent.
    async fn fetch_staking_apy(&self) -> Result<f64, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// The upstream answered but had nothing for the requested range
    MissingData(String),
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::MissingData(msg) => write!(f, "Missing data: {}", msg),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
