//! Mock data source for testing without network calls.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{Asset, PricePoint, Timestamp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock data source that returns predefined test data.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    eth_prices: Vec<PricePoint>,
    wsteth_prices: Vec<PricePoint>,
    gas_prices: Vec<PricePoint>,
    tvl: HashMap<String, f64>,
    staking_apy: Option<f64>,
    failure: Option<DataSourceError>,
    /// Number of history fetches served, shared across clones.
    calls: Arc<AtomicUsize>,
}

impl MockDataSource {
    /// Create a new mock data source with empty data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the price history returned for `asset`.
    pub fn with_prices(mut self, asset: Asset, prices: Vec<PricePoint>) -> Self {
        match asset {
            Asset::Eth => self.eth_prices = prices,
            Asset::WstEth => self.wsteth_prices = prices,
        }
        self
    }

    /// Set the gas history.
    pub fn with_gas(mut self, prices: Vec<PricePoint>) -> Self {
        self.gas_prices = prices;
        self
    }

    /// Set the TVL returned for `protocol`.
    pub fn with_tvl(mut self, protocol: &str, tvl: f64) -> Self {
        self.tvl.insert(protocol.to_string(), tvl);
        self
    }

    /// Set the value returned by fetch_staking_apy.
    pub fn with_staking_apy(mut self, apy: f64) -> Self {
        self.staking_apy = Some(apy);
        self
    }

    /// Make every fetch fail with `err`.
    pub fn with_failure(mut self, err: DataSourceError) -> Self {
        self.failure = Some(err);
        self
    }

    /// How many price or gas histories have been fetched.
    pub fn history_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn history(&self, points: &[PricePoint], from: Timestamp, to: Timestamp) -> Result<Vec<PricePoint>, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(points
            .iter()
            .filter(|p| p.timestamp >= from && p.timestamp <= to)
            .copied()
            .collect())
    }
}

#[async_trait]
impl MarketDataSource for MockDataSource {
    async fn fetch_price_history(
        &self,
        asset: Asset,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        match asset {
            Asset::Eth => self.history(&self.eth_prices, from, to),
            Asset::WstEth => self.history(&self.wsteth_prices, from, to),
        }
    }

    async fn fetch_gas_history(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        self.history(&self.gas_prices, from, to)
    }

    async fn fetch_protocol_tvl(&self, protocol: &str) -> Result<f64, DataSourceError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.tvl.get(protocol).copied().unwrap_or(0.0))
    }

    async fn fetch_staking_apy(&self) -> Result<f64, DataSourceError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(self.staking_apy.unwrap_or(0.0))
    }
}
