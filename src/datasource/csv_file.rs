//! Offline data source reading `timestamp,price` CSV files from a directory.

use super::llama::FALLBACK_STAKING_APY;
use super::{DataSourceError, MarketDataSource};
use crate::domain::{Asset, PricePoint, Timestamp};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File holding the gas series, next to `eth.csv` and `wsteth.csv`.
pub const GAS_FILE: &str = "gas.csv";

#[derive(Debug, Deserialize)]
struct PriceRow {
    timestamp: i64,
    price: f64,
}

/// Reads `eth.csv`, `wsteth.csv` and `gas.csv` from `dir`.
///
/// TVL and staking APY have no file; they come from the values set with
/// [`CsvDataSource::with_tvl`] and [`CsvDataSource::with_staking_apy`].
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
    tvl: HashMap<String, f64>,
    staking_apy: f64,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            tvl: HashMap::new(),
            staking_apy: FALLBACK_STAKING_APY,
        }
    }

    pub fn with_tvl(mut self, protocol: &str, tvl: f64) -> Self {
        self.tvl.insert(protocol.to_string(), tvl);
        self
    }

    pub fn with_staking_apy(mut self, apy: f64) -> Self {
        self.staking_apy = apy;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read_series(
        &self,
        filename: &str,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        let path = self.dir.join(filename);
        debug!("Reading series from {}", path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            DataSourceError::MissingData(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut points = parse_series(&bytes)
            .map_err(|e| DataSourceError::ParseError(format!("{}: {}", path.display(), e)))?;
        points.retain(|p| p.timestamp >= from && p.timestamp <= to);
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }
}

/// Parse a `timestamp,price` CSV body.
pub fn parse_series(bytes: &[u8]) -> Result<Vec<PricePoint>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    reader
        .deserialize::<PriceRow>()
        .map(|row| row.map(|r| PricePoint::new(r.timestamp, r.price)))
        .collect()
}

#[async_trait]
impl MarketDataSource for CsvDataSource {
    async fn fetch_price_history(
        &self,
        asset: Asset,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        self.read_series(&format!("{}.csv", asset.symbol()), from, to)
            .await
    }

    async fn fetch_gas_history(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        self.read_series(GAS_FILE, from, to).await
    }

    async fn fetch_protocol_tvl(&self, protocol: &str) -> Result<f64, DataSourceError> {
        Ok(self.tvl.get(protocol).copied().unwrap_or(0.0))
    }

    async fn fetch_staking_apy(&self) -> Result<f64, DataSourceError> {
        Ok(self.staking_apy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_series() {
        let csv = b"timestamp,price\n0,2000.5\n86400, 2010\n";
        let points = parse_series(csv).unwrap();
        assert_eq!(
            points,
            vec![PricePoint::new(0, 2000.5), PricePoint::new(86_400, 2010.0)]
        );
    }

    #[test]
    fn test_parse_series_rejects_bad_price() {
        let csv = b"timestamp,price\n0,abc\n";
        assert!(parse_series(csv).is_err());
    }

    #[tokio::test]
    async fn test_reads_and_filters_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("wsteth.csv"),
            "timestamp,price\n172800,2070\n0,2050\n86400,2060\n",
        )
        .unwrap();

        let source = CsvDataSource::new(dir.path()).with_tvl("aave-v3", 42.0);
        let points = source
            .fetch_price_history(Asset::WstEth, Timestamp::new(0), Timestamp::new(86_400))
            .await
            .unwrap();
        assert_eq!(
            points,
            vec![PricePoint::new(0, 2050.0), PricePoint::new(86_400, 2060.0)]
        );
        assert_eq!(source.fetch_protocol_tvl("aave-v3").await.unwrap(), 42.0);
        assert_eq!(source.fetch_staking_apy().await.unwrap(), FALLBACK_STAKING_APY);
    }

    #[tokio::test]
    async fn test_missing_file_is_missing_data() {
        let dir = TempDir::new().unwrap();
        let source = CsvDataSource::new(dir.path());
        let err = source
            .fetch_gas_history(Timestamp::new(0), Timestamp::new(86_400))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::MissingData(_)));
    }
}
