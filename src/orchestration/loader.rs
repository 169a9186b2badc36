use crate::datasource::{interpolate_daily, DataSourceError, MarketDataSource};
use crate::db::{cache_key, ResponseCache};
use crate::domain::{Asset, HistoricalData, PricePoint, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Lending protocols whose TVL is reported alongside a run.
pub const AAVE_PROTOCOL: &str = "aave-v3";
pub const COMPOUND_PROTOCOL: &str = "compound-v3";

/// Summary of the gas series a run used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasStats {
    /// Mean rounded to a whole Gwei.
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl GasStats {
    pub fn from_points(points: &[PricePoint]) -> Self {
        if points.is_empty() {
            return Self {
                average: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let prices = points.iter().map(|p| p.price);
        Self {
            average: (prices.clone().sum::<f64>() / points.len() as f64).round(),
            min: prices.clone().fold(f64::INFINITY, f64::min),
            max: prices.fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Market context reported with a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(rename = "aaveTVL")]
    pub aave_tvl: f64,
    #[serde(rename = "compoundTVL")]
    pub compound_tvl: f64,
    #[serde(rename = "stakingAPY")]
    pub staking_apy: f64,
    #[serde(rename = "gasPrices")]
    pub gas_prices: GasStats,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: Timestamp, end: Timestamp },
    #[error("inconsistent number of data points after interpolation: eth={eth}, wsteth={wsteth}, gas={gas}")]
    InconsistentLengths {
        eth: usize,
        wsteth: usize,
        gas: usize,
    },
}

/// Fetches the three daily series for a date range and puts them on one grid.
#[derive(Clone)]
pub struct MarketDataLoader {
    source: Arc<dyn MarketDataSource>,
    cache: Option<ResponseCache>,
}

impl MarketDataLoader {
    pub fn new(source: Arc<dyn MarketDataSource>, cache: Option<ResponseCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Daily ETH, wstETH and gas series covering `[start, end]`.
    ///
    /// Cache failures are logged and treated as a miss.
    pub async fn load_historical(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<HistoricalData, LoadError> {
        if start > end {
            return Err(LoadError::InvalidRange { start, end });
        }

        let (from_s, to_s) = (start.as_secs().to_string(), end.as_secs().to_string());
        let key = cache_key("historical", &[from_s.as_str(), to_s.as_str()]);
        if let Some(cache) = &self.cache {
            match cache.get::<HistoricalData>(&key).await {
                Ok(Some(data)) => {
                    info!(%start, %end, "Using cached historical data");
                    return Ok(data);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Cache read failed, fetching"),
            }
        }

        let (eth, wsteth, gas) = futures::try_join!(
            self.source.fetch_price_history(Asset::Eth, start, end),
            self.source.fetch_price_history(Asset::WstEth, start, end),
            self.source.fetch_gas_history(start, end),
        )?;

        for (name, raw) in [("ETH", &eth), ("wstETH", &wsteth), ("gas", &gas)] {
            if raw.is_empty() {
                return Err(DataSourceError::MissingData(format!(
                    "No {} data between {} and {}",
                    name,
                    start.date_string(),
                    end.date_string()
                ))
                .into());
            }
        }

        let data = HistoricalData {
            eth_prices: interpolate_daily(&eth, start, end),
            wsteth_prices: interpolate_daily(&wsteth, start, end),
            gas_prices: interpolate_daily(&gas, start, end),
        };
        let (n_eth, n_wst, n_gas) = (
            data.eth_prices.len(),
            data.wsteth_prices.len(),
            data.gas_prices.len(),
        );
        if n_eth != n_wst || n_eth != n_gas {
            return Err(LoadError::InconsistentLengths {
                eth: n_eth,
                wsteth: n_wst,
                gas: n_gas,
            });
        }
        info!(
            %start,
            %end,
            days = n_eth,
            raw_eth = eth.len(),
            raw_wsteth = wsteth.len(),
            raw_gas = gas.len(),
            "Loaded historical data"
        );

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &data).await {
                warn!(error = %e, "Cache write failed");
            }
        }
        Ok(data)
    }

    /// Protocol TVLs and staking APY, plus stats over `gas`.
    pub async fn load_market_snapshot(&self, gas: &[PricePoint]) -> Result<MarketSnapshot, LoadError> {
        let (aave_tvl, compound_tvl, staking_apy) = futures::try_join!(
            self.source.fetch_protocol_tvl(AAVE_PROTOCOL),
            self.source.fetch_protocol_tvl(COMPOUND_PROTOCOL),
            self.source.fetch_staking_apy(),
        )?;
        Ok(MarketSnapshot {
            aave_tvl,
            compound_tvl,
            staking_apy,
            gas_prices: GasStats::from_points(gas),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use crate::db::{init_db, DEFAULT_TTL};
    use crate::domain::SECONDS_PER_DAY;
    use tempfile::TempDir;

    const DAY: i64 = SECONDS_PER_DAY;

    fn gappy_source() -> MockDataSource {
        MockDataSource::new()
            .with_prices(
                Asset::Eth,
                vec![PricePoint::new(0, 2000.0), PricePoint::new(2 * DAY, 2040.0)],
            )
            .with_prices(
                Asset::WstEth,
                vec![
                    PricePoint::new(0, 2050.0),
                    PricePoint::new(DAY, 2060.0),
                    PricePoint::new(2 * DAY, 2070.0),
                ],
            )
            .with_gas(vec![PricePoint::new(DAY, 30.0)])
            .with_tvl(AAVE_PROTOCOL, 1.0e10)
            .with_staking_apy(3.5)
    }

    #[tokio::test]
    async fn test_load_historical_interpolates_onto_grid() {
        let loader = MarketDataLoader::new(Arc::new(gappy_source()), None);
        let data = loader
            .load_historical(Timestamp::new(0), Timestamp::new(2 * DAY))
            .await
            .unwrap();

        assert_eq!(data.eth_prices.len(), 3);
        assert_eq!(data.eth_prices[1].price, 2020.0);
        assert_eq!(data.wsteth_prices.len(), 3);
        assert!(data.gas_prices.iter().all(|p| p.price == 30.0));
    }

    #[tokio::test]
    async fn test_load_historical_rejects_inverted_range() {
        let loader = MarketDataLoader::new(Arc::new(gappy_source()), None);
        let err = loader
            .load_historical(Timestamp::new(DAY), Timestamp::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_load_historical_empty_series_is_missing_data() {
        let source = MockDataSource::new()
            .with_prices(Asset::Eth, vec![PricePoint::new(0, 2000.0)])
            .with_prices(Asset::WstEth, vec![PricePoint::new(0, 2050.0)]);
        let loader = MarketDataLoader::new(Arc::new(source), None);
        let err = loader
            .load_historical(Timestamp::new(0), Timestamp::new(DAY))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::DataSource(DataSourceError::MissingData(_))
        ));
    }

    #[tokio::test]
    async fn test_second_load_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let pool = init_db(&dir.path().join("c.db").to_string_lossy())
            .await
            .unwrap();
        let source = gappy_source();
        let loader = MarketDataLoader::new(
            Arc::new(source.clone()),
            Some(ResponseCache::new(pool, DEFAULT_TTL)),
        );

        let first = loader
            .load_historical(Timestamp::new(0), Timestamp::new(2 * DAY))
            .await
            .unwrap();
        assert_eq!(source.history_calls(), 3);

        let second = loader
            .load_historical(Timestamp::new(0), Timestamp::new(2 * DAY))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(source.history_calls(), 3);
    }

    #[tokio::test]
    async fn test_market_snapshot() {
        let loader = MarketDataLoader::new(Arc::new(gappy_source()), None);
        let gas = vec![
            PricePoint::new(0, 20.0),
            PricePoint::new(DAY, 31.0),
            PricePoint::new(2 * DAY, 40.0),
        ];
        let snapshot = loader.load_market_snapshot(&gas).await.unwrap();
        assert_eq!(snapshot.aave_tvl, 1.0e10);
        assert_eq!(snapshot.compound_tvl, 0.0);
        assert_eq!(snapshot.staking_apy, 3.5);
        assert_eq!(
            snapshot.gas_prices,
            GasStats {
                average: 30.0,
                min: 20.0,
                max: 40.0
            }
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["aaveTVL"], 1.0e10);
        assert_eq!(json["gasPrices"]["max"], 40.0);
    }
}
