//! Live data source: DefiLlama for prices and TVL, Etherscan for gas, Lido for
//! staking yield.

use super::{DataSourceError, MarketDataSource};
use crate::domain::{Asset, PricePoint, Timestamp, SECONDS_PER_DAY};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Staking APY reported when the Lido API is unavailable.
pub const FALLBACK_STAKING_APY: f64 = 4.5;

const WEI_PER_GWEI: f64 = 1e9;

/// Base URLs of the upstream APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlamaEndpoints {
    pub coins_url: String,
    pub api_url: String,
    pub etherscan_url: String,
    pub etherscan_api_key: Option<String>,
    pub lido_url: String,
}

impl Default for LlamaEndpoints {
    fn default() -> Self {
        Self {
            coins_url: "https://coins.llama.fi".to_string(),
            api_url: "https://api.llama.fi".to_string(),
            etherscan_url: "https://api.etherscan.io/api".to_string(),
            etherscan_api_key: None,
            lido_url: "https://api.lido.fi".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlamaDataSource {
    client: Client,
    endpoints: LlamaEndpoints,
}

impl LlamaDataSource {
    pub fn new(endpoints: LlamaEndpoints) -> Self {
        Self {
            client: Client::new(),
            endpoints,
        }
    }

    /// Create with the public API URLs and no Etherscan key.
    pub fn default_urls() -> Self {
        Self::new(LlamaEndpoints::default())
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, url: &str) -> Result<T, DataSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<T>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }

    fn etherscan_url(&self, query: &str) -> String {
        let key = self.endpoints.etherscan_api_key.as_deref().unwrap_or_default();
        format!("{}?{}&apikey={}", self.endpoints.etherscan_url, query, key)
    }

    async fn fetch_daily_gas(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        let url = self.etherscan_url(&format!(
            "module=stats&action=dailyavggasprice&startdate={}&enddate={}&sort=asc",
            from.date_string(),
            to.date_string()
        ));
        let body: EtherscanResponse = self.get_json(&url).await?;
        parse_daily_gas(body)
    }

    /// Synthesize a history from today's safe gas price when the daily series
    /// is unavailable.
    async fn fetch_estimated_gas(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        let url = self.etherscan_url("module=gastracker&action=gasoracle");
        let body: EtherscanResponse = self.get_json(&url).await?;
        let oracle: GasOracle = serde_json::from_value(body.result)
            .map_err(|e| DataSourceError::ParseError(format!("Invalid gas oracle: {}", e)))?;
        let baseline: f64 = oracle
            .safe_gas_price
            .parse()
            .map_err(|e| DataSourceError::ParseError(format!("Invalid SafeGasPrice: {}", e)))?;
        Ok(estimated_gas_series(baseline, from, to))
    }
}

#[async_trait]
impl MarketDataSource for LlamaDataSource {
    async fn fetch_price_history(
        &self,
        asset: Asset,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        let span_days = span_days(from, to);
        debug!(
            "Fetching price history for asset={}, from={}, to={}, span={}d",
            asset, from, to, span_days
        );

        let url = format!(
            "{}/chart/{}?start={}&span={}&period=1d",
            self.endpoints.coins_url,
            asset.llama_id(),
            from.as_secs(),
            span_days
        );
        let body: ChartResponse = self.get_json(&url).await?;
        parse_chart(body, asset)
    }

    async fn fetch_gas_history(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        debug!("Fetching gas history from={}, to={}", from, to);
        match self.fetch_daily_gas(from, to).await {
            Ok(points) => Ok(points),
            Err(e) => {
                warn!(error = %e, "Daily gas history unavailable, estimating from gas oracle");
                self.fetch_estimated_gas(from, to).await
            }
        }
    }

    async fn fetch_protocol_tvl(&self, protocol: &str) -> Result<f64, DataSourceError> {
        debug!("Fetching TVL for protocol={}", protocol);
        let url = format!("{}/protocol/{}", self.endpoints.api_url, protocol);
        let body: ProtocolResponse = self.get_json(&url).await?;
        Ok(body.current_chain_tvls.get("Ethereum").copied().unwrap_or(0.0))
    }

    async fn fetch_staking_apy(&self) -> Result<f64, DataSourceError> {
        debug!("Fetching staking APR");
        let url = format!("{}/v1/protocol/steth/apr/sma", self.endpoints.lido_url);
        match self.get_json::<LidoResponse>(&url).await {
            Ok(body) => Ok(apr_to_apy(body.data.sma_apr)),
            Err(e) => {
                warn!(error = %e, "Staking APR unavailable, using fallback APY");
                Ok(FALLBACK_STAKING_APY)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    coins: HashMap<String, ChartCoin>,
}

#[derive(Debug, Deserialize)]
struct ChartCoin {
    #[serde(default)]
    prices: Vec<ChartPrice>,
}

/// DefiLlama returns objects; older responses used `[timestamp, price]` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChartPrice {
    Object { timestamp: i64, price: f64 },
    Pair(i64, f64),
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DailyGas {
    #[serde(rename = "unixTimeStamp")]
    unix_timestamp: String,
    #[serde(rename = "avgGasPrice_Wei")]
    avg_gas_price_wei: String,
}

#[derive(Debug, Deserialize)]
struct GasOracle {
    #[serde(rename = "SafeGasPrice")]
    safe_gas_price: String,
}

#[derive(Debug, Deserialize)]
struct ProtocolResponse {
    #[serde(rename = "currentChainTvls", default)]
    current_chain_tvls: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct LidoResponse {
    data: LidoApr,
}

#[derive(Debug, Deserialize)]
struct LidoApr {
    #[serde(rename = "smaApr")]
    sma_apr: f64,
}

/// Whole days covered by `[from, to]`, at least one.
fn span_days(from: Timestamp, to: Timestamp) -> i64 {
    let secs = (to.as_secs() - from.as_secs()).max(0);
    ((secs + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).max(1)
}

fn parse_chart(body: ChartResponse, asset: Asset) -> Result<Vec<PricePoint>, DataSourceError> {
    let coin = body.coins.get(asset.llama_id()).ok_or_else(|| {
        DataSourceError::ParseError(format!("Invalid price data format for {}", asset))
    })?;

    let mut points: Vec<PricePoint> = coin
        .prices
        .iter()
        .filter_map(|p| {
            let (timestamp, price) = match p {
                ChartPrice::Object { timestamp, price } => (*timestamp, *price),
                ChartPrice::Pair(timestamp, price) => (*timestamp, *price),
            };
            if price.is_finite() && price > 0.0 {
                Some(PricePoint::new(timestamp, price))
            } else {
                warn!(asset = %asset, timestamp, price, "Dropping invalid price point");
                None
            }
        })
        .collect();

    if points.is_empty() {
        return Err(DataSourceError::MissingData(format!(
            "No price data available for {}",
            asset
        )));
    }
    points.sort_by_key(|p| p.timestamp);
    points.dedup_by_key(|p| p.timestamp);
    Ok(points)
}

fn parse_daily_gas(body: EtherscanResponse) -> Result<Vec<PricePoint>, DataSourceError> {
    if body.status != "1" {
        return Err(DataSourceError::Other(format!(
            "Etherscan API error: {} {}",
            body.message, body.result
        )));
    }
    let rows: Vec<DailyGas> = serde_json::from_value(body.result)
        .map_err(|e| DataSourceError::ParseError(format!("Invalid daily gas rows: {}", e)))?;

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let (Ok(ts), Ok(wei)) = (
            row.unix_timestamp.parse::<i64>(),
            row.avg_gas_price_wei.parse::<f64>(),
        ) else {
            warn!(
                timestamp = %row.unix_timestamp,
                wei = %row.avg_gas_price_wei,
                "Dropping unparseable gas row"
            );
            continue;
        };
        points.push(PricePoint::new(ts, (wei / WEI_PER_GWEI).floor()));
    }

    if points.is_empty() {
        return Err(DataSourceError::MissingData(
            "No daily gas prices in range".to_string(),
        ));
    }
    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

/// Daily series around `baseline` Gwei: weekdays at 120%, weekends at 80%.
fn estimated_gas_series(baseline: f64, from: Timestamp, to: Timestamp) -> Vec<PricePoint> {
    let mut points = Vec::new();
    let mut t = from;
    while t <= to {
        let factor = if t.is_weekend() { 0.8 } else { 1.2 };
        points.push(PricePoint {
            timestamp: t,
            price: (baseline * factor).round(),
        });
        match t.next_day() {
            Some(next) => t = next,
            None => break,
        }
    }
    points
}

/// Lido reports APR in percent; compound it daily.
fn apr_to_apy(apr_pct: f64) -> f64 {
    let apr = apr_pct / 100.0;
    ((1.0 + apr / 365.0).powi(365) - 1.0) * 100.0
}
