use crate::datasource::LlamaEndpoints;
use crate::engine::{MissingPricePolicy, ReentryRule, StrategyPolicy};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cache_db_path: String,
    pub cache_ttl: Duration,
    pub data_source: DataSourceKind,
    pub endpoints: LlamaEndpoints,
    pub max_loops: u32,
    pub lookback_days: i64,
    pub reentry_rule: ReentryRule,
    pub missing_price: MissingPricePolicy,
}

/// Where market history comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceKind {
    Live,
    Csv { dir: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| -> String {
            env_map
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let port = get("PORT", "8080").parse::<u16>().map_err(|_| {
            ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
        })?;

        let cache_db_path = get("CACHE_DB_PATH", ".cache/loopsim.db");

        let cache_ttl_secs = get("CACHE_TTL_SECS", "3600").parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "CACHE_TTL_SECS".to_string(),
                "must be a non-negative integer".to_string(),
            )
        })?;

        let data_source = match get("DATA_SOURCE", "live").as_str() {
            "live" => DataSourceKind::Live,
            "csv" => DataSourceKind::Csv {
                dir: env_map
                    .get("CSV_DATA_DIR")
                    .cloned()
                    .ok_or_else(|| ConfigError::MissingEnv("CSV_DATA_DIR".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "DATA_SOURCE".to_string(),
                    format!("must be live or csv, got {}", other),
                ))
            }
        };

        let defaults = LlamaEndpoints::default();
        let endpoints = LlamaEndpoints {
            coins_url: get("DEFILLAMA_COINS_URL", &defaults.coins_url),
            api_url: get("DEFILLAMA_API_URL", &defaults.api_url),
            etherscan_url: get("ETHERSCAN_API_URL", &defaults.etherscan_url),
            etherscan_api_key: env_map
                .get("ETHERSCAN_API_KEY")
                .filter(|k| !k.is_empty())
                .cloned(),
            lido_url: get("LIDO_API_URL", &defaults.lido_url),
        };

        let max_loops = get("MAX_LOOPS", "5").parse::<u32>().map_err(|_| {
            ConfigError::InvalidValue("MAX_LOOPS".to_string(), "must be a valid u32".to_string())
        })?;

        let lookback_days = match get("LOOKBACK_DAYS", "7").parse::<i64>() {
            Ok(days) if days >= 1 => days,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "LOOKBACK_DAYS".to_string(),
                    "must be a positive integer".to_string(),
                ))
            }
        };

        let reentry_rule = get("REENTRY_RULE", "entry-conditions")
            .parse::<ReentryRule>()
            .map_err(|msg| ConfigError::InvalidValue("REENTRY_RULE".to_string(), msg))?;

        let missing_price = get("MISSING_PRICE_POLICY", "fail")
            .parse::<MissingPricePolicy>()
            .map_err(|msg| ConfigError::InvalidValue("MISSING_PRICE_POLICY".to_string(), msg))?;

        Ok(Config {
            port,
            cache_db_path,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            data_source,
            endpoints,
            max_loops,
            lookback_days,
            reentry_rule,
            missing_price,
        })
    }

    /// Default thresholds with the configurable knobs applied.
    pub fn policy(&self) -> StrategyPolicy {
        StrategyPolicy {
            max_loops: self.max_loops,
            lookback_days: self.lookback_days,
            reentry_rule: self.reentry_rule,
            missing_price: self.missing_price,
            ..StrategyPolicy::default()
        }
    }
}
