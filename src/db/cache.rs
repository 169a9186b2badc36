//! Keyed TTL cache of upstream responses.
//!
//! Values are stored as lz4-compressed JSON in `response_cache`. Expired rows
//! are deleted when they are read.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default time-to-live of a cached entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache payload corrupt: {0}")]
    Corrupt(String),
}

/// Stable cache key: `namespace:` followed by a truncated SHA-256 of `parts`.
///
/// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn cache_key(namespace: &str, parts: &[&str]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u32).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let hash = hasher.finalize();
    format!("{}:{}", namespace, hex::encode(&hash[..16]))
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    pool: SqlitePool,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Fresh value under `key`, or `None` when absent or expired.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_at(key, now_ms()).await
    }

    async fn get_at<T: DeserializeOwned>(&self, key: &str, now_ms: i64) -> Result<Option<T>, CacheError> {
        let row = sqlx::query("SELECT stored_at_ms, payload FROM response_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let stored_at_ms: i64 = row.get("stored_at_ms");
        if now_ms - stored_at_ms > self.ttl.as_millis() as i64 {
            debug!(key, "Cache entry expired");
            sqlx::query("DELETE FROM response_cache WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let payload: Vec<u8> = row.get("payload");
        let json = lz4_flex::decompress_size_prepended(&payload)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;
        Ok(Some(serde_json::from_slice(&json)?))
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_at(key, value, now_ms()).await
    }

    async fn set_at<T: Serialize + ?Sized>(&self, key: &str, value: &T, now_ms: i64) -> Result<(), CacheError> {
        let json = serde_json::to_vec(value)?;
        let payload = lz4_flex::compress_prepend_size(&json);
        sqlx::query(
            r#"
            INSERT INTO response_cache (key, stored_at_ms, payload) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET stored_at_ms = excluded.stored_at_ms, payload = excluded.payload
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .bind(payload)
        .execute(&self.pool)
        .await?;
        debug!(key, bytes = json.len(), "Cached response");
        Ok(())
    }

    /// Drop every entry. Returns how many were removed.
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM response_cache")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
