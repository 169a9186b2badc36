//! SQLite-backed response cache.
//!
//! This module provides:
//! - Database initialization and schema
//! - SQLite pragma configuration
//! - The TTL cache used by the market data loader

pub mod cache;
pub mod migrations;

pub use cache::{cache_key, CacheError, ResponseCache, DEFAULT_TTL};
pub use migrations::init_db;
