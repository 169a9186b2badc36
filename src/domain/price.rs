//! Daily price series and the read-only views the simulator works on.

use super::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One observation of a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64) -> Self {
        Self {
            timestamp: Timestamp::new(timestamp),
            price,
        }
    }
}

/// Which of the three input series a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Eth,
    WstEth,
    Gas,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Eth => write!(f, "ETH"),
            SeriesKind::WstEth => write!(f, "wstETH"),
            SeriesKind::Gas => write!(f, "gas"),
        }
    }
}

/// The three aligned daily series a simulation runs over.
///
/// Expected (not enforced) to share one gap-free, day-aligned grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalData {
    #[serde(default)]
    pub eth_prices: Vec<PricePoint>,
    #[serde(default)]
    pub wsteth_prices: Vec<PricePoint>,
    #[serde(default)]
    pub gas_prices: Vec<PricePoint>,
}

impl HistoricalData {
    pub fn series(&self, kind: SeriesKind) -> PriceSeries<'_> {
        match kind {
            SeriesKind::Eth => PriceSeries::new(&self.eth_prices),
            SeriesKind::WstEth => PriceSeries::new(&self.wsteth_prices),
            SeriesKind::Gas => PriceSeries::new(&self.gas_prices),
        }
    }
}

/// Borrowed view over a timestamp-ordered series.
#[derive(Debug, Clone, Copy)]
pub struct PriceSeries<'a> {
    points: &'a [PricePoint],
}

impl<'a> PriceSeries<'a> {
    pub fn new(points: &'a [PricePoint]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &'a [PricePoint] {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> Option<&'a PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&'a PricePoint> {
        self.points.last()
    }

    /// Price at exactly `timestamp`, or `None` if the series has no such point.
    pub fn price_at(&self, timestamp: Timestamp) -> Option<f64> {
        self.points
            .binary_search_by_key(&timestamp, |p| p.timestamp)
            .ok()
            .map(|idx| self.points[idx].price)
    }

    /// Most recent price at or before `timestamp`.
    pub fn price_at_or_before(&self, timestamp: Timestamp) -> Option<f64> {
        let end = self.points.partition_point(|p| p.timestamp <= timestamp);
        end.checked_sub(1).map(|idx| self.points[idx].price)
    }

    /// Points in the half-open window `(until - days, until]`.
    pub fn window(&self, until: Timestamp, days: i64) -> &'a [PricePoint] {
        let from = until.plus_days(-days);
        let start = self.points.partition_point(|p| p.timestamp <= from);
        let end = self.points.partition_point(|p| p.timestamp <= until);
        if start >= end {
            &[]
        } else {
            &self.points[start..end]
        }
    }

    /// Prices in the window, oldest first.
    pub fn window_prices(&self, until: Timestamp, days: i64) -> Vec<f64> {
        self.window(until, days).iter().map(|p| p.price).collect()
    }

    /// True when timestamps strictly increase with uniform daily spacing.
    pub fn is_daily_grid(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| Some(w[1].timestamp) == w[0].timestamp.next_day())
    }
}
