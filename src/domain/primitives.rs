//! Domain primitives: Timestamp, Asset.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Length of one simulation tick.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Time in seconds since Unix epoch (UTC).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a Timestamp from seconds.
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    /// Midnight UTC of the given calendar day.
    pub fn from_date(date: NaiveDate) -> Self {
        Timestamp(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc().timestamp())
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// The same instant one day later, or `None` past the end of `i64`.
    pub fn next_day(&self) -> Option<Self> {
        self.0.checked_add(SECONDS_PER_DAY).map(Timestamp)
    }

    /// Shift by a whole number of days (negative moves backwards), clamped
    /// to the `i64` range.
    pub fn plus_days(&self, days: i64) -> Self {
        Timestamp(self.0.saturating_add(days.saturating_mul(SECONDS_PER_DAY)))
    }

    /// True when chrono can represent this instant as a calendar date.
    pub fn is_representable(&self) -> bool {
        DateTime::from_timestamp(self.0, 0).is_some()
    }

    fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// ISO calendar date, e.g. `2023-01-15`.
    pub fn date_string(&self) -> String {
        self.to_datetime().format("%Y-%m-%d").to_string()
    }

    /// Wall-clock time of day, e.g. `00:00:00`.
    pub fn time_string(&self) -> String {
        self.to_datetime().format("%H:%M:%S").to_string()
    }

    /// True on Saturday or Sunday (UTC).
    pub fn is_weekend(&self) -> bool {
        use chrono::Datelike;
        matches!(
            self.to_datetime().weekday(),
            chrono::Weekday::Sat | chrono::Weekday::Sun
        )
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two assets of the loop: the base asset and its yield-bearing derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// Base asset (WETH).
    Eth,
    /// Lido wrapped staked ETH.
    WstEth,
}

impl Asset {
    /// DefiLlama coin identifier (`chain:address`).
    pub fn llama_id(&self) -> &'static str {
        match self {
            Asset::Eth => "ethereum:0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            Asset::WstEth => "ethereum:0x7f39c581f595b53c5cb19bd0b3f8da6c935e2ca0",
        }
    }

    /// Short symbol used in logs and file names.
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Eth => "eth",
            Asset::WstEth => "wsteth",
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_date_and_time() {
        // 2023-01-15T00:00:00Z
        let ts = Timestamp::new(1_673_740_800);
        assert_eq!(ts.date_string(), "2023-01-15");
        assert_eq!(ts.time_string(), "00:00:00");
    }

    #[test]
    fn test_timestamp_from_date() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(Timestamp::from_date(date), Timestamp::new(1_673_740_800));
    }

    #[test]
    fn test_next_day() {
        let ts = Timestamp::new(0);
        assert_eq!(ts.next_day(), Some(Timestamp::new(SECONDS_PER_DAY)));
        assert_eq!(ts.plus_days(-2), Timestamp::new(-2 * SECONDS_PER_DAY));
    }

    #[test]
    fn test_day_arithmetic_at_i64_edges() {
        let last = Timestamp::new(i64::MAX - i64::MAX % SECONDS_PER_DAY);
        assert_eq!(last.next_day(), None);
        assert_eq!(last.plus_days(3), Timestamp::new(i64::MAX));
        assert_eq!(Timestamp::new(i64::MIN + 1).plus_days(-7), Timestamp::new(i64::MIN));
        assert!(!last.is_representable());
        assert!(Timestamp::new(1_673_740_800).is_representable());
    }

    #[test]
    fn test_weekend() {
        // 2023-01-14 was a Saturday, 2023-01-16 a Monday.
        assert!(Timestamp::new(1_673_654_400).is_weekend());
        assert!(!Timestamp::new(1_673_827_200).is_weekend());
    }

    #[test]
    fn test_timestamp_serializes_as_number() {
        let json = serde_json::to_string(&Timestamp::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_asset_serialization() {
        assert_eq!(serde_json::to_string(&Asset::WstEth).unwrap(), "\"wsteth\"");
        assert_eq!(Asset::Eth.to_string(), "eth");
    }
}
