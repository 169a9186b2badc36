//! Fixed-point formatting of USD amounts and token balances.
//!
//! Arithmetic stays in `f64`; only the presentation strings go through
//! `rust_decimal` so rounding is half-away-from-zero and never shows
//! exponent notation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

fn round(value: f64, dp: u32) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
}

/// Format a token amount with a fixed number of decimals (`1.5` -> `1.5000`).
pub fn format_units(value: f64, dp: u32) -> String {
    match round(value, dp) {
        Some(d) => format!("{:.*}", dp as usize, d),
        None => format!("{:.*}", dp as usize, value),
    }
}

/// Format an amount as en-US currency: `$12,345.68`, `-$5.00`.
pub fn format_usd(value: f64) -> String {
    let Some(rounded) = round(value, 2) else {
        return format!("${:.2}", value);
    };
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = format!("{:.2}", rounded.abs());
    let (whole, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac)
}

/// Parse a string produced by [`format_usd`] back to a number.
pub fn parse_usd(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd_grouping() {
        assert_eq!(format_usd(10000.0), "$10,000.00");
        assert_eq!(format_usd(1234567.891), "$1,234,567.89");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(0.0), "$0.00");
    }

    #[test]
    fn test_format_usd_negative() {
        assert_eq!(format_usd(-87.8), "-$87.80");
        assert_eq!(format_usd(-0.001), "$0.00");
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(5.0, 4), "5.0000");
        assert_eq!(format_units(4.878_048_78, 4), "4.8780");
        assert_eq!(format_units(0.00005, 4), "0.0001");
    }

    #[test]
    fn test_parse_usd() {
        assert_eq!(parse_usd("$10,000.00"), Some(10000.0));
        assert_eq!(parse_usd("-$87.80"), Some(-87.8));
        assert_eq!(parse_usd("n/a"), None);
    }
}
