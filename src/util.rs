// Utility helpers for parsing and number formatting.
//
// All of the "dirty" CSV cell handling lives here so the engine can assume
// clean, typed values.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Date-only layouts accepted by [`parse_date_lenient`], tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y. %m. %d",
    "%Y%m%d",
    "%Y년 %m월 %d일",
    "%m/%d/%Y",
    "%d %b %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

/// Strip every character that is not an ASCII digit or a decimal point and
/// parse what is left.
///
/// - `"1,500,000"` and `"1500000 원"` both become `1500000`.
/// - A minus sign is stripped like any other decoration, so the result is
///   never negative.
/// - Returns `None` when nothing parseable remains (empty cell, `"1.2.3"`,
///   pure text). Callers coerce that to zero.
pub fn clean_numeric(s: &str) -> Option<Decimal> {
    let digits: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    Decimal::from_str(&digits).ok()
}

/// View counts are whole numbers; a fractional cell is truncated and counts
/// are capped at `i64::MAX` so signed deltas stay representable.
pub fn clean_count(s: &str) -> Option<u64> {
    let count = clean_numeric(s)?.trunc().to_u64().unwrap_or(u64::MAX);
    Some(count.min(i64::MAX as u64))
}

/// Parse a calendar date from any of the common spreadsheet layouts.
///
/// Time components are accepted and discarded. Returns `None` when no layout
/// matches.
pub fn parse_date_lenient(s: &str) -> Option<NaiveDate> {
    // Korean locale exports often end with a trailing dot ("2025. 8. 1.").
    let s = s.trim().trim_end_matches('.').trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

fn saturate_i64(d: Decimal) -> i64 {
    d.to_i64().unwrap_or(if d.is_sign_negative() { i64::MIN } else { i64::MAX })
}

/// Whole-unit view of an exact amount, truncated toward zero and saturated
/// at the `i64` bounds.
pub fn decimal_to_i64(d: Decimal) -> i64 {
    saturate_i64(d.trunc())
}

/// Whole-unit view of an exact amount, rounded half to even.
pub fn decimal_round_i64(d: Decimal) -> i64 {
    saturate_i64(d.round_dp(0))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for integer-like values
    // (e.g., `11,500`).
    n.to_formatted_string(&Locale::en)
}

/// Integer with thousands separators and an explicit sign (`+11,500`, `-300`).
pub fn format_signed_grouped(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_int(n.unsigned_abs()))
    } else {
        format!("+{}", format_int(n))
    }
}

/// Integer with an explicit sign and no grouping (`+11500`).
pub fn format_signed(n: i64) -> String {
    format!("{:+}", n)
}

/// Append a unit suffix (e.g. a currency word) separated by a space.
pub fn with_suffix(value: String, suffix: &str) -> String {
    if suffix.is_empty() {
        value
    } else {
        format!("{} {}", value, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_clean_numeric_strips_separators_and_currency() {
        assert_eq!(clean_numeric("1,500,000"), Some(dec!(1500000)));
        assert_eq!(clean_numeric("1500000 원"), Some(dec!(1500000)));
        assert_eq!(clean_numeric("₩2,000,000.50"), Some(dec!(2000000.50)));
        assert_eq!(clean_numeric("-300"), Some(dec!(300)));
    }

    #[test]
    fn test_clean_numeric_unparseable() {
        assert_eq!(clean_numeric(""), None);
        assert_eq!(clean_numeric("n/a"), None);
        assert_eq!(clean_numeric("1.2.3"), None);
    }

    #[test]
    fn test_clean_count_truncates() {
        assert_eq!(clean_count("5,000"), Some(5000));
        assert_eq!(clean_count("12.9회"), Some(12));
        assert_eq!(clean_count("없음"), None);
        assert_eq!(clean_count("18446744073709551615"), Some(i64::MAX as u64));
        assert_eq!(clean_count("79228162514264337593543950335"), Some(i64::MAX as u64));
    }

    #[test]
    fn test_decimal_to_i64_saturates() {
        assert_eq!(decimal_to_i64(Decimal::MAX), i64::MAX);
        assert_eq!(decimal_to_i64(Decimal::MIN), i64::MIN);
        assert_eq!(decimal_to_i64(Decimal::from_str("1500.7").unwrap()), 1500);
        assert_eq!(decimal_round_i64(Decimal::from_str("1500.7").unwrap()), 1501);
        assert_eq!(decimal_round_i64(Decimal::from_str("-20.6").unwrap()), -21);
        assert_eq!(decimal_round_i64(Decimal::MAX), i64::MAX);
    }

    #[test]
    fn test_parse_date_lenient_layouts() {
        let aug1 = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(parse_date_lenient("2025-08-01"), Some(aug1));
        assert_eq!(parse_date_lenient("2025/08/01"), Some(aug1));
        assert_eq!(parse_date_lenient("2025.08.01"), Some(aug1));
        assert_eq!(parse_date_lenient("20250801"), Some(aug1));
        assert_eq!(parse_date_lenient("08/01/2025"), Some(aug1));
        assert_eq!(parse_date_lenient(" 2025-08-01 13:45:00 "), Some(aug1));
        assert_eq!(parse_date_lenient("2025-08-01T00:00:00+09:00"), Some(aug1));
        assert_eq!(parse_date_lenient("2025. 8. 1."), Some(aug1));
        assert_eq!(parse_date_lenient("2025. 08. 01"), Some(aug1));
        assert_eq!(parse_date_lenient("2025년 8월 1일"), Some(aug1));
    }

    #[test]
    fn test_parse_date_lenient_rejects_garbage() {
        assert_eq!(parse_date_lenient(""), None);
        assert_eq!(parse_date_lenient("not a date"), None);
        assert_eq!(parse_date_lenient("2025-13-45"), None);
    }

    #[test]
    fn test_signed_formatting() {
        assert_eq!(format_signed(11500), "+11500");
        assert_eq!(format_signed(-20), "-20");
        assert_eq!(format_signed(0), "+0");
        assert_eq!(format_signed_grouped(11500), "+11,500");
        assert_eq!(format_signed_grouped(-1_500_000), "-1,500,000");
        assert_eq!(with_suffix(format_int(1500000), "원"), "1,500,000 원");
        assert_eq!(with_suffix("7".to_string(), ""), "7");
    }
}
