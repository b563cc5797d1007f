use crate::error::{ReportError, Result};
use chrono::{Duration, NaiveDate};
use std::fmt;

/// Closed calendar-date interval; both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ReportError::InvalidRange { start, end });
        }
        Ok(Period { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The period of identical length that ends the day before this one
    /// starts.
    pub fn previous(&self) -> Period {
        let span = self.end - self.start;
        let prev_end = self.start - Duration::days(1);
        Period {
            start: prev_end - span,
            end: prev_end,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ~ {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_previous_two_day_period() {
        let p = Period::new(d(2025, 8, 1), d(2025, 8, 2)).unwrap();
        let prev = p.previous();
        assert_eq!(prev, Period { start: d(2025, 7, 30), end: d(2025, 7, 31) });
        assert_eq!(prev.num_days(), p.num_days());
    }

    #[test]
    fn test_previous_single_day() {
        let p = Period::new(d(2025, 3, 1), d(2025, 3, 1)).unwrap();
        assert_eq!(p.previous(), Period { start: d(2025, 2, 28), end: d(2025, 2, 28) });
    }

    #[test]
    fn test_previous_abuts_without_overlap() {
        for (s, e) in [
            (d(2024, 1, 1), d(2024, 1, 31)),
            (d(2024, 2, 20), d(2024, 3, 10)),
            (d(2023, 12, 25), d(2024, 1, 7)),
        ] {
            let p = Period::new(s, e).unwrap();
            let prev = p.previous();
            assert_eq!(prev.end + Duration::days(1), p.start);
            assert_eq!(prev.num_days(), p.num_days());
            assert_eq!(prev.start, s - (e - s) - Duration::days(1));
            assert!(!prev.contains(p.start));
        }
    }

    #[test]
    fn test_start_after_end_rejected() {
        let err = Period::new(d(2025, 8, 3), d(2025, 8, 1)).unwrap_err();
        assert!(matches!(err, ReportError::InvalidRange { .. }));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let p = Period::new(d(2025, 8, 1), d(2025, 8, 2)).unwrap();
        assert!(p.contains(d(2025, 8, 1)));
        assert!(p.contains(d(2025, 8, 2)));
        assert!(!p.contains(d(2025, 8, 3)));
        assert!(!p.contains(d(2025, 7, 31)));
    }

    #[test]
    fn test_display() {
        let p = Period::new(d(2025, 8, 1), d(2025, 8, 2)).unwrap();
        assert_eq!(p.to_string(), "2025-08-01 ~ 2025-08-02");
    }
}
