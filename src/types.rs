use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use tabled::Tabled;

/// One uploaded row, cells still as text. Columns are resolved by the schema,
/// so absent cells are `None`.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub hospital_name: Option<String>,
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub target_date: Option<String>,
    pub view_count: Option<String>,
    pub revenue: Option<String>,
    /// Optional attribute columns (discount price, category levels) keyed by
    /// source column name.
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub hospital_name: String,
    pub event_id: String,
    pub event_name: String,
    pub target_date: NaiveDate,
    pub view_count: u64,
    pub revenue: Decimal,
    pub attributes: BTreeMap<String, String>,
}

/// Grouping key: the values of the schema's identity columns, in key order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventIdentity(pub Vec<String>);

impl EventIdentity {
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// Summed metrics for one identity within one period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeriodAggregate {
    pub views: u64,
    pub revenue: Decimal,
}

impl PeriodAggregate {
    /// Sums saturate at the type maximum instead of overflowing.
    pub fn add(&mut self, views: u64, revenue: Decimal) {
        self.views = self.views.saturating_add(views);
        self.revenue = self.revenue.checked_add(revenue).unwrap_or(Decimal::MAX);
    }
}

/// Percentage change between a current value and its baseline.
///
/// A zero baseline never divides: growth from nothing is a flat +100% and
/// nothing-to-nothing is 0%.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    /// Previous was zero, current is positive.
    NoBaseline,
    /// Both sides zero.
    Unchanged,
    Ratio(f64),
}

impl PercentChange {
    pub fn between(current: Decimal, previous: Decimal) -> Self {
        if previous.is_zero() {
            if current > Decimal::ZERO {
                PercentChange::NoBaseline
            } else {
                PercentChange::Unchanged
            }
        } else {
            let exact = current
                .checked_sub(previous)
                .and_then(|delta| delta.checked_div(previous))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
            let rate = match exact {
                Some(rate) => rate.to_f64().unwrap_or(0.0),
                None => {
                    let (c, p) = (current.to_f64().unwrap_or(0.0), previous.to_f64().unwrap_or(0.0));
                    ((c - p) / p * 100.0).clamp(f64::MIN, f64::MAX)
                }
            };
            PercentChange::Ratio(rate)
        }
    }

    /// Full-precision numeric value used for sorting and export.
    pub fn value(&self) -> f64 {
        match self {
            PercentChange::NoBaseline => 100.0,
            PercentChange::Unchanged => 0.0,
            PercentChange::Ratio(r) => *r,
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentChange::NoBaseline => write!(f, "+100.00%"),
            PercentChange::Unchanged => write!(f, "0.00%"),
            PercentChange::Ratio(r) => write!(f, "{:+.2}%", r),
        }
    }
}

impl Serialize for PercentChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

/// Before/after pair for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricComparison<T> {
    pub current: T,
    pub previous: T,
    pub delta: T,
    pub rate: PercentChange,
}

/// One current-period identity joined with its previous-period figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub identity: EventIdentity,
    pub event_name: String,
    pub hospital_name: String,
    pub event_id: String,
    pub attributes: BTreeMap<String, String>,
    /// Delta is signed; views are widened to `i64` for it.
    pub views: MetricComparison<i64>,
    pub revenue: MetricComparison<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub views: MetricComparison<i64>,
    pub revenue: MetricComparison<Decimal>,
}

/// Top-N entry as shown to the user: identity plus "value (±rate%)".
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct RankedRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "이벤트명")]
    #[tabled(rename = "이벤트명")]
    pub event_name: String,
    #[serde(rename = "병원명")]
    #[tabled(rename = "병원명")]
    pub hospital_name: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Detail-table row with display formatting applied.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DetailDisplayRow {
    #[serde(rename = "이벤트명")]
    #[tabled(rename = "이벤트명")]
    pub event_name: String,
    #[serde(rename = "병원명")]
    #[tabled(rename = "병원명")]
    pub hospital_name: String,
    #[serde(rename = "이벤트 ID")]
    #[tabled(rename = "이벤트 ID")]
    pub event_id: String,
    #[serde(rename = "Attributes")]
    #[tabled(rename = "Attributes")]
    pub attributes: String,
    #[serde(rename = "조회수")]
    #[tabled(rename = "조회수")]
    pub views: String,
    #[serde(rename = "조회수 증감량")]
    #[tabled(rename = "조회수 증감량")]
    pub views_delta: String,
    #[serde(rename = "조회수 증감률(%)")]
    #[tabled(rename = "조회수 증감률(%)")]
    pub views_rate: String,
    #[serde(rename = "CPV매출")]
    #[tabled(rename = "CPV매출")]
    pub revenue: String,
    #[serde(rename = "CPV매출 증감액")]
    #[tabled(rename = "CPV매출 증감액")]
    pub revenue_delta: String,
    #[serde(rename = "CPV매출 증감률(%)")]
    #[tabled(rename = "CPV매출 증감률(%)")]
    pub revenue_rate: String,
}

#[derive(Debug, Serialize)]
pub struct TotalsSummary {
    pub current_views: i64,
    pub previous_views: i64,
    pub views_delta: i64,
    pub views_rate: String,
    pub current_revenue: Decimal,
    pub previous_revenue: Decimal,
    pub revenue_delta: Decimal,
    pub revenue_rate: String,
}
