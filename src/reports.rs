use crate::period::Period;
use crate::schema::Schema;
use crate::types::{
    ComparisonRow, EventIdentity, MetricComparison, NormalizedRecord, PercentChange,
    PeriodAggregate, Totals,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Summed metrics for one identity, with the descriptive fields of the first
/// record seen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateEntry {
    pub event_name: String,
    pub hospital_name: String,
    pub event_id: String,
    pub attributes: BTreeMap<String, String>,
    pub totals: PeriodAggregate,
}

/// Ordered by identity, so iteration does not depend on input row order.
pub type Aggregation = BTreeMap<EventIdentity, AggregateEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    Views,
    Revenue,
}

pub fn aggregate(records: &[NormalizedRecord], period: &Period, schema: &Schema) -> Aggregation {
    let mut map: Aggregation = BTreeMap::new();
    for r in records.iter().filter(|r| period.contains(r.target_date)) {
        let e = map
            .entry(schema.identity_of(r))
            .or_insert_with(|| AggregateEntry {
                event_name: r.event_name.clone(),
                hospital_name: r.hospital_name.clone(),
                event_id: r.event_id.clone(),
                attributes: r.attributes.clone(),
                totals: PeriodAggregate::default(),
            });
        e.totals.add(r.view_count, r.revenue);
    }
    debug!(period = %period, groups = map.len(), "aggregated period");
    map
}

fn views_comparison(current: u64, previous: u64) -> MetricComparison<i64> {
    let widen = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
    let (current, previous) = (widen(current), widen(previous));
    MetricComparison {
        current,
        previous,
        delta: current - previous,
        rate: PercentChange::between(Decimal::from(current), Decimal::from(previous)),
    }
}

fn revenue_comparison(current: Decimal, previous: Decimal) -> MetricComparison<Decimal> {
    MetricComparison {
        current,
        previous,
        delta: current - previous,
        rate: PercentChange::between(current, previous),
    }
}

/// Join each current-period identity with its previous-period figures.
///
/// Identities seen only in the previous period are not reported; a missing
/// previous side counts as zero.
pub fn compare(current: &Aggregation, previous: &Aggregation) -> Vec<ComparisonRow> {
    current
        .iter()
        .map(|(identity, cur)| {
            let prev = previous
                .get(identity)
                .map(|p| p.totals)
                .unwrap_or_default();
            ComparisonRow {
                identity: identity.clone(),
                event_name: cur.event_name.clone(),
                hospital_name: cur.hospital_name.clone(),
                event_id: cur.event_id.clone(),
                attributes: cur.attributes.clone(),
                views: views_comparison(cur.totals.views, prev.views),
                revenue: revenue_comparison(cur.totals.revenue, prev.revenue),
            }
        })
        .collect()
}

/// Top `n` rows by the current value of `key`, descending. Ties keep their
/// input order.
pub fn rank(rows: &[ComparisonRow], key: RankKey, n: usize) -> Vec<&ComparisonRow> {
    let mut sorted: Vec<&ComparisonRow> = rows.iter().collect();
    match key {
        RankKey::Views => sorted.sort_by(|a, b| b.views.current.cmp(&a.views.current)),
        RankKey::Revenue => sorted.sort_by(|a, b| b.revenue.current.cmp(&a.revenue.current)),
    }
    sorted.truncate(n);
    sorted
}

/// Grand totals over every comparison row.
pub fn totals(rows: &[ComparisonRow]) -> Totals {
    let (mut cur_views, mut prev_views) = (0u64, 0u64);
    let (mut cur_rev, mut prev_rev) = (Decimal::ZERO, Decimal::ZERO);
    for r in rows {
        cur_views = cur_views.saturating_add(r.views.current.max(0) as u64);
        prev_views = prev_views.saturating_add(r.views.previous.max(0) as u64);
        cur_rev = cur_rev.checked_add(r.revenue.current).unwrap_or(Decimal::MAX);
        prev_rev = prev_rev.checked_add(r.revenue.previous).unwrap_or(Decimal::MAX);
    }
    Totals {
        views: views_comparison(cur_views, prev_views),
        revenue: revenue_comparison(cur_rev, prev_rev),
    }
}
