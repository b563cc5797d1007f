//! # Event Report
//!
//! Period-over-period performance comparison for promotional events.
//!
//! An uploaded CSV of per-day event records is normalized, the selected date
//! range is paired with the immediately preceding range of equal length, both
//! periods are summed per event identity, and the results are joined into a
//! comparison with totals, top-N rankings, a detail table and a CSV export.
//!
//! ```rust,ignore
//! use event_report::*;
//!
//! let schema = Schema::basic();
//! let dataset = loader::load_and_clean("events.csv", &schema)?;
//! let period = Period::new(dataset.min_date, dataset.max_date)?;
//! let report = generate_report(&dataset, &schema, period, &ReportOptions::default())?;
//! println!("{}", report.totals.views.rate);
//! ```

pub mod error;
pub mod loader;
pub mod output;
pub mod period;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
pub use loader::{Dataset, LoadReport};
pub use period::Period;
pub use reports::RankKey;
pub use schema::{Schema, SchemaVariant};
pub use types::{ComparisonRow, PercentChange, RankedRow, Totals};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub top_n: usize,
    pub currency_suffix: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            top_n: 3,
            currency_suffix: "원".to_string(),
        }
    }
}

/// Everything one report run produces. Held only for the duration of a run.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub current_period: Period,
    pub previous_period: Period,
    /// Detail table, one row per current-period identity, in identity order.
    pub rows: Vec<ComparisonRow>,
    pub totals: Totals,
    pub top_views: Vec<RankedRow>,
    pub top_revenue: Vec<RankedRow>,
}

/// Run the comparison for one dataset and one selected period.
///
/// Fails with [`ReportError::EmptyRange`] when the selected period has no
/// rows; an empty previous period is normal and compares against zero.
pub fn generate_report(
    dataset: &Dataset,
    schema: &Schema,
    period: Period,
    options: &ReportOptions,
) -> Result<ComparisonReport> {
    let previous_period = period.previous();
    debug!(current = %period, previous = %previous_period, "resolved periods");

    let current = reports::aggregate(&dataset.records, &period, schema);
    if current.is_empty() {
        return Err(ReportError::EmptyRange {
            start: period.start,
            end: period.end,
        });
    }
    let previous = reports::aggregate(&dataset.records, &previous_period, schema);

    let rows = reports::compare(&current, &previous);
    let totals = reports::totals(&rows);
    let currency = options.currency_suffix.as_str();
    let top_views = output::ranked_rows(
        &reports::rank(&rows, RankKey::Views, options.top_n),
        RankKey::Views,
        currency,
    );
    let top_revenue = output::ranked_rows(
        &reports::rank(&rows, RankKey::Revenue, options.top_n),
        RankKey::Revenue,
        currency,
    );

    Ok(ComparisonReport {
        current_period: period,
        previous_period,
        rows,
        totals,
        top_views,
        top_revenue,
    })
}
