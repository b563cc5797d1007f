use crate::error::{ReportError, Result};
use crate::schema::Schema;
use crate::types::{NormalizedRecord, RawRecord};
use crate::util::{clean_count, clean_numeric, parse_date_lenient};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_undated_rows: usize,
    /// Non-empty numeric cells that could not be parsed and became 0.
    pub coerced_values: usize,
}

/// Normalized upload plus the date bounds used to seed the default range.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<NormalizedRecord>,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub report: LoadReport,
}

pub fn load_and_clean(path: impl AsRef<Path>, schema: &Schema) -> Result<Dataset> {
    let file = std::fs::File::open(path)?;
    load_from_reader(file, schema)
}

pub fn load_from_reader<R: Read>(reader: R, schema: &Schema) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = schema.resolve(rdr.headers()?)?;

    let mut raw = Vec::new();
    for result in rdr.records() {
        raw.push(columns.raw_record(&result?));
    }
    normalize(raw)
}

/// Turn raw rows into typed records.
///
/// Numeric cells degrade to zero; rows without a parseable date are dropped.
pub fn normalize(rows: Vec<RawRecord>) -> Result<Dataset> {
    let total_rows = rows.len();
    let mut coerced_values = 0usize;
    let mut dropped_undated_rows = 0usize;
    let mut records = Vec::with_capacity(total_rows);

    for row in rows {
        let target_date = match row.target_date.as_deref().and_then(parse_date_lenient) {
            Some(d) => d,
            None => {
                dropped_undated_rows += 1;
                continue;
            }
        };

        let view_count = match row.view_count.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => clean_count(s).unwrap_or_else(|| {
                coerced_values += 1;
                0
            }),
            None => 0,
        };
        let revenue = match row.revenue.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => clean_numeric(s).unwrap_or_else(|| {
                coerced_values += 1;
                Decimal::ZERO
            }),
            None => Decimal::ZERO,
        };

        records.push(NormalizedRecord {
            hospital_name: row.hospital_name.unwrap_or_default(),
            event_id: row.event_id.unwrap_or_default(),
            event_name: row.event_name.unwrap_or_default(),
            target_date,
            view_count,
            revenue,
            attributes: row.attributes,
        });
    }

    if dropped_undated_rows > 0 {
        warn!(dropped = dropped_undated_rows, "rows without a valid date were dropped");
    }

    let min_date = records.iter().map(|r| r.target_date).min();
    let max_date = records.iter().map(|r| r.target_date).max();
    let (Some(min_date), Some(max_date)) = (min_date, max_date) else {
        return Err(ReportError::NoValidDates);
    };

    let report = LoadReport {
        total_rows,
        kept_rows: records.len(),
        dropped_undated_rows,
        coerced_values,
    };
    debug!(?report, %min_date, %max_date, "dataset normalized");
    Ok(Dataset {
        records,
        min_date,
        max_date,
        report,
    })
}
