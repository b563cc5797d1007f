use crate::error::Result;
use crate::period::Period;
use crate::reports::RankKey;
use crate::types::{ComparisonRow, DetailDisplayRow, RankedRow, Totals, TotalsSummary};
use crate::util::{
    decimal_round_i64, decimal_to_i64, format_int, format_signed, format_signed_grouped, with_suffix,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// Export bytes keyed by the SHA-256 of the exact table content.
static EXPORT_CACHE: Lazy<Mutex<HashMap<[u8; 32], Arc<Vec<u8>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// `"11,500 (+100.00%)"`, or `"1,500,000 원 (+100.00%)"` for revenue.
pub fn rank_value_text(row: &ComparisonRow, key: RankKey, currency: &str) -> String {
    match key {
        RankKey::Views => format!("{} ({})", format_int(row.views.current), row.views.rate),
        RankKey::Revenue => format!(
            "{} ({})",
            with_suffix(format_int(decimal_to_i64(row.revenue.current)), currency),
            row.revenue.rate
        ),
    }
}

pub fn ranked_rows(ranked: &[&ComparisonRow], key: RankKey, currency: &str) -> Vec<RankedRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, r)| RankedRow {
            rank: idx + 1,
            event_name: r.event_name.clone(),
            hospital_name: r.hospital_name.clone(),
            value: rank_value_text(r, key, currency),
        })
        .collect()
}

pub fn detail_display_rows(rows: &[ComparisonRow], currency: &str) -> Vec<DetailDisplayRow> {
    rows.iter()
        .map(|r| DetailDisplayRow {
            event_name: r.event_name.clone(),
            hospital_name: r.hospital_name.clone(),
            event_id: r.event_id.clone(),
            attributes: r
                .attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
            views: format_int(r.views.current),
            views_delta: format_signed(r.views.delta),
            views_rate: r.views.rate.to_string(),
            revenue: with_suffix(format_int(decimal_round_i64(r.revenue.current)), currency),
            revenue_delta: with_suffix(format_signed(decimal_round_i64(r.revenue.delta)), currency),
            revenue_rate: r.revenue.rate.to_string(),
        })
        .collect()
}

pub fn totals_summary(t: &Totals) -> TotalsSummary {
    TotalsSummary {
        current_views: t.views.current,
        previous_views: t.views.previous,
        views_delta: t.views.delta,
        views_rate: t.views.rate.to_string(),
        current_revenue: t.revenue.current,
        previous_revenue: t.revenue.previous,
        revenue_delta: t.revenue.delta,
        revenue_rate: t.revenue.rate.to_string(),
    }
}

/// Headline lines for views and revenue: value, then signed delta with rate.
pub fn totals_lines(t: &Totals, currency: &str) -> (String, String) {
    let views = format!(
        "{}  ({} ({}))",
        format_int(t.views.current),
        format_signed_grouped(t.views.delta),
        t.views.rate
    );
    let revenue = format!(
        "{}  ({} ({}))",
        with_suffix(format_int(decimal_to_i64(t.revenue.current)), currency),
        with_suffix(format_signed_grouped(decimal_to_i64(t.revenue.delta)), currency),
        t.revenue.rate
    );
    (views, revenue)
}

/// Header and records of the canonical export: plain numbers, no display
/// formatting.
pub fn export_records(
    rows: &[ComparisonRow],
    attribute_columns: &[String],
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header: Vec<String> = vec!["이벤트명".into(), "병원명".into(), "이벤트 ID".into()];
    header.extend(attribute_columns.iter().cloned());
    header.extend(
        [
            "조회수",
            "조회수 증감량",
            "조회수 증감률(%)",
            "CPV매출",
            "CPV매출 증감액",
            "CPV매출 증감률(%)",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    let records = rows
        .iter()
        .map(|r| {
            let mut rec = vec![r.event_name.clone(), r.hospital_name.clone(), r.event_id.clone()];
            rec.extend(
                attribute_columns
                    .iter()
                    .map(|c| r.attributes.get(c).cloned().unwrap_or_default()),
            );
            rec.push(r.views.current.to_string());
            rec.push(r.views.delta.to_string());
            rec.push(r.views.rate.value().to_string());
            rec.push(r.revenue.current.normalize().to_string());
            rec.push(r.revenue.delta.normalize().to_string());
            rec.push(r.revenue.rate.value().to_string());
            rec
        })
        .collect();
    (header, records)
}

fn content_key(header: &[String], records: &[Vec<String>]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    // Length-prefix every row and field so no cell content can fake a boundary.
    for row in std::iter::once(header).chain(records.iter().map(Vec::as_slice)) {
        hasher.update((row.len() as u64).to_le_bytes());
        for field in row {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    hasher.finalize().into()
}

fn encode_csv(header: &[String], records: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut buf = UTF8_BOM.to_vec();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record(header)?;
        for rec in records {
            wtr.write_record(rec)?;
        }
        wtr.flush()?;
    }
    Ok(buf)
}

/// BOM-prefixed CSV of the detail table. Identical tables are encoded once.
pub fn export_csv_bytes(rows: &[ComparisonRow], attribute_columns: &[String]) -> Result<Arc<Vec<u8>>> {
    let (header, records) = export_records(rows, attribute_columns);
    let key = content_key(&header, &records);

    let mut cache = EXPORT_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(bytes) = cache.get(&key) {
        debug!("export cache hit");
        return Ok(Arc::clone(bytes));
    }
    let bytes = Arc::new(encode_csv(&header, &records)?);
    cache.insert(key, Arc::clone(&bytes));
    Ok(bytes)
}

pub fn export_filename(period: &Period) -> String {
    format!(
        "event_performance_{}_{}.csv",
        period.start.format("%Y%m%d"),
        period.end.format("%Y%m%d")
    )
}

pub fn write_export(
    dir: &Path,
    period: &Period,
    rows: &[ComparisonRow],
    attribute_columns: &[String],
) -> Result<PathBuf> {
    let bytes = export_csv_bytes(rows, attribute_columns)?;
    let path = dir.join(export_filename(period));
    std::fs::write(&path, bytes.as_slice())?;
    info!(path = %path.display(), rows = rows.len(), "export written");
    Ok(path)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventIdentity, MetricComparison, PercentChange};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn row(name: &str, views: (i64, i64), revenue: (Decimal, Decimal)) -> ComparisonRow {
        ComparisonRow {
            identity: EventIdentity(vec![name.into(), "HospA".into(), "1".into()]),
            event_name: name.into(),
            hospital_name: "HospA".into(),
            event_id: "1".into(),
            attributes: BTreeMap::new(),
            views: MetricComparison {
                current: views.0,
                previous: views.1,
                delta: views.0 - views.1,
                rate: PercentChange::between(Decimal::from(views.0), Decimal::from(views.1)),
            },
            revenue: MetricComparison {
                current: revenue.0,
                previous: revenue.1,
                delta: revenue.0 - revenue.1,
                rate: PercentChange::between(revenue.0, revenue.1),
            },
        }
    }

    #[test]
    fn rank_text_combines_value_and_rate() {
        let r = row("EventA", (11500, 0), (dec!(3300000), dec!(0)));
        assert_eq!(rank_value_text(&r, RankKey::Views, "원"), "11,500 (+100.00%)");
        assert_eq!(rank_value_text(&r, RankKey::Revenue, "원"), "3,300,000 원 (+100.00%)");
    }

    #[test]
    fn detail_rows_are_display_formatted() {
        let r = row("EventA", (900, 1000), (dec!(1200), dec!(1000)));
        let d = &detail_display_rows(&[r], "원")[0];
        assert_eq!(d.views, "900");
        assert_eq!(d.views_delta, "-100");
        assert_eq!(d.views_rate, "-10.00%");
        assert_eq!(d.revenue, "1,200 원");
        assert_eq!(d.revenue_delta, "+200 원");
        assert_eq!(d.revenue_rate, "+20.00%");
    }

    #[test]
    fn export_uses_plain_numbers_and_bom() {
        let rows = vec![row("EventA", (11500, 0), (dec!(3300000), dec!(0)))];
        let bytes = export_csv_bytes(&rows, &[]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "이벤트명,병원명,이벤트 ID,조회수,조회수 증감량,조회수 증감률(%),CPV매출,CPV매출 증감액,CPV매출 증감률(%)"
        );
        assert_eq!(lines.next().unwrap(), "EventA,HospA,1,11500,11500,100,3300000,3300000,100");
    }

    #[test]
    fn detail_revenue_is_rounded() {
        let r = row("EventA", (1, 1), (dec!(1500.7), dec!(1000.2)));
        let d = &detail_display_rows(&[r], "원")[0];
        assert_eq!(d.revenue, "1,501 원");
        assert_eq!(d.revenue_delta, "+500 원");
    }

    #[test]
    fn content_key_respects_field_boundaries() {
        let header = vec!["h".to_string()];
        let joined = vec![vec!["a\u{1f}b".to_string()]];
        let split = vec![vec!["a".to_string(), "b".to_string()]];
        assert_ne!(content_key(&header, &joined), content_key(&header, &split));

        let one = vec![vec!["ab".to_string()]];
        let two = vec![vec!["a".to_string()], vec!["b".to_string()]];
        assert_ne!(content_key(&header, &one), content_key(&header, &two));

        let wide_first = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
        ];
        let wide_last = vec![
            vec!["a".to_string()],
            vec!["b".to_string(), "c".to_string()],
        ];
        assert_ne!(content_key(&header, &wide_first), content_key(&header, &wide_last));
    }

    #[test]
    fn export_is_memoized_by_content() {
        let rows = vec![row("Memo", (5, 4), (dec!(2), dec!(1)))];
        let first = export_csv_bytes(&rows, &[]).unwrap();
        let second = export_csv_bytes(&rows.clone(), &[]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = vec![row("Memo", (6, 4), (dec!(2), dec!(1)))];
        let third = export_csv_bytes(&other, &[]).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn export_includes_attribute_columns() {
        let mut r = row("EventA", (1, 0), (dec!(1), dec!(0)));
        r.attributes.insert("할인가".into(), "9900".into());
        let attrs = vec!["할인가".to_string()];
        let (header, records) = export_records(&[r], &attrs);
        assert_eq!(header[3], "할인가");
        assert_eq!(records[0][3], "9900");
    }

    #[test]
    fn filename_contains_range() {
        let p = Period::new(
            chrono::NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
        )
        .unwrap();
        assert_eq!(export_filename(&p), "event_performance_20250801_20250802.csv");
    }
}
