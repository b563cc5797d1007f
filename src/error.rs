use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("no rows with a valid date; nothing to analyse")]
    NoValidDates,

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("no data in the selected period {start} ~ {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    /// Only an empty selection can be fixed by picking another range.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ReportError::EmptyRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_message_lists_every_column() {
        let err = ReportError::MissingColumns(vec!["대상일".into(), "CPV 매출".into()]);
        assert_eq!(err.to_string(), "missing required columns: 대상일, CPV 매출");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn only_empty_range_is_recoverable() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert!(ReportError::EmptyRange { start: d, end: d }.is_recoverable());
        assert!(!ReportError::InvalidRange { start: d, end: d }.is_recoverable());
        assert!(!ReportError::NoValidDates.is_recoverable());
    }
}
