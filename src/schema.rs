//! Column schema: which source columns hold which logical field, which
//! columns are required, and which columns form the grouping key.
use crate::error::{ReportError, Result};
use crate::types::{EventIdentity, NormalizedRecord, RawRecord};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const COL_HOSPITAL: &str = "병원명";
pub const COL_EVENT_ID: &str = "이벤트 ID";
pub const COL_EVENT_NAME: &str = "이벤트명";
pub const COL_TARGET_DATE: &str = "대상일";
pub const COL_VIEWS: &str = "CPV 조회 수";
pub const COL_REVENUE: &str = "CPV 매출";
pub const COL_DISCOUNT_PRICE: &str = "할인가";
pub const COL_CATEGORY_L1: &str = "카테고리(대)";
pub const COL_CATEGORY_L2: &str = "카테고리(중)";
pub const COL_CATEGORY_L3: &str = "카테고리(소)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Name, hospital and id only.
    Basic,
    /// Adds discount price and three category levels to the key.
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub hospital_name: String,
    pub event_id: String,
    pub event_name: String,
    pub target_date: String,
    pub view_count: String,
    pub revenue: String,
    /// Optional attribute columns carried through to the detail table.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Ordered source column names whose values form the [`EventIdentity`].
    pub identity_key: Vec<String>,
}

impl Schema {
    pub fn basic() -> Self {
        Schema {
            hospital_name: COL_HOSPITAL.to_string(),
            event_id: COL_EVENT_ID.to_string(),
            event_name: COL_EVENT_NAME.to_string(),
            target_date: COL_TARGET_DATE.to_string(),
            view_count: COL_VIEWS.to_string(),
            revenue: COL_REVENUE.to_string(),
            attributes: Vec::new(),
            identity_key: vec![
                COL_EVENT_NAME.to_string(),
                COL_HOSPITAL.to_string(),
                COL_EVENT_ID.to_string(),
            ],
        }
    }

    pub fn extended() -> Self {
        let attributes: Vec<String> = [
            COL_DISCOUNT_PRICE,
            COL_CATEGORY_L1,
            COL_CATEGORY_L2,
            COL_CATEGORY_L3,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut schema = Schema::basic();
        schema.identity_key.extend(attributes.iter().cloned());
        schema.attributes = attributes;
        schema
    }

    pub fn for_variant(variant: SchemaVariant) -> Self {
        match variant {
            SchemaVariant::Basic => Schema::basic(),
            SchemaVariant::Extended => Schema::extended(),
        }
    }

    /// Load a schema descriptor from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let schema: Schema = serde_json::from_str(&text)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity_key.is_empty() {
            return Err(ReportError::InvalidSchema(
                "identity key must name at least one column".to_string(),
            ));
        }
        for col in &self.identity_key {
            if !self.is_identity_capable(col) {
                return Err(ReportError::InvalidSchema(format!(
                    "identity column '{}' is not hospital, event id, event name or a declared attribute",
                    col
                )));
            }
        }
        Ok(())
    }

    fn is_identity_capable(&self, col: &str) -> bool {
        col == self.hospital_name
            || col == self.event_id
            || col == self.event_name
            || self.attributes.iter().any(|a| a == col)
    }

    /// Every column the upload must contain, in reporting order.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut cols = vec![
            self.hospital_name.as_str(),
            self.event_id.as_str(),
            self.event_name.as_str(),
            self.target_date.as_str(),
            self.view_count.as_str(),
            self.revenue.as_str(),
        ];
        cols.extend(self.attributes.iter().map(String::as_str));
        cols
    }

    /// Match the (trimmed) header row against the required columns.
    pub fn resolve(&self, headers: &StringRecord) -> Result<ColumnIndex> {
        let names: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();
        let position = |col: &str| names.iter().position(|n| n == col);

        let missing: Vec<String> = self
            .required_columns()
            .into_iter()
            .filter(|c| position(c).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::MissingColumns(missing));
        }

        // Every required column was found above.
        let at = |col: &str| position(col).unwrap_or_default();
        Ok(ColumnIndex {
            hospital_name: at(&self.hospital_name),
            event_id: at(&self.event_id),
            event_name: at(&self.event_name),
            target_date: at(&self.target_date),
            view_count: at(&self.view_count),
            revenue: at(&self.revenue),
            attributes: self
                .attributes
                .iter()
                .map(|a| (a.clone(), at(a)))
                .collect(),
        })
    }

    /// Build the grouping key for a record.
    pub fn identity_of(&self, record: &NormalizedRecord) -> EventIdentity {
        let values = self
            .identity_key
            .iter()
            .map(|col| {
                if *col == self.event_name {
                    record.event_name.clone()
                } else if *col == self.hospital_name {
                    record.hospital_name.clone()
                } else if *col == self.event_id {
                    record.event_id.clone()
                } else {
                    record.attributes.get(col).cloned().unwrap_or_default()
                }
            })
            .collect();
        EventIdentity(values)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::basic()
    }
}

/// Header positions resolved once per upload.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    hospital_name: usize,
    event_id: usize,
    event_name: usize,
    target_date: usize,
    view_count: usize,
    revenue: usize,
    attributes: Vec<(String, usize)>,
}

impl ColumnIndex {
    pub fn raw_record(&self, row: &StringRecord) -> RawRecord {
        let cell = |i: usize| row.get(i).map(|s| s.trim().to_string());
        let attributes: BTreeMap<String, String> = self
            .attributes
            .iter()
            .map(|(name, i)| (name.clone(), cell(*i).unwrap_or_default()))
            .collect();
        RawRecord {
            hospital_name: cell(self.hospital_name),
            event_id: cell(self.event_id),
            event_name: cell(self.event_name),
            target_date: cell(self.target_date),
            view_count: cell(self.view_count),
            revenue: cell(self.revenue),
            attributes,
        }
    }
}
