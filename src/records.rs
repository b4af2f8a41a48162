//! Row types for the OSHA violation and inspection tables.
//!
//! Raw rows are resolved against the header once per file ([`ViolationColumns`],
//! [`InspectionColumns`]) and then converted row by row. A row that cannot be
//! converted yields a [`RowError`] and is skipped by the caller.

use crate::classifier::Category;
use crate::error::PipelineError;
use crate::money::Usd;
use crate::output::CsvRow;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Narrative columns tried, in order, when none are given explicitly.
pub const KNOWN_TEXT_COLUMNS: &[&str] = &[
    "violation_description",
    "citation_text",
    "narrative",
    "abatement_text",
    "hazard_description",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Column names used to read a violation table.
#[derive(Debug, Clone)]
pub struct ViolationColumnNames {
    pub id: String,
    pub standard: String,
    pub date: String,
    pub penalty: String,
    /// `None` means auto-detect from [`KNOWN_TEXT_COLUMNS`].
    pub text: Option<Vec<String>>,
}

impl Default for ViolationColumnNames {
    fn default() -> Self {
        Self {
            id: "activity_nr".into(),
            standard: "standard".into(),
            date: "issuance_date".into(),
            penalty: "initial_penalty".into(),
            text: None,
        }
    }
}

/// Column names used to read an inspection table.
#[derive(Debug, Clone)]
pub struct InspectionColumnNames {
    pub id: String,
    pub naics: String,
}

impl Default for InspectionColumnNames {
    fn default() -> Self {
        Self {
            id: "activity_nr".into(),
            naics: "naics_code".into(),
        }
    }
}

/// Finds a header by name, ignoring ASCII case and surrounding whitespace.
pub fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    let name = name.trim();
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn require_column(headers: &StringRecord, name: &str, path: &Path) -> Result<usize, PipelineError> {
    find_column(headers, name).ok_or_else(|| PipelineError::MissingColumn {
        column: name.to_string(),
        path: path.to_path_buf(),
    })
}

/// Header positions for one violation file.
#[derive(Debug, Clone)]
pub struct ViolationColumns {
    id: usize,
    standard: usize,
    date: usize,
    penalty: usize,
    text: Vec<usize>,
}

impl ViolationColumns {
    pub fn resolve(
        headers: &StringRecord,
        names: &ViolationColumnNames,
        path: &Path,
    ) -> Result<Self, PipelineError> {
        let text = match &names.text {
            Some(explicit) => explicit
                .iter()
                .map(|name| require_column(headers, name, path))
                .collect::<Result<Vec<_>, _>>()?,
            None => {
                let found: Vec<usize> = KNOWN_TEXT_COLUMNS
                    .iter()
                    .filter_map(|name| find_column(headers, name))
                    .collect();
                if found.is_empty() {
                    warn!(
                        path = %path.display(),
                        "No narrative columns found, classifying by citation code only"
                    );
                }
                found
            }
        };

        Ok(Self {
            id: require_column(headers, &names.id, path)?,
            standard: require_column(headers, &names.standard, path)?,
            date: require_column(headers, &names.date, path)?,
            penalty: require_column(headers, &names.penalty, path)?,
            text,
        })
    }

    pub fn text_column_count(&self) -> usize {
        self.text.len()
    }
}

/// Header positions for one inspection file.
#[derive(Debug, Clone)]
pub struct InspectionColumns {
    id: usize,
    naics: usize,
}

impl InspectionColumns {
    pub fn resolve(
        headers: &StringRecord,
        names: &InspectionColumnNames,
        path: &Path,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            id: require_column(headers, &names.id, path)?,
            naics: require_column(headers, &names.naics, path)?,
        })
    }
}

/// Why a raw row was left out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("row is missing an inspection id")]
    MissingId,
    #[error("row is missing a date")]
    MissingDate,
    #[error("unparseable date `{0}`")]
    BadDate(String),
    #[error("unparseable penalty `{0}`")]
    BadPenalty(String),
    #[error("unreadable row: {0}")]
    Unreadable(String),
}

impl RowError {
    pub fn kind(&self) -> &'static str {
        match self {
            RowError::MissingId => "missing_id",
            RowError::MissingDate => "missing_date",
            RowError::BadDate(_) => "bad_date",
            RowError::BadPenalty(_) => "bad_penalty",
            RowError::Unreadable(_) => "unreadable",
        }
    }
}

/// Counts skipped rows by reason.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SkipTally {
    by_kind: BTreeMap<&'static str, usize>,
}

impl SkipTally {
    pub fn record(&mut self, err: &RowError) {
        *self.by_kind.entry(err.kind()).or_default() += 1;
    }

    pub fn total(&self) -> usize {
        self.by_kind.values().sum()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.by_kind.get(kind).copied().unwrap_or(0)
    }

    /// Emits one warning per skip reason.
    pub fn report(&self, stage: &str) {
        for (kind, n) in &self.by_kind {
            warn!(stage, reason = kind, rows = n, "Rows skipped");
        }
    }
}

/// One citation from the violation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationRecord {
    pub activity_nr: String,
    pub standard: String,
    pub narrative: String,
    pub penalty: Usd,
    pub issued: NaiveDate,
}

impl ViolationRecord {
    pub fn from_row(row: &StringRecord, cols: &ViolationColumns) -> Result<Self, RowError> {
        let field = |i: usize| row.get(i).unwrap_or("").trim();

        let activity_nr = field(cols.id);
        if activity_nr.is_empty() {
            return Err(RowError::MissingId);
        }

        let raw_date = field(cols.date);
        if raw_date.is_empty() {
            return Err(RowError::MissingDate);
        }
        let issued = parse_date(raw_date).ok_or_else(|| RowError::BadDate(raw_date.to_string()))?;

        // A blank penalty means none was assessed.
        let raw_penalty = field(cols.penalty);
        let penalty = if raw_penalty.is_empty() {
            Usd::ZERO
        } else {
            raw_penalty
                .parse()
                .map_err(|_| RowError::BadPenalty(raw_penalty.to_string()))?
        };

        let narrative = cols
            .text
            .iter()
            .map(|&i| field(i))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");

        Ok(Self {
            activity_nr: activity_nr.to_string(),
            standard: field(cols.standard).to_string(),
            narrative,
            penalty,
            issued,
        })
    }

    pub fn year(&self) -> i32 {
        self.issued.year()
    }
}

/// One row from the inspection table, reduced to what the sector join needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionRecord {
    pub activity_nr: String,
    pub naics_code: Option<String>,
}

impl InspectionRecord {
    pub fn from_row(row: &StringRecord, cols: &InspectionColumns) -> Result<Self, RowError> {
        let activity_nr = row.get(cols.id).unwrap_or("").trim();
        if activity_nr.is_empty() {
            return Err(RowError::MissingId);
        }

        let naics = row.get(cols.naics).unwrap_or("").trim();

        Ok(Self {
            activity_nr: activity_nr.to_string(),
            naics_code: (!naics.is_empty()).then(|| naics.to_string()),
        })
    }
}

/// A matched violation as written by the classify stage and read back by
/// the aggregate stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredRecord {
    pub activity_nr: String,
    pub standard: String,
    pub issuance_date: NaiveDate,
    pub year: i32,
    pub penalty: Usd,
    pub category: Category,
    pub narrative: String,
}

impl CsvRow for FilteredRecord {
    const HEADER: &'static [&'static str] = &[
        "activity_nr",
        "standard",
        "issuance_date",
        "year",
        "penalty",
        "category",
        "narrative",
    ];
}

impl FilteredRecord {
    pub fn new(record: ViolationRecord, category: Category) -> Self {
        Self {
            year: record.year(),
            activity_nr: record.activity_nr,
            standard: record.standard,
            issuance_date: record.issued,
            penalty: record.penalty,
            category,
            narrative: record.narrative,
        }
    }
}

/// Parses the date layouts seen across OSHA exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
