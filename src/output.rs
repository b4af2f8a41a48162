//! Output file names and CSV persistence for filtered records and summaries.
//!
//! Every run rewrites its outputs from scratch so identical inputs give
//! byte-identical files.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

pub const FILTERED_RECORDS: &str = "filtered_records.csv";
pub const SUMMARY_BY_TAG: &str = "summary_by_tag.csv";
pub const SUMMARY_BY_YEAR: &str = "summary_by_year.csv";
pub const SUMMARY_BY_YEAR_TAG: &str = "summary_by_year_tag.csv";
pub const SUMMARY_BY_YEAR_SECTOR: &str = "summary_by_year_sector.csv";
pub const SUMMARY_BY_SECTOR: &str = "summary_by_sector.csv";
pub const SUMMARY_FOCUS_SECTORS: &str = "summary_focus_sectors.csv";
pub const VIOLATIONS_CHART: &str = "illumination_violations_per_year.png";
pub const PENALTIES_CHART: &str = "illumination_penalties_per_year.png";

/// A row type written as one CSV line under a fixed header.
///
/// `HEADER` lists the serialized field names in declaration order.
pub trait CsvRow: Serialize {
    const HEADER: &'static [&'static str];
}

/// Writes `rows` to a fresh CSV file at `path`, header first. The header is
/// written even when there are no rows.
pub fn write_records<T: CsvRow>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV");

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer
        .write_record(T::HEADER)
        .with_context(|| format!("writing header of {}", path.display()))?;

    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Saved");
    Ok(())
}

/// Prints a value to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
