//! Locating and reading the CSV inputs of each stage.
//!
//! Raw OSHA tables are streamed row by row; only what a stage keeps is held
//! in memory. Rows are decoded lossily since older extracts are not always
//! valid UTF-8.

use crate::aggregate::YearSummary;
use crate::error::PipelineError;
use crate::output::CsvRow;
use crate::records::{
    FilteredRecord, InspectionColumnNames, InspectionColumns, InspectionRecord, RowError,
    SkipTally, ViolationColumnNames, ViolationColumns, ViolationRecord,
};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counters from reading one or more files.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadStats {
    pub files: usize,
    pub rows: usize,
    pub skipped: SkipTally,
}

/// Expands path/glob arguments into a sorted, de-duplicated file list.
///
/// Every pattern must match at least one file. Files matching any of
/// `excludes` (by full path or by file name) are dropped.
pub fn expand_inputs(patterns: &[String], excludes: &[String]) -> Result<Vec<PathBuf>> {
    let excludes = excludes
        .iter()
        .map(|p| glob::Pattern::new(p).with_context(|| format!("invalid exclude pattern `{p}`")))
        .collect::<Result<Vec<_>>>()?;

    let mut paths = Vec::new();

    for pattern in patterns {
        let mut matched = 0;
        let entries =
            glob::glob(pattern).with_context(|| format!("invalid input pattern `{pattern}`"))?;

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            matched += 1;

            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if excludes
                .iter()
                .any(|ex| ex.matches_path(&path) || ex.matches(file_name))
            {
                info!(path = %path.display(), "Skipping excluded file");
                continue;
            }
            paths.push(path);
        }

        if matched == 0 {
            return Err(PipelineError::NoInputFiles {
                pattern: pattern.clone(),
            }
            .into());
        }
    }

    paths.sort();
    paths.dedup();

    if paths.is_empty() {
        return Err(PipelineError::NoInputFiles {
            pattern: patterns.join(" "),
        }
        .into());
    }

    Ok(paths)
}

fn read_raw_rows<C, T>(
    path: &Path,
    resolve: impl FnOnce(&StringRecord) -> Result<C, PipelineError>,
    convert: impl Fn(&StringRecord, &C) -> Result<T, RowError>,
    sink: &mut impl FnMut(T),
    stats: &mut ReadStats,
) -> Result<()> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = StringRecord::from_byte_record_lossy(
        rdr.byte_headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .clone(),
    );
    let columns = resolve(&headers)?;

    let mut rows = 0;
    for result in rdr.byte_records() {
        rows += 1;
        let converted = result
            .map_err(|e| RowError::Unreadable(e.to_string()))
            .and_then(|raw| convert(&StringRecord::from_byte_record_lossy(raw), &columns));

        match converted {
            Ok(record) => sink(record),
            Err(e) => {
                debug!(path = %path.display(), row = rows, error = %e, "Row skipped");
                stats.skipped.record(&e);
            }
        }
    }

    debug!(path = %path.display(), rows, "File read");
    stats.files += 1;
    stats.rows += rows;
    Ok(())
}

/// Streams every valid violation row from `paths` into `sink`.
pub fn read_violations(
    paths: &[PathBuf],
    names: &ViolationColumnNames,
    mut sink: impl FnMut(ViolationRecord),
) -> Result<ReadStats> {
    let mut stats = ReadStats::default();
    for path in paths {
        info!(path = %path.display(), "Loading violations");
        read_raw_rows(
            path,
            |headers| ViolationColumns::resolve(headers, names, path),
            ViolationRecord::from_row,
            &mut sink,
            &mut stats,
        )?;
    }
    Ok(stats)
}

/// Streams every valid inspection row from `paths` into `sink`.
pub fn read_inspections(
    paths: &[PathBuf],
    names: &InspectionColumnNames,
    mut sink: impl FnMut(InspectionRecord),
) -> Result<ReadStats> {
    let mut stats = ReadStats::default();
    for path in paths {
        info!(path = %path.display(), "Loading inspections");
        read_raw_rows(
            path,
            |headers| InspectionColumns::resolve(headers, names, path),
            InspectionRecord::from_row,
            &mut sink,
            &mut stats,
        )?;
    }
    Ok(stats)
}

/// Reads `path` into `T` rows. Header names are trimmed and lowercased
/// before deserializing, so `Year` and ` year ` both fill `year`.
fn read_typed<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<(Vec<T>, ReadStats)> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers: StringRecord = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    rdr.set_headers(headers.clone());
    let has_header = !headers.is_empty();

    if has_header {
        for column in required {
            if !headers.iter().any(|h| h == *column) {
                return Err(PipelineError::MissingColumn {
                    column: column.to_string(),
                    path: path.to_path_buf(),
                }
                .into());
            }
        }
    }

    let mut stats = ReadStats {
        files: 1,
        ..Default::default()
    };
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        stats.rows += 1;
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Row skipped");
                stats.skipped.record(&RowError::Unreadable(e.to_string()));
            }
        }
    }

    Ok((rows, stats))
}

/// Reads the filtered records written by the classify stage.
pub fn read_filtered(path: &Path) -> Result<(Vec<FilteredRecord>, ReadStats)> {
    read_typed(path, &["activity_nr", "year", "penalty", "category"])
}

/// Reads a year summary, sorted by ascending year.
pub fn read_year_summary(path: &Path) -> Result<(Vec<YearSummary>, ReadStats)> {
    let (mut rows, stats) = read_typed::<YearSummary>(path, YearSummary::HEADER)?;
    rows.sort_by_key(|r| r.year);
    Ok((rows, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_expand_inputs_sorts_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "osha_violation2.csv", "a\n");
        write(dir.path(), "osha_violation1.csv", "a\n");
        write(dir.path(), "osha_violation_snapshot.csv", "a\n");

        let pattern = format!("{}/osha_violation*.csv", dir.path().display());
        let paths = expand_inputs(&[pattern], &["*_snapshot.csv".into()]).unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["osha_violation1.csv", "osha_violation2.csv"]);
    }

    #[test]
    fn test_expand_inputs_unmatched_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/missing.csv", dir.path().display());
        let err = expand_inputs(&[pattern.clone()], &[]).unwrap_err();

        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::NoInputFiles { pattern: p }) => assert_eq!(p, &pattern),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_violations_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "v.csv",
            "activity_nr,standard,issuance_date,initial_penalty,narrative\n\
             1,19100037,2010-05-01,100,\n\
             2,1000.01,not a date,100,dimly lit\n\
             ,1000.01,2010-05-01,100,dimly lit\n\
             3,1000.01,2011-05-01,,dimly lit\n",
        );

        let mut records = Vec::new();
        let stats = read_violations(&[path], &ViolationColumnNames::default(), |r| {
            records.push(r)
        })
        .unwrap();

        assert_eq!(stats.rows, 4);
        assert_eq!(stats.skipped.total(), 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].narrative, "dimly lit");
    }

    #[test]
    fn test_read_violations_missing_column_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "v.csv", "activity_nr,standard\n1,19100037\n");

        let err = read_violations(&[path.clone()], &ViolationColumnNames::default(), |_| {})
            .unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MissingColumn { column, path: p }) => {
                assert_eq!(column, "issuance_date");
                assert_eq!(p, &path);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_year_summary_requires_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "s.csv", "year,n_violations\n2001,3\n");
        assert!(read_year_summary(&path).is_err());
    }

    #[test]
    fn test_read_year_summary_normalizes_header_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "s.csv",
            "Year, N_Violations ,TOTAL_PENALTY\n2001,2,20.00\n",
        );
        let (rows, stats) = read_year_summary(&path).unwrap();
        assert_eq!(stats.skipped.total(), 0);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_penalty.cents(), 2_000);
    }

    #[test]
    fn test_read_violations_skips_out_of_range_penalty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "v.csv",
            "activity_nr,standard,issuance_date,initial_penalty\n\
             1,19100037,2010-05-01,1e17\n\
             2,19100037,2010-05-01,1e300\n\
             3,19100037,2010-05-01,1.005\n",
        );

        let mut records = Vec::new();
        let stats = read_violations(&[path], &ViolationColumnNames::default(), |r| {
            records.push(r)
        })
        .unwrap();

        assert_eq!(stats.skipped.count("bad_penalty"), 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].penalty.cents(), 101);
    }

    #[test]
    fn test_read_year_summary_sorts_by_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "s.csv",
            "year,n_violations,total_penalty\n2003,1,10.00\n2001,2,20.00\n",
        );
        let (rows, _) = read_year_summary(&path).unwrap();
        assert_eq!(rows.iter().map(|r| r.year).collect::<Vec<_>>(), vec![2001, 2003]);
    }
}
