//! The three batch stages and the end-to-end run.
//!
//! raw violation CSV → `classify` → filtered CSV → `aggregate` → summary
//! CSVs → `plot` → PNG charts. Each stage reads files and writes files;
//! nothing else is shared between them.

use crate::aggregate::sector::{SectorLookup, UnknownSector};
use crate::aggregate::{
    TagSummary, summarize_by_sector, summarize_by_tag, summarize_by_year,
    summarize_by_year_and_sector, summarize_by_year_and_tag, summarize_focus_sectors,
};
use crate::classifier::{Classifier, RuleSet};
use crate::error::PipelineError;
use crate::input::{expand_inputs, read_filtered, read_inspections, read_violations, read_year_summary};
use crate::output::{
    FILTERED_RECORDS, SUMMARY_BY_SECTOR, SUMMARY_BY_TAG, SUMMARY_BY_YEAR, SUMMARY_BY_YEAR_SECTOR,
    SUMMARY_BY_YEAR_TAG, SUMMARY_FOCUS_SECTORS, write_records,
};
use crate::plot::{YearWindow, render_year_charts};
use crate::records::{FilteredRecord, InspectionColumnNames, SkipTally, ViolationColumnNames};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub inputs: Vec<String>,
    pub excludes: Vec<String>,
    pub columns: ViolationColumnNames,
    pub rules: RuleSet,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyReport {
    pub rows_read: usize,
    pub matched: usize,
    pub skipped: SkipTally,
    pub by_category: Vec<TagSummary>,
    pub filtered_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub filtered: PathBuf,
    /// Inspection files; sector summaries are skipped when empty.
    pub inspections: Vec<String>,
    pub inspection_columns: InspectionColumnNames,
    pub unknown_sector: UnknownSector,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateReport {
    pub records: usize,
    pub years: usize,
    pub sectors: Option<usize>,
    pub year_summary_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub summary: PathBuf,
    pub window: YearWindow,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub classify: ClassifyOptions,
    pub inspections: Vec<String>,
    pub inspection_columns: InspectionColumnNames,
    pub unknown_sector: UnknownSector,
    pub window: YearWindow,
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))
}

/// Keeps the illumination-related rows of the violation tables.
///
/// Writes the filtered records and the per-category counts.
#[tracing::instrument(skip_all, fields(output_dir = %opts.output_dir.display()))]
pub fn classify(opts: &ClassifyOptions) -> Result<ClassifyReport> {
    let classifier = Classifier::new(&opts.rules)?;
    let paths = expand_inputs(&opts.inputs, &opts.excludes)?;
    info!(files = paths.len(), "Violation files found");
    ensure_dir(&opts.output_dir)?;

    let mut kept: Vec<FilteredRecord> = Vec::new();
    let stats = read_violations(&paths, &opts.columns, |record| {
        let result = classifier.classify(&record.standard, &record.narrative);
        if let Some(category) = result.category() {
            kept.push(FilteredRecord::new(record, category));
        }
    })?;
    stats.skipped.report("classify");

    let by_category = summarize_by_tag(kept.iter().map(|r| r.category));

    let filtered_path = opts.output_dir.join(FILTERED_RECORDS);
    write_records(&filtered_path, &kept)?;
    write_records(&opts.output_dir.join(SUMMARY_BY_TAG), &by_category)?;

    info!(
        rows = stats.rows,
        matched = kept.len(),
        skipped = stats.skipped.total(),
        "Classification complete"
    );

    Ok(ClassifyReport {
        rows_read: stats.rows,
        matched: kept.len(),
        skipped: stats.skipped,
        by_category,
        filtered_path,
    })
}

/// Builds the year, tag and (with inspections) sector summaries.
#[tracing::instrument(skip_all, fields(filtered = %opts.filtered.display()))]
pub fn aggregate(opts: &AggregateOptions) -> Result<AggregateReport> {
    let (records, stats) = read_filtered(&opts.filtered)?;
    stats.skipped.report("aggregate");
    info!(records = records.len(), "Filtered records loaded");
    ensure_dir(&opts.output_dir)?;

    let years = summarize_by_year(&records);
    let year_summary_path = opts.output_dir.join(SUMMARY_BY_YEAR);
    write_records(&year_summary_path, &years)?;
    write_records(
        &opts.output_dir.join(SUMMARY_BY_YEAR_TAG),
        &summarize_by_year_and_tag(&records),
    )?;

    let sectors = if opts.inspections.is_empty() {
        warn!("No inspection files given, skipping sector summaries");
        None
    } else {
        let paths = expand_inputs(&opts.inspections, &[])?;
        let mut lookup = SectorLookup::default();
        let mut duplicates = 0usize;
        let stats = read_inspections(&paths, &opts.inspection_columns, |inspection| {
            if !lookup.insert(inspection) {
                duplicates += 1;
            }
        })?;
        stats.skipped.report("aggregate");
        info!(
            inspections = lookup.len(),
            duplicates,
            "Inspection lookup built"
        );

        let by_sector = summarize_by_sector(&records, &lookup, opts.unknown_sector);
        write_records(
            &opts.output_dir.join(SUMMARY_BY_YEAR_SECTOR),
            &summarize_by_year_and_sector(&records, &lookup, opts.unknown_sector),
        )?;
        write_records(&opts.output_dir.join(SUMMARY_BY_SECTOR), &by_sector)?;
        write_records(
            &opts.output_dir.join(SUMMARY_FOCUS_SECTORS),
            &summarize_focus_sectors(&by_sector),
        )?;
        Some(by_sector.len())
    };

    info!(years = years.len(), ?sectors, "Aggregation complete");

    Ok(AggregateReport {
        records: records.len(),
        years: years.len(),
        sectors,
        year_summary_path,
    })
}

/// Renders the per-year charts from a year summary.
#[tracing::instrument(skip_all, fields(summary = %opts.summary.display()))]
pub fn plot(opts: &PlotOptions) -> Result<Vec<PathBuf>> {
    let (rows, _) = read_year_summary(&opts.summary)?;
    let rows: Vec<_> = rows
        .into_iter()
        .filter(|r| opts.window.contains(r.year))
        .collect();

    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Err(PipelineError::EmptySummary {
            path: opts.summary.clone(),
        }
        .into());
    };
    info!(rows = rows.len(), first = first.year, last = last.year, "Year summary loaded");

    ensure_dir(&opts.output_dir)?;
    render_year_charts(&rows, &opts.output_dir)
}

/// Runs classify, aggregate and plot into one output directory.
pub fn run(opts: &RunOptions) -> Result<()> {
    let output_dir = opts.classify.output_dir.clone();

    let classified = classify(&opts.classify)?;

    let aggregated = aggregate(&AggregateOptions {
        filtered: classified.filtered_path,
        inspections: opts.inspections.clone(),
        inspection_columns: opts.inspection_columns.clone(),
        unknown_sector: opts.unknown_sector,
        output_dir: output_dir.clone(),
    })?;

    if aggregated.years == 0 {
        warn!("No matched records, skipping charts");
        return Ok(());
    }

    plot(&PlotOptions {
        summary: aggregated.year_summary_path,
        window: opts.window,
        output_dir,
    })?;

    info!("Done");
    Ok(())
}
