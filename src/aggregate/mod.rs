//! Yearly, sector and category summaries of matched violations.
//!
//! Every summary is a plain reduction over the filtered records: a count and
//! an exact penalty sum per group. Groups are kept in `BTreeMap`s so output
//! order is ascending year, then ascending sector code.

pub mod sector;

use crate::classifier::Category;
use crate::money::Usd;
use crate::output::CsvRow;
use crate::records::FilteredRecord;
use sector::{FOCUS_SECTORS, SectorCode, SectorLookup, UnknownSector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running count and penalty sum for one group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub count: u64,
    pub penalty: Usd,
}

impl Tally {
    /// Parsed penalties are capped at [`Usd::MAX_PARSED`], so the sum only
    /// clamps after thousands of maximal rows.
    pub fn add(&mut self, penalty: Usd) {
        self.count += 1;
        self.penalty += penalty;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub n_violations: u64,
    pub total_penalty: Usd,
}

impl CsvRow for YearSummary {
    const HEADER: &'static [&'static str] = &["year", "n_violations", "total_penalty"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSectorSummary {
    pub year: i32,
    pub sector_code: SectorCode,
    pub sector: &'static str,
    pub n_violations: u64,
    pub total_penalty: Usd,
}

impl CsvRow for YearSectorSummary {
    const HEADER: &'static [&'static str] =
        &["year", "sector_code", "sector", "n_violations", "total_penalty"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorSummary {
    pub sector_code: SectorCode,
    pub sector: &'static str,
    pub n_violations: u64,
    pub total_penalty: Usd,
}

impl CsvRow for SectorSummary {
    const HEADER: &'static [&'static str] =
        &["sector_code", "sector", "n_violations", "total_penalty"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusSectorSummary {
    pub sector: &'static str,
    pub n_violations: u64,
    pub total_penalty: Usd,
}

impl CsvRow for FocusSectorSummary {
    const HEADER: &'static [&'static str] = &["sector", "n_violations", "total_penalty"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    pub category: Category,
    pub n_records: u64,
}

impl CsvRow for TagSummary {
    const HEADER: &'static [&'static str] = &["category", "n_records"];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearTagSummary {
    pub year: i32,
    pub category: Category,
    pub n_records: u64,
}

impl CsvRow for YearTagSummary {
    const HEADER: &'static [&'static str] = &["year", "category", "n_records"];
}

fn tally_by<K: Ord>(
    records: &[FilteredRecord],
    mut key: impl FnMut(&FilteredRecord) -> Option<K>,
) -> BTreeMap<K, Tally> {
    let mut groups: BTreeMap<K, Tally> = BTreeMap::new();
    for record in records {
        if let Some(k) = key(record) {
            groups.entry(k).or_default().add(record.penalty);
        }
    }
    groups
}

fn sector_key(lookup: &SectorLookup, policy: UnknownSector, record: &FilteredRecord) -> Option<SectorCode> {
    match (lookup.sector_of(&record.activity_nr), policy) {
        (SectorCode::Unknown, UnknownSector::Drop) => None,
        (sector, _) => Some(sector),
    }
}

/// Count and penalty total per citation year.
pub fn summarize_by_year(records: &[FilteredRecord]) -> Vec<YearSummary> {
    tally_by(records, |r| Some(r.year))
        .into_iter()
        .map(|(year, t)| YearSummary {
            year,
            n_violations: t.count,
            total_penalty: t.penalty,
        })
        .collect()
}

/// Count and penalty total per year and sector.
pub fn summarize_by_year_and_sector(
    records: &[FilteredRecord],
    lookup: &SectorLookup,
    policy: UnknownSector,
) -> Vec<YearSectorSummary> {
    tally_by(records, |r| sector_key(lookup, policy, r).map(|s| (r.year, s)))
        .into_iter()
        .map(|((year, sector_code), t)| YearSectorSummary {
            year,
            sector_code,
            sector: sector_code.label(),
            n_violations: t.count,
            total_penalty: t.penalty,
        })
        .collect()
}

/// Count and penalty total per sector across all years.
pub fn summarize_by_sector(
    records: &[FilteredRecord],
    lookup: &SectorLookup,
    policy: UnknownSector,
) -> Vec<SectorSummary> {
    tally_by(records, |r| sector_key(lookup, policy, r))
        .into_iter()
        .map(|(sector_code, t)| SectorSummary {
            sector_code,
            sector: sector_code.label(),
            n_violations: t.count,
            total_penalty: t.penalty,
        })
        .collect()
}

/// Office, education and health care rolled up by label, largest first.
pub fn summarize_focus_sectors(sectors: &[SectorSummary]) -> Vec<FocusSectorSummary> {
    let mut by_label: BTreeMap<&'static str, Tally> = BTreeMap::new();
    for s in sectors.iter().filter(|s| FOCUS_SECTORS.contains(&s.sector)) {
        let t = by_label.entry(s.sector).or_default();
        t.count += s.n_violations;
        t.penalty += s.total_penalty;
    }

    let mut out: Vec<FocusSectorSummary> = by_label
        .into_iter()
        .map(|(sector, t)| FocusSectorSummary {
            sector,
            n_violations: t.count,
            total_penalty: t.penalty,
        })
        .collect();
    // Stable sort keeps label order among ties.
    out.sort_by(|a, b| b.n_violations.cmp(&a.n_violations));
    out
}

/// Number of records per category, largest first.
pub fn summarize_by_tag(categories: impl IntoIterator<Item = Category>) -> Vec<TagSummary> {
    let mut counts: BTreeMap<Category, u64> = BTreeMap::new();
    for c in categories {
        *counts.entry(c).or_default() += 1;
    }

    let mut out: Vec<TagSummary> = counts
        .into_iter()
        .map(|(category, n_records)| TagSummary {
            category,
            n_records,
        })
        .collect();
    out.sort_by(|a, b| b.n_records.cmp(&a.n_records));
    out
}

/// Number of records per year and category.
pub fn summarize_by_year_and_tag(records: &[FilteredRecord]) -> Vec<YearTagSummary> {
    tally_by(records, |r| Some((r.year, r.category)))
        .into_iter()
        .map(|((year, category), t)| YearTagSummary {
            year,
            category,
            n_records: t.count,
        })
        .collect()
}
