//! NAICS sectors and the inspection-to-sector lookup.

use crate::records::InspectionRecord;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

pub const OFFICE: &str = "Office / Professional / Admin";
pub const EDUCATION: &str = "Education";
pub const HEALTH_CARE: &str = "Health care & social assistance";
pub const UNKNOWN: &str = "Unknown";

/// Sectors reported separately in the focus summary.
pub const FOCUS_SECTORS: &[&str] = &[OFFICE, EDUCATION, HEALTH_CARE];

/// Two-digit NAICS sector. `Unknown` sorts after every real sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectorCode {
    Naics(u8),
    Unknown,
}

impl SectorCode {
    /// Takes the sector from the first two digits of a NAICS code.
    pub fn from_naics(code: &str) -> Self {
        let code = code.trim();
        match code.get(..2) {
            Some(two) if two.bytes().all(|b| b.is_ascii_digit()) => {
                two.parse().map_or(SectorCode::Unknown, SectorCode::Naics)
            }
            _ => SectorCode::Unknown,
        }
    }

    /// Coarse label used in the sector summaries.
    pub fn label(self) -> &'static str {
        match self {
            SectorCode::Unknown => UNKNOWN,
            SectorCode::Naics(n) => match n {
                23 => "Construction",
                31..=33 => "Manufacturing",
                44..=45 => "Retail trade",
                48..=49 => "Transportation & warehousing",
                51..=56 => OFFICE,
                61 => EDUCATION,
                62 => HEALTH_CARE,
                92 => "Public administration",
                _ => "Other sectors",
            },
        }
    }
}

impl fmt::Display for SectorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorCode::Naics(n) => write!(f, "{:02}", n),
            SectorCode::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for SectorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What to do with records whose inspection has no usable NAICS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownSector {
    #[default]
    Bucket,
    Drop,
}

/// Sector of each inspection, keyed by activity number.
#[derive(Debug, Default, Clone)]
pub struct SectorLookup {
    by_activity: HashMap<String, SectorCode>,
}

impl SectorLookup {
    /// Adds an inspection. The first row seen for an activity number wins;
    /// returns `false` for a duplicate.
    pub fn insert(&mut self, inspection: InspectionRecord) -> bool {
        match self.by_activity.entry(inspection.activity_nr) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let sector = inspection
                    .naics_code
                    .as_deref()
                    .map_or(SectorCode::Unknown, SectorCode::from_naics);
                slot.insert(sector);
                true
            }
        }
    }

    /// Sector for an activity number; `Unknown` when not found.
    pub fn sector_of(&self, activity_nr: &str) -> SectorCode {
        self.by_activity
            .get(activity_nr)
            .copied()
            .unwrap_or(SectorCode::Unknown)
    }

    pub fn len(&self) -> usize {
        self.by_activity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_activity.is_empty()
    }
}

impl FromIterator<InspectionRecord> for SectorLookup {
    fn from_iter<I: IntoIterator<Item = InspectionRecord>>(iter: I) -> Self {
        let mut lookup = SectorLookup::default();
        for inspection in iter {
            lookup.insert(inspection);
        }
        lookup
    }
}
