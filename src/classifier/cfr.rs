//! CFR section references and the citation allow-list.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A `PART.SECTION` reference such as `1910.37`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfrSection {
    pub part: u16,
    pub section: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a CFR section (expected PART.SECTION, e.g. 1910.37): `{0}`")]
pub struct ParseCfrError(String);

impl FromStr for CfrSection {
    type Err = ParseCfrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCfrError(s.to_string());
        let (part, section) = s.trim().split_once('.').ok_or_else(err)?;
        Ok(CfrSection {
            part: part.parse().map_err(|_| err())?,
            section: section.parse().map_err(|_| err())?,
        })
    }
}

impl fmt::Display for CfrSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.part, self.section)
    }
}

impl Serialize for CfrSection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CfrSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Matches citation codes against a set of CFR sections.
///
/// OSHA tables encode `1910.37(b)(1)` as `19100037 B01`; free-text exports
/// use the dotted form, sometimes prefixed with `29 CFR`. Both are accepted.
#[derive(Debug, Clone)]
pub struct CfrAllowList {
    pattern: Option<Regex>,
}

impl CfrAllowList {
    pub fn new(sections: &[CfrSection]) -> Result<Self, regex::Error> {
        if sections.is_empty() {
            return Ok(Self { pattern: None });
        }

        let alternatives: Vec<String> = sections
            .iter()
            .map(|s| {
                format!(
                    r"^{part:04}{section:04}|(?:^|\D){part}\.0*{section}(?:\D|$)",
                    part = s.part,
                    section = s.section
                )
            })
            .collect();

        Ok(Self {
            pattern: Some(Regex::new(&alternatives.join("|"))?),
        })
    }

    pub fn matches(&self, citation: &str) -> bool {
        let citation = citation.trim();
        match &self.pattern {
            Some(re) if !citation.is_empty() => re.is_match(citation),
            _ => false,
        }
    }
}
