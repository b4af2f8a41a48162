//! Illumination classification of violation records.
//!
//! A record is illumination-related when its citation code is on the CFR
//! allow-list or its narrative contains one of the keyword phrases. The
//! category comes from the first rule that matches, in this order:
//! explicit low light, egress lighting, visibility hazard, code-based.

pub mod cfr;
pub mod rules;

use crate::error::PipelineError;
use cfr::{CfrAllowList, CfrSection};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a record was kept. Variants are declared in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ExplicitLowLight,
    EgressLighting,
    VisibilityHazard,
    CodeBased,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::ExplicitLowLight,
        Category::EgressLighting,
        Category::VisibilityHazard,
        Category::CodeBased,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::ExplicitLowLight => "explicit_low_light",
            Category::EgressLighting => "egress_lighting",
            Category::VisibilityHazard => "visibility_hazard",
            Category::CodeBased => "code_based",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Citation code is on the allow-list.
    pub code_match: bool,
    /// Highest-priority keyword group found in the narrative.
    pub keyword_match: Option<Category>,
}

impl ClassificationResult {
    pub fn is_match(&self) -> bool {
        self.code_match || self.keyword_match.is_some()
    }

    pub fn category(&self) -> Option<Category> {
        self.keyword_match
            .or(self.code_match.then_some(Category::CodeBased))
    }
}

/// Rule tables: the CFR allow-list and one keyword list per category.
///
/// Fields missing from a rules file fall back to the built-in tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSet {
    pub cfr_sections: Vec<CfrSection>,
    pub explicit_low_light: Vec<String>,
    pub egress_lighting: Vec<String>,
    pub visibility_hazard: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            cfr_sections: rules::CFR_SECTIONS
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            explicit_low_light: owned(rules::EXPLICIT_LOW_LIGHT_KEYWORDS),
            egress_lighting: owned(rules::EGRESS_LIGHTING_KEYWORDS),
            visibility_hazard: owned(rules::VISIBILITY_HAZARD_KEYWORDS),
        }
    }
}

impl RuleSet {
    pub fn keywords(&self, category: Category) -> &[String] {
        match category {
            Category::ExplicitLowLight => &self.explicit_low_light,
            Category::EgressLighting => &self.egress_lighting,
            Category::VisibilityHazard => &self.visibility_hazard,
            Category::CodeBased => &[],
        }
    }

    /// Rejects blank keywords, which would match every narrative.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for category in Category::ALL {
            if self.keywords(category).iter().any(|k| k.trim().is_empty()) {
                return Err(PipelineError::InvalidRules {
                    reason: format!("blank keyword in `{}`", category),
                });
            }
        }
        Ok(())
    }
}

/// A compiled [`RuleSet`].
#[derive(Debug, Clone)]
pub struct Classifier {
    allow_list: CfrAllowList,
    keyword_groups: Vec<(Category, Regex)>,
}

/// One case-insensitive alternation per keyword group. A phrase that
/// starts or ends with a word character must meet a word boundary there,
/// and any run of whitespace separates its words.
fn keyword_pattern(keywords: &[String]) -> Result<Regex, regex::Error> {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| {
            let k = k.trim();
            let body = k
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            let start = if is_word(k.chars().next()) { r"\b" } else { "" };
            let end = if is_word(k.chars().next_back()) { r"\b" } else { "" };
            format!("{start}{body}{end}")
        })
        .collect();

    Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))
}

impl Classifier {
    pub fn new(rules: &RuleSet) -> Result<Self, PipelineError> {
        rules.validate()?;

        let invalid = |e: regex::Error| PipelineError::InvalidRules {
            reason: e.to_string(),
        };

        let allow_list = CfrAllowList::new(&rules.cfr_sections).map_err(invalid)?;

        // An empty alternation matches every narrative, so empty groups are
        // left out entirely.
        let keyword_groups = Category::ALL
            .into_iter()
            .filter(|c| !rules.keywords(*c).is_empty())
            .map(|c| {
                keyword_pattern(rules.keywords(c))
                    .map(|pattern| (c, pattern))
                    .map_err(invalid)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allow_list,
            keyword_groups,
        })
    }

    /// Classifies one record from its citation code and narrative.
    ///
    /// A blank narrative can only match through the citation code.
    pub fn classify(&self, citation: &str, narrative: &str) -> ClassificationResult {
        let text = narrative.trim();

        let keyword_match = if text.is_empty() {
            None
        } else {
            self.keyword_groups
                .iter()
                .find(|(_, pattern)| pattern.is_match(text))
                .map(|(category, _)| *category)
        };

        ClassificationResult {
            code_match: self.allow_list.matches(citation),
            keyword_match,
        }
    }
}
