//! Rules file loading.
//!
//! The rule tables can be overridden with a JSON file; any key left out
//! keeps its built-in value:
//! ```json
//! {
//!   "cfr_sections": ["1910.37", "1926.56", "1926.26"],
//!   "explicit_low_light": ["inadequate lighting", "low light"],
//!   "visibility_hazard": ["poor visibility"]
//! }
//! ```

use crate::classifier::RuleSet;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

impl RuleSet {
    /// Loads a rules file from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading rules file {}", path.display()))?;
        let rules: RuleSet = serde_json::from_str(&content)
            .with_context(|| format!("parsing rules file {}", path.display()))?;
        rules.validate()?;

        info!(
            path = %path.display(),
            cfr_sections = rules.cfr_sections.len(),
            "Loaded rules file"
        );
        Ok(rules)
    }

    /// Built-in tables, or the file at `path` when one is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
