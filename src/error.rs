//! Fatal pipeline errors.
//!
//! Anything in here stops a stage. Per-row problems are [`crate::records::RowError`]
//! values instead and never abort a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no input files match `{pattern}`")]
    NoInputFiles { pattern: String },

    #[error("column `{column}` not found in {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("summary {} has no rows to plot", path.display())]
    EmptySummary { path: PathBuf },

    #[error("invalid rules: {reason}")]
    InvalidRules { reason: String },
}
