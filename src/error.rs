//! Error taxonomy shared by every pipeline stage.
//!
//! Hard failures travel as `anyhow::Error` wrapping a [`PipelineError`], so
//! callers can still branch on the kind:
//!
//! ```
//! use scholarstream::error::PipelineError;
//!
//! fn describe(err: &anyhow::Error) -> &'static str {
//!     match err.downcast_ref::<PipelineError>() {
//!         Some(PipelineError::NotFound { .. }) => "missing",
//!         Some(PipelineError::Empty { .. }) => "empty",
//!         _ => "other",
//!     }
//! }
//! # let e = anyhow::Error::new(PipelineError::Empty { path: "x.csv".into() });
//! # assert_eq!(describe(&e), "empty");
//! ```
//!
//! Soft failures (an absent column, an unparseable date) never become errors.
//! They are counted in [`crate::metrics::RunMetrics`] or reported as
//! [`Notice`] values.

use serde::{Deserialize, Serialize};
use std::collections::TryReserveError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input or cleaned artifact does not exist.
    #[error("'{}' not found", .path.display())]
    NotFound { path: PathBuf },

    /// The artifact exists but holds no records.
    #[error("'{}' contains no records", .path.display())]
    Empty { path: PathBuf },

    /// An expected field is absent. Only ever surfaced as a notice.
    #[error("field '{field}' is not present")]
    FieldMissing { field: String },

    /// A batch buffer could not be allocated for the configured window.
    #[error(
        "could not reserve memory for a window of {window_size} records; \
         retry with a smaller window size"
    )]
    ResourceExhaustion {
        window_size: usize,
        #[source]
        source: TryReserveError,
    },

    /// The cleaning sink refuses to append to a previous run's output.
    #[error(
        "output '{}' already exists; remove it or request an overwrite",
        .path.display()
    )]
    OutputExists { path: PathBuf },

    /// A configuration knob is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Anything else, tagged with the 1-based batch being processed.
    #[error("batch {batch} failed: {cause:#}")]
    Unexpected { batch: usize, cause: anyhow::Error },
}

impl PipelineError {
    /// Truth that downstream stages should treat this as "nothing to do".
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Empty { .. })
    }
}

/// Non-fatal condition shown to the operator next to the results.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// A column needed by some computation is absent; the computation was skipped.
    FieldMissing(String),
    /// No data was available at all.
    NoData(String),
    /// Anything else worth a line in the report.
    Info(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldMissing(field) => write!(f, "field '{field}' not found, dependent view skipped"),
            Self::NoData(what) => write!(f, "no data: {what}"),
            Self::Info(msg) => f.write_str(msg),
        }
    }
}

/// Shorthand used by batch-level code to tag failures with their batch index.
pub(crate) fn in_batch(batch: usize) -> impl FnOnce(anyhow::Error) -> anyhow::Error {
    move |cause| {
        // Keep typed errors raised inside the batch untouched.
        if cause.downcast_ref::<PipelineError>().is_some() {
            cause
        } else {
            PipelineError::Unexpected { batch, cause }.into()
        }
    }
}
