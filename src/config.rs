//! Run configuration
//!
//! One struct per run kind. `Default` carries the documented defaults and
//! every struct is serializable so the effective configuration can be stored
//! next to the artifacts it produced. Out-of-range knobs are rejected by
//! `validate()` before any file is touched.

use crate::error::PipelineError;
use crate::record::{SOURCE, TITLE, TITLE_WORD_COUNT, YEAR};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Default raw input file
pub const DEFAULT_INPUT: &str = "metadata.csv";
/// Default cleaned artifact
pub const DEFAULT_CLEANED: &str = "cleaned_data.csv";
/// Default image directory
pub const DEFAULT_IMAGE_DIR: &str = "visualizations";

fn window(size: usize, what: &str) -> Result<NonZeroUsize, PipelineError> {
    NonZeroUsize::new(size)
        .ok_or_else(|| PipelineError::InvalidConfig(format!("{what} window size must be at least 1")))
}

fn non_zero(value: usize, what: &str) -> Result<(), PipelineError> {
    if value == 0 {
        return Err(PipelineError::InvalidConfig(format!("{what} must be at least 1")));
    }
    Ok(())
}

/// Configuration of a cleaning run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub window_size: usize,
    /// Low-value columns removed when present
    pub drop_columns: Vec<String>,
    /// Truncate an existing output instead of refusing to run
    pub overwrite: bool,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT.into(),
            output: DEFAULT_CLEANED.into(),
            window_size: 10_000,
            drop_columns: vec!["journal".to_string(), "pmcid".to_string()],
            overwrite: false,
        }
    }
}

impl CleanConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.window().map(|_| ())
    }

    pub fn window(&self) -> Result<NonZeroUsize, PipelineError> {
        window(self.window_size, "cleaning")
    }
}

/// Configuration of an analysis run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub window_size: usize,
    /// Truncation of the category ("top sources") views
    pub top_categories: usize,
    /// Truncation of the token table
    pub top_tokens: usize,
    pub min_token_len: usize,
    pub year_field: String,
    pub source_field: String,
    pub title_field: String,
    pub scalar_field: String,
    pub histogram_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input: DEFAULT_CLEANED.into(),
            output_dir: DEFAULT_IMAGE_DIR.into(),
            window_size: 15_000,
            top_categories: 10,
            top_tokens: 50,
            min_token_len: 3,
            year_field: YEAR.to_string(),
            source_field: SOURCE.to_string(),
            title_field: TITLE.to_string(),
            scalar_field: TITLE_WORD_COUNT.to_string(),
            histogram_bins: 50,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.window()?;
        non_zero(self.top_categories, "top categories")?;
        non_zero(self.top_tokens, "top tokens")?;
        non_zero(self.min_token_len, "minimum token length")?;
        non_zero(self.histogram_bins, "histogram bins")?;
        for (name, field) in [
            ("year", &self.year_field),
            ("source", &self.source_field),
            ("title", &self.title_field),
            ("scalar", &self.scalar_field),
        ] {
            if field.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(format!("{name} field name is empty")));
            }
        }
        Ok(())
    }

    pub fn window(&self) -> Result<NonZeroUsize, PipelineError> {
        window(self.window_size, "analysis")
    }
}

/// Configuration of the sampling loader
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    pub path: PathBuf,
    pub window_size: usize,
    /// Target share of the artifact's rows, in `(0, 1]`
    pub fraction: f64,
    pub seed: u64,
    /// Categorical column exposed as [`crate::record::Paper::source`]
    pub source_field: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_CLEANED.into(),
            window_size: 10_000,
            fraction: 0.05,
            seed: 42,
            source_field: SOURCE.to_string(),
        }
    }
}

impl SampleConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.window()?;
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "sample fraction {} is outside (0, 1]",
                self.fraction
            )));
        }
        Ok(())
    }

    pub fn window(&self) -> Result<NonZeroUsize, PipelineError> {
        window(self.window_size, "sampling")
    }
}

/// Configuration of the headless exploration view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Inclusive year range; `None` picks the last five years of the sample
    pub year_range: Option<(i32, i32)>,
    /// Selected sources; `None` picks the five most frequent ones
    pub sources: Option<Vec<String>>,
    pub preview_rows: usize,
    pub top_sources: usize,
    /// Directory holding the static images of the analysis run
    pub image_dir: PathBuf,
    /// Where to render the two filtered charts, if anywhere
    pub output_dir: Option<PathBuf>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            year_range: None,
            sources: None,
            preview_rows: 10,
            top_sources: 10,
            image_dir: DEFAULT_IMAGE_DIR.into(),
            output_dir: None,
        }
    }
}

impl ViewConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some((lo, hi)) = self.year_range
            && lo > hi
        {
            return Err(PipelineError::InvalidConfig(format!(
                "year range {lo}..={hi} is empty"
            )));
        }
        non_zero(self.top_sources, "top sources")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CleanConfig::default().validate().is_ok());
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(SampleConfig::default().validate().is_ok());
        assert!(ViewConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_knobs() {
        let clean = CleanConfig {
            window_size: 0,
            ..CleanConfig::default()
        };
        assert!(matches!(clean.validate(), Err(PipelineError::InvalidConfig(_))));

        for fraction in [0.0, -0.1, 1.5, f64::NAN] {
            let sample = SampleConfig {
                fraction,
                ..SampleConfig::default()
            };
            assert!(sample.validate().is_err(), "{fraction}");
        }

        let analysis = AnalysisConfig {
            min_token_len: 0,
            ..AnalysisConfig::default()
        };
        assert!(analysis.validate().is_err());

        let view = ViewConfig {
            year_range: Some((2021, 2020)),
            ..ViewConfig::default()
        };
        assert!(view.validate().is_err());
    }
}
