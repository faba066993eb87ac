//! Test fixtures for metadata pipelines.
//!
//! - **Builders**: [`MetadataBuilder`] assembles raw metadata rows fluently and
//!   writes them as (optionally compressed) CSV.
//! - **Fixtures**: canned datasets and cleaned-artifact writers for tests that
//!   start after the cleaning stage, and a [`RecordingRenderer`] that
//!   stands in for the SVG backend.
//!
//! # Quick Start
//!
//! ```
//! use scholarstream::testing::MetadataBuilder;
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let path = MetadataBuilder::new()
//!     .add_paper("Cats And Dogs", "2020-03-01", "PMC")
//!     .add_untitled("2021-01-01", "WHO")
//!     .write_csv(dir.path().join("metadata.csv"))?;
//! assert!(path.exists());
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod fixtures;

pub use builders::{METADATA_COLUMNS, MetadataBuilder, MetadataRow};
pub use fixtures::{
    CLEANED_COLUMNS, RecordingRenderer, cats_and_dogs_titles, read_to_string, write_cleaned_csv,
};
