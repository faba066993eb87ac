//! # Scholarstream
//!
//! Bounded-memory cleaning, aggregation and sampled exploration of large
//! scholarly metadata CSV files (title, abstract, publish date, source).
//!
//! Every stage reads its input in fixed-size windows of rows, so memory use is
//! bounded by one window plus the aggregate state, whatever the file size.
//!
//! ## Key Features
//!
//! - **Chunked reading** - lazy, single-pass windows over plain or compressed CSV
//! - **Stateless cleaning** - per-batch transform with derived `year` and `title_word_count`
//! - **Streaming aggregation** - mergeable combiners whose result ignores window size
//! - **Static images** - time series, top sources, word cloud and histogram as SVG
//! - **Sampling** - a seeded, window-by-window sample for interactive use
//! - **Filtered views** - year range and source predicates over the sample
//!
//! ## Quick Start
//!
//! ```no_run
//! use scholarstream::config::{AnalysisConfig, CleanConfig};
//! use scholarstream::pipeline::{run_analysis, run_clean};
//! use scholarstream::render::SvgRenderer;
//!
//! # fn main() -> anyhow::Result<()> {
//! let clean = CleanConfig {
//!     input: "metadata.csv".into(),
//!     output: "cleaned_data.csv".into(),
//!     overwrite: true,
//!     ..CleanConfig::default()
//! };
//! let report = run_clean(&clean)?;
//! report.metrics.print();
//!
//! let analysis = AnalysisConfig {
//!     input: clean.output.clone(),
//!     ..AnalysisConfig::default()
//! };
//! let summary = run_analysis(&analysis, &SvgRenderer::default())?.summary;
//! summary.print();
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Batch
//!
//! A [`Batch`] is a contiguous window of at most `window_size` rows. The
//! batches of a file partition it in order, with no overlap and no gap.
//!
//! ### Combiner
//!
//! A [`CombineFn`] folds values into an accumulator and merges accumulators.
//! Merges are additive (or unions), so processing a file as one window or as
//! many gives the same finalized aggregates.
//!
//! ### Notice
//!
//! Soft problems (a missing column, nothing to plot) never abort a run. They
//! are reported as [`Notice`] values next to the results.
//!
//! ## Modules
//!
//! - [`io`] - chunk reader, sink writer and compression
//! - [`record`] - schema, raw batches and the typed [`Paper`]
//! - [`clean`] - the record cleaner
//! - [`combiners`] - category counts, token frequency, scalar distribution
//! - [`aggregate`] - the streaming aggregator
//! - [`render`] - charts and the SVG renderer
//! - [`sample`] - the sampling loader
//! - [`view`] - filters and recomputed aggregates
//! - [`explore`] - the headless exploration report
//! - [`pipeline`] - cleaning and analysis drivers
//! - [`config`], [`error`], [`metrics`] - run configuration, errors and counters
//! - [`testing`] - fixtures for tests

pub mod aggregate;
pub mod clean;
pub mod combiners;
pub mod config;
pub mod error;
pub mod explore;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod sample;
pub mod testing;
pub mod view;

pub use aggregate::{AggregateResults, AnalysisSummary, StreamingAggregator};
pub use clean::{CleanBatch, Cleaner};
pub use combiners::{CategoryCount, CombineFn, ScalarDistribution, Tally, TokenFrequency};
pub use error::{Notice, PipelineError};
pub use explore::{ExploreReport, explore};
pub use io::{ChunkReader, SinkWriter, read_batches};
pub use metrics::RunMetrics;
pub use pipeline::{run_analysis, run_clean};
pub use record::{Batch, Paper, Schema};
pub use render::{Chart, Renderer, SvgRenderer};
pub use sample::{Sample, sample};
pub use view::{Filter, filter};
