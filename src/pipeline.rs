//! Run drivers: cleaning and analysis.
//!
//! Both runs are single-threaded and strictly sequential: read a batch,
//! process it, move on. A hard failure aborts the run; whatever the sink
//! already wrote stays in place and must be treated as incomplete.
//!
//! ```text
//! cleaning:  ChunkReader -> Cleaner -> SinkWriter           => cleaned artifact
//! analysis:  ChunkReader -> StreamingAggregator -> Renderer => images + summary
//! ```

use crate::aggregate::{AnalysisSummary, StreamingAggregator};
use crate::clean::Cleaner;
use crate::config::{AnalysisConfig, CleanConfig};
use crate::error::{Notice, PipelineError, in_batch};
use crate::io::csv::{ChunkReader, ExistingOutput, SinkWriter};
use crate::metrics::{
    BATCHES, DATE_PARSE_FAILURES, NUMBER_PARSE_FAILURES, ROWS_DROPPED, ROWS_READ, ROWS_WRITTEN,
    RunMetrics, write_json,
};
use crate::record::TITLE;
use crate::render::{
    Chart, PUBLICATIONS_BY_YEAR, Rendered, Renderer, TITLE_WORD_COUNT_DIST, TITLE_WORDCLOUD,
    TOP_SOURCES, render_chart,
};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name of the analysis summary inside the output directory.
pub const ANALYSIS_SUMMARY: &str = "analysis_summary.json";
/// File name of the cleaning metrics, next to the cleaned artifact.
pub const CLEAN_METRICS: &str = "clean_metrics.json";

/// Outcome of [`run_clean`].
#[derive(Clone, Debug, Serialize)]
pub struct CleanReport {
    pub output: PathBuf,
    /// Configured columns that the input actually had.
    pub dropped_columns: Vec<String>,
    pub notices: Vec<Notice>,
    #[serde(skip)]
    pub metrics: RunMetrics,
}

impl CleanReport {
    /// Default location of the metrics file for this run.
    pub fn metrics_path(&self) -> PathBuf {
        self.output.with_file_name(CLEAN_METRICS)
    }

    /// Save the counters and notices as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut value = serde_json::to_value(self)?;
        value["metrics"] = self.metrics.to_json();
        write_json(path, &value)
    }
}

/// Clean `cfg.input` into `cfg.output`, one window at a time.
///
/// The input is opened before the output is touched, so a missing or empty
/// input produces no artifact at all.
///
/// # Errors
/// - [`PipelineError::InvalidConfig`] for a zero window, or an output that
///   is the input file.
/// - [`PipelineError::NotFound`] / [`PipelineError::Empty`] for the input.
/// - [`PipelineError::OutputExists`] unless `cfg.overwrite` is set.
/// - [`PipelineError::Unexpected`] for failures inside a batch.
pub fn run_clean(cfg: &CleanConfig) -> Result<CleanReport> {
    cfg.validate()?;
    let mut metrics = RunMetrics::new();
    metrics.record_start();

    let reader = ChunkReader::open(&cfg.input, cfg.window()?)?;
    if same_file(&cfg.input, &cfg.output) {
        return Err(PipelineError::InvalidConfig(format!(
            "output '{}' is the input file",
            cfg.output.display()
        ))
        .into());
    }
    let existing = if cfg.overwrite {
        ExistingOutput::Overwrite
    } else {
        ExistingOutput::Fail
    };
    let mut sink = SinkWriter::create(&cfg.output, existing)?;
    let cleaner = Cleaner::new(reader.schema(), &cfg.drop_columns);
    log::info!(
        "Cleaning '{}' into '{}' (window {})",
        cfg.input.display(),
        cfg.output.display(),
        cfg.window_size
    );

    let mut notices = Vec::new();
    if !cleaner.layout().has_title() {
        let notice = Notice::FieldMissing(TITLE.to_string());
        log::warn!("{notice}: every row will be dropped");
        notices.push(notice);
    }

    for batch in reader {
        let batch = batch?;
        let index = batch.index;
        log::info!("Processing batch {index} ({} rows)", batch.len());
        metrics.increment(BATCHES, 1);
        metrics.increment(ROWS_READ, batch.len() as u64);

        let cleaned = cleaner.clean(batch);
        metrics.increment(ROWS_DROPPED, cleaned.dropped_rows as u64);
        metrics.increment(DATE_PARSE_FAILURES, cleaned.date_failures as u64);

        let written = sink.write(&cleaned).map_err(in_batch(index))?;
        metrics.increment(ROWS_WRITTEN, written as u64);
        log::debug!("batch {index}: wrote {written} rows");
    }
    sink.finish()?;
    metrics.record_end();
    log::info!(
        "Cleaning complete: kept {} of {} rows",
        metrics.get(ROWS_WRITTEN),
        metrics.get(ROWS_READ)
    );

    Ok(CleanReport {
        output: cfg.output.clone(),
        dropped_columns: cleaner.layout().dropped_columns().to_vec(),
        notices,
        metrics,
    })
}

/// Truth that `output` names the existing file `input`, through any
/// relative detour or symlink. The output itself may not exist yet.
fn same_file(input: &Path, output: &Path) -> bool {
    let Ok(input) = input.canonicalize() else {
        return false;
    };
    if output.canonicalize().is_ok_and(|o| o == input) {
        return true;
    }
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    output
        .file_name()
        .is_some_and(|name| parent.canonicalize().is_ok_and(|dir| dir.join(name) == input))
}

/// Outcome of [`run_analysis`].
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub summary: AnalysisSummary,
    pub rendered: Vec<PathBuf>,
    #[serde(skip)]
    pub metrics: RunMetrics,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        value["metrics"] = self.metrics.to_json();
        Ok(value)
    }
}

/// Aggregate the cleaned artifact and render the four static images into
/// `cfg.output_dir`, along with [`ANALYSIS_SUMMARY`].
///
/// An empty artifact is not an error: the summary records a no-data notice
/// and no image is drawn.
///
/// # Errors
/// Invalid configuration, a missing artifact, and hard batch failures.
pub fn run_analysis(cfg: &AnalysisConfig, renderer: &dyn Renderer) -> Result<AnalysisReport> {
    cfg.validate()?;
    let mut metrics = RunMetrics::new();
    metrics.record_start();
    let mut aggregator = StreamingAggregator::for_analysis(cfg)?;

    let mut empty_input = None;
    match ChunkReader::open(&cfg.input, cfg.window()?) {
        Ok(reader) => {
            log::info!(
                "Analysing '{}' (window {})",
                cfg.input.display(),
                cfg.window_size
            );
            for batch in reader {
                let batch = batch?;
                log::info!("Analysing batch {}...", batch.index);
                aggregator.fold_batch(&batch);
            }
        }
        Err(err) => match err.downcast_ref::<PipelineError>() {
            Some(e) if matches!(e, PipelineError::Empty { .. }) => {
                log::warn!("{e}");
                empty_input = Some(Notice::NoData(e.to_string()));
            }
            _ => return Err(err),
        },
    }

    metrics.set(BATCHES, aggregator.batches());
    metrics.set(ROWS_READ, aggregator.rows_seen());
    let failures = aggregator.parse_failures();
    metrics.set(DATE_PARSE_FAILURES, failures.dates);
    metrics.set(NUMBER_PARSE_FAILURES, failures.numbers);
    log::info!("Finished processing {} rows in total", aggregator.rows_seen());

    let mut summary = aggregator
        .finalize()
        .summarize(cfg.top_categories, cfg.top_tokens);
    summary.notices.extend(empty_input);

    let year_title = format!("Number of Publications by {}", cfg.year_field);
    let source_title = format!("Top {} by Publications", cfg.source_field);
    let cloud_title = format!("Word Cloud of {}", cfg.title_field);
    let hist_title = format!("Distribution of {}", cfg.scalar_field);
    let charts = [
        (
            PUBLICATIONS_BY_YEAR,
            Chart::TimeSeries {
                title: &year_title,
                x_label: &cfg.year_field,
                y_label: "Number of Papers",
                points: &summary.by_year,
            },
        ),
        (
            TOP_SOURCES,
            Chart::Bar {
                title: &source_title,
                x_label: "Number of Papers",
                y_label: &cfg.source_field,
                bars: &summary.top_sources,
            },
        ),
        (
            TITLE_WORDCLOUD,
            Chart::Cloud {
                title: &cloud_title,
                words: &summary.top_tokens,
            },
        ),
        (
            TITLE_WORD_COUNT_DIST,
            Chart::Histogram {
                title: &hist_title,
                x_label: &cfg.scalar_field,
                y_label: "Frequency",
                values: &summary.scalar,
                bins: cfg.histogram_bins,
            },
        ),
    ];

    let mut rendered = Vec::new();
    let mut skipped = Vec::new();
    for (name, chart) in &charts {
        match render_chart(renderer, chart, &cfg.output_dir, name)? {
            Rendered::Written(path) => rendered.push(path),
            Rendered::Skipped(notice) => skipped.push(notice),
        }
    }
    summary.notices.extend(skipped);
    metrics.record_end();

    let report = AnalysisReport {
        config: cfg.clone(),
        summary,
        rendered,
        metrics,
    };
    std::fs::create_dir_all(&cfg.output_dir)?;
    write_json(cfg.output_dir.join(ANALYSIS_SUMMARY), &report.to_json()?)?;
    log::info!(
        "Analysis complete, {} plots saved in '{}'",
        report.rendered.len(),
        cfg.output_dir.display()
    );
    Ok(report)
}
