//! Bounded-memory sampling of a cleaned artifact.
//!
//! The artifact is read window by window. From each window exactly
//! `round(len * fraction)` rows are drawn without replacement, with an RNG
//! seeded from `seed + window index` so that windows never draw the same
//! positions. The per-window samples are concatenated, then re-sampled with
//! the base seed down to `round(rows_read * fraction)` when rounding made the
//! concatenation overshoot.
//!
//! Only one window plus the accumulated sample is resident at any time.
//!
//! The scheme approximates a uniform sample of the whole file. It is exact in
//! expectation when all windows have the same length; a short final window is
//! sampled at the same rate but its rounding error weighs more.

use crate::config::SampleConfig;
use crate::error::{Notice, PipelineError};
use crate::io::csv::ChunkReader;
use crate::metrics::{BATCHES, DATE_PARSE_FAILURES, NUMBER_PARSE_FAILURES, ROWS_READ, ROWS_SAMPLED, RunMetrics};
use crate::record::{Paper, PaperFields, ParseFailures, Schema};
use anyhow::Result;
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;

/// In-memory sample of a cleaned artifact, in file order.
#[derive(Clone, Debug, Default)]
pub struct Sample {
    pub papers: Vec<Paper>,
    /// Columns of the artifact; empty when nothing could be read.
    pub schema: Schema,
    /// Name of the column exposed as [`Paper::source`].
    pub source_field: String,
    /// Rows of the artifact the sample was drawn from.
    pub rows_read: u64,
    pub windows: u64,
    /// Rows drawn by the per-window stage, before the final re-sample.
    pub drawn: usize,
    pub failures: ParseFailures,
    pub notices: Vec<Notice>,
}

impl Sample {
    fn no_data(err: &PipelineError, source_field: &str) -> Self {
        log::warn!("{err}");
        Self {
            source_field: source_field.to_string(),
            notices: vec![Notice::NoData(err.to_string())],
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Truth that the artifact had a column called `name`.
    pub fn has_field(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Copy the sample's counters into `metrics`.
    pub fn record_metrics(&self, metrics: &mut RunMetrics) {
        metrics.increment(BATCHES, self.windows);
        metrics.increment(ROWS_READ, self.rows_read);
        metrics.increment(ROWS_SAMPLED, self.papers.len() as u64);
        metrics.increment(DATE_PARSE_FAILURES, self.failures.dates);
        metrics.increment(NUMBER_PARSE_FAILURES, self.failures.numbers);
    }
}

/// Number of rows to draw from `len` rows at `fraction`, never more than `len`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn draw_size(len: usize, fraction: f64) -> usize {
    ((len as f64 * fraction).round() as usize).min(len)
}

/// Sorted positions of `amount` rows drawn uniformly from `len`.
fn draw(len: usize, amount: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, len, amount).into_vec();
    picked.sort_unstable();
    picked
}

/// Load a sample of the artifact at `cfg.path`.
///
/// A missing or empty artifact is not an error: the returned sample is empty
/// and carries a [`Notice::NoData`].
///
/// # Errors
/// Invalid configuration, and hard read failures (malformed rows, I/O).
pub fn sample(cfg: &SampleConfig) -> Result<Sample> {
    cfg.validate()?;
    let reader = match ChunkReader::open(&cfg.path, cfg.window()?) {
        Ok(reader) => reader,
        Err(err) => {
            return match err.downcast_ref::<PipelineError>() {
                Some(e) if e.is_no_data() => Ok(Sample::no_data(e, &cfg.source_field)),
                _ => Err(err),
            };
        }
    };
    log::info!(
        "Loading a sample ({:.1}%) of '{}'",
        cfg.fraction * 100.0,
        cfg.path.display()
    );

    let schema = reader.schema().as_ref().clone();
    let fields = PaperFields::resolve(&schema, &cfg.source_field);
    let mut out = Sample {
        schema,
        source_field: cfg.source_field.clone(),
        ..Sample::default()
    };

    for batch in reader {
        let batch = batch?;
        let amount = draw_size(batch.len(), cfg.fraction);
        log::debug!("window {}: drawing {amount} of {} rows", batch.index, batch.len());
        if amount > 0 {
            for i in draw(batch.len(), amount, cfg.seed.wrapping_add(batch.index as u64)) {
                let (paper, failures) = fields.paper(&batch.rows[i]);
                out.failures.add(failures);
                out.papers.push(paper);
            }
        }
        out.rows_read += batch.len() as u64;
        out.windows += 1;
    }
    out.drawn = out.papers.len();

    let target = draw_size(usize::try_from(out.rows_read).unwrap_or(usize::MAX), cfg.fraction);
    if target > 0 && target < out.drawn {
        let keep = draw(out.drawn, target, cfg.seed);
        let mut keep = keep.into_iter().peekable();
        let mut position = 0;
        out.papers.retain(|_| {
            let kept = keep.peek() == Some(&position);
            if kept {
                keep.next();
            }
            position += 1;
            kept
        });
    }

    if out.papers.is_empty() {
        out.notices.push(Notice::NoData(format!(
            "a {:.1}% sample of {} rows is empty",
            cfg.fraction * 100.0,
            out.rows_read
        )));
    }
    for field in fields.missing() {
        out.notices.push(Notice::FieldMissing(field));
    }
    log::info!("Sample loaded: {} of {} rows", out.papers.len(), out.rows_read);
    Ok(out)
}
