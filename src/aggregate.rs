//! Streaming aggregation over the batch stream.
//!
//! A [`StreamingAggregator`] owns four parallel aggregates computed from the
//! same stream:
//!
//! | aggregate        | combiner                  | input field (default)  |
//! |------------------|---------------------------|------------------------|
//! | per-year counts  | [`CategoryCount<i32>`]    | `year`                 |
//! | per-source counts| [`CategoryCount<String>`] | `source`               |
//! | token frequency  | [`TokenFrequency`]        | `title`                |
//! | scalar values    | [`ScalarDistribution`]    | `title_word_count`     |
//!
//! Each batch is first reduced to a partial accumulator, which is then merged
//! into the running state: exactly one merge per batch per aggregate. Because
//! every merge is additive (or a union), the finished state does not depend on
//! how the input was partitioned into windows.
//!
//! The lifecycle is create → fold* → finalize. [`StreamingAggregator::finalize`]
//! consumes the aggregator, so folding after finalization does not compile.

use crate::combiners::{CategoryCount, CombineFn, ScalarDistribution, Tally, TokenFrequency};
use crate::config::AnalysisConfig;
use crate::error::Notice;
use crate::metrics::DistributionStats;
use crate::record::{Batch, Paper, ParseFailures, Schema, cell, parse_integer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Names of the fields each aggregate reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFields {
    pub year: String,
    pub source: String,
    pub title: String,
    pub scalar: String,
}

impl From<&AnalysisConfig> for AggregateFields {
    fn from(cfg: &AnalysisConfig) -> Self {
        Self {
            year: cfg.year_field.clone(),
            source: cfg.source_field.clone(),
            title: cfg.title_field.clone(),
            scalar: cfg.scalar_field.clone(),
        }
    }
}

impl Default for AggregateFields {
    fn default() -> Self {
        (&AnalysisConfig::default()).into()
    }
}

/// Column positions of [`AggregateFields`] in one schema.
#[derive(Clone, Copy, Debug, Default)]
struct Positions {
    year: Option<usize>,
    source: Option<usize>,
    title: Option<usize>,
    scalar: Option<usize>,
}

/// The values of one record that the aggregates look at.
#[derive(Clone, Copy, Debug, Default)]
struct Observation<'a> {
    year: Option<i32>,
    source: Option<&'a str>,
    title: Option<&'a str>,
    scalar: Option<u32>,
}

type Accumulators = (
    HashMap<i32, u64>,
    HashMap<String, u64>,
    HashMap<String, u64>,
    Vec<u32>,
);

/// Running aggregate state of one analysis (or view) run.
pub struct StreamingAggregator {
    fields: AggregateFields,
    years_fn: CategoryCount<i32>,
    sources_fn: CategoryCount<String>,
    tokens_fn: Option<TokenFrequency>,
    scalar_fn: ScalarDistribution<u32>,

    years: HashMap<i32, u64>,
    sources: HashMap<String, u64>,
    tokens: HashMap<String, u64>,
    scalar: Vec<u32>,

    resolved: Option<(Arc<Schema>, Positions)>,
    rows_seen: u64,
    batches: u64,
    failures: ParseFailures,
    notices: Vec<Notice>,
}

impl StreamingAggregator {
    /// # Errors
    /// Fails if `min_token_len` is zero.
    pub fn new(fields: AggregateFields, min_token_len: usize) -> Result<Self> {
        Ok(Self::build(fields, Some(TokenFrequency::new(min_token_len)?)))
    }

    /// Aggregator that skips token frequency; the title field is not read.
    pub fn without_tokens(fields: AggregateFields) -> Self {
        Self::build(fields, None)
    }

    fn build(fields: AggregateFields, tokens_fn: Option<TokenFrequency>) -> Self {
        let years_fn = CategoryCount::new();
        let sources_fn = CategoryCount::new();
        let scalar_fn = ScalarDistribution::new();
        Self {
            fields,
            years: years_fn.create(),
            sources: sources_fn.create(),
            tokens: HashMap::new(),
            scalar: scalar_fn.create(),
            years_fn,
            sources_fn,
            tokens_fn,
            scalar_fn,
            resolved: None,
            rows_seen: 0,
            batches: 0,
            failures: ParseFailures::default(),
            notices: Vec::new(),
        }
    }

    /// Aggregator for an analysis run.
    pub fn for_analysis(cfg: &AnalysisConfig) -> Result<Self> {
        Self::new(cfg.into(), cfg.min_token_len)
    }

    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn parse_failures(&self) -> ParseFailures {
        self.failures
    }

    fn note_missing(&mut self, field: &str) {
        let notice = Notice::FieldMissing(field.to_string());
        if !self.notices.contains(&notice) {
            log::warn!("{notice}");
            self.notices.push(notice);
        }
    }

    fn positions(&mut self, schema: &Arc<Schema>) -> Positions {
        if let Some((known, positions)) = &self.resolved
            && Arc::ptr_eq(known, schema)
        {
            return *positions;
        }
        let positions = Positions {
            year: schema.position(&self.fields.year),
            source: schema.position(&self.fields.source),
            title: self
                .tokens_fn
                .as_ref()
                .and_then(|_| schema.position(&self.fields.title)),
            scalar: schema.position(&self.fields.scalar),
        };
        let missing: Vec<String> = [
            (positions.year, &self.fields.year),
            (positions.source, &self.fields.source),
            (positions.title, &self.fields.title),
            (positions.scalar, &self.fields.scalar),
        ]
        .into_iter()
        .filter(|(_, name)| self.tokens_fn.is_some() || *name != &self.fields.title)
        .filter(|(pos, _)| pos.is_none())
        .map(|(_, name)| name.clone())
        .collect();
        for field in missing {
            self.note_missing(&field);
        }
        self.resolved = Some((Arc::clone(schema), positions));
        positions
    }

    /// Reduce one window of observations to partial accumulators.
    fn partial<'a, I>(&self, observations: I) -> Accumulators
    where
        I: IntoIterator<Item = Observation<'a>>,
    {
        let mut years = self.years_fn.create();
        let mut sources = self.sources_fn.create();
        let mut tokens = HashMap::new();
        let mut scalar = self.scalar_fn.create();
        for obs in observations {
            if let Some(year) = obs.year {
                self.years_fn.add_input(&mut years, year);
            }
            if let Some(source) = obs.source {
                self.sources_fn.add_input(&mut sources, source.to_string());
            }
            if let (Some(tokens_fn), Some(title)) = (&self.tokens_fn, obs.title) {
                tokens_fn.add_input(&mut tokens, title);
            }
            if let Some(value) = obs.scalar {
                self.scalar_fn.add_input(&mut scalar, value);
            }
        }
        (years, sources, tokens, scalar)
    }

    fn merge(&mut self, rows: usize, (years, sources, tokens, scalar): Accumulators) {
        self.years_fn.merge(&mut self.years, years);
        self.sources_fn.merge(&mut self.sources, sources);
        if let Some(tokens_fn) = &self.tokens_fn {
            tokens_fn.merge(&mut self.tokens, tokens);
        }
        self.scalar_fn.merge(&mut self.scalar, scalar);
        self.rows_seen += rows as u64;
        self.batches += 1;
    }

    /// Fold one raw batch read from a cleaned artifact.
    ///
    /// Unparseable `year` or scalar cells are counted as parse failures and
    /// excluded from their aggregate; the row still counts for the others.
    pub fn fold_batch(&mut self, batch: &Batch) {
        let pos = self.positions(&batch.schema);
        let mut failures = ParseFailures::default();
        let observations: Vec<Observation<'_>> = batch
            .rows
            .iter()
            .map(|row| Observation {
                year: cell(row, pos.year).and_then(|raw| {
                    let parsed = parse_integer(raw).and_then(|y| i32::try_from(y).ok());
                    if parsed.is_none() {
                        failures.numbers += 1;
                    }
                    parsed
                }),
                source: cell(row, pos.source),
                title: cell(row, pos.title),
                scalar: cell(row, pos.scalar).and_then(|raw| {
                    let parsed = parse_integer(raw).and_then(|v| u32::try_from(v).ok());
                    if parsed.is_none() {
                        failures.numbers += 1;
                    }
                    parsed
                }),
            })
            .collect();
        let partial = self.partial(observations);
        self.failures.add(failures);
        self.merge(batch.len(), partial);
    }

    /// Fold typed papers as one window. Used by the view layer over a sample.
    pub fn fold_papers<'a, I>(&mut self, papers: I)
    where
        I: IntoIterator<Item = &'a Paper>,
    {
        let mut rows = 0;
        let partial = self.partial(papers.into_iter().map(|p| {
            rows += 1;
            Observation {
                year: p.year,
                source: p.source.as_deref(),
                title: Some(p.title.as_str()).filter(|t| !t.is_empty()),
                scalar: p.title_word_count,
            }
        }));
        self.merge(rows, partial);
    }

    /// Freeze the state. No fold can follow.
    pub fn finalize(self) -> AggregateResults {
        AggregateResults {
            rows_seen: self.rows_seen,
            batches: self.batches,
            years: self.years_fn.finish(self.years),
            sources: self.sources_fn.finish(self.sources),
            tokens: match &self.tokens_fn {
                Some(tokens_fn) => tokens_fn.finish(self.tokens),
                None => Tally::default(),
            },
            scalar: self.scalar_fn.finish(self.scalar),
            parse_failures: self.failures,
            notices: self.notices,
            fields: self.fields,
        }
    }
}

/// Frozen aggregate state, not yet ordered or truncated.
#[derive(Clone, Debug)]
pub struct AggregateResults {
    pub rows_seen: u64,
    pub batches: u64,
    pub years: Tally<i32>,
    pub sources: Tally<String>,
    pub tokens: Tally<String>,
    pub scalar: Vec<u32>,
    pub parse_failures: ParseFailures,
    pub notices: Vec<Notice>,
    pub fields: AggregateFields,
}

impl AggregateResults {
    /// Order and truncate into presentation-ready views: years ascending,
    /// sources and tokens by descending count then ascending key.
    pub fn summarize(mut self, top_categories: usize, top_tokens: usize) -> AnalysisSummary {
        AnalysisSummary {
            rows_seen: self.rows_seen,
            batches: self.batches,
            scalar_stats: DistributionStats::from_values(&mut self.scalar),
            by_year: self.years.sorted_by_key(),
            top_sources: self.sources.top(top_categories),
            top_tokens: self.tokens.top(top_tokens),
            scalar: self.scalar,
            notices: self.notices,
            fields: self.fields,
        }
    }
}

/// Finalized aggregates of one run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub rows_seen: u64,
    pub batches: u64,
    pub by_year: Vec<(i32, u64)>,
    pub top_sources: Vec<(String, u64)>,
    pub top_tokens: Vec<(String, u64)>,
    /// Every parsed value in ascending order, handed to the histogram renderer.
    #[serde(skip)]
    pub scalar: Vec<u32>,
    pub scalar_stats: DistributionStats,
    pub notices: Vec<Notice>,
    pub fields: AggregateFields,
}

impl AnalysisSummary {
    /// Human-readable digest, first ten entries of each view.
    pub fn print(&self) {
        println!("\n--- Final Aggregated Results ---");
        println!("Rows analysed: {} in {} batches", self.rows_seen, self.batches);
        println!("Paper counts by {}:", self.fields.year);
        for (year, n) in self.by_year.iter().take(10) {
            println!("  {year}: {n}");
        }
        println!("Top {}:", self.fields.source);
        for (source, n) in self.top_sources.iter().take(10) {
            println!("  {source}: {n}");
        }
        println!("Most frequent words in {}:", self.fields.title);
        for (token, n) in self.top_tokens.iter().take(10) {
            println!("  {token}: {n}");
        }
        let s = &self.scalar_stats;
        println!(
            "{}: count {} mean {:.2} min {} median {} max {}",
            self.fields.scalar, s.count, s.mean, s.min, s.p50, s.max
        );
        for notice in &self.notices {
            println!("note: {notice}");
        }
    }
}
