//! Filtered views over an in-memory sample.
//!
//! Two predicates are supported: an inclusive range over `year` and set
//! membership over the source column. A predicate naming a field the sample
//! does not have passes every record through. Filtered records feed the same
//! combiners as an analysis run, at sample scale; nothing here writes back to
//! the cleaned artifact or the static images.

use crate::aggregate::{AggregateFields, AnalysisSummary, StreamingAggregator};
use crate::combiners::{CategoryCount, CombineFn};
use crate::error::Notice;
use crate::record::{Paper, TITLE, TITLE_WORD_COUNT, YEAR};
use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Number of most recent years selected by default.
pub const DEFAULT_YEAR_SPAN: i32 = 5;
/// Number of most frequent sources selected by default.
pub const DEFAULT_SOURCE_COUNT: usize = 5;

/// User-chosen predicates. `None` means "no restriction".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Inclusive `(first, last)` year range.
    pub year_range: Option<(i32, i32)>,
    /// Accepted sources. An empty set restricts nothing.
    pub sources: Option<BTreeSet<String>>,
}

impl Filter {
    /// Truth that `paper` passes. `has_year` / `has_source` say whether the
    /// sample has those columns at all; absent columns never filter.
    ///
    /// Records whose year (or source) is missing fail an active predicate on
    /// that field.
    pub fn matches(&self, paper: &Paper, has_year: bool, has_source: bool) -> bool {
        if has_year
            && let Some((first, last)) = self.year_range
            && !paper.year.is_some_and(|y| (first..=last).contains(&y))
        {
            return false;
        }
        if has_source
            && let Some(sources) = self.sources.as_ref().filter(|s| !s.is_empty())
            && !paper.source.as_ref().is_some_and(|s| sources.contains(s))
        {
            return false;
        }
        true
    }
}

/// Apply `filter` to `sample`, keeping sample order.
pub fn filter<'a>(sample: &'a Sample, filter: &Filter) -> Vec<&'a Paper> {
    let has_year = sample.has_field(YEAR);
    let has_source = sample.has_field(&sample.source_field);
    sample
        .papers
        .iter()
        .filter(|p| filter.matches(p, has_year, has_source))
        .collect()
}

/// Choices offered by the sample, with their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// `(min, max)` of the sample's years.
    pub year_bounds: Option<(i32, i32)>,
    /// Last [`DEFAULT_YEAR_SPAN`] years before `max` (clamped to `min`), or
    /// `None` when a year filter makes no sense.
    pub default_year_range: Option<(i32, i32)>,
    /// Distinct sources by descending frequency, ties by name.
    pub sources: Vec<(String, u64)>,
    pub default_sources: Vec<String>,
    pub notices: Vec<Notice>,
}

impl FilterOptions {
    /// Derive the options from `sample`.
    pub fn from_sample(sample: &Sample) -> Self {
        let mut out = FilterOptions::default();

        if sample.has_field(YEAR) {
            let years = sample.papers.iter().filter_map(|p| p.year);
            let bounds = years.fold(None, |acc: Option<(i32, i32)>, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            });
            match bounds {
                None => out.notices.push(Notice::Info(
                    "no valid years in the sample, year filter disabled".to_string(),
                )),
                Some((lo, hi)) if lo == hi => out.notices.push(Notice::Info(format!(
                    "all sampled papers are from {lo}, year filter disabled"
                ))),
                Some((lo, hi)) => {
                    out.default_year_range = Some((hi.saturating_sub(DEFAULT_YEAR_SPAN).max(lo), hi));
                }
            }
            out.year_bounds = bounds;
        } else {
            out.notices.push(Notice::FieldMissing(YEAR.to_string()));
        }

        if sample.has_field(&sample.source_field) {
            let counter = CategoryCount::<String>::new();
            let acc = counter.build_from_batch(sample.papers.iter().filter_map(|p| p.source.clone()));
            let tally = counter.finish(acc);
            let distinct = tally.len();
            out.sources = tally.top(distinct);
            if out.sources.is_empty() {
                out.notices.push(Notice::Info(
                    "no sources in the sample, source filter disabled".to_string(),
                ));
            }
            out.default_sources = out
                .sources
                .iter()
                .take(DEFAULT_SOURCE_COUNT)
                .map(|(s, _)| s.clone())
                .collect();
        } else {
            out.notices
                .push(Notice::FieldMissing(sample.source_field.clone()));
        }
        out
    }

    /// The filter applied when the user chose nothing.
    pub fn default_filter(&self) -> Filter {
        Filter {
            year_range: self.default_year_range,
            sources: (!self.default_sources.is_empty())
                .then(|| self.default_sources.iter().cloned().collect()),
        }
    }
}

/// Re-derive per-year counts and top sources over filtered records.
///
/// Titles are not tokenized; the summary's `top_tokens` is always empty.
pub fn recompute(papers: &[&Paper], source_field: &str, top_sources: usize) -> AnalysisSummary {
    let fields = AggregateFields {
        year: YEAR.to_string(),
        source: source_field.to_string(),
        title: TITLE.to_string(),
        scalar: TITLE_WORD_COUNT.to_string(),
    };
    let mut aggregator = StreamingAggregator::without_tokens(fields);
    aggregator.fold_papers(papers.iter().copied());
    aggregator.finalize().summarize(top_sources, 0)
}
