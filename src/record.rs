//! Record schema: column names, raw batches, and the typed paper view.
//!
//! The input is an untyped CSV whose columns are looked up by name. That
//! lookup happens once per file ([`PaperFields::resolve`]); after it every
//! component works with [`Paper`], whose optional fields say exactly what may
//! be missing.

use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column holding the paper title. Rows without it are dropped by cleaning.
pub const TITLE: &str = "title";
/// Free-text abstract, filled with the empty string when missing.
pub const ABSTRACT: &str = "abstract";
/// Date-like publication time.
pub const PUBLISH_TIME: &str = "publish_time";
/// Derived publication year.
pub const YEAR: &str = "year";
/// Derived whitespace-token count of the title.
pub const TITLE_WORD_COUNT: &str = "title_word_count";
/// Default categorical source column.
pub const SOURCE: &str = "source";

/// Ordered column names of a CSV artifact.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Schema {
    names: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_headers(headers: &StringRecord) -> Self {
        Self::new(headers.iter().map(|h| h.trim().to_string()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of the first column called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// A window of raw rows, in file order.
#[derive(Clone, Debug)]
pub struct Batch {
    /// 1-based position of this window in the input.
    pub index: usize,
    pub schema: Arc<Schema>,
    pub rows: Vec<StringRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Value of column `idx` in `row`, or `None` when the column is absent or the
/// cell is empty. Empty cells are how CSV spells "missing".
pub fn cell(row: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| row.get(i)).filter(|v| !v.is_empty())
}

/// One paper as seen by analysis, sampling and the view layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub publish_time: Option<NaiveDate>,
    pub year: Option<i32>,
    pub source: Option<String>,
    pub title_word_count: Option<u32>,
}

/// Column positions of the fields [`Paper`] needs, resolved once per schema.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaperFields {
    pub title: Option<usize>,
    pub abstract_text: Option<usize>,
    pub publish_time: Option<usize>,
    pub year: Option<usize>,
    pub source: Option<usize>,
    pub title_word_count: Option<usize>,
    source_name: String,
}

/// Per-row soft parse failures noticed while building a [`Paper`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ParseFailures {
    pub dates: u64,
    pub numbers: u64,
}

impl ParseFailures {
    pub fn add(&mut self, other: ParseFailures) {
        self.dates += other.dates;
        self.numbers += other.numbers;
    }
}

impl PaperFields {
    pub fn resolve(schema: &Schema, source_field: &str) -> Self {
        Self {
            title: schema.position(TITLE),
            abstract_text: schema.position(ABSTRACT),
            publish_time: schema.position(PUBLISH_TIME),
            year: schema.position(YEAR),
            source: schema.position(source_field),
            title_word_count: schema.position(TITLE_WORD_COUNT),
            source_name: source_field.to_string(),
        }
    }

    /// Name of the categorical source column these fields were resolved for.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Names of the expected columns that the schema lacks.
    pub fn missing(&self) -> Vec<String> {
        [
            (self.title, TITLE),
            (self.year, YEAR),
            (self.source, self.source_name.as_str()),
            (self.title_word_count, TITLE_WORD_COUNT),
        ]
        .into_iter()
        .filter(|(idx, _)| idx.is_none())
        .map(|(_, name)| name.to_string())
        .collect()
    }

    /// Build the typed view of one row of a cleaned artifact.
    ///
    /// Unparseable numbers and dates become `None` and are counted in the
    /// returned [`ParseFailures`].
    pub fn paper(&self, row: &StringRecord) -> (Paper, ParseFailures) {
        let mut failures = ParseFailures::default();
        let publish_time = cell(row, self.publish_time).and_then(|raw| {
            let parsed = crate::clean::parse_publish_time(raw);
            if parsed.is_none() {
                failures.dates += 1;
            }
            parsed
        });
        let year = cell(row, self.year).and_then(|raw| {
            let parsed = parse_integer(raw).and_then(|y| i32::try_from(y).ok());
            if parsed.is_none() {
                failures.numbers += 1;
            }
            parsed
        });
        let title_word_count = cell(row, self.title_word_count).and_then(|raw| {
            let parsed = parse_integer(raw).and_then(|c| u32::try_from(c).ok());
            if parsed.is_none() {
                failures.numbers += 1;
            }
            parsed
        });
        let paper = Paper {
            title: cell(row, self.title).unwrap_or_default().to_string(),
            abstract_text: cell(row, self.abstract_text).unwrap_or_default().to_string(),
            publish_time,
            year,
            source: cell(row, self.source).map(str::to_string),
            title_word_count,
        };
        (paper, failures)
    }
}

/// Parse an integer cell, tolerating a float spelling with a zero fraction
/// (`"2020.0"`), which spreadsheet round-trips tend to produce.
pub fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15).then_some(f as i64)
}
