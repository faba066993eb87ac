//! Record cleaning: a pure, per-batch transform.
//!
//! For each batch, in order:
//! 1. drop rows whose `title` is missing or empty (counted); a title of
//!    only whitespace is kept and counts zero words,
//! 2. default a missing `abstract` to the empty string,
//! 3. parse `publish_time`; unparseable values become missing (counted),
//! 4. derive `year` from the parsed date,
//! 5. derive `title_word_count` as the number of whitespace-separated tokens,
//! 6. drop the configured low-value columns that this input happens to have.
//!
//! Cleaning keeps no state between batches: the same rows give the same
//! output whatever window they arrive in.

use crate::record::{ABSTRACT, Batch, PUBLISH_TIME, Schema, TITLE, TITLE_WORD_COUNT, YEAR, cell};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use std::sync::Arc;

/// Where an output cell comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum OutputColumn {
    Title,
    Abstract,
    PublishTime,
    /// Index into [`CleanRecord::passthrough`].
    Passthrough(usize),
    Year,
    TitleWordCount,
}

/// Column layout of the cleaned artifact, derived once from the input schema.
///
/// Input columns keep their order, minus the dropped ones; `year` and
/// `title_word_count` are appended (replacing same-named input columns).
#[derive(Clone, Debug)]
pub struct CleanLayout {
    header: Vec<String>,
    columns: Vec<OutputColumn>,
    title: Option<usize>,
    abstract_text: Option<usize>,
    publish_time: Option<usize>,
    /// Input positions of the passthrough columns, in output order.
    passthrough: Vec<usize>,
    dropped: Vec<String>,
}

impl CleanLayout {
    pub fn new(schema: &Schema, drop_columns: &[String]) -> Self {
        let mut layout = CleanLayout {
            header: Vec::with_capacity(schema.len() + 2),
            columns: Vec::with_capacity(schema.len() + 2),
            title: None,
            abstract_text: None,
            publish_time: None,
            passthrough: Vec::new(),
            dropped: Vec::new(),
        };
        for (idx, name) in schema.names().iter().enumerate() {
            if drop_columns.iter().any(|d| d == name) {
                layout.dropped.push(name.clone());
                continue;
            }
            let column = match name.as_str() {
                // Derived columns are recomputed, never passed through.
                YEAR | TITLE_WORD_COUNT => continue,
                TITLE if layout.title.is_none() => {
                    layout.title = Some(idx);
                    OutputColumn::Title
                }
                ABSTRACT if layout.abstract_text.is_none() => {
                    layout.abstract_text = Some(idx);
                    OutputColumn::Abstract
                }
                PUBLISH_TIME if layout.publish_time.is_none() => {
                    layout.publish_time = Some(idx);
                    OutputColumn::PublishTime
                }
                _ => {
                    layout.passthrough.push(idx);
                    OutputColumn::Passthrough(layout.passthrough.len() - 1)
                }
            };
            layout.header.push(name.clone());
            layout.columns.push(column);
        }
        layout.header.push(YEAR.to_string());
        layout.columns.push(OutputColumn::Year);
        layout.header.push(TITLE_WORD_COUNT.to_string());
        layout.columns.push(OutputColumn::TitleWordCount);
        layout
    }

    /// Field names of the cleaned artifact.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Configured columns that were actually present and dropped.
    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped
    }

    /// Truth that the input has a title column at all.
    pub fn has_title(&self) -> bool {
        self.title.is_some()
    }

    /// Output cells of `record`, in header order.
    pub fn cells<'a>(&self, record: &'a CleanRecord) -> Vec<Cow<'a, str>> {
        self.columns
            .iter()
            .map(|column| match *column {
                OutputColumn::Title => Cow::Borrowed(record.title.as_str()),
                OutputColumn::Abstract => Cow::Borrowed(record.abstract_text.as_str()),
                OutputColumn::PublishTime => match record.publish_time {
                    Some(date) => Cow::Owned(date.format("%Y-%m-%d").to_string()),
                    None => Cow::Borrowed(""),
                },
                OutputColumn::Passthrough(i) => Cow::Borrowed(record.passthrough[i].as_str()),
                OutputColumn::Year => match record.year {
                    Some(year) => Cow::Owned(year.to_string()),
                    None => Cow::Borrowed(""),
                },
                OutputColumn::TitleWordCount => Cow::Owned(record.title_word_count.to_string()),
            })
            .collect()
    }
}

/// A row that survived cleaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanRecord {
    pub title: String,
    pub abstract_text: String,
    pub publish_time: Option<NaiveDate>,
    pub year: Option<i32>,
    pub title_word_count: u32,
    /// Untouched cells, in [`CleanLayout`] passthrough order.
    pub passthrough: Vec<String>,
}

/// Output of [`Cleaner::clean`] for one batch.
#[derive(Clone, Debug)]
pub struct CleanBatch {
    pub index: usize,
    pub records: Vec<CleanRecord>,
    /// Rows removed because their title was missing or empty.
    pub dropped_rows: usize,
    /// Non-empty `publish_time` values that could not be parsed.
    pub date_failures: usize,
    layout: Arc<CleanLayout>,
}

impl CleanBatch {
    pub fn layout(&self) -> &CleanLayout {
        &self.layout
    }
}

/// Stateless batch cleaner bound to one input layout.
#[derive(Clone, Debug)]
pub struct Cleaner {
    layout: Arc<CleanLayout>,
}

impl Cleaner {
    pub fn new(schema: &Schema, drop_columns: &[String]) -> Self {
        Self {
            layout: Arc::new(CleanLayout::new(schema, drop_columns)),
        }
    }

    pub fn layout(&self) -> &Arc<CleanLayout> {
        &self.layout
    }

    /// Clean one batch. Row order is preserved; only rows without a title
    /// are removed.
    pub fn clean(&self, batch: Batch) -> CleanBatch {
        let layout = &self.layout;
        let mut records = Vec::with_capacity(batch.rows.len());
        let mut dropped_rows = 0;
        let mut date_failures = 0;

        for row in &batch.rows {
            let Some(title) = cell(row, layout.title) else {
                dropped_rows += 1;
                continue;
            };
            let publish_time = cell(row, layout.publish_time).and_then(|raw| {
                let parsed = parse_publish_time(raw);
                if parsed.is_none() {
                    date_failures += 1;
                }
                parsed
            });
            records.push(CleanRecord {
                title: title.to_string(),
                abstract_text: cell(row, layout.abstract_text).unwrap_or_default().to_string(),
                year: publish_time.map(|d| d.year()),
                publish_time,
                title_word_count: title_word_count(title),
                passthrough: layout
                    .passthrough
                    .iter()
                    .map(|&i| row.get(i).unwrap_or_default().to_string())
                    .collect(),
            });
        }

        log::debug!(
            "batch {}: dropped {} rows without title, {} unparseable dates",
            batch.index,
            dropped_rows,
            date_failures
        );
        CleanBatch {
            index: batch.index,
            records,
            dropped_rows,
            date_failures,
            layout: Arc::clone(layout),
        }
    }
}

/// Number of whitespace-separated tokens in `title`.
pub fn title_word_count(title: &str) -> u32 {
    u32::try_from(title.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Parse a publication date the way metadata dumps spell it.
///
/// Accepts `2020-03-15`, `2020-03-15 10:00:00`, RFC 3339 timestamps,
/// `2020/03/15`, `2020-03`, `2020 Mar 15`, `2020 Mar` and a bare `2020`.
/// Partial dates resolve to the first day of the period.
pub fn parse_publish_time(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y %b %d"];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // Month precision: complete with the first day.
    for fmt in ["%Y-%m-%d", "%Y %b %d"] {
        let padded = if fmt.contains('-') {
            format!("{raw}-01")
        } else {
            format!("{raw} 01")
        };
        if let Ok(d) = NaiveDate::parse_from_str(&padded, fmt) {
            return Some(d);
        }
    }
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = raw.parse().ok()?;
        if year >= 1000 {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_date_shapes() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert_eq!(parse_publish_time("2020-03-15"), d(2020, 3, 15));
        assert_eq!(parse_publish_time(" 2020-03-15 "), d(2020, 3, 15));
        assert_eq!(parse_publish_time("2020-03-15 08:30:00"), d(2020, 3, 15));
        assert_eq!(parse_publish_time("2020-03-15T08:30:00Z"), d(2020, 3, 15));
        assert_eq!(parse_publish_time("2020/03/15"), d(2020, 3, 15));
        assert_eq!(parse_publish_time("2020-03"), d(2020, 3, 1));
        assert_eq!(parse_publish_time("2020 Mar 15"), d(2020, 3, 15));
        assert_eq!(parse_publish_time("2020 Mar"), d(2020, 3, 1));
        assert_eq!(parse_publish_time("2020"), d(2020, 1, 1));
    }

    #[test]
    fn rejects_garbage_dates() {
        for raw in ["", "   ", "unknown", "2020-13-01", "0999", "20", "March"] {
            assert_eq!(parse_publish_time(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(title_word_count("one"), 1);
        assert_eq!(title_word_count("  two\twords "), 2);
        assert_eq!(title_word_count("a b\nc  d"), 4);
        assert_eq!(title_word_count(""), 0);
    }

    #[test]
    fn layout_drops_configured_columns_and_appends_derived_ones() {
        let schema = Schema::new(["cord_uid", "title", "journal", "abstract", "year"]);
        let layout = CleanLayout::new(&schema, &["journal".to_string(), "pmcid".to_string()]);
        assert_eq!(
            layout.header(),
            ["cord_uid", "title", "abstract", "year", "title_word_count"]
        );
        assert_eq!(layout.dropped_columns(), ["journal"]);
    }
}
