//! Canned datasets and cleaned-artifact writers.

use crate::io::compression::auto_detect_reader;
use crate::record::{SOURCE, TITLE, TITLE_WORD_COUNT, YEAR};
use crate::render::{Chart, Renderer};
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Columns of the files written by [`write_cleaned_csv`].
pub const CLEANED_COLUMNS: [&str; 6] = [TITLE, "abstract", "publish_time", SOURCE, YEAR, TITLE_WORD_COUNT];

/// The two titles of the classic token-frequency example.
#[must_use]
pub fn cats_and_dogs_titles() -> Vec<String> {
    vec!["Cats And Dogs".to_string(), "dogs are cats".to_string()]
}

/// Write a cleaned-shaped artifact from `(title, year, source)` triples.
///
/// `publish_time` is January 1st of the year and `title_word_count` is
/// derived from the title, as the cleaner would.
pub fn write_cleaned_csv(
    path: impl AsRef<Path>,
    rows: &[(&str, Option<i32>, Option<&str>)],
) -> Result<PathBuf> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(CLEANED_COLUMNS)?;
    for (title, year, source) in rows {
        let year_cell = year.map(|y| y.to_string()).unwrap_or_default();
        let date = year.map(|y| format!("{y}-01-01")).unwrap_or_default();
        let words = crate::clean::title_word_count(title).to_string();
        wtr.write_record([*title, "", date.as_str(), source.unwrap_or(""), year_cell.as_str(), words.as_str()])?;
    }
    wtr.flush()?;
    Ok(path.to_path_buf())
}

/// Read a (possibly compressed) artifact fully into a string.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = String::new();
    auto_detect_reader(file, path)?.read_to_string(&mut out)?;
    Ok(out)
}

/// A [`Renderer`] that writes each chart's title as a text file and
/// remembers what it drew.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    titles: RefCell<Vec<String>>,
}

impl RecordingRenderer {
    /// Titles of the charts drawn so far, in order.
    pub fn titles(&self) -> Vec<String> {
        self.titles.borrow().clone()
    }
}

impl Renderer for RecordingRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, chart: &Chart<'_>, path: &Path) -> Result<()> {
        self.titles.borrow_mut().push(chart.title().to_string());
        std::fs::write(path, chart.title()).with_context(|| format!("write {}", path.display()))
    }
}
