//! Fluent builder for raw metadata files.

use crate::io::compression::auto_detect_writer;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Columns of the files written by [`MetadataBuilder`], in order.
pub const METADATA_COLUMNS: [&str; 7] = [
    "cord_uid",
    "source",
    "title",
    "abstract",
    "publish_time",
    "journal",
    "pmcid",
];

/// One raw metadata row. Empty strings are written as empty (missing) cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataRow {
    pub cord_uid: String,
    pub source: String,
    pub title: String,
    pub abstract_text: String,
    pub publish_time: String,
    pub journal: String,
    pub pmcid: String,
}

impl MetadataRow {
    fn cells(&self) -> [&str; 7] {
        [
            self.cord_uid.as_str(),
            self.source.as_str(),
            self.title.as_str(),
            self.abstract_text.as_str(),
            self.publish_time.as_str(),
            self.journal.as_str(),
            self.pmcid.as_str(),
        ]
    }
}

/// A fluent builder for raw metadata datasets.
///
/// # Example
///
/// ```
/// use scholarstream::testing::MetadataBuilder;
///
/// let rows = MetadataBuilder::new()
///     .add_paper("A title", "2020-01-01", "PMC")
///     .add_generated(10)
///     .build();
/// assert_eq!(rows.len(), 11);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MetadataBuilder {
    rows: Vec<MetadataRow>,
}

const SOURCES: [&str; 6] = ["PMC", "Medline", "WHO", "Elsevier", "ArXiv", "bioRxiv"];
const WORDS: [&str; 12] = [
    "virus", "cell", "protein", "covid", "respiratory", "of", "in", "clinical", "patients",
    "infection", "immune", "response",
];

impl MetadataBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }

    #[must_use]
    pub fn add_row(mut self, row: MetadataRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Add a titled paper with a generated id, journal and pmcid.
    #[must_use]
    pub fn add_paper(self, title: &str, publish_time: &str, source: &str) -> Self {
        let n = self.rows.len();
        self.add_row(MetadataRow {
            cord_uid: format!("uid{n:05}"),
            source: source.to_string(),
            title: title.to_string(),
            abstract_text: String::new(),
            publish_time: publish_time.to_string(),
            journal: "Journal of Tests".to_string(),
            pmcid: format!("PMC{n}"),
        })
    }

    /// Add a row whose title is missing.
    #[must_use]
    pub fn add_untitled(self, publish_time: &str, source: &str) -> Self {
        self.add_paper("", publish_time, source)
    }

    /// Add `count` deterministic pseudo-random rows.
    ///
    /// Years span 2015..=2022 in several date spellings; every 13th row has no
    /// title and every 17th row an unparseable date.
    #[must_use]
    pub fn add_generated(mut self, count: usize) -> Self {
        let mut seed: u32 = 12345;
        let mut next = move |range: u32| {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (seed / 65536) % range
        };
        for i in 0..count {
            let n = self.rows.len();
            let year = 2015 + next(8);
            let month = 1 + next(12);
            let publish_time = match (i % 17, i % 4) {
                (16, _) => "unknown".to_string(),
                (_, 0) => format!("{year}-{month:02}-{:02}", 1 + next(28)),
                (_, 1) => format!("{year}"),
                (_, 2) => format!("{year}-{month:02}"),
                _ => format!("{year}-{month:02}-01 12:00:00"),
            };
            let words = 1 + next(12) as usize;
            let title = if i % 13 == 12 {
                String::new()
            } else {
                (0..words)
                    .map(|_| WORDS[next(WORDS.len() as u32) as usize])
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            let abstract_text = if i % 3 == 0 {
                String::new()
            } else {
                format!("Abstract of paper {n}.")
            };
            self.rows.push(MetadataRow {
                cord_uid: format!("uid{n:05}"),
                source: SOURCES[next(SOURCES.len() as u32) as usize].to_string(),
                title,
                abstract_text,
                publish_time,
                journal: if i % 2 == 0 { "Lancet".to_string() } else { String::new() },
                pmcid: format!("PMC{}", 1000 + n),
            });
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn build(self) -> Vec<MetadataRow> {
        self.rows
    }

    /// Write the rows under a [`METADATA_COLUMNS`] header to `path`,
    /// compressed when the extension names a codec.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut wtr = csv::Writer::from_writer(auto_detect_writer(file, path)?);
        wtr.write_record(METADATA_COLUMNS)?;
        for row in &self.rows {
            wtr.write_record(row.cells())?;
        }
        wtr.flush()?;
        wtr.into_inner()
            .map_err(|e| e.into_error())?
            .finish()
            .with_context(|| format!("finish {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}
