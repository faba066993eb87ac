//! Windowed CSV reading and append-only CSV writing.
//!
//! This module provides:
//! - **Chunk reader**: [`ChunkReader`] / [`read_batches`] yield the rows of a
//!   CSV file as consecutive [`Batch`]es of at most `window_size` rows, lazily,
//!   so at most one window is resident at a time.
//! - **Sink writer**: [`SinkWriter`] appends cleaned batches to an artifact,
//!   writing the header once, with the first non-empty batch.
//!
//! # Design notes
//! - Windows are **row-count based** (header excluded), not byte-range based.
//! - Batches partition the file: no overlap, no gap, file order.
//! - A reader is single-pass. Reading the file again means opening it again.

use crate::clean::CleanBatch;
use crate::error::{PipelineError, in_batch};
use crate::io::compression::{Encoder, auto_detect_reader, auto_detect_writer};
use crate::record::{Batch, Schema};
use anyhow::{Context, Result};
use csv::{StringRecord, WriterBuilder};
use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{ErrorKind, Read};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lazy, single-pass sequence of row windows over a CSV file.
///
/// Construct with [`ChunkReader::open`]. Iterating yields `Result<Batch>`; a
/// malformed row aborts the sequence with a [`PipelineError::Unexpected`]
/// carrying the failing batch index.
pub struct ChunkReader {
    path: PathBuf,
    reader: csv::Reader<Box<dyn Read>>,
    schema: Arc<Schema>,
    window_size: usize,
    /// Row read ahead of time, either while probing for emptiness or as the
    /// first row of the next window.
    pending: Option<StringRecord>,
    next_index: usize,
    rows_read: u64,
    finished: bool,
}

impl ChunkReader {
    /// Open `path` for windowed reading.
    ///
    /// # Errors
    /// - [`PipelineError::NotFound`] if the file does not exist.
    /// - [`PipelineError::Empty`] if it has no header or no data row.
    /// - I/O or CSV errors while reading the header or the first row.
    pub fn open(path: impl AsRef<Path>, window_size: NonZeroUsize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PipelineError::NotFound { path }.into());
            }
            Err(e) => return Err(e).with_context(|| format!("open {}", path.display())),
        };
        let rdr = auto_detect_reader(file, &path)
            .with_context(|| format!("setup decompression for {}", path.display()))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(rdr);

        let headers = reader
            .headers()
            .with_context(|| format!("read header of {}", path.display()))?;
        let schema = Schema::from_headers(headers);
        if schema.is_empty() || schema.names().iter().all(String::is_empty) {
            return Err(PipelineError::Empty { path }.into());
        }

        let mut first = StringRecord::new();
        let has_row = reader
            .read_record(&mut first)
            .with_context(|| format!("parse CSV record #1 of {}", path.display()))
            .map_err(in_batch(1))?;
        if !has_row {
            return Err(PipelineError::Empty { path }.into());
        }

        Ok(Self {
            path,
            reader,
            schema: Arc::new(schema),
            window_size: window_size.get(),
            pending: Some(first),
            next_index: 1,
            rows_read: 0,
            finished: false,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    fn next_row(&mut self, batch: usize) -> Result<Option<StringRecord>> {
        if let Some(row) = self.pending.take() {
            return Ok(Some(row));
        }
        let mut row = StringRecord::new();
        let more = self
            .reader
            .read_record(&mut row)
            .with_context(|| {
                format!(
                    "parse CSV record #{} of {}",
                    self.rows_read + 1,
                    self.path.display()
                )
            })
            .map_err(in_batch(batch))?;
        Ok(more.then_some(row))
    }

    fn read_window(&mut self) -> Result<Option<Batch>> {
        let index = self.next_index;
        let Some(first) = self.next_row(index)? else {
            return Ok(None);
        };

        let mut rows: Vec<StringRecord> = Vec::new();
        rows.try_reserve_exact(self.window_size)
            .map_err(|source| PipelineError::ResourceExhaustion {
                window_size: self.window_size,
                source,
            })?;
        rows.push(first);
        self.rows_read += 1;
        while rows.len() < self.window_size {
            match self.next_row(index)? {
                Some(row) => {
                    rows.push(row);
                    self.rows_read += 1;
                }
                None => break,
            }
        }

        self.next_index += 1;
        Ok(Some(Batch {
            index,
            schema: Arc::clone(&self.schema),
            rows,
        }))
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_window() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Open `path` and read it in windows of `window_size` rows.
///
/// Shorthand for [`ChunkReader::open`].
pub fn read_batches(path: impl AsRef<Path>, window_size: NonZeroUsize) -> Result<ChunkReader> {
    ChunkReader::open(path, window_size)
}

/// What to do when the sink's destination already exists.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExistingOutput {
    /// Refuse to start; stale rows would otherwise be duplicated.
    #[default]
    Fail,
    /// Truncate the previous artifact before writing.
    Overwrite,
}

/// Append-only CSV sink for cleaned batches.
///
/// The destination is created (or truncated) when the sink is created, so a
/// run always starts from a cleared artifact. The header is written together
/// with the first non-empty batch; empty batches are no-ops.
pub struct SinkWriter {
    path: PathBuf,
    writer: csv::Writer<Encoder>,
    header_written: bool,
    rows_written: u64,
}

impl SinkWriter {
    /// Create the artifact at `path`, creating parent directories as needed.
    ///
    /// **Compression**: picked from the extension (e.g. `.csv.gz`).
    ///
    /// # Errors
    /// [`PipelineError::OutputExists`] if `path` exists and `existing` is
    /// [`ExistingOutput::Fail`]; I/O errors otherwise.
    pub fn create(path: impl AsRef<Path>, existing: ExistingOutput) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let opened = match existing {
            ExistingOutput::Fail => OpenOptions::new().write(true).create_new(true).open(&path),
            ExistingOutput::Overwrite => File::create(&path),
        };
        let f = match opened {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PipelineError::OutputExists { path }.into());
            }
            Err(e) => return Err(e).with_context(|| format!("create {}", path.display())),
        };
        let w = auto_detect_writer(f, &path)
            .with_context(|| format!("setup compression for {}", path.display()))?;
        let writer = WriterBuilder::new().has_headers(false).from_writer(w);
        Ok(Self {
            path,
            writer,
            header_written: false,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    /// Append one cleaned batch. Returns the number of rows written.
    ///
    /// # Errors
    /// Returns an error if a row fails to serialize or the write fails.
    pub fn write(&mut self, batch: &CleanBatch) -> Result<usize> {
        if batch.records.is_empty() {
            return Ok(0);
        }
        let layout = batch.layout();
        if !self.header_written {
            self.writer
                .write_record(layout.header())
                .with_context(|| format!("write header to {}", self.path.display()))?;
            self.header_written = true;
        }
        for (i, record) in batch.records.iter().enumerate() {
            let cells = layout.cells(record);
            self.writer
                .write_record(cells.iter().map(|c| c.as_bytes()))
                .with_context(|| format!("serialize CSV row #{} of batch {}", i + 1, batch.index))?;
        }
        self.rows_written += batch.records.len() as u64;
        Ok(batch.records.len())
    }

    /// Flush buffered rows and close the artifact.
    ///
    /// Compressed artifacts get their trailer here; a failure to write it is
    /// reported rather than dropped.
    pub fn finish(mut self) -> Result<u64> {
        self.writer
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        let encoder = self
            .writer
            .into_inner()
            .map_err(|e| e.into_error())
            .with_context(|| format!("flush {}", self.path.display()))?;
        encoder
            .finish()
            .with_context(|| format!("finish {}", self.path.display()))?;
        Ok(self.rows_written)
    }
}
