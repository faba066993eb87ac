//! Artifact I/O: windowed CSV reading, append-only CSV writing and
//! transparent compression.

pub mod compression;
pub mod csv;

pub use self::csv::{ChunkReader, ExistingOutput, SinkWriter, read_batches};
pub use compression::{Codec, Encoder, auto_detect_reader, auto_detect_writer};
