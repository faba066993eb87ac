//! Transparent compression for input and output artifacts.
//!
//! Large metadata dumps are often shipped compressed. Readers detect the codec
//! from the file extension first and fall back to the magic bytes at the start
//! of the stream; writers pick the codec from the extension only and must be
//! closed with [`Encoder::finish`].
//!
//! Built-in codecs, each behind its own feature flag:
//! - **Gzip** (`.gz`) - `compression-gzip`
//! - **Zstd** (`.zst`) - `compression-zstd`
//! - **Bzip2** (`.bz2`) - `compression-bzip2`
//! - **Xz** (`.xz`) - `compression-xz`
//!
//! With no codec feature enabled both entry points are buffered pass-throughs.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A compression format known to the artifact readers and writers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Codec {
    Gzip,
    Zstd,
    Bzip2,
    Xz,
}

impl Codec {
    /// Codecs compiled into this build, in detection order.
    pub fn enabled() -> &'static [Codec] {
        &[
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip,
            #[cfg(feature = "compression-zstd")]
            Codec::Zstd,
            #[cfg(feature = "compression-bzip2")]
            Codec::Bzip2,
            #[cfg(feature = "compression-xz")]
            Codec::Xz,
        ]
    }

    /// Human-readable codec name.
    pub fn name(self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Zstd => "zstd",
            Codec::Bzip2 => "bzip2",
            Codec::Xz => "xz",
        }
    }

    /// Lowercase file extensions, leading dot included.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Codec::Gzip => &[".gz", ".gzip"],
            Codec::Zstd => &[".zst", ".zstd"],
            Codec::Bzip2 => &[".bz2", ".bzip2"],
            Codec::Xz => &[".xz"],
        }
    }

    /// Stream signature.
    pub fn magic_bytes(self) -> &'static [u8] {
        match self {
            Codec::Gzip => &[0x1f, 0x8b],
            Codec::Zstd => &[0x28, 0xb5, 0x2f, 0xfd],
            Codec::Bzip2 => b"BZh",
            Codec::Xz => &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00],
        }
    }

    /// Detect an enabled codec from a path's extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Option<Codec> {
        let lowered = path.as_ref().to_string_lossy().to_lowercase();
        Codec::enabled()
            .iter()
            .copied()
            .find(|codec| codec.extensions().iter().any(|ext| lowered.ends_with(ext)))
    }

    /// Detect an enabled codec from the start of a buffered stream without
    /// consuming anything.
    fn from_magic<R: BufRead>(reader: &mut R) -> Option<Codec> {
        let head = reader.fill_buf().ok()?;
        Codec::enabled()
            .iter()
            .copied()
            .find(|codec| head.starts_with(codec.magic_bytes()))
    }

    #[allow(unused_variables, unreachable_code)]
    fn wrap_reader(self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        Ok(match self {
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            #[cfg(feature = "compression-zstd")]
            Codec::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
            #[cfg(feature = "compression-bzip2")]
            Codec::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            #[cfg(feature = "compression-xz")]
            Codec::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            #[allow(unreachable_patterns)]
            other => return Err(disabled(other)),
        })
    }

    #[allow(unused_variables, unreachable_code)]
    fn wrap_writer(self, writer: Box<dyn Write>) -> std::io::Result<Encoder> {
        Ok(match self {
            #[cfg(feature = "compression-gzip")]
            Codec::Gzip => Encoder::Gzip(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            )),
            #[cfg(feature = "compression-zstd")]
            Codec::Zstd => Encoder::Zstd(zstd::stream::write::Encoder::new(writer, 3)?),
            #[cfg(feature = "compression-bzip2")]
            Codec::Bzip2 => Encoder::Bzip2(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::default(),
            )),
            #[cfg(feature = "compression-xz")]
            Codec::Xz => Encoder::Xz(xz2::write::XzEncoder::new(writer, 6)),
            #[allow(unreachable_patterns)]
            other => return Err(disabled(other)),
        })
    }
}

/// Output stream of [`auto_detect_writer`].
///
/// Compressed streams end with a trailer that is only written by
/// [`Encoder::finish`]. Dropping an unfinished encoder loses any error raised
/// while writing it, so callers must finish explicitly.
pub enum Encoder {
    Plain(Box<dyn Write>),
    #[cfg(feature = "compression-gzip")]
    Gzip(flate2::write::GzEncoder<Box<dyn Write>>),
    #[cfg(feature = "compression-zstd")]
    Zstd(zstd::stream::write::Encoder<'static, Box<dyn Write>>),
    #[cfg(feature = "compression-bzip2")]
    Bzip2(bzip2::write::BzEncoder<Box<dyn Write>>),
    #[cfg(feature = "compression-xz")]
    Xz(xz2::write::XzEncoder<Box<dyn Write>>),
}

impl Encoder {
    fn inner(&mut self) -> &mut dyn Write {
        match self {
            Encoder::Plain(w) => w,
            #[cfg(feature = "compression-gzip")]
            Encoder::Gzip(w) => w,
            #[cfg(feature = "compression-zstd")]
            Encoder::Zstd(w) => w,
            #[cfg(feature = "compression-bzip2")]
            Encoder::Bzip2(w) => w,
            #[cfg(feature = "compression-xz")]
            Encoder::Xz(w) => w,
        }
    }

    /// Write the codec trailer and flush everything down to the file.
    pub fn finish(self) -> std::io::Result<()> {
        let mut sink = match self {
            Encoder::Plain(w) => w,
            #[cfg(feature = "compression-gzip")]
            Encoder::Gzip(w) => w.finish()?,
            #[cfg(feature = "compression-zstd")]
            Encoder::Zstd(w) => w.finish()?,
            #[cfg(feature = "compression-bzip2")]
            Encoder::Bzip2(w) => w.finish()?,
            #[cfg(feature = "compression-xz")]
            Encoder::Xz(w) => w.finish()?,
        };
        sink.flush()
    }
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner().flush()
    }
}

#[allow(dead_code)]
fn disabled(codec: Codec) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("{} support is not compiled in", codec.name()),
    )
}

/// Wrap `reader` with decompression when the path or the content calls for it.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> Result<Box<dyn Read>> {
    if let Some(codec) = Codec::from_path(&path_hint) {
        return codec
            .wrap_reader(Box::new(BufReader::new(reader)))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }

    let mut buffered = BufReader::new(reader);
    if let Some(codec) = Codec::from_magic(&mut buffered) {
        return codec
            .wrap_reader(Box::new(buffered))
            .with_context(|| format!("wrap reader with {} codec", codec.name()));
    }
    Ok(Box::new(buffered))
}

/// Wrap `writer` with compression when the path's extension names a codec.
///
/// The returned [`Encoder`] must be [finished](Encoder::finish).
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> Result<Encoder> {
    let buffered: Box<dyn Write> = Box::new(BufWriter::new(writer));
    match Codec::from_path(&path_hint) {
        Some(codec) => codec
            .wrap_writer(buffered)
            .with_context(|| format!("wrap writer with {} codec", codec.name())),
        None => Ok(Encoder::Plain(buffered)),
    }
}
