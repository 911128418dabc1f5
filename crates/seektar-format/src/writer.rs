//! Seekable archive writer
//!
//! Every entry is written as three independent gzip members (header, payload,
//! padding), so a payload can be pulled out of the finished file by byte
//! range alone. `close` appends the tar terminator as a final member; since
//! gzip members concatenate, the result is an ordinary `.tar.gz`.
//!
//! # Example
//!
//! ```rust
//! use seektar_format::{ArchiveReader, ArchiveWriter, extract_entry};
//!
//! # fn example() -> Result<(), seektar_format::ArchiveError> {
//! let mut writer = ArchiveWriter::new(Vec::new());
//! let foo = writer.append("foo", b"foo2")?;
//! let bar = writer.append("bar", b"bar2")?;
//! let (archive, _index) = writer.finish()?;
//!
//! assert_eq!(foo.start, 0);
//! assert_eq!(bar.start, foo.end);
//! assert_eq!(extract_entry(&archive, &bar)?, b"bar2");
//!
//! let names: Vec<String> = ArchiveReader::new(&archive)
//!     .entries()
//!     .map(|entry| entry.map(|e| e.filename))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(names, ["foo", "bar"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::codec::{GzipCodec, StreamCodec};
use crate::descriptor::OffsetDescriptor;
use crate::error::{ArchiveError, ArchiveResult};
use crate::index::ArchiveIndex;
use crate::tar::{StructuralCodec, TarCodec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Open,
    Closed,
    Failed,
}

/// Counts bytes passed through to the sink
struct CountingWriter<'a, W: Write + ?Sized> {
    inner: &'a mut W,
    written: u64,
}

impl<W: Write + ?Sized> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writer for seekable `.tar.gz` archives
pub struct ArchiveWriter<W: Write, C: StreamCodec = GzipCodec, S: StructuralCodec = TarCodec> {
    /// Output sink; taken by `finish`
    writer: Option<W>,
    codec: C,
    structure: S,
    /// Compressed bytes written so far
    position: u64,
    /// Descriptors of appended entries, also the duplicate-name check
    index: ArchiveIndex,
    state: WriterState,
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a writer with the default gzip and tar codecs
    pub fn new(writer: W) -> Self {
        Self::with_codecs(writer, GzipCodec::default(), TarCodec::new())
    }

    /// Create a writer with a specific gzip compression level
    pub fn with_level(writer: W, level: u32) -> Self {
        Self::with_codecs(writer, GzipCodec::new(level), TarCodec::new())
    }
}

impl ArchiveWriter<BufWriter<File>> {
    /// Create a writer for a new file at `path`
    pub fn create<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write, C: StreamCodec, S: StructuralCodec> ArchiveWriter<W, C, S> {
    /// Create a writer with explicit codecs
    pub fn with_codecs(writer: W, codec: C, structure: S) -> Self {
        Self {
            writer: Some(writer),
            codec,
            structure,
            position: 0,
            index: ArchiveIndex::new(),
            state: WriterState::Open,
        }
    }

    fn ensure_open(&self) -> ArchiveResult<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Closed => Err(ArchiveError::WriterClosed),
            WriterState::Failed => Err(ArchiveError::WriterFailed),
        }
    }

    /// Compress `source` as one segment, returning uncompressed bytes consumed
    fn write_segment<R: Read + ?Sized>(&mut self, source: &mut R) -> ArchiveResult<u64> {
        let sink = self.writer.as_mut().ok_or(ArchiveError::WriterClosed)?;
        let mut counter = CountingWriter {
            inner: sink,
            written: 0,
        };
        let consumed = self.codec.write_segment(source, &mut counter)?;
        self.position += counter.written;
        Ok(consumed)
    }

    /// Append an entry and return the offsets of its three segments
    ///
    /// Fails with [`ArchiveError::DuplicateEntry`] before writing anything if
    /// `name` was already appended.
    pub fn append(&mut self, name: &str, data: &[u8]) -> ArchiveResult<OffsetDescriptor> {
        let mut source = data;
        self.append_reader(name, data.len() as u64, &mut source)
    }

    /// Append an entry whose payload is streamed from `reader`
    ///
    /// Exactly `size` bytes are consumed; a shorter source fails with
    /// [`ArchiveError::SizeMismatch`] and leaves the writer unusable.
    pub fn append_reader<R: Read + ?Sized>(
        &mut self,
        name: &str,
        size: u64,
        reader: &mut R,
    ) -> ArchiveResult<OffsetDescriptor> {
        self.ensure_open()?;
        if self.index.contains(name) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        let header = self.structure.encode_header(name, size)?;

        match self.write_entry(&header, size, reader) {
            Ok(descriptor) => {
                self.index.insert(name, descriptor)?;
                debug!(
                    "Appended {} ({} bytes) at {}..{}",
                    name, size, descriptor.start, descriptor.end
                );
                Ok(descriptor)
            }
            Err(e) => {
                self.state = WriterState::Failed;
                Err(e)
            }
        }
    }

    fn write_entry<R: Read + ?Sized>(
        &mut self,
        header: &[u8],
        size: u64,
        reader: &mut R,
    ) -> ArchiveResult<OffsetDescriptor> {
        let start = self.position;
        self.write_segment(&mut &header[..])?;

        let data_start = self.position;
        let consumed = self.write_segment(&mut reader.take(size))?;
        if consumed != size {
            return Err(ArchiveError::SizeMismatch {
                expected: size,
                actual: consumed,
            });
        }

        let padding_start = self.position;
        let padding = self.structure.padding_len(size);
        self.write_segment(&mut io::repeat(0).take(padding))?;

        OffsetDescriptor::new(start, data_start, padding_start, self.position)
    }

    /// Write the end-of-archive marker and flush the sink
    ///
    /// Returns the total archive length. Further `append` or `close` calls
    /// fail with [`ArchiveError::WriterClosed`].
    pub fn close(&mut self) -> ArchiveResult<u64> {
        self.ensure_open()?;

        let result = self.write_terminator();
        match result {
            Ok(()) => {
                self.state = WriterState::Closed;
                self.index.set_archive_len(self.position);
                debug!(
                    "Closed archive: {} entries, {} bytes",
                    self.index.len(),
                    self.position
                );
                Ok(self.position)
            }
            Err(e) => {
                self.state = WriterState::Failed;
                Err(e)
            }
        }
    }

    fn write_terminator(&mut self) -> ArchiveResult<()> {
        let terminator = self.structure.terminator();
        self.write_segment(&mut &terminator[..])?;
        if let Some(sink) = self.writer.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Close the archive if still open and return the sink and entry index
    pub fn finish(mut self) -> ArchiveResult<(W, ArchiveIndex)> {
        match self.state {
            WriterState::Open => {
                self.close()?;
            }
            WriterState::Closed => {}
            WriterState::Failed => return Err(ArchiveError::WriterFailed),
        }

        let writer = self.writer.take().ok_or(ArchiveError::WriterClosed)?;
        let index = std::mem::take(&mut self.index);
        Ok((writer, index))
    }

    /// Compressed bytes written so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Descriptors of the entries appended so far
    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Number of entries appended
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no entry was appended
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `close` has completed
    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// Borrow the underlying sink
    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }
}

impl<W: Write, C: StreamCodec, S: StructuralCodec> Drop for ArchiveWriter<W, C, S> {
    fn drop(&mut self) {
        if self.state == WriterState::Open && self.writer.is_some() {
            warn!(
                "Archive writer dropped without close after {} entries; output has no end-of-archive marker",
                self.index.len()
            );
        }
    }
}
