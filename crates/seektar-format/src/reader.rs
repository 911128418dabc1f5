//! Sequential archive reader
//!
//! Reads a seekable archive front to back as one continuous compressed
//! stream, the same way `tar -xzf` would. Entries are produced lazily; an
//! error ends the iteration after it is yielded.

use std::io::Read;
use std::iter::FusedIterator;

use flate2::read::MultiGzDecoder;
use tracing::trace;

use crate::codec::{GzipCodec, StreamCodec};
use crate::error::{ArchiveError, ArchiveResult};
use crate::tar::{self, StructuralCodec, TarCodec};

/// Largest payload buffered by default (1 GiB)
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 1024 * 1024 * 1024;

/// Initial payload buffer capacity; larger payloads grow as they are read
const INITIAL_CAPACITY_LIMIT: u64 = 64 * 1024;

/// A decoded archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name as stored in the archive
    pub filename: String,
    /// Uncompressed payload
    pub data: Vec<u8>,
}

/// Reader over a complete in-memory archive
#[derive(Debug, Clone)]
pub struct ArchiveReader<'a, C = GzipCodec, S = TarCodec> {
    archive: &'a [u8],
    codec: C,
    structure: S,
    max_entry_size: u64,
}

impl<'a> ArchiveReader<'a> {
    /// Create a reader with the default gzip and tar codecs
    pub fn new(archive: &'a [u8]) -> Self {
        Self::with_codecs(archive, GzipCodec::default(), TarCodec::new())
    }
}

impl<'a, C: StreamCodec, S: StructuralCodec + Clone> ArchiveReader<'a, C, S> {
    /// Create a reader with explicit codecs
    pub fn with_codecs(archive: &'a [u8], codec: C, structure: S) -> Self {
        Self {
            archive,
            codec,
            structure,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }

    /// Set the largest payload the reader will buffer
    pub fn with_max_entry_size(mut self, limit: u64) -> Self {
        self.max_entry_size = limit;
        self
    }

    /// Archive bytes being read
    pub fn archive(&self) -> &'a [u8] {
        self.archive
    }

    /// Iterate over all entries in archive order
    pub fn entries(&self) -> Entries<C::Decoder<&'a [u8]>, S> {
        Entries::new(
            self.codec.decoder(self.archive),
            self.structure.clone(),
            self.max_entry_size,
        )
    }

    /// Scan the archive for the first entry named `name`
    pub fn find(&self, name: &str) -> ArchiveResult<ArchiveEntry> {
        for entry in self.entries() {
            let entry = entry?;
            if entry.filename == name {
                return Ok(entry);
            }
        }
        Err(ArchiveError::EntryNotFound(name.to_string()))
    }
}

/// Iterate over the entries of a gzip-compressed tar stream
pub fn read_entries<R: Read>(source: R) -> Entries<MultiGzDecoder<R>, TarCodec> {
    Entries::new(
        GzipCodec::default().decoder(source),
        TarCodec::new(),
        DEFAULT_MAX_ENTRY_SIZE,
    )
}

/// Lazy iterator over archive entries
///
/// Yields `Err` at most once; iteration stops after the first error.
pub struct Entries<R, S = TarCodec> {
    decoder: R,
    structure: S,
    max_entry_size: u64,
    done: bool,
}

impl<R: Read, S: StructuralCodec> Entries<R, S> {
    /// Wrap an already-decompressing reader
    pub fn new(decoder: R, structure: S, max_entry_size: u64) -> Self {
        Self {
            decoder,
            structure,
            max_entry_size,
            done: false,
        }
    }

    fn read_next(&mut self) -> ArchiveResult<Option<ArchiveEntry>> {
        let Some(header) = self.structure.read_header(&mut self.decoder)? else {
            return Ok(None);
        };

        if header.size > self.max_entry_size {
            return Err(ArchiveError::EntryTooLarge {
                name: header.name,
                size: header.size,
                limit: self.max_entry_size,
            });
        }

        let mut data = Vec::with_capacity(header.size.min(INITIAL_CAPACITY_LIMIT) as usize);
        (&mut self.decoder)
            .take(header.size)
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::from_decode(e, "payload"))?;
        if (data.len() as u64) < header.size {
            return Err(ArchiveError::Truncated { context: "payload" });
        }

        let padding = self.structure.padding_len(header.size);
        tar::skip(&mut self.decoder, padding, "padding")?;

        trace!("Read entry {} ({} bytes)", header.name, header.size);
        Ok(Some(ArchiveEntry {
            filename: header.name,
            data,
        }))
    }
}

impl<R: Read, S: StructuralCodec> Iterator for Entries<R, S> {
    type Item = ArchiveResult<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read, S: StructuralCodec> FusedIterator for Entries<R, S> {}
