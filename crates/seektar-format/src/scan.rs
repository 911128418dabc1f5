//! Index recovery from an archive without its side index
//!
//! Walks the gzip members one at a time and checks that they follow the
//! header / payload / padding pattern the writer produces, ending with a
//! single terminator member. Archives written by other tools (one member for
//! the whole file) are rejected with [`ArchiveError::UnexpectedLayout`].

use std::io::{self, Read, Write};

use flate2::bufread::GzDecoder;
use tracing::debug;

use crate::descriptor::OffsetDescriptor;
use crate::error::{ArchiveError, ArchiveResult};
use crate::index::ArchiveIndex;
use crate::tar::{BLOCK_SIZE, MAX_EXTENSION_SIZE, StructuralCodec, TarCodec};

/// Largest header member the writer can produce: an extension record plus
/// its `x` header and the ustar header
const HEADER_MEMBER_LIMIT: u64 = MAX_EXTENSION_SIZE + 2 * BLOCK_SIZE as u64;

struct MemberWalker<'a> {
    archive: &'a [u8],
    rest: &'a [u8],
}

impl<'a> MemberWalker<'a> {
    fn new(archive: &'a [u8]) -> Self {
        Self {
            archive,
            rest: archive,
        }
    }

    fn offset(&self) -> u64 {
        (self.archive.len() - self.rest.len()) as u64
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    /// Decode exactly one gzip member into `sink`, returning its decoded length
    fn member<W: Write + ?Sized>(&mut self, sink: &mut W) -> ArchiveResult<u64> {
        let mut decoder = GzDecoder::new(self.rest);
        let written =
            io::copy(&mut decoder, sink).map_err(|e| ArchiveError::from_decode(e, "member"))?;
        self.rest = decoder.into_inner();
        Ok(written)
    }

    /// Decode one gzip member into memory, refusing members longer than `limit`
    fn bounded_member(&mut self, limit: u64) -> ArchiveResult<Vec<u8>> {
        let start = self.offset();
        let mut decoder = GzDecoder::new(self.rest);
        let mut data = Vec::new();
        (&mut decoder)
            .take(limit + 1)
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::from_decode(e, "member"))?;
        if data.len() as u64 > limit {
            return Err(self.layout_error(
                start,
                format!("header member decodes to more than {limit} bytes"),
            ));
        }
        self.rest = decoder.into_inner();
        Ok(data)
    }

    fn layout_error(&self, offset: u64, reason: impl Into<String>) -> ArchiveError {
        ArchiveError::UnexpectedLayout {
            offset,
            reason: reason.into(),
        }
    }
}

/// Rebuild the entry index by scanning a seekable archive
pub fn rebuild_index(archive: &[u8]) -> ArchiveResult<ArchiveIndex> {
    let codec = TarCodec::new();
    let mut walker = MemberWalker::new(archive);
    let mut index = ArchiveIndex::new();

    loop {
        let start = walker.offset();
        if walker.at_end() {
            return Err(walker.layout_error(start, "archive ends without a terminator member"));
        }

        let header = walker.bounded_member(HEADER_MEMBER_LIMIT)?;

        if !header.is_empty() && header.iter().all(|&b| b == 0) {
            if !walker.at_end() {
                return Err(walker.layout_error(
                    walker.offset(),
                    "data follows the terminator member",
                ));
            }
            break;
        }

        let mut source = &header[..];
        let entry = match codec.read_header(&mut source) {
            Ok(Some(entry)) => entry,
            Ok(None) | Err(ArchiveError::MissingTerminator) => {
                return Err(walker.layout_error(start, "member holds no entry header"));
            }
            Err(e) => return Err(e),
        };
        if !source.is_empty() {
            return Err(walker.layout_error(
                start,
                format!("header member for {} carries {} extra bytes", entry.name, source.len()),
            ));
        }

        let data_start = walker.offset();
        let size = walker.member(&mut io::sink())?;
        if size != entry.size {
            return Err(walker.layout_error(
                data_start,
                format!(
                    "payload member for {} holds {} bytes, header declares {}",
                    entry.name, size, entry.size
                ),
            ));
        }

        let padding_start = walker.offset();
        let padding = walker.member(&mut io::sink())?;
        let expected = codec.padding_len(entry.size);
        if padding != expected {
            return Err(walker.layout_error(
                padding_start,
                format!("padding member holds {padding} bytes, expected {expected}"),
            ));
        }

        let descriptor = OffsetDescriptor::new(start, data_start, padding_start, walker.offset())?;
        debug!("Recovered {} at {}..{}", entry.name, start, descriptor.end);
        index.insert(entry.name, descriptor)?;
    }

    index.set_archive_len(archive.len() as u64);
    Ok(index)
}

/// Read a whole archive from `source` and rebuild its index
pub fn rebuild_index_from<R: Read>(mut source: R) -> ArchiveResult<ArchiveIndex> {
    let mut archive = Vec::new();
    source.read_to_end(&mut archive)?;
    rebuild_index(&archive)
}
