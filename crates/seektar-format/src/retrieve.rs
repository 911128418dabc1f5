//! Random-access payload retrieval
//!
//! A payload segment is a complete gzip member, so the bytes in
//! `[data_start, padding_start)` decompress on their own. This is the same
//! as the shell recipe:
//!
//! ```text
//! dd if=archive.tar.gz bs=1 skip=$data_start count=$((padding_start - data_start)) | gunzip
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::codec::{GzipCodec, StreamCodec};
use crate::descriptor::OffsetDescriptor;
use crate::error::{ArchiveError, ArchiveResult};
use crate::index::ArchiveIndex;
use crate::reader::ArchiveReader;

fn check_bounds(descriptor: &OffsetDescriptor, archive_len: u64) -> ArchiveResult<()> {
    descriptor.validate()?;
    if descriptor.end > archive_len {
        return Err(ArchiveError::DescriptorOutOfBounds {
            end: descriptor.end,
            archive_len,
        });
    }
    Ok(())
}

fn decode_payload<C: StreamCodec>(codec: &C, compressed: &[u8]) -> ArchiveResult<Vec<u8>> {
    codec
        .decode_segment(compressed)
        .map_err(|e| ArchiveError::from_decode(e, "payload"))
}

/// Decompress one payload from an in-memory archive
pub fn extract_entry(archive: &[u8], descriptor: &OffsetDescriptor) -> ArchiveResult<Vec<u8>> {
    extract_entry_with(&GzipCodec::default(), archive, descriptor)
}

/// Decompress one payload with a specific stream codec
pub fn extract_entry_with<C: StreamCodec>(
    codec: &C,
    archive: &[u8],
    descriptor: &OffsetDescriptor,
) -> ArchiveResult<Vec<u8>> {
    check_bounds(descriptor, archive.len() as u64)?;
    let range = descriptor.data_range();
    decode_payload(codec, &archive[range.start as usize..range.end as usize])
}

/// Seek to a payload and decompress it, reading only its compressed bytes
pub fn read_entry_at<R: Read + Seek>(
    reader: &mut R,
    descriptor: &OffsetDescriptor,
) -> ArchiveResult<Vec<u8>> {
    let archive_len = reader.seek(SeekFrom::End(0))?;
    check_bounds(descriptor, archive_len)?;

    reader.seek(SeekFrom::Start(descriptor.data_start))?;
    let mut compressed = Vec::with_capacity(descriptor.data_size() as usize);
    reader
        .take(descriptor.data_size())
        .read_to_end(&mut compressed)?;
    if (compressed.len() as u64) < descriptor.data_size() {
        return Err(ArchiveError::Truncated { context: "payload" });
    }

    decode_payload(&GzipCodec::default(), &compressed)
}

/// Memory-mapped archive file
pub struct MappedArchive {
    path: PathBuf,
    /// `None` for an empty file, which cannot be mapped
    mmap: Option<Mmap>,
}

impl MappedArchive {
    /// Map an archive file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();

        let mmap = if size == 0 {
            None
        } else {
            // The mapping is only read; callers must not truncate the file while it is open
            #[allow(unsafe_code)]
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            Some(mmap)
        };

        debug!("Mapped archive {} ({} bytes)", path.display(), size);
        Ok(Self { path, mmap })
    }

    /// Path the archive was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw archive bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    /// Archive length in bytes
    pub fn len(&self) -> u64 {
        self.as_bytes().len() as u64
    }

    /// Whether the file is empty
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Sequential reader over the mapped bytes
    pub fn reader(&self) -> ArchiveReader<'_> {
        ArchiveReader::new(self.as_bytes())
    }

    /// Decompress the payload at `descriptor`
    pub fn extract(&self, descriptor: &OffsetDescriptor) -> ArchiveResult<Vec<u8>> {
        extract_entry(self.as_bytes(), descriptor)
    }

    /// Look `name` up in `index` and decompress its payload
    pub fn extract_by_name(&self, index: &ArchiveIndex, name: &str) -> ArchiveResult<Vec<u8>> {
        let descriptor = index
            .get(name)
            .ok_or_else(|| ArchiveError::EntryNotFound(name.to_string()))?;
        self.extract(descriptor)
    }
}
