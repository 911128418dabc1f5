//! Archive structural codec
//!
//! The structural codec knows the container layout (header record, payload,
//! alignment padding, terminator) and nothing about compression. The writer
//! asks it for header bytes and padding lengths; the reader hands it the
//! already-decompressed stream and gets back one regular-file header at a
//! time.
//!
//! [`TarCodec`] implements POSIX pax/ustar:
//!
//! ```text
//! [pax 'x' header + records]?   only for names that need it or sizes >= 8 GiB
//! [ustar header]                512 bytes
//! [payload][zero padding]       padded to 512
//! ...
//! [zero block][zero block]      terminator
//! ```

mod header;
mod pax;

use std::io::{self, Read};

use tracing::debug;

use crate::error::{ArchiveError, ArchiveResult};

pub use header::{
    BLOCK_SIZE, NAME_LEN, PREFIX_LEN, TYPE_GNU_LONGNAME, TYPE_PAX_GLOBAL, TYPE_PAX_LOCAL,
    TYPE_REGULAR, UstarHeader, block_checksum, is_zero_block, padding_for, parse_numeric,
    parse_octal,
};
pub use pax::{PaxOverrides, encode_record, parse_records};

/// Largest extension payload (pax records, GNU long name) accepted on read
pub const MAX_EXTENSION_SIZE: u64 = 1024 * 1024;

/// Payload sizes from here on need a pax `size` record for POSIX readers
const OCTAL_SIZE_LIMIT: u64 = 1 << 33;

/// Name and size of the next regular-file entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry name
    pub name: String,
    /// Payload size in bytes
    pub size: u64,
}

/// Container layout used by the archive writer and reader
pub trait StructuralCodec {
    /// Encode the complete header record for an entry
    fn encode_header(&self, name: &str, size: u64) -> ArchiveResult<Vec<u8>>;

    /// Padding bytes that must follow a payload of `size` bytes
    fn padding_len(&self, size: u64) -> u64;

    /// End-of-archive marker
    fn terminator(&self) -> Vec<u8>;

    /// Read the next regular-file header from a decompressed stream
    ///
    /// Returns `Ok(None)` at the end-of-archive marker. Leaves `source`
    /// positioned at the first payload byte of the returned entry.
    fn read_header<R: Read + ?Sized>(&self, source: &mut R)
    -> ArchiveResult<Option<EntryHeader>>;
}

/// POSIX pax/ustar structural codec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TarCodec;

impl TarCodec {
    /// Create a tar codec
    pub fn new() -> Self {
        Self
    }
}

/// Reject names that cannot be stored in a tar header
pub fn validate_name(name: &str) -> ArchiveResult<()> {
    if name.is_empty() {
        return Err(ArchiveError::InvalidName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if name.contains('\0') {
        return Err(ArchiveError::InvalidName {
            name: name.to_string(),
            reason: "name contains a NUL byte",
        });
    }
    Ok(())
}

/// Split a long name into ustar `(prefix, name)` fields at a `/`
fn split_ustar_name(name: &[u8]) -> Option<(&[u8], &[u8])> {
    if name.len() <= NAME_LEN {
        return Some((&name[..0], name));
    }
    name.iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'/')
        .map(|(i, _)| (&name[..i], &name[i + 1..]))
        .find(|(prefix, rest)| {
            prefix.len() <= PREFIX_LEN && !rest.is_empty() && rest.len() <= NAME_LEN
        })
}

/// Longest prefix of `name` no longer than `max` bytes ending on a char boundary
fn truncate_on_char(name: &str, max: usize) -> &str {
    let mut end = max.min(name.len());
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn pad_to_block(buffer: &mut Vec<u8>) {
    let padding = padding_for(buffer.len() as u64) as usize;
    buffer.resize(buffer.len() + padding, 0);
}

/// Fill `block`, returning `false` on a clean end of input before any byte
fn read_block<R: Read + ?Sized>(
    source: &mut R,
    block: &mut [u8; BLOCK_SIZE],
) -> ArchiveResult<bool> {
    let mut filled = 0;
    while filled < BLOCK_SIZE {
        match source.read(&mut block[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(ArchiveError::Truncated { context: "header" }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ArchiveError::from_decode(e, "header")),
        }
    }
    Ok(true)
}

fn read_extension<R: Read + ?Sized>(source: &mut R, size: u64) -> ArchiveResult<Vec<u8>> {
    if size > MAX_EXTENSION_SIZE {
        return Err(ArchiveError::invalid_header(format!(
            "extension record of {size} bytes exceeds {MAX_EXTENSION_SIZE}"
        )));
    }
    let mut data = vec![0u8; size as usize];
    source
        .read_exact(&mut data)
        .map_err(|e| ArchiveError::from_decode(e, "extension record"))?;
    skip(source, padding_for(size), "extension padding")?;
    Ok(data)
}

/// Discard exactly `count` bytes from `source`
pub(crate) fn skip<R: Read + ?Sized>(
    source: &mut R,
    count: u64,
    context: &'static str,
) -> ArchiveResult<()> {
    let skipped = io::copy(&mut source.take(count), &mut io::sink())
        .map_err(|e| ArchiveError::from_decode(e, context))?;
    if skipped == count {
        Ok(())
    } else {
        Err(ArchiveError::Truncated { context })
    }
}

impl StructuralCodec for TarCodec {
    fn encode_header(&self, name: &str, size: u64) -> ArchiveResult<Vec<u8>> {
        validate_name(name)?;

        let split = split_ustar_name(name.as_bytes());
        let needs_size_record = size >= OCTAL_SIZE_LIMIT;
        let mut out = Vec::with_capacity(BLOCK_SIZE);

        let (prefix, short_name) = match split {
            Some(fields) if !needs_size_record => fields,
            _ => {
                let mut records = Vec::new();
                if split.is_none() {
                    records.extend(encode_record("path", name.as_bytes()));
                }
                if needs_size_record {
                    records.extend(encode_record("size", size.to_string().as_bytes()));
                }

                let pax_name = format!("PaxHeaders/{}", truncate_on_char(name, NAME_LEN - 11));
                let pax = UstarHeader::new(
                    TYPE_PAX_LOCAL,
                    pax_name.as_bytes(),
                    &[],
                    records.len() as u64,
                )?;
                out.extend_from_slice(&pax.encode()?);
                out.extend_from_slice(&records);
                pad_to_block(&mut out);

                split.unwrap_or((&[][..], truncate_on_char(name, NAME_LEN).as_bytes()))
            }
        };

        let header = UstarHeader::new(TYPE_REGULAR, short_name, prefix, size)?;
        out.extend_from_slice(&header.encode()?);
        Ok(out)
    }

    fn padding_len(&self, size: u64) -> u64 {
        padding_for(size)
    }

    fn terminator(&self) -> Vec<u8> {
        vec![0; 2 * BLOCK_SIZE]
    }

    fn read_header<R: Read + ?Sized>(
        &self,
        source: &mut R,
    ) -> ArchiveResult<Option<EntryHeader>> {
        let mut overrides = PaxOverrides::default();
        let mut long_name: Option<Vec<u8>> = None;
        let mut block = [0u8; BLOCK_SIZE];

        loop {
            if !read_block(source, &mut block)? {
                return Err(ArchiveError::MissingTerminator);
            }

            if is_zero_block(&block) {
                // A lone zero block at end of input is accepted, as GNU tar does
                if !read_block(source, &mut block)? || is_zero_block(&block) {
                    return Ok(None);
                }
                return Err(ArchiveError::invalid_header(
                    "data follows a zero block before the end-of-archive marker",
                ));
            }

            let header = UstarHeader::parse(&block)?;
            let recorded_size = header.entry_size()?;

            match header.typeflag {
                TYPE_PAX_LOCAL => {
                    let records = read_extension(source, recorded_size)?;
                    overrides = parse_records(&records)?;
                }
                TYPE_PAX_GLOBAL => {
                    read_extension(source, recorded_size)?;
                }
                TYPE_GNU_LONGNAME => {
                    let mut name = read_extension(source, recorded_size)?;
                    while name.last() == Some(&0) {
                        name.pop();
                    }
                    long_name = Some(name);
                }
                _ => {
                    let size = overrides.size.unwrap_or(recorded_size);
                    let path = overrides
                        .path
                        .take()
                        .or_else(|| long_name.take())
                        .unwrap_or_else(|| header.path());

                    if !header.is_regular() {
                        debug!(
                            "Skipping non-regular tar entry {:?} (type {:?})",
                            String::from_utf8_lossy(&path),
                            char::from(header.typeflag)
                        );
                        let stored = size.checked_add(padding_for(size)).ok_or_else(|| {
                            ArchiveError::invalid_header(format!(
                                "entry size {size} overflows with its padding"
                            ))
                        })?;
                        skip(source, stored, "skipped entry")?;
                        overrides = PaxOverrides::default();
                        long_name = None;
                        continue;
                    }

                    let name = String::from_utf8(path)
                        .map_err(|_| ArchiveError::invalid_header("entry name is not valid UTF-8"))?;
                    return Ok(Some(EntryHeader { name, size }));
                }
            }
        }
    }
}
