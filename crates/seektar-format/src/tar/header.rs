//! Tar header record (POSIX ustar layout)
//!
//! A header occupies one 512-byte block:
//!
//! ```text
//! offset  size  field
//!      0   100  name
//!    100     8  mode (octal)
//!    108     8  uid (octal)
//!    116     8  gid (octal)
//!    124    12  size (octal, or base-256 when the high bit is set)
//!    136    12  mtime (octal)
//!    148     8  checksum ("%06o\0 ")
//!    156     1  typeflag
//!    157   100  linkname
//!    257     6  magic ("ustar\0")
//!    263     2  version ("00")
//!    265    32  uname
//!    297    32  gname
//!    329     8  devmajor
//!    337     8  devminor
//!    345   155  prefix
//!    500    12  unused
//! ```

use std::io::Cursor;

use binrw::{BinRead, BinWrite};

use crate::error::{ArchiveError, ArchiveResult};

/// Tar block size; headers, payload padding and the terminator align to it
pub const BLOCK_SIZE: usize = 512;

/// Byte range of the checksum field within a header block
const CHECKSUM_RANGE: std::ops::Range<usize> = 148..156;

/// POSIX ustar magic
pub const USTAR_MAGIC: [u8; 6] = *b"ustar\0";

/// POSIX ustar version
pub const USTAR_VERSION: [u8; 2] = *b"00";

/// Regular file
pub const TYPE_REGULAR: u8 = b'0';
/// Regular file (pre-POSIX)
pub const TYPE_REGULAR_OLD: u8 = b'\0';
/// Contiguous file, treated as regular
pub const TYPE_CONTIGUOUS: u8 = b'7';
/// Pax extended header for the next entry
pub const TYPE_PAX_LOCAL: u8 = b'x';
/// Pax global extended header
pub const TYPE_PAX_GLOBAL: u8 = b'g';
/// GNU long name for the next entry
pub const TYPE_GNU_LONGNAME: u8 = b'L';

/// Maximum length of the `name` field
pub const NAME_LEN: usize = 100;

/// Maximum length of the `prefix` field
pub const PREFIX_LEN: usize = 155;

/// Raw ustar header block
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[br(little)]
#[bw(little)]
pub struct UstarHeader {
    /// Entry name, or its trailing part when `prefix` is used
    pub name: [u8; 100],
    /// Permission bits
    pub mode: [u8; 8],
    /// Owner id
    pub uid: [u8; 8],
    /// Group id
    pub gid: [u8; 8],
    /// Payload size
    pub size: [u8; 12],
    /// Modification time
    pub mtime: [u8; 12],
    /// Header checksum
    pub checksum: [u8; 8],
    /// Entry type
    pub typeflag: u8,
    /// Link target
    pub linkname: [u8; 100],
    /// Format magic
    pub magic: [u8; 6],
    /// Format version
    pub version: [u8; 2],
    /// Owner name
    pub uname: [u8; 32],
    /// Group name
    pub gname: [u8; 32],
    /// Device major number
    pub devmajor: [u8; 8],
    /// Device minor number
    pub devminor: [u8; 8],
    /// Leading directory part of the name
    pub prefix: [u8; 155],
    /// Unused tail of the block
    pub padding: [u8; 12],
}

impl UstarHeader {
    /// Header for an entry of `size` payload bytes
    ///
    /// `name` and `prefix` must already fit their fields. Mode is `0644`,
    /// owner and timestamps are zero so output is reproducible.
    pub fn new(typeflag: u8, name: &[u8], prefix: &[u8], size: u64) -> ArchiveResult<Self> {
        if name.len() > NAME_LEN || prefix.len() > PREFIX_LEN {
            return Err(ArchiveError::invalid_header(format!(
                "name field {} bytes, prefix field {} bytes exceed ustar limits",
                name.len(),
                prefix.len()
            )));
        }

        let mut header = Self {
            name: [0; 100],
            mode: [0; 8],
            uid: [0; 8],
            gid: [0; 8],
            size: [0; 12],
            mtime: [0; 12],
            checksum: [b' '; 8],
            typeflag,
            linkname: [0; 100],
            magic: USTAR_MAGIC,
            version: USTAR_VERSION,
            uname: [0; 32],
            gname: [0; 32],
            devmajor: [0; 8],
            devminor: [0; 8],
            prefix: [0; 155],
            padding: [0; 12],
        };
        header.name[..name.len()].copy_from_slice(name);
        header.prefix[..prefix.len()].copy_from_slice(prefix);
        write_octal(&mut header.mode, 0o644);
        write_octal(&mut header.uid, 0);
        write_octal(&mut header.gid, 0);
        write_octal(&mut header.mtime, 0);
        write_numeric(&mut header.size, size);
        Ok(header)
    }

    /// Serialize to a block with the checksum filled in
    pub fn encode(&self) -> ArchiveResult<[u8; BLOCK_SIZE]> {
        let mut unsummed = self.clone();
        unsummed.checksum = [b' '; 8];

        let mut bytes = Vec::with_capacity(BLOCK_SIZE);
        unsummed.write(&mut Cursor::new(&mut bytes))?;

        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&bytes);

        let sum = block_checksum(&block);
        let field = &mut block[CHECKSUM_RANGE];
        write_octal(&mut field[..7], u64::from(sum));
        field[7] = b' ';
        Ok(block)
    }

    /// Parse a block and verify its checksum
    pub fn parse(block: &[u8; BLOCK_SIZE]) -> ArchiveResult<Self> {
        let header = Self::read(&mut Cursor::new(&block[..]))?;

        let stored = parse_octal(&header.checksum)?;
        let computed = block_checksum(block);
        if stored != u64::from(computed) {
            return Err(ArchiveError::ChecksumMismatch {
                stored: u32::try_from(stored).unwrap_or(u32::MAX),
                computed,
            });
        }
        Ok(header)
    }

    /// Payload size recorded in the header
    pub fn entry_size(&self) -> ArchiveResult<u64> {
        parse_numeric(&self.size)
    }

    /// Whether the header uses the POSIX ustar layout (and so `prefix`)
    pub fn is_ustar(&self) -> bool {
        self.magic == USTAR_MAGIC
    }

    /// Full entry path, joining `prefix` and `name` for ustar headers
    pub fn path(&self) -> Vec<u8> {
        let name = until_nul(&self.name);
        let prefix = if self.is_ustar() {
            until_nul(&self.prefix)
        } else {
            &[]
        };

        if prefix.is_empty() {
            name.to_vec()
        } else {
            let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
            path.extend_from_slice(prefix);
            path.push(b'/');
            path.extend_from_slice(name);
            path
        }
    }

    /// Whether the typeflag denotes a regular file
    pub fn is_regular(&self) -> bool {
        matches!(
            self.typeflag,
            TYPE_REGULAR | TYPE_REGULAR_OLD | TYPE_CONTIGUOUS
        )
    }
}

/// Unsigned sum of the block with the checksum field read as spaces
pub fn block_checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_RANGE.contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(b)
            }
        })
        .sum()
}

/// Whether every byte of the block is zero
pub fn is_zero_block(block: &[u8; BLOCK_SIZE]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Zero bytes needed after `size` payload bytes to reach a block boundary
pub fn padding_for(size: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    (block - size % block) % block
}

fn until_nul(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Write `value` as zero-padded octal followed by a NUL
///
/// Returns `false` when the value needs more digits than the field holds.
pub fn write_octal(field: &mut [u8], value: u64) -> bool {
    let digits = field.len() - 1;
    let text = format!("{value:0digits$o}");
    if text.len() > digits {
        return false;
    }
    field[..digits].copy_from_slice(text.as_bytes());
    field[digits] = 0;
    true
}

/// Write `value` as octal, falling back to GNU base-256 when it overflows
pub fn write_numeric(field: &mut [u8], value: u64) {
    if write_octal(field, value) {
        return;
    }
    field.fill(0);
    let bytes = value.to_be_bytes();
    let tail = field.len() - bytes.len();
    field[tail..].copy_from_slice(&bytes);
    field[0] = 0x80;
}

/// Parse an octal field, tolerating leading spaces and NUL/space terminators
pub fn parse_octal(field: &[u8]) -> ArchiveResult<u64> {
    let trimmed = field
        .iter()
        .skip_while(|&&b| b == b' ')
        .take_while(|&&b| b != 0 && b != b' ');

    let mut value: u64 = 0;
    for &b in trimmed {
        if !(b'0'..=b'7').contains(&b) {
            return Err(ArchiveError::invalid_header(format!(
                "non-octal byte {b:#04x} in numeric field"
            )));
        }
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(b - b'0')))
            .ok_or_else(|| ArchiveError::invalid_header("numeric field overflows u64"))?;
    }
    Ok(value)
}

/// Parse a numeric field in octal or GNU base-256 form
pub fn parse_numeric(field: &[u8]) -> ArchiveResult<u64> {
    match field.first() {
        Some(&first) if first & 0x80 != 0 => {
            if first & 0x40 != 0 {
                return Err(ArchiveError::invalid_header("negative base-256 value"));
            }
            let mut value: u64 = u64::from(first & 0x3f);
            for &b in &field[1..] {
                value = value
                    .checked_mul(256)
                    .and_then(|v| v.checked_add(u64::from(b)))
                    .ok_or_else(|| ArchiveError::invalid_header("base-256 field overflows u64"))?;
            }
            Ok(value)
        }
        _ => parse_octal(field),
    }
}
