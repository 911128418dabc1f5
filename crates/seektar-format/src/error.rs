//! Error types for archive operations

use thiserror::Error;

/// Archive operation result type
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Error types for writing, reading and indexing seekable archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An entry with this name was already appended to the archive
    #[error("Duplicate entry name: {0}")]
    DuplicateEntry(String),

    /// The writer was closed; no further entries can be appended
    #[error("Archive writer is already closed")]
    WriterClosed,

    /// A previous I/O failure left the writer unusable
    #[error("Archive writer failed earlier and can no longer be used")]
    WriterFailed,

    /// Entry name cannot be stored in a tar header
    #[error("Invalid entry name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Why the name was rejected
        reason: &'static str,
    },

    /// Streamed payload length differs from the declared size
    #[error("Size mismatch: declared {expected} bytes, source provided {actual} bytes")]
    SizeMismatch {
        /// Size written into the header
        expected: u64,
        /// Bytes the source actually produced
        actual: u64,
    },

    /// Tar header record is malformed
    #[error("Invalid tar header: {reason}")]
    InvalidHeader {
        /// Description of the problem
        reason: String,
    },

    /// Tar header checksum does not match its contents
    #[error("Tar header checksum mismatch: stored {stored:#o}, computed {computed:#o}")]
    ChecksumMismatch {
        /// Checksum recorded in the header
        stored: u32,
        /// Checksum computed from the header bytes
        computed: u32,
    },

    /// Input ended in the middle of a record or payload
    #[error("Archive truncated while reading {context}")]
    Truncated {
        /// What was being read when input ran out
        context: &'static str,
    },

    /// Input ended cleanly but without the end-of-archive marker
    #[error("Archive ends without an end-of-archive marker")]
    MissingTerminator,

    /// A compressed segment could not be decoded
    #[error("Decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    /// Descriptor boundaries are out of order
    #[error(
        "Invalid offset descriptor: start={start} data_start={data_start} padding_start={padding_start} end={end}"
    )]
    InvalidDescriptor {
        /// Entry start offset
        start: u64,
        /// Payload start offset
        data_start: u64,
        /// Padding start offset
        padding_start: u64,
        /// Entry end offset
        end: u64,
    },

    /// Descriptor points past the end of the archive
    #[error("Offset descriptor ends at {end}, archive is only {archive_len} bytes")]
    DescriptorOutOfBounds {
        /// Requested end offset
        end: u64,
        /// Length of the archive
        archive_len: u64,
    },

    /// Gzip member layout does not follow the header/payload/padding pattern
    #[error("Unexpected member layout at offset {offset}: {reason}")]
    UnexpectedLayout {
        /// Compressed offset where the problem was found
        offset: u64,
        /// Description of the problem
        reason: String,
    },

    /// Entry payload is larger than the reader is willing to buffer
    #[error("Entry {name:?} is {size} bytes, limit is {limit}")]
    EntryTooLarge {
        /// Entry name
        name: String,
        /// Declared payload size
        size: u64,
        /// Configured limit
        limit: u64,
    },

    /// Named entry is not present in the index or archive
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Binary read/write error
    #[error("Binary format error: {0}")]
    BinRead(#[from] binrw::Error),

    /// Index serialization error
    #[error("Index format error: {0}")]
    IndexFormat(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Create an invalid header error with a reason
    pub fn invalid_header<S: Into<String>>(reason: S) -> Self {
        Self::InvalidHeader {
            reason: reason.into(),
        }
    }

    /// Map an error raised while pulling decompressed bytes
    ///
    /// `flate2` reports corrupt members as `InvalidInput`/`InvalidData` and a
    /// member cut short as `UnexpectedEof`.
    pub fn from_decode(error: std::io::Error, context: &'static str) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::Truncated { context },
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput => {
                Self::Decompression(error)
            }
            _ => Self::Io(error),
        }
    }

    /// Check if this error reports caller misuse rather than a data problem
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEntry(_) | Self::WriterClosed | Self::WriterFailed
        )
    }

    /// Check if this error indicates corrupt or truncated archive data
    pub fn is_corruption_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader { .. }
                | Self::ChecksumMismatch { .. }
                | Self::Truncated { .. }
                | Self::MissingTerminator
                | Self::Decompression(_)
                | Self::UnexpectedLayout { .. }
        )
    }
}
