//! Seekable `.tar.gz` archives
//!
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Consistent logging style
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
//! This crate writes and reads tar archives compressed with gzip in a layout
//! that allows random access to individual entries while staying fully
//! compatible with `tar -xzf`.
//!
//! # Layout
//!
//! Every entry is stored as three independent gzip members:
//!
//! ```text
//! start        data_start      padding_start      end
//!   | gz(header) | gz(payload)   | gz(padding)      |
//! ```
//!
//! followed, once the archive is closed, by a single member holding the
//! two-block tar terminator. Gzip decoders treat concatenated members as one
//! stream, so the whole file is an ordinary `.tar.gz`.
//!
//! The writer returns an [`OffsetDescriptor`] for every entry. Given the
//! descriptor, the bytes `[data_start, padding_start)` decompress on their
//! own to exactly the entry's payload, without touching the rest of the file.
//!
//! # Components
//!
//! - [`ArchiveWriter`]: append entries, receive offset descriptors
//! - [`ArchiveReader`]: sequential, lazy iteration over all entries
//! - [`extract_entry`], [`read_entry_at`], [`MappedArchive`]: random access
//! - [`ArchiveIndex`]: name to descriptor map, persisted as JSON
//! - [`rebuild_index`]: recover the index from the archive alone
//! - [`StreamCodec`] / [`StructuralCodec`]: the compression and container
//!   layers, with gzip and POSIX pax/ustar as the defaults

#![warn(missing_docs)]

/// Compression stream codec
pub mod codec;
/// Entry offset descriptors
pub mod descriptor;
/// Error types
pub mod error;
/// Name to descriptor index
pub mod index;
/// Sequential reading
pub mod reader;
/// Random-access payload retrieval
pub mod retrieve;
/// Index recovery by member scanning
pub mod scan;
/// Tar structural codec
pub mod tar;
/// Archive writer
pub mod writer;

pub use codec::{GzipCodec, StreamCodec};
pub use descriptor::OffsetDescriptor;
pub use error::{ArchiveError, ArchiveResult};
pub use index::{ArchiveIndex, IndexEntry};
pub use reader::{ArchiveEntry, ArchiveReader, DEFAULT_MAX_ENTRY_SIZE, Entries, read_entries};
pub use retrieve::{MappedArchive, extract_entry, extract_entry_with, read_entry_at};
pub use scan::{rebuild_index, rebuild_index_from};
pub use tar::{EntryHeader, StructuralCodec, TarCodec};
pub use writer::ArchiveWriter;
