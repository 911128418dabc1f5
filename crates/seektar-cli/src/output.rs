//! Output formatting for command results
//!
//! Listings are printed either as aligned text columns or as a JSON array,
//! selected with `--format`.

use std::io::{self, Write};

use clap::ValueEnum;
use seektar_format::{ArchiveEntry, IndexEntry, OffsetDescriptor};
use serde::Serialize;

/// Output format options for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text columns
    Text,
    /// Pretty-printed JSON
    Json,
}

/// One row of a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedEntry {
    /// Entry name
    pub name: String,
    /// Uncompressed payload size, when the payload was decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Compressed offsets, when known from an index or writer
    #[serde(flatten)]
    pub descriptor: Option<OffsetDescriptor>,
}

impl ListedEntry {
    /// Row for an entry whose offsets are known
    pub fn indexed(name: impl Into<String>, descriptor: OffsetDescriptor) -> Self {
        Self {
            name: name.into(),
            size: None,
            descriptor: Some(descriptor),
        }
    }

    /// Row with both size and offsets
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

impl From<&ArchiveEntry> for ListedEntry {
    fn from(entry: &ArchiveEntry) -> Self {
        Self {
            name: entry.filename.clone(),
            size: Some(entry.data.len() as u64),
            descriptor: None,
        }
    }
}

impl From<&IndexEntry> for ListedEntry {
    fn from(entry: &IndexEntry) -> Self {
        Self::indexed(entry.name.clone(), entry.descriptor)
    }
}

/// Print a listing in the requested format
pub fn print_entries<W: Write + ?Sized>(
    out: &mut W,
    format: OutputFormat,
    entries: &[ListedEntry],
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, entries)?;
            writeln!(out)
        }
        OutputFormat::Text => {
            for entry in entries {
                writeln!(out, "{}", format_row(entry))?;
            }
            Ok(())
        }
    }
}

fn format_row(entry: &ListedEntry) -> String {
    let size = entry
        .size
        .map_or_else(|| "-".to_string(), |size| size.to_string());
    match entry.descriptor {
        Some(d) => format!(
            "{:>12} {:>12} {:>12} {:>12} {:>12}  {}",
            size, d.start, d.data_start, d.padding_start, d.end, entry.name
        ),
        None => format!("{:>12}  {}", size, entry.name),
    }
}
