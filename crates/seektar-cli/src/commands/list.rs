use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use seektar_format::{ArchiveEntry, ArchiveIndex, ArchiveResult, MappedArchive, read_entries};
use tracing::info;

use crate::config::ListArgs;
use crate::output::{ListedEntry, OutputFormat, print_entries};

/// Archive argument that selects stdin
pub const STDIN_ARG: &str = "-";

fn collect_rows<I>(entries: I) -> Result<Vec<ListedEntry>>
where
    I: Iterator<Item = ArchiveResult<ArchiveEntry>>,
{
    entries
        .map(|entry| {
            entry
                .map(|e| ListedEntry::from(&e))
                .context("Failed to read archive entry")
        })
        .collect()
}

pub fn handle<W: Write + ?Sized>(args: &ListArgs, format: OutputFormat, out: &mut W) -> Result<()> {
    let rows = if let Some(index_path) = &args.index {
        let index = ArchiveIndex::load(index_path)
            .with_context(|| format!("Failed to load index {}", index_path.display()))?;
        index.iter().map(ListedEntry::from).collect()
    } else if args.archive == Path::new(STDIN_ARG) {
        collect_rows(read_entries(io::stdin().lock()))?
    } else {
        let archive = MappedArchive::open(&args.archive)
            .with_context(|| format!("Failed to open {}", args.archive.display()))?;
        collect_rows(archive.reader().entries())?
    };

    info!("Listed {} entries", rows.len());
    print_entries(out, format, &rows)?;
    Ok(())
}
