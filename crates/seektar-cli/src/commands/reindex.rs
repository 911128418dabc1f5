use std::io::Write;

use anyhow::{Context, Result};
use seektar_format::{MappedArchive, rebuild_index};
use tracing::info;

use crate::config::{ReindexArgs, default_index_path};
use crate::output::{ListedEntry, OutputFormat, print_entries};

pub fn handle<W: Write + ?Sized>(
    args: &ReindexArgs,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let archive = MappedArchive::open(&args.archive)
        .with_context(|| format!("Failed to open {}", args.archive.display()))?;
    let index = rebuild_index(archive.as_bytes())
        .with_context(|| format!("Failed to scan {}", args.archive.display()))?;

    let index_path = args
        .index
        .clone()
        .unwrap_or_else(|| default_index_path(&args.archive));
    index
        .save(&index_path)
        .with_context(|| format!("Failed to write index {}", index_path.display()))?;

    info!(
        "Rebuilt index for {} entries at {}",
        index.len(),
        index_path.display()
    );
    let rows: Vec<ListedEntry> = index.iter().map(ListedEntry::from).collect();
    print_entries(out, format, &rows)?;
    Ok(())
}
