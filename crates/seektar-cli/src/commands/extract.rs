use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use seektar_format::MappedArchive;
use tracing::{debug, info};

use crate::config::ExtractArgs;
use crate::error::CliError;
use crate::output::{ListedEntry, OutputFormat, print_entries};

/// Relative path for an entry name, refusing anything that leaves the destination
pub fn safe_relative_path(name: &str) -> Result<PathBuf, CliError> {
    let path = Path::new(name);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(CliError::UnsafeEntryName(name.to_string()));
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(CliError::UnsafeEntryName(name.to_string()));
    }
    Ok(relative)
}

pub fn handle<W: Write + ?Sized>(
    args: &ExtractArgs,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let archive = MappedArchive::open(&args.archive)
        .with_context(|| format!("Failed to open {}", args.archive.display()))?;

    let mut rows = Vec::new();
    for entry in archive.reader().entries() {
        let entry = entry.context("Failed to read archive entry")?;
        let target = args.output.join(safe_relative_path(&entry.filename)?);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&target, &entry.data)
            .with_context(|| format!("Failed to write {}", target.display()))?;

        debug!("Extracted {} to {}", entry.filename, target.display());
        rows.push(ListedEntry::from(&entry));
    }

    info!(
        "Extracted {} entries into {}",
        rows.len(),
        args.output.display()
    );
    print_entries(out, format, &rows)?;
    Ok(())
}
