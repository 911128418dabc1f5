use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path};

use anyhow::{Context, Result};
use seektar_format::ArchiveWriter;
use tracing::{debug, info};

use crate::config::{NameFrom, PackArgs, default_index_path};
use crate::error::CliError;
use crate::output::{ListedEntry, OutputFormat, print_entries};

/// Derive the archive entry name for an input path
pub fn entry_name(path: &Path, name_from: NameFrom) -> Result<String, CliError> {
    let name = match name_from {
        NameFrom::Base => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        NameFrom::Path => {
            let parts: Vec<String> = path
                .components()
                .filter_map(|component| match component {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("/"))
        }
    };
    name.ok_or_else(|| CliError::NoEntryName(path.to_path_buf()))
}

pub fn handle<W: Write + ?Sized>(args: &PackArgs, format: OutputFormat, out: &mut W) -> Result<()> {
    let file = File::create(&args.archive)
        .with_context(|| format!("Failed to create {}", args.archive.display()))?;
    let mut writer = ArchiveWriter::with_level(BufWriter::new(file), args.level);

    let mut rows = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let name = entry_name(path, args.name_from)?;
        let file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(CliError::NotAFile(path.clone()).into());
        }

        let size = metadata.len();
        let descriptor = writer
            .append_reader(&name, size, &mut BufReader::new(file))
            .with_context(|| format!("Failed to add {} as {}", path.display(), name))?;
        debug!("Packed {} as {} ({} bytes)", path.display(), name, size);
        rows.push(ListedEntry::indexed(name, descriptor).with_size(size));
    }

    let (_, index) = writer
        .finish()
        .with_context(|| format!("Failed to finish {}", args.archive.display()))?;

    let index_path = args
        .index
        .clone()
        .unwrap_or_else(|| default_index_path(&args.archive));
    index
        .save(&index_path)
        .with_context(|| format!("Failed to write index {}", index_path.display()))?;

    info!(
        "Packed {} files into {} ({} bytes), index at {}",
        rows.len(),
        args.archive.display(),
        index.archive_len().unwrap_or_default(),
        index_path.display()
    );
    print_entries(out, format, &rows)?;
    Ok(())
}
