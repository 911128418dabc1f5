use std::io::Write;

use anyhow::{Context, Result};
use seektar_format::{ArchiveIndex, MappedArchive};
use tracing::debug;

use crate::config::CatArgs;

pub fn handle<W: Write + ?Sized>(args: &CatArgs, out: &mut W) -> Result<()> {
    let archive = MappedArchive::open(&args.archive)
        .with_context(|| format!("Failed to open {}", args.archive.display()))?;

    let data = if let Some(index_path) = &args.index {
        let index = ArchiveIndex::load(index_path)
            .with_context(|| format!("Failed to load index {}", index_path.display()))?;
        debug!("Reading {} by offset", args.name);
        archive
            .extract_by_name(&index, &args.name)
            .with_context(|| format!("Failed to extract {}", args.name))?
    } else {
        debug!("Scanning for {}", args.name);
        archive
            .reader()
            .find(&args.name)
            .with_context(|| format!("Failed to find {}", args.name))?
            .data
    };

    out.write_all(&data)?;
    out.flush()?;
    Ok(())
}
