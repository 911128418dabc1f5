//! External entry index
//!
//! The writer returns one [`OffsetDescriptor`] per entry; an [`ArchiveIndex`]
//! keeps them by name so a single payload can later be fetched straight from
//! its byte range. The index is stored next to the archive as JSON:
//!
//! ```json
//! {
//!   "archive_len": 1186,
//!   "entries": [
//!     { "name": "foo", "start": 0, "data_start": 43, "padding_start": 67, "end": 92 }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::OffsetDescriptor;
use crate::error::{ArchiveError, ArchiveResult};

/// One named entry of the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Entry name
    pub name: String,
    /// Entry boundaries in the compressed archive
    #[serde(flatten)]
    pub descriptor: OffsetDescriptor,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    archive_len: Option<u64>,
    entries: Vec<IndexEntry>,
}

/// Name to offset-descriptor map, in archive order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexFile", into = "IndexFile")]
pub struct ArchiveIndex {
    archive_len: Option<u64>,
    entries: Vec<IndexEntry>,
    positions: HashMap<String, usize>,
}

impl TryFrom<IndexFile> for ArchiveIndex {
    type Error = ArchiveError;

    fn try_from(file: IndexFile) -> Result<Self, Self::Error> {
        let mut index = Self::new();
        let mut previous: Option<OffsetDescriptor> = None;
        for entry in file.entries {
            entry.descriptor.validate()?;
            if let Some(previous) = previous
                && !previous.is_followed_by(&entry.descriptor)
            {
                return Err(ArchiveError::UnexpectedLayout {
                    offset: entry.descriptor.start,
                    reason: format!(
                        "index entry {} does not start where the previous entry ends ({})",
                        entry.name, previous.end
                    ),
                });
            }
            previous = Some(entry.descriptor);
            index.insert(entry.name, entry.descriptor)?;
        }
        index.archive_len = file.archive_len;
        Ok(index)
    }
}

impl From<ArchiveIndex> for IndexFile {
    fn from(index: ArchiveIndex) -> Self {
        Self {
            archive_len: index.archive_len,
            entries: index.entries,
        }
    }
}

impl ArchiveIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry; names must be unique
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        descriptor: OffsetDescriptor,
    ) -> ArchiveResult<()> {
        let name = name.into();
        if self.positions.contains_key(&name) {
            return Err(ArchiveError::DuplicateEntry(name));
        }
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push(IndexEntry { name, descriptor });
        Ok(())
    }

    /// Descriptor of the named entry
    pub fn get(&self, name: &str) -> Option<&OffsetDescriptor> {
        self.positions
            .get(name)
            .map(|&position| &self.entries[position].descriptor)
    }

    /// Whether an entry with this name is indexed
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    /// Entries in archive order
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total compressed archive length, once the archive is closed
    pub fn archive_len(&self) -> Option<u64> {
        self.archive_len
    }

    /// Record the total compressed archive length
    pub fn set_archive_len(&mut self, len: u64) {
        self.archive_len = Some(len);
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> ArchiveResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> ArchiveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write as JSON to `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> ArchiveResult<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Read JSON from `reader`
    pub fn read_from<R: Read>(reader: R) -> ArchiveResult<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Save to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ArchiveResult<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }

    /// Load from a file
    pub fn load<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        Self::read_from(BufReader::new(File::open(path)?))
    }
}

impl<'a> IntoIterator for &'a ArchiveIndex {
    type Item = &'a IndexEntry;
    type IntoIter = std::slice::Iter<'a, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
