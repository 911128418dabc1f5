//! Error types for the seektar command-line tool.

use std::path::PathBuf;
use thiserror::Error;

/// Argument and input validation errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Compression level outside the gzip range
    #[error("Compression level {level} is out of range (0-{max})")]
    InvalidLevel {
        /// Requested level
        level: u32,
        /// Highest accepted level
        max: u32,
    },

    /// Input path is not a regular file
    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// No entry name can be derived from an input path
    #[error("Cannot derive an entry name from {}", .0.display())]
    NoEntryName(PathBuf),

    /// Entry name would escape the extraction directory
    #[error("Refusing to extract unsafe entry name: {0}")]
    UnsafeEntryName(String),
}
