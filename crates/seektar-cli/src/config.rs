//! Command-line configuration.
//!
//! Options come from CLI arguments, with environment fallbacks for the ones
//! that are usually fixed per machine or per script:
//!
//! - `SEEKTAR_LEVEL`: gzip compression level for `pack`
//! - `SEEKTAR_INDEX`: index file path for `pack`, `list`, `cat` and `reindex`
//! - `SEEKTAR_FORMAT`: output format (`text` or `json`)
//! - `SEEKTAR_LOG_LEVEL`: log level when `RUST_LOG` is not set
//!
//! # Example
//!
//! ```
//! use clap::Parser;
//! use seektar_cli::{CliConfig, Command};
//!
//! let config = CliConfig::try_parse_from(["seektar", "pack", "out.tar.gz", "a.txt"]).unwrap();
//! config.validate().unwrap();
//! assert!(matches!(config.command, Command::Pack(_)));
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use seektar_format::codec::{DEFAULT_LEVEL, MAX_LEVEL};
use tracing::Level;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Suffix of the default index file written next to an archive
pub const INDEX_SUFFIX: &str = ".index.json";

/// Top-level configuration for the `seektar` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seektar",
    about = "Seekable .tar.gz archives with per-entry random access",
    version
)]
pub struct CliConfig {
    /// Logging level (overridden by RUST_LOG)
    #[arg(
        short,
        long,
        value_enum,
        global = true,
        env = "SEEKTAR_LOG_LEVEL",
        default_value = "warn"
    )]
    pub log_level: LogLevel,

    /// Output format
    #[arg(
        short,
        long,
        value_enum,
        global = true,
        env = "SEEKTAR_FORMAT",
        default_value = "text"
    )]
    pub format: OutputFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Everything
    Trace,
    /// Per-entry details
    Debug,
    /// Per-command summaries
    Info,
    /// Problems only
    Warn,
    /// Failures only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl LogLevel {
    /// Filter directive understood by `EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// `seektar` subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Pack files into a new seekable archive and write its index
    Pack(PackArgs),
    /// List the entries of an archive
    List(ListArgs),
    /// Extract every entry into a directory
    Extract(ExtractArgs),
    /// Write one entry's payload to stdout
    Cat(CatArgs),
    /// Rebuild the index of an archive by scanning it
    Reindex(ReindexArgs),
}

/// How entry names are derived from input paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NameFrom {
    /// File name only
    Base,
    /// Relative path as given, without `.` and leading `/`
    Path,
}

/// Arguments for `pack`.
#[derive(Debug, Clone, Args)]
pub struct PackArgs {
    /// Archive to create
    pub archive: PathBuf,

    /// Files to add, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Index output path (default: <archive>.index.json)
    #[arg(long, env = "SEEKTAR_INDEX")]
    pub index: Option<PathBuf>,

    /// Gzip compression level (0-9)
    #[arg(long, env = "SEEKTAR_LEVEL", default_value_t = DEFAULT_LEVEL)]
    pub level: u32,

    /// How to name entries
    #[arg(long, value_enum, default_value = "base")]
    pub name_from: NameFrom,
}

/// Arguments for `list`.
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Archive to list, or `-` for stdin
    pub archive: PathBuf,

    /// List offsets from this index instead of decoding the archive
    #[arg(long, env = "SEEKTAR_INDEX")]
    pub index: Option<PathBuf>,
}

/// Arguments for `extract`.
#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Archive to extract
    pub archive: PathBuf,

    /// Destination directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Arguments for `cat`.
#[derive(Debug, Clone, Args)]
pub struct CatArgs {
    /// Archive to read
    pub archive: PathBuf,

    /// Entry name
    pub name: String,

    /// Fetch the entry by offset using this index
    #[arg(long, env = "SEEKTAR_INDEX")]
    pub index: Option<PathBuf>,
}

/// Arguments for `reindex`.
#[derive(Debug, Clone, Args)]
pub struct ReindexArgs {
    /// Archive to scan
    pub archive: PathBuf,

    /// Index output path (default: <archive>.index.json)
    #[arg(long, env = "SEEKTAR_INDEX")]
    pub index: Option<PathBuf>,
}

impl CliConfig {
    /// Parse configuration from command-line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate option values that clap cannot check on its own.
    pub fn validate(&self) -> Result<(), CliError> {
        if let Command::Pack(args) = &self.command
            && args.level > MAX_LEVEL
        {
            return Err(CliError::InvalidLevel {
                level: args.level,
                max: MAX_LEVEL,
            });
        }
        Ok(())
    }
}

/// Default index location for an archive: `<archive>.index.json`
pub fn default_index_path(archive: &Path) -> PathBuf {
    let mut path = OsString::from(archive.as_os_str());
    path.push(INDEX_SUFFIX);
    PathBuf::from(path)
}
