//! seektar command-line library
//!
//! Argument parsing, output formatting and the subcommand handlers behind the
//! `seektar` binary. Handlers write their results to any `Write` so they can
//! be driven from tests without spawning a process.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use crate::commands::run;
pub use crate::config::{
    CatArgs, CliConfig, Command, ExtractArgs, ListArgs, LogLevel, NameFrom, PackArgs, ReindexArgs,
    default_index_path,
};
pub use crate::error::CliError;
pub use crate::output::{ListedEntry, OutputFormat};
