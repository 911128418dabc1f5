//! Subcommand handlers

pub mod cat;
pub mod extract;
pub mod list;
pub mod pack;
pub mod reindex;

use std::io::Write;

use anyhow::Result;

use crate::config::{CliConfig, Command};

/// Run the configured subcommand, writing results to `out`
pub fn run<W: Write + ?Sized>(config: &CliConfig, out: &mut W) -> Result<()> {
    match &config.command {
        Command::Pack(args) => pack::handle(args, config.format, out),
        Command::List(args) => list::handle(args, config.format, out),
        Command::Extract(args) => extract::handle(args, config.format, out),
        Command::Cat(args) => cat::handle(args, out),
        Command::Reindex(args) => reindex::handle(args, config.format, out),
    }
}
