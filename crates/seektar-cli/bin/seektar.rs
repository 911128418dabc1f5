//! seektar binary entry point.
//!
//! Parses arguments, initializes logging on stderr, validates the
//! configuration and runs the selected subcommand with results on stdout.

use anyhow::Result;
use seektar_cli::CliConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = CliConfig::from_args();

    // RUST_LOG takes precedence over --log-level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_directive())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    seektar_cli::run(&config, &mut out)
}
