//! komodo-secrets-sync: mirror secrets from a secrets manager into Komodo
//! variables.
//!
//! # Usage
//!
//! ```text
//! komodo-secrets-sync [--komodo-url ..] [--reconciler-interval 5m] [--once] bitwarden --access-token .. --organization-id ..
//! komodo-secrets-sync [--komodo-url ..] file --path secrets.json
//! ```
//!
//! Every flag also reads an environment variable (`KOMODO_URL`,
//! `RECONCILER_INTERVAL`, `BW_ACCESS_TOKEN`, ...).

mod commands;

use anyhow::{Context, Result};
use clap::Parser;

use commands::run::{KomodoArgs, ReconcilerArgs};
use commands::source::SourceCommand;
use ksync_daemon::{init_tracing, LogConfig, LogFormat};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "komodo-secrets-sync",
    version,
    about = "Keep Komodo variables in sync with a secrets manager",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    komodo: KomodoArgs,

    #[command(flatten)]
    reconciler: ReconcilerArgs,

    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    source: SourceCommand,
}

// ---------------------------------------------------------------------------
// Logging flags
// ---------------------------------------------------------------------------

#[derive(clap::Args, Debug)]
struct LogArgs {
    /// Log level or filter directive. `RUST_LOG` takes precedence.
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    level: String,

    /// Log line format: text or json.
    #[arg(long = "log-format", env = "LOG_FORMAT", default_value_t = LogFormat::Text)]
    format: LogFormat,
}

impl From<LogArgs> for LogConfig {
    fn from(args: LogArgs) -> Self {
        LogConfig {
            level: args.level,
            format: args.format,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log.into()).context("failed to initialize logging")?;

    let (source, scope) = cli.source.build()?;
    commands::run::run(cli.komodo, cli.reconciler, source, scope)
}
