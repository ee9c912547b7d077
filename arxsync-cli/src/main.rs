//! arxsync: incremental mirror of arXiv listings into a local record store.
//!
//! # Usage
//!
//! ```text
//! arxsync sync [-n N] [-s START] [-b BREAK] [--query Q] [--store DIR] [--dry-run] [--json]
//! arxsync status [--limit K] [--json]
//! arxsync config
//! ```
//!
//! `sync` exits 0 when records were updated, 1 when nothing changed and 2 on
//! any fatal error.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{config::ConfigArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "arxsync",
    version,
    about = "Keep a local store of arXiv records up to date",
    long_about = None,
)]
struct Cli {
    /// Log as JSON lines instead of human-readable text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch recently updated records and merge them into the store.
    Sync(SyncArgs),

    /// Show store size and the most recently updated records.
    Status(StatusArgs),

    /// Print the effective configuration.
    Config(ConfigArgs),
}

/// Exit status for a fatal error.
const EXIT_FATAL: u8 = 2;

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result = match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Config(args) => args.run().map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "fatal");
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Logs go to stderr; stdout is reserved for command output.
fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("ARXSYNC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
