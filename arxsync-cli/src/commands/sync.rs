//! `arxsync sync`: one incremental run against the arXiv API.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{ensure, Context, Result};
use clap::Args;
use colored::Colorize;

use arxsync_core::{config, Config, Query};
use arxsync_source::MAX_PAGE_SIZE;
use arxsync_sync::{
    engine::{DEFAULT_BREAK_AFTER, DEFAULT_MAX_COUNT},
    pipeline::{self, SyncRequest},
    RunOutcome, RunSummary,
};

/// Exit status when at least one record was inserted or replaced.
const EXIT_UPDATED: u8 = 0;
/// Exit status when the run changed nothing.
const EXIT_NO_CHANGES: u8 = 1;

/// Arguments for `arxsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Maximum number of records to scan.
    #[arg(short = 'n', long = "num", default_value_t = DEFAULT_MAX_COUNT)]
    pub num: u64,

    /// Offset of the first page.
    #[arg(short = 's', long, default_value_t = 0)]
    pub start: u64,

    /// Stop after this many consecutive pages without new records (0 = never).
    #[arg(short = 'b', long, default_value_t = DEFAULT_BREAK_AFTER)]
    pub break_after: u32,

    /// Search query in API form, or a preset name (`audio`, `cs`).
    #[arg(long)]
    pub query: Option<String>,

    /// Record store directory.
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Records requested per page.
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Fetch attempts per page before giving up.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Decide and count as usual without writing to the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let home = config::home()?;
        let mut config = config::load_at(&home).context("failed to load configuration")?;

        if let Some(query) = self.query.as_deref() {
            config.query = resolve_query(query).to_string();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(store) = self.store {
            config.store_dir = Some(store);
        }
        validate(&config, self.num)?;

        let mut request = SyncRequest::from_config(&config, &home);
        request.params = request
            .params
            .with_start(self.start)
            .with_max_count(self.num)
            .with_break_after(self.break_after);
        request.dry_run = self.dry_run;

        let summary = pipeline::run(&config, &request)
            .with_context(|| format!("sync failed for query '{}'", config.query))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize run summary")?
            );
        } else {
            print_summary(&summary, self.dry_run);
        }

        Ok(ExitCode::from(exit_status(summary.outcome())))
    }
}

fn validate(config: &Config, num: u64) -> Result<()> {
    ensure!(config.page_size > 0, "page size must be at least 1");
    ensure!(
        config.page_size <= MAX_PAGE_SIZE,
        "page size {} exceeds the API limit of {MAX_PAGE_SIZE}",
        config.page_size
    );
    ensure!(num > 0, "number of records to scan must be at least 1");
    Ok(())
}

fn exit_status(outcome: RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Updated => EXIT_UPDATED,
        RunOutcome::NoChanges => EXIT_NO_CHANGES,
    }
}

/// A preset name expands to its category query; anything else is used as-is.
fn resolve_query(raw: &str) -> Query {
    arxsync_source::query::preset(raw).unwrap_or_else(|| Query::from(raw))
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let headline = match summary.outcome() {
        RunOutcome::Updated => format!("✓ {} records updated", summary.total_updated)
            .green()
            .bold(),
        RunOutcome::NoChanges => "· no changes".bright_black().bold(),
    };
    println!(
        "{prefix}{headline} ({} new, {} replaced, {} already stored)",
        summary.totals.new, summary.totals.replaced, summary.totals.had
    );
    println!(
        "  {} page(s), last offset {}, {} records in store",
        summary.pages, summary.final_offset, summary.stored
    );
    println!("  stopped: {}", summary.stop_reason);
}
