//! `arxsync status`: store size and most recently updated records.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use arxsync_core::{config, FileStore, RecordStore};

/// Arguments for `arxsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of recent records to list.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Record store directory.
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = config::home()?;
        let config = config::load_at(&home).context("failed to load configuration")?;
        let store_dir = self
            .store
            .clone()
            .unwrap_or_else(|| config.store_dir_at(&home));

        let report = build_report(&store_dir, self.limit)
            .with_context(|| format!("failed to read store at {}", store_dir.display()))?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    store: PathBuf,
    count: usize,
    recent: Vec<RecentRecord>,
}

#[derive(Debug, Serialize)]
struct RecentRecord {
    id: String,
    updated: DateTime<Utc>,
    age: String,
    title: String,
}

#[derive(Tabled)]
struct RecentTableRow {
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "updated")]
    updated: String,
    #[tabled(rename = "age")]
    age: String,
    #[tabled(rename = "title")]
    title: String,
}

fn build_report(store_dir: &Path, limit: usize) -> Result<StatusReport> {
    let store = FileStore::open(store_dir)?;
    let mut metas = store.metas()?;
    metas.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.id.cmp(&b.id)));
    metas.truncate(limit);

    let mut recent = Vec::with_capacity(metas.len());
    for meta in metas {
        let title = store
            .get(&meta.id)?
            .and_then(|r| r.field_str("title").map(str::to_owned))
            .unwrap_or_default();
        recent.push(RecentRecord {
            id: meta.id.to_string(),
            updated: meta.time,
            age: format_age(meta.time, Utc::now()),
            title,
        });
    }

    Ok(StatusReport {
        store: store.root().to_path_buf(),
        count: store.count()?,
        recent,
    })
}

fn print_table(report: StatusReport) {
    println!(
        "arxsync v{} | {} records | {}",
        env!("CARGO_PKG_VERSION"),
        report.count.to_string().bold(),
        report.store.display().to_string().bright_black(),
    );

    if report.recent.is_empty() {
        println!("Store is empty. Run 'arxsync sync' to fetch records.");
        return;
    }

    let rows: Vec<RecentTableRow> = report
        .recent
        .into_iter()
        .map(|r| RecentTableRow {
            id: r.id,
            updated: r.updated.format("%b %d %Y").to_string(),
            age: r.age,
            title: truncate(&r.title, 72),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn format_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(timestamp).num_seconds().max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
