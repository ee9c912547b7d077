//! Incremental sync engine.
//!
//! One run walks offsets `start, start + page_size, …` strictly in order:
//!
//! 1. fetch the page through the [`BackoffRetrier`] (retries are invisible here),
//! 2. merge every record into the store,
//! 3. ask the [`TerminationPolicy`] whether to go on,
//! 4. pause politely before the next request.
//!
//! The run ends successfully when the range is scanned or the policy says
//! stop, and fails only when a page cannot be fetched at all.

use std::time::Duration;

use serde::Serialize;

use arxsync_core::{PageSource, Query, RecordStore};

use crate::error::SyncError;
use crate::merge::{self, PageCounts};
use crate::pacing::{Delay, Pacer};
use crate::retry::BackoffRetrier;
use crate::termination::{RunState, StopReason, TerminationPolicy};

pub const DEFAULT_MAX_COUNT: u64 = 100;
pub const DEFAULT_BREAK_AFTER: u32 = 3;

/// Parameters of a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub query: Query,
    pub start: u64,
    /// Upper bound on records scanned: offsets stay below `start + max_count`.
    pub max_count: u64,
    pub page_size: usize,
    /// See [`TerminationPolicy::break_after`].
    pub break_after: u32,
}

impl RunParams {
    pub fn new(query: impl Into<Query>) -> Self {
        Self {
            query: query.into(),
            start: 0,
            max_count: DEFAULT_MAX_COUNT,
            page_size: arxsync_core::config::DEFAULT_PAGE_SIZE,
            break_after: DEFAULT_BREAK_AFTER,
        }
    }

    pub fn with_start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn with_max_count(mut self, max_count: u64) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_break_after(mut self, break_after: u32) -> Self {
        self.break_after = break_after;
        self
    }
}

/// How a successful run turned out, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// At least one record was inserted or replaced.
    Updated,
    /// Nothing changed.
    NoChanges,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Inserted plus replaced records over the whole run.
    pub total_updated: usize,
    /// Offset of the last page merged.
    pub final_offset: u64,
    pub pages: usize,
    #[serde(flatten)]
    pub totals: PageCounts,
    pub stop_reason: StopReason,
    /// Store size after the run.
    pub stored: usize,
}

impl RunSummary {
    pub fn outcome(&self) -> RunOutcome {
        if self.total_updated > 0 {
            RunOutcome::Updated
        } else {
            RunOutcome::NoChanges
        }
    }
}

/// Drives fetch → merge → decide over a borrowed source, store and pacer.
pub struct SyncEngine<'a, Src: ?Sized, St: ?Sized, P: ?Sized> {
    source: &'a mut Src,
    store: &'a mut St,
    pacer: &'a mut P,
    retrier: BackoffRetrier,
    page_pause: Delay,
}

impl<'a, Src, St, P> SyncEngine<'a, Src, St, P>
where
    Src: PageSource + ?Sized,
    St: RecordStore + ?Sized,
    P: Pacer + ?Sized,
{
    pub fn new(source: &'a mut Src, store: &'a mut St, pacer: &'a mut P) -> Self {
        Self {
            source,
            store,
            pacer,
            retrier: BackoffRetrier::default(),
            page_pause: Delay::new(Duration::from_secs(1), Duration::from_secs(3)),
        }
    }

    pub fn with_retrier(mut self, retrier: BackoffRetrier) -> Self {
        self.retrier = retrier;
        self
    }

    /// Politeness pause between consecutive page requests.
    pub fn with_page_pause(mut self, pause: Delay) -> Self {
        self.page_pause = pause;
        self
    }

    pub fn run(&mut self, params: &RunParams) -> Result<RunSummary, SyncError> {
        let page_size = params.page_size.max(1);
        let end = params.start.saturating_add(params.max_count);
        let policy = TerminationPolicy::new(params.break_after);
        let mut state = RunState::new(params.start);
        let mut stop_reason = StopReason::RangeExhausted;
        let mut offset = params.start;

        while offset < end {
            tracing::info!(query = %params.query, offset, "querying source");
            let page = self.retrier.fetch_page(
                &mut *self.source,
                &mut *self.pacer,
                &params.query,
                offset,
                page_size,
                page_size,
            )?;

            let counts = merge::merge_page(&mut *self.store, &page)?;
            state.record_page(offset, counts);

            let stored = self.store.count()?;
            let newest = page
                .newest()
                .map(|r| r.time.format("%b %d %Y").to_string())
                .unwrap_or_default();
            tracing::info!(
                offset,
                records = page.len(),
                %newest,
                had = counts.had,
                replaced = counts.replaced,
                new = counts.new,
                stored,
                "merged page"
            );

            let is_first_page = offset == params.start;
            if let Some(reason) = policy.should_stop(counts.new, is_first_page, &mut state) {
                tracing::info!(%reason, "stopping early");
                stop_reason = reason;
                break;
            }
            if page.reaches_end(offset) {
                stop_reason = StopReason::SourceExhausted;
                break;
            }

            offset = offset.saturating_add(page_size as u64);
            if offset < end {
                self.pacer.pause(self.page_pause);
            }
        }

        let summary = RunSummary {
            total_updated: state.total_updated(),
            final_offset: state.offset,
            pages: state.pages,
            totals: state.totals,
            stop_reason,
            stored: self.store.count()?,
        };
        tracing::info!(
            total_updated = summary.total_updated,
            pages = summary.pages,
            final_offset = summary.final_offset,
            stop = %summary.stop_reason,
            "sync run finished"
        );
        Ok(summary)
    }
}
