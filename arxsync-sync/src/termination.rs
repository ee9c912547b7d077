//! Run state and the early-termination heuristic.

use std::fmt;

use serde::Serialize;

use crate::merge::PageCounts;

/// Why a run stopped fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// The first page held nothing new; the newest data is already known.
    FirstPageKnown,
    /// `streak` consecutive pages held nothing new.
    CaughtUp { streak: u32 },
    /// Every offset in `start..start + max_count` was processed.
    RangeExhausted,
    /// The source reported no records beyond the last page.
    SourceExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FirstPageKnown => write!(f, "first page had no new records"),
            StopReason::CaughtUp { streak } => {
                write!(f, "no new records {streak} page(s) in a row")
            }
            StopReason::RangeExhausted => write!(f, "requested range scanned"),
            StopReason::SourceExhausted => write!(f, "reached end of source"),
        }
    }
}

/// Mutable state threaded through one run. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    /// Offset of the last page merged (the start offset before any page).
    pub offset: u64,
    pub zero_new_streak: u32,
    pub pages: usize,
    pub totals: PageCounts,
}

impl RunState {
    pub fn new(start: u64) -> Self {
        Self {
            offset: start,
            ..Self::default()
        }
    }

    pub fn record_page(&mut self, offset: u64, counts: PageCounts) {
        self.offset = offset;
        self.pages += 1;
        self.totals.add(counts);
    }

    pub fn total_updated(&self) -> usize {
        self.totals.updated()
    }
}

/// Decides when further pages are not worth fetching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminationPolicy {
    /// Consecutive zero-new pages that end the run; 0 disables the check.
    pub break_after: u32,
}

impl TerminationPolicy {
    pub fn new(break_after: u32) -> Self {
        Self { break_after }
    }

    /// Observe a page that contributed `page_new` new records.
    ///
    /// Replacements do not count as new.
    pub fn should_stop(
        &self,
        page_new: usize,
        is_first_page: bool,
        state: &mut RunState,
    ) -> Option<StopReason> {
        if page_new > 0 {
            state.zero_new_streak = 0;
            return None;
        }

        state.zero_new_streak += 1;
        if is_first_page {
            return Some(StopReason::FirstPageKnown);
        }
        if self.break_after > 0 && state.zero_new_streak >= self.break_after {
            return Some(StopReason::CaughtUp {
                streak: state.zero_new_streak,
            });
        }
        None
    }
}
