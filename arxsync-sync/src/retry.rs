//! Bounded retry of page fetches with randomized backoff.
//!
//! An attempt fails when the source errors, or when it answers with fewer
//! records than a complete page at that offset must hold. A short page is
//! only accepted as genuine when the source reports a non-zero total and the
//! page reaches it (see [`Page::expected_len`]).

use std::time::Duration;

use arxsync_core::{Config, Page, PageSource, Query, SourceError};

use crate::error::SyncError;
use crate::pacing::{Delay, Pacer};

/// Retry budget and pauses for [`BackoffRetrier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts before giving up on a page (at least one is always made).
    pub max_attempts: u32,
    /// Pause after each failed attempt except the last.
    pub backoff: Delay,
    /// Pause after a successful fetch, before handing the page back.
    pub success_pause: Delay,
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A single attempt, no pauses.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Delay::ZERO,
            success_pause: Delay::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Delay::from_millis(config.retry_base_ms, config.retry_jitter_ms),
            success_pause: Delay::from_millis(config.success_pause_ms, 0),
        }
    }

    pub fn with_backoff(mut self, backoff: Delay) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_success_pause(mut self, pause: Delay) -> Self {
        self.success_pause = pause;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: arxsync_core::config::DEFAULT_MAX_ATTEMPTS,
            backoff: Delay::new(Duration::from_secs(2), Duration::from_secs(4)),
            success_pause: Delay::fixed(Duration::from_millis(500)),
        }
    }
}

/// Result of a single fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Page),
    Transient(String),
}

impl FetchOutcome {
    /// Classify a raw fetch result for the page at `offset`.
    pub fn classify(
        result: Result<Page, SourceError>,
        offset: u64,
        expected_size: usize,
    ) -> Self {
        match result {
            Err(err) => FetchOutcome::Transient(err.to_string()),
            Ok(page) => {
                let expected = page.expected_len(offset, expected_size);
                if page.len() < expected {
                    FetchOutcome::Transient(format!(
                        "short page: got {} of {expected} records",
                        page.len()
                    ))
                } else {
                    FetchOutcome::Success(page)
                }
            }
        }
    }
}

/// Wraps a [`PageSource`] fetch with bounded retry.
#[derive(Debug, Clone, Default)]
pub struct BackoffRetrier {
    config: RetryConfig,
}

impl BackoffRetrier {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Fetch the page at `offset`, retrying until it is complete or the
    /// attempt budget is spent.
    pub fn fetch_page<Src, P>(
        &self,
        source: &mut Src,
        pacer: &mut P,
        query: &Query,
        offset: u64,
        page_size: usize,
        expected_size: usize,
    ) -> Result<Page, SyncError>
    where
        Src: PageSource + ?Sized,
        P: Pacer + ?Sized,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            let result = source.fetch(query, offset, page_size);
            match FetchOutcome::classify(result, offset, expected_size) {
                FetchOutcome::Success(page) => {
                    if attempt > 1 {
                        tracing::info!(offset, attempt, "page fetched after retry");
                    }
                    pacer.pause(self.config.success_pause);
                    return Ok(page);
                }
                FetchOutcome::Transient(reason) => {
                    tracing::warn!(offset, attempt, max_attempts, %reason, "page fetch failed, will try again in a bit");
                    last_reason = reason;
                    if attempt < max_attempts {
                        pacer.pause(self.config.backoff);
                    }
                }
            }
        }

        tracing::error!(offset, attempts = max_attempts, "retries exhausted, giving up");
        Err(SyncError::FetchExhausted {
            offset,
            attempts: max_attempts,
            last_reason,
        })
    }
}
