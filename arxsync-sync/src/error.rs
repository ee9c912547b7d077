//! Error types for arxsync-sync.

use thiserror::Error;

use arxsync_core::StoreError;

/// Errors that abort a sync run.
///
/// Transient fetch failures never surface here; they are absorbed by the
/// retrier until its attempt budget runs out.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Every attempt to fetch the page at `offset` failed.
    #[error("gave up fetching offset {offset} after {attempts} attempt(s): {last_reason}")]
    FetchExhausted {
        offset: u64,
        attempts: u32,
        last_reason: String,
    },

    /// The record store failed; nothing after the failing write was merged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
