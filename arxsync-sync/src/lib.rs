//! # arxsync-sync
//!
//! Incremental merge of a paginated remote source into a record store.
//!
//! - [`retry`]: [`BackoffRetrier`]: bounded retry of one page fetch
//! - [`merge`]: per-record insert / replace / skip decision
//! - [`termination`]: [`TerminationPolicy`]: when to stop fetching
//! - [`engine`]: [`SyncEngine`]: the end-to-end run
//! - [`pipeline`]: config-driven entrypoint used by the CLI

pub mod engine;
pub mod error;
pub mod merge;
pub mod pacing;
pub mod pipeline;
pub mod retry;
pub mod termination;

pub use engine::{RunOutcome, RunParams, RunSummary, SyncEngine};
pub use error::SyncError;
pub use merge::{decide, MergeVerdict, PageCounts};
pub use pacing::{Delay, Pacer, ThreadPacer};
pub use retry::{BackoffRetrier, FetchOutcome, RetryConfig};
pub use termination::{RunState, StopReason, TerminationPolicy};
