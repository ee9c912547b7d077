//! Shared sync pipeline entrypoint used by the CLI.
//!
//! Resolves configuration into a concrete engine (arXiv client, directory
//! store, real pauses) and runs it once.

use std::path::{Path, PathBuf};

use arxsync_core::{Config, FileStore, OverlayStore, PageSource, RecordStore};
use arxsync_source::ArxivClient;

use crate::engine::{RunParams, RunSummary, SyncEngine};
use crate::error::SyncError;
use crate::pacing::{Delay, Pacer, ThreadPacer};
use crate::retry::{BackoffRetrier, RetryConfig};

/// Everything one pipeline run needs beyond the [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub params: RunParams,
    pub store_dir: PathBuf,
    /// Decide and count as usual, but write nothing.
    pub dry_run: bool,
}

impl SyncRequest {
    /// Request built from config values alone; callers override fields.
    pub fn from_config(config: &Config, home: &Path) -> Self {
        Self {
            params: RunParams::new(config.query()).with_page_size(config.page_size),
            store_dir: config.store_dir_at(home),
            dry_run: false,
        }
    }
}

/// Politeness pause between pages, from config.
pub fn page_pause(config: &Config) -> Delay {
    Delay::from_millis(config.page_pause_base_ms, config.page_pause_jitter_ms)
}

/// Run one sync against the live arXiv API.
pub fn run(config: &Config, request: &SyncRequest) -> Result<RunSummary, SyncError> {
    let mut source = ArxivClient::from_config(config);
    let mut pacer = ThreadPacer;
    run_with(&mut source, &mut pacer, config, request)
}

/// [`run`] with the source and pacer supplied by the caller.
pub fn run_with<Src, P>(
    source: &mut Src,
    pacer: &mut P,
    config: &Config,
    request: &SyncRequest,
) -> Result<RunSummary, SyncError>
where
    Src: PageSource + ?Sized,
    P: Pacer + ?Sized,
{
    let retrier = BackoffRetrier::new(RetryConfig::from_config(config));
    let pause = page_pause(config);

    if request.dry_run {
        tracing::info!(store = %request.store_dir.display(), "dry run: no records will be written");
        let base = FileStore::open(&request.store_dir)?;
        let mut overlay = OverlayStore::new(&base);
        return run_engine(source, &mut overlay, pacer, retrier, pause, &request.params);
    }

    let mut store = FileStore::open_or_create(&request.store_dir)?;
    run_engine(source, &mut store, pacer, retrier, pause, &request.params)
}

fn run_engine<Src, St, P>(
    source: &mut Src,
    store: &mut St,
    pacer: &mut P,
    retrier: BackoffRetrier,
    page_pause: Delay,
    params: &RunParams,
) -> Result<RunSummary, SyncError>
where
    Src: PageSource + ?Sized,
    St: RecordStore + ?Sized,
    P: Pacer + ?Sized,
{
    SyncEngine::new(source, store, pacer)
        .with_retrier(retrier)
        .with_page_pause(page_pause)
        .run(params)
}
