//! Per-record merge decision and the page fold that applies it.

use serde::Serialize;

use arxsync_core::{Page, Record, RecordStore, StoreError};

/// What to do with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeVerdict {
    /// Not stored yet.
    Insert,
    /// Stored, but the incoming record is strictly newer.
    Replace,
    /// Stored copy is at least as fresh.
    Skip,
}

/// Decide how `incoming` relates to the stored record with the same id.
pub fn decide(incoming: &Record, existing: Option<&Record>) -> MergeVerdict {
    match existing {
        None => MergeVerdict::Insert,
        Some(stored) if incoming.time > stored.time => MergeVerdict::Replace,
        Some(_) => MergeVerdict::Skip,
    }
}

/// Outcome counts for one page. `had + new + replaced == page.len()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageCounts {
    pub had: usize,
    pub new: usize,
    pub replaced: usize,
}

impl PageCounts {
    /// Records written.
    pub fn updated(&self) -> usize {
        self.new + self.replaced
    }

    pub fn total(&self) -> usize {
        self.had + self.new + self.replaced
    }

    pub fn add(&mut self, other: PageCounts) {
        self.had += other.had;
        self.new += other.new;
        self.replaced += other.replaced;
    }
}

/// Merge every record of `page` into `store`, in page order.
///
/// Writes happen immediately, one record at a time; a store error aborts the
/// fold with earlier records already written.
pub fn merge_page<S: RecordStore + ?Sized>(
    store: &mut S,
    page: &Page,
) -> Result<PageCounts, StoreError> {
    let mut counts = PageCounts::default();
    for record in &page.records {
        let existing = store.get(&record.id)?;
        match decide(record, existing.as_ref()) {
            MergeVerdict::Insert => {
                store.put(record)?;
                counts.new += 1;
            }
            MergeVerdict::Replace => {
                store.put(record)?;
                counts.replaced += 1;
            }
            MergeVerdict::Skip => counts.had += 1,
        }
    }
    Ok(counts)
}
