//! In-memory stores: [`MemoryStore`] for tests, [`OverlayStore`] for dry runs.

use std::collections::HashMap;

use crate::error::StoreError;
use crate::store::RecordStore;
use crate::types::{Record, RecordId, RecordMeta};

/// `HashMap`-backed [`RecordStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: HashMap<RecordId, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store without going through the sync engine.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(id).cloned())
    }

    fn get_meta(&self, id: &RecordId) -> Result<Option<RecordMeta>, StoreError> {
        Ok(self.records.get(id).map(Record::meta))
    }

    fn put(&mut self, record: &Record) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }

    fn metas(&self) -> Result<Vec<RecordMeta>, StoreError> {
        Ok(self.records.values().map(Record::meta).collect())
    }
}

/// Read-through overlay: reads fall back to `base`, writes stay in memory.
///
/// Used by `--dry-run` so a run decides exactly as it would against the
/// durable store without modifying it.
#[derive(Debug)]
pub struct OverlayStore<'a, S: RecordStore> {
    base: &'a S,
    writes: MemoryStore,
    added: usize,
}

impl<'a, S: RecordStore> OverlayStore<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            writes: MemoryStore::new(),
            added: 0,
        }
    }

    /// Records the run would have written.
    pub fn pending(&self) -> &MemoryStore {
        &self.writes
    }
}

impl<S: RecordStore> RecordStore for OverlayStore<'_, S> {
    fn get(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        match self.writes.get(id)? {
            Some(r) => Ok(Some(r)),
            None => self.base.get(id),
        }
    }

    fn get_meta(&self, id: &RecordId) -> Result<Option<RecordMeta>, StoreError> {
        match self.writes.get_meta(id)? {
            Some(m) => Ok(Some(m)),
            None => self.base.get_meta(id),
        }
    }

    fn put(&mut self, record: &Record) -> Result<(), StoreError> {
        if !self.writes.contains(&record.id) && self.base.get_meta(&record.id)?.is_none() {
            self.added += 1;
        }
        self.writes.put(record)
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.base.count()? + self.added)
    }

    fn metas(&self) -> Result<Vec<RecordMeta>, StoreError> {
        let mut metas: HashMap<RecordId, RecordMeta> = self
            .base
            .metas()?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();
        for meta in self.writes.metas()? {
            metas.insert(meta.id.clone(), meta);
        }
        Ok(metas.into_values().collect())
    }
}
