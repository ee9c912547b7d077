//! Durable record store.
//!
//! # Storage layout
//!
//! ```text
//! <store_dir>/
//!   records/<sha256(id)>.json   (full record, one file per id)
//!   metas/<sha256(id)>.json     ({ id, time } index entry)
//! ```
//!
//! File names are the hex SHA-256 of the record id so that ids containing
//! `/` (old-style arXiv ids such as `cs/0101001`) map to flat file names.
//!
//! Every [`RecordStore::put`] is written immediately: record first, then its
//! metadata entry, each through a `.tmp` sibling + rename.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{io_err, json_err, StoreError};
use crate::types::{Record, RecordId, RecordMeta};

const RECORDS_DIR: &str = "records";
const METAS_DIR: &str = "metas";

/// Keyed access to the records collection and its metadata index.
pub trait RecordStore {
    /// Full record stored under `id`.
    fn get(&self, id: &RecordId) -> Result<Option<Record>, StoreError>;

    /// Metadata entry stored under `id`.
    fn get_meta(&self, id: &RecordId) -> Result<Option<RecordMeta>, StoreError>;

    /// Store `record` and its metadata entry, superseding any previous value.
    fn put(&mut self, record: &Record) -> Result<(), StoreError>;

    /// Number of records held.
    fn count(&self) -> Result<usize, StoreError>;

    /// Every metadata entry, in no particular order.
    fn metas(&self) -> Result<Vec<RecordMeta>, StoreError>;
}

/// File name used for `id` in both collections.
pub fn file_key(id: &RecordId) -> String {
    let mut h = Sha256::new();
    h.update(id.as_str().as_bytes());
    format!("{}.json", hex::encode(h.finalize()))
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Directory-backed [`RecordStore`].
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    count: usize,
}

impl FileStore {
    /// Open the store at `root`, creating the directory layout if absent.
    pub fn open_or_create(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for sub in [RECORDS_DIR, METAS_DIR] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        let count = json_files(&root.join(RECORDS_DIR))?.len();
        tracing::debug!(root = %root.display(), count, "opened record store");
        Ok(Self { root, count })
    }

    /// Open the store at `root` for reading without touching the filesystem.
    ///
    /// A missing root or collection directory reads as empty.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let count = json_files(&root.join(RECORDS_DIR))?.len();
        tracing::debug!(root = %root.display(), count, "opened record store read-only");
        Ok(Self { root, count })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(RECORDS_DIR).join(file_key(id))
    }

    pub fn meta_path(&self, id: &RecordId) -> PathBuf {
        self.root.join(METAS_DIR).join(file_key(id))
    }
}

impl RecordStore for FileStore {
    fn get(&self, id: &RecordId) -> Result<Option<Record>, StoreError> {
        read_json(&self.record_path(id))
    }

    fn get_meta(&self, id: &RecordId) -> Result<Option<RecordMeta>, StoreError> {
        read_json(&self.meta_path(id))
    }

    fn put(&mut self, record: &Record) -> Result<(), StoreError> {
        let record_path = self.record_path(&record.id);
        let existed = record_path.exists();
        write_json_atomic(&record_path, record)?;
        write_json_atomic(&self.meta_path(&record.id), &record.meta())?;
        if !existed {
            self.count += 1;
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.count)
    }

    fn metas(&self) -> Result<Vec<RecordMeta>, StoreError> {
        let mut out = Vec::new();
        for path in json_files(&self.root.join(METAS_DIR))? {
            if let Some(meta) = read_json(&path)? {
                out.push(meta);
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(path, e)),
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| json_err(path, e))
}

/// Write `value` to `<path>.tmp` then rename over `path`.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| json_err(path, e))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Every `*.json` file directly under `dir` (leftover `.json.tmp` files skipped).
/// A missing `dir` holds none.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(dir, e)),
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
