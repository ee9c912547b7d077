//! Domain types shared by the source client, the store and the sync engine.
//!
//! A [`Record`] is whatever the remote source calls an entry (an arXiv
//! paper here). The engine only ever looks at `id` and `time`; the rest of
//! the entry travels along as an opaque JSON payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Stable identifier of a record at the remote source (version suffix stripped).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque search expression handed to the source client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(pub String);

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Query {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Query {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single entry observed at the remote source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Last-modified timestamp at the source.
    pub time: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Record {
    /// A record with an empty payload.
    pub fn new(id: impl Into<RecordId>, time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            time,
            payload: Map::new(),
        }
    }

    /// Builder-style payload field setter.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// String payload field, if present.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            id: self.id.clone(),
            time: self.time,
        }
    }
}

/// Entry of the lightweight metadata index kept next to the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub id: RecordId,
    pub time: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// One batch of records returned by a single fetch at a given offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub records: Vec<Record>,
    /// Size of the whole result set, when the source reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

impl Page {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            total_results: None,
        }
    }

    pub fn with_total_results(mut self, total: u64) -> Self {
        self.total_results = Some(total);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records a complete page at `offset` must carry.
    ///
    /// With a reported total the tail of the result set may legitimately be
    /// shorter than `page_size`; without one every page is expected full.
    pub fn expected_len(&self, offset: u64, page_size: usize) -> usize {
        match self.total_results {
            Some(total) if total > 0 => {
                let remaining = total.saturating_sub(offset);
                usize::try_from(remaining).map_or(page_size, |r| r.min(page_size))
            }
            _ => page_size,
        }
    }

    /// `true` once this page reaches the end of the reported result set.
    pub fn reaches_end(&self, offset: u64) -> bool {
        match self.total_results {
            Some(total) if total > 0 => offset.saturating_add(self.len() as u64) >= total,
            _ => false,
        }
    }

    /// The record with the most recent `time`, if any.
    pub fn newest(&self) -> Option<&Record> {
        self.records.iter().max_by_key(|r| r.time)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
