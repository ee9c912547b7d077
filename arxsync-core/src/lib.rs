//! arxsync core library: domain types, collaborator traits, stores, config.
//!
//! - [`types`]: records, pages, newtypes
//! - [`source`]: [`PageSource`], the remote-source seam
//! - [`store`]: [`RecordStore`] and the directory-backed [`FileStore`]
//! - [`memory`]: in-memory and dry-run stores
//! - [`config`]: YAML configuration
//! - [`error`]: error enums

pub mod config;
pub mod error;
pub mod memory;
pub mod source;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, SourceError, StoreError};
pub use memory::{MemoryStore, OverlayStore};
pub use source::PageSource;
pub use store::{FileStore, RecordStore};
pub use types::{Page, Query, Record, RecordId, RecordMeta};
