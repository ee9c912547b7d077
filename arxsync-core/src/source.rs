//! The remote-source collaborator seen by the sync engine.

use crate::error::SourceError;
use crate::types::{Page, Query};

/// Fetches one page of records from a remote, paginated source.
///
/// Query encoding and what `offset` counts are owned by the implementor.
/// Any error returned here is treated as transient by the caller.
pub trait PageSource {
    fn fetch(&mut self, query: &Query, offset: u64, page_size: usize) -> Result<Page, SourceError>;
}

impl<T: PageSource + ?Sized> PageSource for &mut T {
    fn fetch(&mut self, query: &Query, offset: u64, page_size: usize) -> Result<Page, SourceError> {
        (**self).fetch(query, offset, page_size)
    }
}

impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn fetch(&mut self, query: &Query, offset: u64, page_size: usize) -> Result<Page, SourceError> {
        (**self).fetch(query, offset, page_size)
    }
}
