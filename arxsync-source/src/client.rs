//! Blocking HTTP client for the arXiv query API.

use std::time::Duration;

use arxsync_core::{Config, Page, PageSource, Query, SourceError};

use crate::atom;

const USER_AGENT: &str = concat!("arxsync/", env!("CARGO_PKG_VERSION"));

/// Largest `max_results` the API honours in one request. Asking for more
/// yields short pages that never fill.
pub const MAX_PAGE_SIZE: usize = 2_000;

/// [`PageSource`] backed by `export.arxiv.org/api/query`.
///
/// Results are requested newest-first by last-updated date, so offset 0
/// always holds the most recently changed records.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl ArxivClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint.clone(), config.timeout())
    }

    /// Full request URL. The query is appended verbatim; it is already in the
    /// API's `+OR+` form.
    pub fn request_url(&self, query: &Query, offset: u64, page_size: usize) -> String {
        format!(
            "{}?search_query={}&sortBy=lastUpdatedDate&sortOrder=descending&start={}&max_results={}",
            self.endpoint.trim_end_matches('?'),
            query,
            offset,
            page_size
        )
    }
}

impl PageSource for ArxivClient {
    fn fetch(&mut self, query: &Query, offset: u64, page_size: usize) -> Result<Page, SourceError> {
        let url = self.request_url(query, offset, page_size);
        tracing::debug!(%url, "querying arxiv api");

        let response = self.agent.get(&url).call().map_err(|e| SourceError::Http {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let body = response.into_string()?;
        atom::parse_feed(&body)
    }
}
