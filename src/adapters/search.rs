//! Search service: `semantic_search(query, {limit, threshold, file_filter})
//! -> {results: [{path, score}]}` (spec.md §6), used as a Work Selector
//! source-4 hint. Failures are non-fatal.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, WardenError};

/// Timeout for a single search call (spec.md §5, shared with generators).
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Query parameters for a semantic search (spec.md §6).
#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    /// Free-text query, typically a seed issue-pattern phrase.
    pub query: String,
    /// Maximum results to return.
    pub limit: usize,
    /// Minimum similarity score to include a result.
    pub threshold: f64,
    /// Restrict results to paths matching this glob, if set.
    pub file_filter: Option<String>,
}

/// A single search hit.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    /// Repository-relative path.
    pub path: String,
    /// Similarity score in `[0, 1]`.
    pub score: f64,
}

#[async_trait]
/// Semantic-search hint source (spec.md §6).
pub trait SearchService: Send + Sync {
    /// Run a semantic search. Errors are treated as hint-source failures:
    /// callers should log and continue with whatever other sources
    /// produced (spec.md §4.1).
    async fn semantic_search(&self, query: SearchQuery) -> Result<Vec<SearchResult>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

/// HTTP-backed search service.
pub struct HttpSearchService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchService {
    /// Build a client targeting `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SearchService for HttpSearchService {
    async fn semantic_search(&self, query: SearchQuery) -> Result<Vec<SearchResult>> {
        let url = format!("{}/search", self.base_url);
        let response = tokio::time::timeout(SEARCH_TIMEOUT, self.client.post(&url).json(&query).send())
            .await
            .map_err(|_| WardenError::external_transient("search", "request timed out"))?
            .map_err(|e| WardenError::external_transient("search", e.to_string()))?;

        if !response.status().is_success() {
            return Err(WardenError::external_transient(
                "search",
                format!("unexpected status: {}", response.status()),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| WardenError::external_transient("search", e.to_string()))?;
        Ok(body.results)
    }
}

/// No-op search service: always returns an empty result set.
#[derive(Debug, Default)]
pub struct StubSearchService;

#[async_trait]
impl SearchService for StubSearchService {
    async fn semantic_search(&self, _query: SearchQuery) -> Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }
}
