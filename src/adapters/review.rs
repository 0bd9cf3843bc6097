//! Review Client: `review(source_text, path) -> {success, issues[]}`
//! (spec.md §6), plus the optional "quick parse check" sub-check the
//! Validator uses (spec.md §4.4).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::errors::{Result, WardenError};
use crate::core::issue::Issue;

/// Timeout for a single `review` call (spec.md §5).
pub const REVIEW_TIMEOUT: Duration = Duration::from_secs(30);

/// A source of Issues for a file's content (spec.md §6).
#[async_trait]
pub trait ReviewClient: Send + Sync {
    /// Analyze `source` (the content of `path`) and return the Issues
    /// found. Errors are surfaced to the caller as `Err`; the File
    /// Analyzer maps any `Err` here to an `errors++` and skips the file,
    /// never propagating past it (spec.md §4.2 step 5, §7).
    async fn review(&self, source: &str, path: &str) -> Result<Vec<Issue>>;

    /// Best-effort, narrower sibling of [`ReviewClient::review`] used only
    /// by the Validator's optional parse check (spec.md §4.4). Returns
    /// `Ok(true)` if the candidate parses, `Ok(false)` on a parse error,
    /// and `Err` only for adapter-level failures (timeout, transport).
    async fn quick_parse_check(&self, _candidate: &str, _path: &str) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    success: bool,
    issues: Vec<Issue>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP-backed Review Client for a production deployment.
pub struct HttpReviewClient {
    client: reqwest::Client,
    base_url: String,
    disabled: AtomicBool,
}

impl HttpReviewClient {
    /// Build a client targeting `base_url`, with the shared request
    /// timeout configured.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            disabled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ReviewClient for HttpReviewClient {
    async fn review(&self, source: &str, path: &str) -> Result<Vec<Issue>> {
        if self.disabled.load(Ordering::Relaxed) {
            return Err(WardenError::external_permanent("review", "adapter disabled for this run"));
        }

        let url = format!("{}/review", self.base_url);
        let response = tokio::time::timeout(
            REVIEW_TIMEOUT,
            self.client.post(&url).json(&serde_json::json!({ "source": source, "path": path })).send(),
        )
        .await
        .map_err(|_| WardenError::external_transient("review", "request timed out"))?
        .map_err(|e| WardenError::external_transient("review", e.to_string()))?;

        if response.status().is_client_error() {
            self.disabled.store(true, Ordering::Relaxed);
            return Err(WardenError::external_permanent(
                "review",
                format!("client error: {}", response.status()),
            ));
        }
        if response.status().is_server_error() {
            return Err(WardenError::external_transient(
                "review",
                format!("server error: {}", response.status()),
            ));
        }

        let body: ReviewResponse = response
            .json()
            .await
            .map_err(|e| WardenError::external_transient("review", e.to_string()))?;

        if !body.success {
            return Err(WardenError::external_transient(
                "review",
                body.message.unwrap_or_else(|| "review request failed".to_string()),
            ));
        }
        Ok(body.issues)
    }
}

/// No-op Review Client: returns no issues, used by tests and by `cargo
/// run` without a configured backend so the pipeline's documented
/// fallback behavior runs honestly rather than being mocked away.
#[derive(Debug, Default)]
pub struct StubReviewClient;

#[async_trait]
impl ReviewClient for StubReviewClient {
    async fn review(&self, _source: &str, _path: &str) -> Result<Vec<Issue>> {
        Ok(Vec::new())
    }
}
