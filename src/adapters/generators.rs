//! Generator backends: `generate(issue, source_text, path, hints) ->
//! {code, method, confidence} | none` (spec.md §6), driving the Fix
//! Pipeline's generator cascade (spec.md §4.3 stage 4).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::candidate::Method;
use crate::core::errors::{Result, WardenError};
use crate::core::issue::Issue;

/// Timeout for a single generator call (spec.md §5).
pub const GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Enumerated hint bag a caller may attach to a generator request
/// (SPEC_FULL.md §6 / spec.md §6 `hints`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorHints {
    /// Coding-convention hints (indent style, quote style, etc.).
    pub conventions: Option<String>,
    /// Textually similar prior fixes, for few-shot context.
    pub similar_patterns: Vec<String>,
    /// Existing fixes already applied nearby in this run.
    pub existing_fixes: Vec<String>,
    /// Observed code-style descriptor.
    pub code_style: Option<String>,
    /// Free-text domain hint, used as a Learner calibration-bucket key.
    pub domain: Option<String>,
    /// Risk score in `[0, 1]` from an external impact analyzer.
    pub risk_score: Option<f64>,
    /// Whether the impact analyzer flagged this issue as high risk.
    pub is_high_risk: bool,
}

/// A successful generator response.
#[derive(Debug, Clone)]
pub struct GeneratedFix {
    /// The rewritten file content.
    pub code: String,
    /// Raw confidence reported by the backend.
    pub confidence: f64,
}

/// One backend in the generator cascade (spec.md §4.3 stage 4).
#[async_trait]
pub trait FixGenerator: Send + Sync {
    /// The [`Method`] tag this backend's candidates are recorded under.
    fn method(&self) -> Method;

    /// Attempt to generate a fix. Returns `Ok(None)` when the backend has
    /// no suggestion (not an error); `Err` is reserved for adapter-level
    /// failures and is swallowed by the cascade per spec.md §7.
    async fn generate(
        &self,
        issue: &Issue,
        source_text: &str,
        path: &str,
        hints: &GeneratorHints,
    ) -> Result<Option<GeneratedFix>>;
}

#[derive(Debug, Deserialize)]
struct GeneratorResponse {
    code: Option<String>,
    confidence: Option<f64>,
}

/// HTTP-backed generator backend.
pub struct HttpFixGenerator {
    client: reqwest::Client,
    base_url: String,
    method: Method,
}

impl HttpFixGenerator {
    /// Build a generator targeting `base_url`, tagged with `method`.
    pub fn new(base_url: impl Into<String>, method: Method, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            method,
        }
    }
}

#[async_trait]
impl FixGenerator for HttpFixGenerator {
    fn method(&self) -> Method {
        self.method
    }

    async fn generate(
        &self,
        issue: &Issue,
        source_text: &str,
        path: &str,
        hints: &GeneratorHints,
    ) -> Result<Option<GeneratedFix>> {
        let url = format!("{}/generate", self.base_url);
        let payload = serde_json::json!({
            "issue": issue,
            "source_text": source_text,
            "path": path,
            "hints": hints,
        });

        let response = tokio::time::timeout(GENERATOR_TIMEOUT, self.client.post(&url).json(&payload).send())
            .await
            .map_err(|_| WardenError::external_transient("generator", "request timed out"))?
            .map_err(|e| WardenError::external_transient("generator", e.to_string()))?;

        if response.status().is_server_error() {
            return Err(WardenError::external_transient(
                "generator",
                format!("server error: {}", response.status()),
            ));
        }
        if response.status().is_client_error() {
            return Err(WardenError::external_permanent(
                "generator",
                format!("client error: {}", response.status()),
            ));
        }

        let body: GeneratorResponse = response
            .json()
            .await
            .map_err(|e| WardenError::external_transient("generator", e.to_string()))?;

        match (body.code, body.confidence) {
            (Some(code), Some(confidence)) => Ok(Some(GeneratedFix { code, confidence })),
            _ => Ok(None),
        }
    }
}

/// No-op generator backend, used by tests and as the default when no
/// endpoint is configured.
pub struct StubFixGenerator {
    method: Method,
}

impl StubFixGenerator {
    /// Build a stub tagged with `method`.
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

#[async_trait]
impl FixGenerator for StubFixGenerator {
    fn method(&self) -> Method {
        self.method
    }

    async fn generate(
        &self,
        _issue: &Issue,
        _source_text: &str,
        _path: &str,
        _hints: &GeneratorHints,
    ) -> Result<Option<GeneratedFix>> {
        Ok(None)
    }
}

/// Run the generator cascade (spec.md §4.3 stage 4): invoke each backend
/// in order, stopping at the first success. Individual backend failures
/// are swallowed (logged by the caller) so the cascade always proceeds.
pub async fn run_cascade(
    backends: &[Box<dyn FixGenerator>],
    issue: &Issue,
    source_text: &str,
    path: &str,
    hints: &GeneratorHints,
) -> Option<(Method, GeneratedFix)> {
    for backend in backends {
        if let Ok(Some(fix)) = backend.generate(issue, source_text, path, hints).await {
            return Some((backend.method(), fix));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::issue::{Safety, Severity, SourceSpan};

    fn issue() -> Issue {
        Issue {
            file_path: "a.js".to_string(),
            span: SourceSpan {
                line_start: 1,
                line_end: 1,
                column: None,
            },
            kind: crate::core::issue::IssueKind::Other,
            severity: Severity::Low,
            message: "x".to_string(),
            code: None,
            hint: None,
            safety: Safety::Safe,
        }
    }

    #[tokio::test]
    async fn test_stub_yields_nothing() {
        let backend = StubFixGenerator::new(Method::GeneratorCtx);
        let result = backend.generate(&issue(), "src", "a.js", &GeneratorHints::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_cascade_falls_through_all_stub_backends() {
        let backends: Vec<Box<dyn FixGenerator>> = vec![
            Box::new(StubFixGenerator::new(Method::GeneratorCtx)),
            Box::new(StubFixGenerator::new(Method::GeneratorCodebase)),
            Box::new(StubFixGenerator::new(Method::GeneratorAdvanced)),
        ];
        let result = run_cascade(&backends, &issue(), "src", "a.js", &GeneratorHints::default()).await;
        assert!(result.is_none());
    }
}
