//! Error taxonomy for warden-rs.
//!
//! Mirrors spec.md §7: every external-collaborator failure is classified
//! as transient or permanent and never aborts the run; the pipeline always
//! has a documented fallback.

use std::io;

use thiserror::Error;

/// Main result type for warden operations.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Comprehensive error type for all warden operations.
#[derive(Error, Debug)]
pub enum WardenError {
    /// I/O related errors (file operations).
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message.
        message: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Configuration errors.
    #[error("Configuration error: {message}")]
    Config {
        /// Error description.
        message: String,
        /// Configuration field that caused the error.
        field: Option<String>,
    },

    /// Validation errors for decoded external data (Issue/FixCandidate).
    #[error("Validation error: {message}")]
    Validation {
        /// Error description.
        message: String,
        /// Field or input that failed validation.
        field: Option<String>,
    },

    /// Pattern registry errors (registration-time invariant violations).
    #[error("Pattern error: {message}")]
    Pattern {
        /// Error description.
        message: String,
        /// Fingerprint of the offending pattern, if known.
        fingerprint: Option<String>,
    },

    /// Cache store errors.
    #[error("Cache error: {message}")]
    Cache {
        /// Error description.
        message: String,
        /// Cache key that caused the issue.
        key: Option<String>,
    },

    /// Fix pipeline/stage errors.
    #[error("Pipeline error at stage '{stage}': {message}")]
    Pipeline {
        /// Pipeline stage where the error occurred.
        stage: String,
        /// Error description.
        message: String,
    },

    /// A transient failure from an external collaborator (store, search,
    /// generator timeouts or 5xx). Retried with back-off inside the
    /// adapter; if retries are exhausted the stage yields no candidate.
    #[error("{adapter} transient failure: {message}")]
    ExternalTransient {
        /// Name of the adapter that failed.
        adapter: String,
        /// Error description.
        message: String,
    },

    /// A permanent failure from an external collaborator (auth failure,
    /// 4xx misconfiguration). Disables the adapter for the rest of the run.
    #[error("{adapter} permanent failure: {message}")]
    ExternalPermanent {
        /// Name of the adapter that failed.
        adapter: String,
        /// Error description.
        message: String,
    },

    /// Concurrency and locking errors.
    #[error("Concurrency error: {message}")]
    Concurrency {
        /// Error description.
        message: String,
    },

    /// Generic internal errors / invariant violations.
    #[error("Internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
        /// Additional context.
        context: Option<String>,
    },
}

impl WardenError {
    /// Create a new I/O error with context.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context.
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new validation error scoped to a field.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new pattern error.
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern {
            message: message.into(),
            fingerprint: None,
        }
    }

    /// Create a new cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            key: None,
        }
    }

    /// Create a new pipeline error.
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new transient external error.
    pub fn external_transient(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalTransient {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Create a new permanent external error.
    pub fn external_permanent(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalPermanent {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Create a new concurrency error.
    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::Concurrency {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Whether this error originated from an external collaborator and is
    /// safe to swallow (log and advance to the next stage) per spec.md §7's
    /// propagation rule.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Self::ExternalTransient { .. } | Self::ExternalPermanent { .. }
        )
    }

    /// Add context to an existing error.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        if let Self::Internal { context: ctx, .. } = &mut self {
            *ctx = Some(context.into());
        }
        self
    }
}

impl From<io::Error> for WardenError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation {
            message: format!("JSON error: {err}"),
            field: None,
        }
    }
}

impl From<serde_yaml::Error> for WardenError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config {
            message: format!("YAML error: {err}"),
            field: None,
        }
    }
}

/// Result extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<WardenError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}
