//! Error types for bionet-sync
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for bionet-sync
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// YAML profile could not be parsed
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON could not be parsed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    /// Request failed before producing a status code
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status; the body is kept for the negotiator
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// 401/403; distinguishable from transport failures so the caller can
    /// point at credentials
    #[error("Authentication rejected (HTTP {status}): check credentials")]
    Unauthorized {
        /// Status code
        status: u16,
        /// Response body
        body: String,
    },

    /// 429 persisted through retries
    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited {
        /// Server-suggested wait
        retry_after_seconds: u64,
    },

    /// Request timed out
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// Every retry attempt failed
    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded {
        /// Attempts made
        max_retries: u32,
    },

    /// URL did not parse
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // OData / Schema Errors
    // ============================================================================
    /// 400 the negotiator could not recover from
    #[error("Server rejected $select field set: {body}")]
    SchemaMismatch {
        /// Response body
        body: String,
    },

    /// Response payload had an unexpected shape
    #[error("Failed to decode response: {message}")]
    Decode {
        /// What was unexpected
        message: String,
    },

    /// Negotiation removed every requested field
    #[error("Field set exhausted by schema negotiation")]
    EmptyFieldSet,

    // ============================================================================
    // Pager Errors
    // ============================================================================
    /// The hard page ceiling was hit
    #[error("Page iteration limit reached after {pages} pages")]
    IterationLimitExceeded {
        /// Pages fetched before the ceiling
        pages: u64,
    },

    // ============================================================================
    // Output Errors
    // ============================================================================
    /// Arrow batch construction failed
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet writing failed
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Sink-side failure
    #[error("Output error: {message}")]
    Output {
        /// What failed
        message: String,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    /// Contextualized error from `ResultExt`
    #[error("{0}")]
    Other(String),

    /// Wrapped foreign error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an HTTP status error, routing auth failures to their own variant
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::Unauthorized { status, body },
            _ => Self::HttpStatus { status, body },
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(body: impl Into<String>) -> Self {
        Self::SchemaMismatch { body: body.into() }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if this error is a schema mismatch the negotiator may recover from
    pub fn is_negotiable(&self) -> bool {
        matches!(self, Error::SchemaMismatch { .. })
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for bionet-sync
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
