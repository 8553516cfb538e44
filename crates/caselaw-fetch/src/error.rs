//! Fetch-layer error taxonomy (spec.md §4.1/§7), grounded on
//! `mcp-agent-mail-core/src/error.rs`'s grouped `thiserror` enum convention.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HttpError>;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} was blocked after {attempts} cookie-refresh attempts")]
    Blocked { url: String, attempts: u32 },

    #[error("cookie harvest failed: {0}")]
    HarvestFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HttpError {
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::HttpStatus { .. } => "HTTP_STATUS",
            Self::Blocked { .. } => "BLOCKED",
            Self::HarvestFailed(_) => "HARVEST_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether a retry (with the same or refreshed cookies) might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Blocked { .. }
        ) || matches!(self, Self::HttpStatus { status, .. } if *status == 429 || *status >= 500)
    }
}
