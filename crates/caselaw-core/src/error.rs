//! Top-level error taxonomy (spec.md §7), grounded on
//! `mcp-agent-mail-core/src/error.rs`'s grouped `thiserror` enum + `error_type()`
//! convention.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared across the workspace. Crate-specific errors
/// (`caselaw_fetch::HttpError`, `caselaw_search::SearchError`,
/// `caselaw_graph::GraphError`) convert into this one at crate boundaries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("decision not found: {0}")]
    DecisionNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("graph not available: {0}")]
    GraphNotAvailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// JSON-body `error` discriminant, per spec.md §6/§7.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::DecisionNotFound(_) => "NOT_FOUND",
            Self::InvalidArgument(_) | Self::MissingField(_) => "BAD_REQUEST",
            Self::SchemaViolation(_) => "SCHEMA_VIOLATION",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::GraphNotAvailable(_) => "GRAPH_NOT_AVAILABLE",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for the server's `{"error": "..."}` body (spec.md §7).
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::DecisionNotFound(_) | Self::GraphNotAvailable(_) => 404,
            Self::InvalidArgument(_) | Self::MissingField(_) | Self::SchemaViolation(_) => 400,
            _ => 500,
        }
    }
}
