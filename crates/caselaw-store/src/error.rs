//! Store-layer error taxonomy (spec.md §7), grounded on
//! `caselaw_core::Error`'s grouped `thiserror` enum + `error_type()`
//! convention.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("decision not found: {0}")]
    NotFound(String),

    #[error("schema violation: {0}")]
    SchemaViolation(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Schema(_) => "SCHEMA_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::SchemaViolation(_) => "SCHEMA_VIOLATION",
            Self::Sqlite(_) => "STORE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::SchemaViolation(_) => 400,
            _ => 500,
        }
    }
}

impl From<StoreError> for caselaw_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::DecisionNotFound(id),
            StoreError::SchemaViolation(msg) => Self::SchemaViolation(msg),
            other => Self::Store(other.to_string()),
        }
    }
}
