//! Search-layer error taxonomy (spec.md §7), following
//! `caselaw_store::StoreError`'s grouped `thiserror` enum + `error_type()`
//! convention.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] caselaw_store::StoreError),

    #[error("embedding error: {0}")]
    Embedding(String),
}

impl SearchError {
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "BAD_REQUEST",
            Self::Sqlite(_) | Self::Store(_) => "STORE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Embedding(_) => "EMBEDDING_ERROR",
        }
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidQuery(_) => 400,
            _ => 500,
        }
    }
}

impl From<SearchError> for caselaw_core::Error {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidQuery(msg) => Self::InvalidArgument(msg),
            other => Self::Store(other.to_string()),
        }
    }
}
