//! Graph-layer error taxonomy (spec.md §7), following
//! `caselaw_store::StoreError`'s grouped `thiserror` enum + `error_type()`
//! convention.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reference graph database not found at {0}")]
    NotFound(std::path::PathBuf),

    #[error("decision not found: {0}")]
    UnknownDecision(String),
}

impl GraphError {
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "STORE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::NotFound(_) => "NOT_BUILT",
            Self::UnknownDecision(_) => "NOT_FOUND",
        }
    }

    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::UnknownDecision(_) => 404,
            Self::NotFound(_) => 503,
            _ => 500,
        }
    }
}

impl From<GraphError> for caselaw_core::Error {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UnknownDecision(id) => Self::DecisionNotFound(id),
            GraphError::NotFound(path) => Self::GraphNotAvailable(path.display().to_string()),
            other => Self::Store(other.to_string()),
        }
    }
}
