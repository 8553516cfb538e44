//! Shared server state: one connection per store, opened once at startup
//! and guarded by a `Mutex` for the thread-per-connection accept loop
//! (spec.md §5: "the relational store is opened read-only by query paths").

use std::path::PathBuf;
use std::sync::Mutex;

use caselaw_core::paths::PathLayout;
use caselaw_search::{Embedder, HashEmbedder};
use rusqlite::Connection;

pub struct AppState {
    pub store_conn: Mutex<Connection>,
    pub vector_conn: Mutex<Option<Connection>>,
    pub embedder: Option<Box<dyn Embedder>>,
    pub graph_db_path: PathBuf,
    pub search_backend: &'static str,
}

impl AppState {
    /// Open the decision store read-only, and the vector store / embedder
    /// if a vector database exists at `paths.vectors_db()`. The reference
    /// graph is opened lazily per-request (spec.md §4.7: "if no graph store
    /// is present, return an error without raising").
    pub fn open(paths: &PathLayout) -> caselaw_core::Result<Self> {
        let store_path = paths.decisions_db();
        let store_conn = Connection::open_with_flags(
            &store_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        )
        .map_err(|e| caselaw_core::Error::Store(e.to_string()))?;

        let vectors_path = paths.vectors_db();
        let (vector_conn, embedder, backend) = if vectors_path.exists() {
            let conn = Connection::open_with_flags(&vectors_path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
                .map_err(|e| caselaw_core::Error::Store(e.to_string()))?;
            let embedder: Box<dyn Embedder> = Box::new(HashEmbedder::from_config(&caselaw_core::Config::default()));
            (Some(conn), Some(embedder), "hybrid_rrf")
        } else {
            (None, None, "sqlite_fts5")
        };

        Ok(Self {
            store_conn: Mutex::new(store_conn),
            vector_conn: Mutex::new(vector_conn),
            embedder,
            graph_db_path: paths.reference_graph_db(),
            search_backend: backend,
        })
    }
}
