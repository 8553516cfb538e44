//! Canonical relational schema, ingester, and read queries (spec.md §4.3):
//! the single source of truth for `Decision` row layout, shared by the FTS
//! index, the vector store, and the reference graph.

pub mod error;
pub mod ingester;
pub mod queries;
pub mod record_log;
pub mod schema;
pub mod state;

pub use error::{Result, StoreError};
pub use ingester::{
    clean_text, dedup_decisions, extract_regeste_from_text, fill_missing_regeste, insert_all,
    insert_decision, normalize_decision, run_ingest, IngestStats,
};
pub use queries::{
    get_decision, get_statistics, list_courts, list_embedding_inputs, CourtCount, EmbeddingRow,
    Statistics,
};
pub use record_log::{read_decisions, JsonlRecordLog};
pub use schema::{apply_schema, insert_or_ignore_sql, insert_sql, select_all_sql, INSERT_COLUMNS};
pub use state::{journal_path, safe_name, FileStateJournal};

/// Open a SQLite connection at `path` and ensure the schema is applied.
/// Uses WAL journaling, matching `examples/original_source/build_fts5.py`'s
/// `PRAGMA journal_mode=WAL` / `PRAGMA synchronous=NORMAL` pragmas.
pub fn open_store(path: &std::path::Path) -> Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    apply_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_store_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.db");
        let conn = open_store(&path).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='decisions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        drop(conn);
        assert!(path.exists());
    }
}
