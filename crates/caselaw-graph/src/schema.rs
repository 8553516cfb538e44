//! Reference-graph schema (spec.md §4.6), ported from
//! `examples/original_source/search_stack/build_reference_graph.py`'s
//! `SCHEMA_SQL`: a standalone SQLite database, separate from the decision
//! store, recording statute references, case-to-case citations, and
//! resolved citation targets for appeal-chain traversal.

use rusqlite::Connection;

use crate::error::Result;

const SCHEMA_SQL: &str = r"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS decisions (
        decision_id TEXT PRIMARY KEY,
        court TEXT NOT NULL,
        canton TEXT NOT NULL,
        docket_norm TEXT NOT NULL,
        decision_date TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_decisions_docket_norm ON decisions(docket_norm);
    CREATE INDEX IF NOT EXISTS idx_decisions_court ON decisions(court);

    CREATE TABLE IF NOT EXISTS statutes (
        id INTEGER PRIMARY KEY,
        law_code TEXT NOT NULL,
        article TEXT NOT NULL,
        paragraph TEXT,
        normalized TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS decision_statutes (
        decision_id TEXT NOT NULL REFERENCES decisions(decision_id) ON DELETE CASCADE,
        statute_id INTEGER NOT NULL REFERENCES statutes(id) ON DELETE CASCADE,
        raw_text TEXT NOT NULL,
        PRIMARY KEY (decision_id, statute_id)
    );

    CREATE INDEX IF NOT EXISTS idx_decision_statutes_statute ON decision_statutes(statute_id);

    CREATE TABLE IF NOT EXISTS decision_citations (
        id INTEGER PRIMARY KEY,
        source_decision_id TEXT NOT NULL REFERENCES decisions(decision_id) ON DELETE CASCADE,
        target_ref TEXT NOT NULL,
        target_type TEXT NOT NULL,
        raw_text TEXT NOT NULL,
        is_prior_instance INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_decision_citations_source ON decision_citations(source_decision_id);
    CREATE INDEX IF NOT EXISTS idx_decision_citations_target_ref ON decision_citations(target_ref);

    CREATE TABLE IF NOT EXISTS citation_targets (
        citation_id INTEGER NOT NULL REFERENCES decision_citations(id) ON DELETE CASCADE,
        target_decision_id TEXT NOT NULL REFERENCES decisions(decision_id) ON DELETE CASCADE,
        match_type TEXT NOT NULL,
        candidate_rank INTEGER NOT NULL,
        candidate_count INTEGER NOT NULL,
        confidence REAL NOT NULL,
        PRIMARY KEY (citation_id, target_decision_id)
    );

    CREATE INDEX IF NOT EXISTS idx_citation_targets_target ON citation_targets(target_decision_id);
";

/// Create every reference-graph table/index if absent.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_cleanly_and_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='decision_citations'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn foreign_keys_cascade_on_decision_delete() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO decisions (decision_id, court, canton, docket_norm) VALUES ('bger_1', 'bger', 'ZH', '1')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO decision_citations (source_decision_id, target_ref, target_type, raw_text) VALUES ('bger_1', 'x', 'docket', 'x')",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM decisions WHERE decision_id = 'bger_1'", [])
            .unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM decision_citations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
