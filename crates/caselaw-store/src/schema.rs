//! Canonical relational schema (spec.md §3/§4.3), ported from
//! `examples/original_source/db_schema.py`'s `SCHEMA_SQL`/`INSERT_COLUMNS`:
//! one `decisions` table, an FTS5 shadow index kept in sync by triggers, and
//! a handful of secondary indexes. This module is the single source of
//! truth for row layout — both the ingester and every reader share
//! `INSERT_COLUMNS`, so the two cannot silently drift (spec.md §4.3).

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Column order for `decisions` INSERT/SELECT statements. Must track
/// `caselaw_core::Decision`'s field order (see that struct's doc comment).
pub const INSERT_COLUMNS: &[&str] = &[
    "decision_id",
    "canonical_key",
    "court",
    "canton",
    "chamber",
    "docket_number",
    "docket_number_2",
    "decision_date",
    "publication_date",
    "language",
    "title",
    "legal_area",
    "regeste",
    "abstract_de",
    "abstract_fr",
    "abstract_it",
    "full_text",
    "decision_type",
    "outcome",
    "judges",
    "clerks",
    "collection",
    "appeal_info",
    "source_url",
    "pdf_url",
    "bge_reference",
    "cited_decisions",
    "scraped_at",
    "external_id",
    "source",
    "source_id",
    "source_spider",
    "content_hash",
];

const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS decisions (
        decision_id TEXT PRIMARY KEY,
        canonical_key TEXT NOT NULL,
        court TEXT NOT NULL,
        canton TEXT NOT NULL,
        chamber TEXT,
        docket_number TEXT NOT NULL,
        docket_number_2 TEXT,
        decision_date TEXT,
        publication_date TEXT,
        language TEXT NOT NULL,
        title TEXT,
        legal_area TEXT,
        regeste TEXT,
        abstract_de TEXT,
        abstract_fr TEXT,
        abstract_it TEXT,
        full_text TEXT NOT NULL,
        decision_type TEXT,
        outcome TEXT,
        judges TEXT,
        clerks TEXT,
        collection TEXT,
        appeal_info TEXT,
        source_url TEXT NOT NULL,
        pdf_url TEXT,
        bge_reference TEXT,
        cited_decisions TEXT NOT NULL DEFAULT '[]',
        scraped_at TEXT NOT NULL,
        external_id TEXT,
        source TEXT,
        source_id TEXT,
        source_spider TEXT,
        content_hash TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_decisions_canonical_key ON decisions(canonical_key);
    CREATE INDEX IF NOT EXISTS idx_decisions_court ON decisions(court);
    CREATE INDEX IF NOT EXISTS idx_decisions_canton ON decisions(canton);
    CREATE INDEX IF NOT EXISTS idx_decisions_date ON decisions(decision_date);
    CREATE INDEX IF NOT EXISTS idx_decisions_language ON decisions(language);
    CREATE INDEX IF NOT EXISTS idx_decisions_docket ON decisions(docket_number);

    CREATE VIRTUAL TABLE IF NOT EXISTS decisions_fts USING fts5(
        decision_id UNINDEXED,
        court,
        canton,
        docket_number,
        language,
        title,
        regeste,
        full_text,
        content=decisions,
        content_rowid=rowid,
        tokenize='unicode61 remove_diacritics 2'
    );

    CREATE TRIGGER IF NOT EXISTS decisions_ai AFTER INSERT ON decisions BEGIN
        INSERT INTO decisions_fts(rowid, decision_id, court, canton,
            docket_number, language, title, regeste, full_text)
        VALUES (new.rowid, new.decision_id, new.court, new.canton,
            new.docket_number, new.language, new.title, new.regeste,
            new.full_text);
    END;

    CREATE TRIGGER IF NOT EXISTS decisions_ad AFTER DELETE ON decisions BEGIN
        INSERT INTO decisions_fts(decisions_fts, rowid, decision_id, court,
            canton, docket_number, language, title, regeste, full_text)
        VALUES ('delete', old.rowid, old.decision_id, old.court, old.canton,
            old.docket_number, old.language, old.title, old.regeste,
            old.full_text);
    END;

    CREATE TRIGGER IF NOT EXISTS decisions_au AFTER UPDATE ON decisions BEGIN
        INSERT INTO decisions_fts(decisions_fts, rowid, decision_id, court,
            canton, docket_number, language, title, regeste, full_text)
        VALUES ('delete', old.rowid, old.decision_id, old.court, old.canton,
            old.docket_number, old.language, old.title, old.regeste,
            old.full_text);
        INSERT INTO decisions_fts(rowid, decision_id, court, canton,
            docket_number, language, title, regeste, full_text)
        VALUES (new.rowid, new.decision_id, new.court, new.canton,
            new.docket_number, new.language, new.title, new.regeste,
            new.full_text);
    END;
";

/// Create `decisions`/`decisions_fts` and their sync triggers if absent.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| StoreError::Schema(e.to_string()))?;
    Ok(())
}

#[must_use]
pub fn insert_sql() -> String {
    format!(
        "INSERT INTO decisions ({}) VALUES ({})",
        INSERT_COLUMNS.join(", "),
        INSERT_COLUMNS.iter().map(|_| "?").collect::<Vec<_>>().join(", ")
    )
}

#[must_use]
pub fn insert_or_ignore_sql() -> String {
    format!(
        "INSERT OR IGNORE INTO decisions ({}) VALUES ({})",
        INSERT_COLUMNS.join(", "),
        INSERT_COLUMNS.iter().map(|_| "?").collect::<Vec<_>>().join(", ")
    )
}

#[must_use]
pub fn select_all_sql() -> String {
    format!("SELECT {} FROM decisions", INSERT_COLUMNS.join(", "))
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
                "SELECT count(*) FROM sqlite_master WHERE type='table' AND name='decisions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn fts_trigger_keeps_shadow_index_in_sync() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO decisions (decision_id, canonical_key, court, canton, docket_number, language, full_text, source_url, scraped_at) VALUES ('bger_1', 'bger|1|', 'bger', 'CH', '1', 'de', 'Some full text about Widerspruch', 'https://x', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let hit: i64 = conn
            .query_row(
                "SELECT count(*) FROM decisions_fts WHERE decisions_fts MATCH 'Widerspruch'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hit, 1);

        conn.execute("DELETE FROM decisions WHERE decision_id = 'bger_1'", [])
            .unwrap();
        let hit_after_delete: i64 = conn
            .query_row(
                "SELECT count(*) FROM decisions_fts WHERE decisions_fts MATCH 'Widerspruch'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hit_after_delete, 0);
    }
}
