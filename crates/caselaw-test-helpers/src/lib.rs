//! Shared test fixtures used by every crate's test suite: a small fixed
//! decision corpus and tempdir-backed store builders, so each crate stops
//! re-deriving its own `seeded_conn()` helper.
//!
//! Grounded on `mcp-agent-mail-test-helpers`'s role (shared fixture/factory
//! crate consumed only from `[dev-dependencies]`), adapted to this
//! workspace's domain: decisions instead of repos/shims.

#![forbid(unsafe_code)]

use caselaw_core::{Decision, DecisionBuilder};
use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::TempDir;

/// Build a minimal `Decision` with everything but the identity fields
/// defaulted, for tests that only care about one or two attributes.
#[must_use]
pub fn sample_decision(court: &str, canton: &str, docket: &str, language: &str) -> Decision {
    DecisionBuilder::new(court, canton, docket, language, format!("https://example.test/{court}/{docket}"))
        .decision_date(NaiveDate::from_ymd_opt(2021, 6, 1))
        .full_text(format!("Sample decision text for {court} {docket}."))
        .build()
}

/// A small fixed corpus spanning two federal courts, two cantons, and two
/// languages, with a docket ambiguous enough to double as a multi-candidate
/// citation-resolution fixture (`4A_100/2017`, shared by the bger and
/// zhobger rows below).
#[must_use]
pub fn sample_decisions() -> Vec<Decision> {
    vec![
        DecisionBuilder::new("bger", "CH", "4A_1/2020", "de", "https://example.test/bger/4A_1_2020")
            .decision_date(NaiveDate::from_ymd_opt(2020, 3, 1))
            .full_text("Das Bundesgericht hat Art. 41 OR angewendet.")
            .build(),
        DecisionBuilder::new("bger", "ZH", "4A_100/2017", "de", "https://example.test/bger/4A_100_2017")
            .decision_date(NaiveDate::from_ymd_opt(2017, 9, 12))
            .full_text("Vorinstanz: Obergericht des Kantons Zuerich.")
            .build(),
        DecisionBuilder::new("zhobger", "ZH", "4A_100/2017", "de", "https://example.test/zhobger/4A_100_2017")
            .decision_date(NaiveDate::from_ymd_opt(2017, 1, 1))
            .full_text("Jugement du tribunal superieur.")
            .build(),
        DecisionBuilder::new("bge", "VD", "1C_1/2021", "fr", "https://example.test/bge/1C_1_2021")
            .decision_date(NaiveDate::from_ymd_opt(2021, 1, 15))
            .full_text("Arret du Tribunal federal, premiere cour de droit civil.")
            .build(),
        DecisionBuilder::new("bstger", "TI", "SK_1/2019", "it", "https://example.test/bstger/SK_1_2019")
            .decision_date(NaiveDate::from_ymd_opt(2019, 11, 3))
            .full_text("Sentenza del Tribunale penale federale.")
            .build(),
    ]
}

/// Open an on-disk `decisions.db` in a fresh tempdir with the schema
/// applied but empty. The `TempDir` must outlive the connection.
#[must_use]
pub fn temp_store() -> (TempDir, Connection) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let conn = caselaw_store::open_store(&dir.path().join("decisions.db")).expect("open store");
    (dir, conn)
}

/// Open a tempdir-backed store and ingest [`sample_decisions`] into it.
#[must_use]
pub fn seeded_store() -> (TempDir, Connection) {
    let (dir, conn) = temp_store();
    caselaw_store::run_ingest(&conn, &sample_decisions()).expect("seed store");
    (dir, conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_decisions_cover_more_than_one_court_and_language() {
        let decisions = sample_decisions();
        let courts: std::collections::HashSet<&str> = decisions.iter().map(|d| d.court.as_str()).collect();
        let languages: std::collections::HashSet<&str> = decisions.iter().map(|d| d.language.as_str()).collect();
        assert!(courts.len() > 1);
        assert!(languages.len() > 1);
    }

    #[test]
    fn sample_decisions_contains_an_ambiguous_shared_docket() {
        let decisions = sample_decisions();
        let matching: Vec<&Decision> = decisions.iter().filter(|d| d.docket_number == "4A_100/2017").collect();
        assert_eq!(matching.len(), 2);
        assert_ne!(matching[0].court, matching[1].court);
    }

    #[test]
    fn seeded_store_ingests_every_sample_decision() {
        let (_dir, conn) = seeded_store();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM decisions", [], |row| row.get(0)).unwrap();
        assert_eq!(count, sample_decisions().len() as i64);
    }
}
