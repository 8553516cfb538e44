//! Reference-graph construction (spec.md §4.6), ported from
//! `build_reference_graph.py`'s `build_graph` main loop: extract statute
//! references and case citations from every decision's full text, then
//! resolve citation targets against the decision corpus in two SQL passes.
//!
//! Unlike the original, this also runs `extract_prior_instance` during the
//! build and flags the resulting `decision_citations` rows
//! `is_prior_instance = 1` — the original never wires prior-instance
//! extraction into the graph despite `find_appeal_chain` depending on it.

use std::path::Path;

use caselaw_core::normalize::normalize_docket;
use caselaw_core::paths::atomic_build;
use caselaw_extract::reference::{extract_case_citations, extract_prior_instance, extract_statute_references, CitationType};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::confidence::{citation_confidence, ConfidenceInput};
use crate::error::Result;
use crate::schema::apply_schema;

/// One row read out of the decision store, the only input this crate needs
/// from `caselaw-store` (kept as plain columns rather than a dependency on
/// that crate's `Decision` type, matching how the original reads a flat
/// `decisions.db` connection without importing its ingester).
#[derive(Debug, Clone)]
pub struct DecisionRow {
    pub decision_id: String,
    pub court: String,
    pub canton: String,
    pub docket_number: String,
    pub decision_date: Option<NaiveDate>,
    pub full_text: String,
}

/// Read every decision's identity/date/text columns needed to build the
/// reference graph, straight off the decision store connection.
pub fn load_decision_rows(store_conn: &Connection) -> Result<Vec<DecisionRow>> {
    let mut stmt = store_conn.prepare(
        "SELECT decision_id, court, canton, docket_number, decision_date, full_text FROM decisions",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let date_raw: Option<String> = row.get(4)?;
            Ok(DecisionRow {
                decision_id: row.get(0)?,
                court: row.get(1)?,
                canton: row.get(2)?,
                docket_number: row.get(3)?,
                decision_date: date_raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
                full_text: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GraphBuildStats {
    pub decisions_processed: usize,
    pub statutes_found: usize,
    pub citations_found: usize,
    pub prior_instances_found: usize,
    pub citations_resolved: usize,
}

/// Build the reference graph database at `graph_path` from the given
/// decision rows, atomically (write-tmp-then-rename).
pub fn build_reference_graph(graph_path: &Path, decisions: &[DecisionRow]) -> Result<GraphBuildStats> {
    let mut stats = GraphBuildStats::default();
    atomic_build(graph_path, |tmp| -> Result<()> {
        let conn = Connection::open(tmp)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        apply_schema(&conn)?;
        insert_decisions(&conn, decisions)?;
        extract_and_insert(&conn, decisions, &mut stats)?;
        resolve_docket_targets(&conn, &mut stats)?;
        resolve_bge_targets(&conn, &mut stats)?;
        Ok(())
    })?;
    Ok(stats)
}

fn insert_decisions(conn: &Connection, decisions: &[DecisionRow]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO decisions (decision_id, court, canton, docket_norm, decision_date) VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for d in decisions {
        stmt.execute(rusqlite::params![
            d.decision_id,
            d.court,
            d.canton,
            normalize_docket(&d.docket_number),
            d.decision_date.map(|date| date.format("%Y-%m-%d").to_string()),
        ])?;
    }
    Ok(())
}

fn upsert_statute(conn: &Connection, law_code: &str, article: &str, paragraph: Option<&str>, normalized: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO statutes (law_code, article, paragraph, normalized) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![law_code, article, paragraph, normalized],
    )?;
    let id: i64 = conn.query_row(
        "SELECT id FROM statutes WHERE normalized = ?1",
        [normalized],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn extract_and_insert(conn: &Connection, decisions: &[DecisionRow], stats: &mut GraphBuildStats) -> Result<()> {
    for d in decisions {
        stats.decisions_processed += 1;

        for statute in extract_statute_references(&d.full_text) {
            let statute_id = upsert_statute(
                conn,
                &statute.law_code,
                &statute.article,
                statute.paragraph.as_deref(),
                &statute.normalized,
            )?;
            conn.execute(
                "INSERT OR IGNORE INTO decision_statutes (decision_id, statute_id, raw_text) VALUES (?1, ?2, ?3)",
                rusqlite::params![d.decision_id, statute_id, statute.raw],
            )?;
            stats.statutes_found += 1;
        }

        for citation in extract_case_citations(&d.full_text) {
            let target_type = match citation.citation_type {
                CitationType::Bge => "bge",
                CitationType::Docket => "docket",
            };
            conn.execute(
                "INSERT INTO decision_citations (source_decision_id, target_ref, target_type, raw_text, is_prior_instance) VALUES (?1, ?2, ?3, ?4, 0)",
                rusqlite::params![d.decision_id, citation.normalized, target_type, citation.raw],
            )?;
            stats.citations_found += 1;
        }

        for prior_docket in extract_prior_instance(Some(&d.full_text)) {
            conn.execute(
                "INSERT INTO decision_citations (source_decision_id, target_ref, target_type, raw_text, is_prior_instance) VALUES (?1, ?2, 'docket', ?2, 1)",
                rusqlite::params![d.decision_id, prior_docket],
            )?;
            stats.prior_instances_found += 1;
        }
    }
    Ok(())
}

struct Candidate {
    citation_id: i64,
    source_court: String,
    source_canton: String,
    source_date: Option<NaiveDate>,
    target_decision_id: String,
    target_court: String,
    target_canton: String,
    target_date: Option<NaiveDate>,
    target_docket_norm: String,
    candidate_rank: i64,
    candidate_count: i64,
}

fn parse_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Pass 1: resolve `target_type = 'docket'` citations against
/// `decisions.docket_norm`, per `_resolve_citation_targets`'s first SQL pass.
fn resolve_docket_targets(conn: &Connection, stats: &mut GraphBuildStats) -> Result<()> {
    let sql = "
        SELECT c.id, s.court, s.canton, s.decision_date,
               t.decision_id, t.court, t.canton, t.decision_date, t.docket_norm,
               ROW_NUMBER() OVER (PARTITION BY c.id ORDER BY t.decision_date DESC, t.decision_id) AS candidate_rank,
               COUNT(*) OVER (PARTITION BY c.id) AS candidate_count
        FROM decision_citations c
        JOIN decisions s ON s.decision_id = c.source_decision_id
        JOIN decisions t ON t.docket_norm = c.target_ref AND t.decision_id != c.source_decision_id
        WHERE c.target_type = 'docket'
    ";
    resolve_candidates(conn, sql, "docket_norm", stats)
}

/// Pass 2: resolve `target_type = 'bge'` citations where `target_ref` is
/// `"BGE <vol> <div> <page>"` against `docket_norm = SUBSTR(target_ref, 5)`
/// for `bge`/`bger` targets, per the second SQL pass. `candidate_rank`/
/// `candidate_count` are hardcoded to 1, matching the original (a BGE
/// reference is treated as unambiguous once matched).
fn resolve_bge_targets(conn: &Connection, stats: &mut GraphBuildStats) -> Result<()> {
    let sql = "
        SELECT c.id, s.court, s.canton, s.decision_date,
               t.decision_id, t.court, t.canton, t.decision_date, t.docket_norm,
               1 AS candidate_rank,
               1 AS candidate_count
        FROM decision_citations c
        JOIN decisions s ON s.decision_id = c.source_decision_id
        JOIN decisions t ON t.docket_norm = SUBSTR(c.target_ref, 5) AND t.court IN ('bge', 'bger')
        WHERE c.target_type = 'bge' AND c.target_ref LIKE 'BGE %'
    ";
    resolve_candidates(conn, sql, "bge_norm", stats)
}

/// Store every resolved candidate for each citation, not just the
/// best-ranked one: a `(source_decision_id, target_ref)` pair may
/// legitimately match several decisions (spec.md §3/§4.6), so downstream
/// consumers need to see the full candidate set and its ranking, not a
/// single collapsed winner.
fn resolve_candidates(conn: &Connection, sql: &str, match_type: &str, stats: &mut GraphBuildStats) -> Result<()> {
    let mut stmt = conn.prepare(sql)?;
    let candidates = stmt
        .query_map([], |row| {
            Ok(Candidate {
                citation_id: row.get(0)?,
                source_court: row.get(1)?,
                source_canton: row.get(2)?,
                source_date: parse_date(row.get(3)?),
                target_decision_id: row.get(4)?,
                target_court: row.get(5)?,
                target_canton: row.get(6)?,
                target_date: parse_date(row.get(7)?),
                target_docket_norm: row.get(8)?,
                candidate_rank: row.get(9)?,
                candidate_count: row.get(10)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    drop(stmt);

    for candidate in candidates {
        let confidence = citation_confidence(ConfidenceInput {
            source_court: &candidate.source_court,
            source_canton: &candidate.source_canton,
            source_date: candidate.source_date,
            target_court: &candidate.target_court,
            target_canton: &candidate.target_canton,
            target_date: candidate.target_date,
            target_docket_norm: &candidate.target_docket_norm,
            candidate_rank: candidate.candidate_rank,
            candidate_count: candidate.candidate_count,
        });
        conn.execute(
            "INSERT OR REPLACE INTO citation_targets (citation_id, target_decision_id, match_type, candidate_rank, candidate_count, confidence) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                candidate.citation_id,
                candidate.target_decision_id,
                match_type,
                candidate.candidate_rank,
                candidate.candidate_count,
                confidence,
            ],
        )?;
        stats.citations_resolved += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, court: &str, canton: &str, docket: &str, year: i32, text: &str) -> DecisionRow {
        DecisionRow {
            decision_id: id.to_string(),
            court: court.to_string(),
            canton: canton.to_string(),
            docket_number: docket.to_string(),
            decision_date: NaiveDate::from_ymd_opt(year, 1, 1),
            full_text: text.to_string(),
        }
    }

    #[test]
    fn resolves_a_docket_citation_between_two_decisions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let decisions = vec![
            row(
                "bger_4a_291_2018",
                "bger",
                "ZH",
                "4A_291/2018",
                2018,
                "Vgl. Urteil 4A_100/2017 des Bundesgerichts zum gleichen Sachverhalt.",
            ),
            row("bger_4a_100_2017", "bger", "ZH", "4A_100/2017", 2017, "keine weiteren Verweise."),
        ];
        let stats = build_reference_graph(&path, &decisions).unwrap();
        assert_eq!(stats.decisions_processed, 2);
        assert_eq!(stats.citations_found, 1);
        assert_eq!(stats.citations_resolved, 1);

        let conn = Connection::open(&path).unwrap();
        let target: String = conn
            .query_row(
                "SELECT target_decision_id FROM citation_targets",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(target, "bger_4a_100_2017");
    }

    #[test]
    fn resolves_bge_citation_against_bge_court_docket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let decisions = vec![
            row("bger_1", "bger", "ZH", "4A_1/2020", 2020, "Gemäss BGE 147 I 268 gilt dies."),
            row("bge_147_i_268", "bge", "CH", "147 I 268", 2015, "Leitentscheid."),
        ];
        let stats = build_reference_graph(&path, &decisions).unwrap();
        assert_eq!(stats.citations_resolved, 1);
    }

    #[test]
    fn flags_prior_instance_citations_distinctly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let text = "Gegenstand\nBeschwerde gegen den Entscheid des Obergerichts vom 13.11.2025 (SBK.2025.285).\nErwägungen: ...";
        let decisions = vec![
            row("bger_1", "bger", "ZH", "4A_1/2025", 2025, text),
            row("zhobger_sbk_2025_285", "zhobger", "ZH", "SBK.2025.285", 2025, "Ursprünglicher Entscheid."),
        ];
        let stats = build_reference_graph(&path, &decisions).unwrap();
        assert_eq!(stats.prior_instances_found, 1);

        let conn = Connection::open(&path).unwrap();
        let flagged: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM decision_citations WHERE is_prior_instance = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(flagged, 1);
    }

    #[test]
    fn stores_every_candidate_when_a_docket_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let decisions = vec![
            row(
                "bger_4a_291_2018",
                "bger",
                "ZH",
                "4A_291/2018",
                2018,
                "Vgl. Urteil 4A_100/2017 zum gleichen Sachverhalt.",
            ),
            row("bger_4a_100_2017", "bger", "ZH", "4A_100/2017", 2017, "keine weiteren Verweise."),
            row("zhobger_4a_100_2017", "zhobger", "BE", "4A_100/2017", 2016, "ein anderer Entscheid mit gleichem Aktenzeichen."),
        ];
        let stats = build_reference_graph(&path, &decisions).unwrap();
        assert_eq!(stats.citations_found, 1);
        assert_eq!(stats.citations_resolved, 2, "both candidates must be stored");

        let conn = Connection::open(&path).unwrap();
        let mut stmt = conn
            .prepare("SELECT target_decision_id, candidate_rank, candidate_count, confidence FROM citation_targets ORDER BY candidate_rank")
            .unwrap();
        let rows: Vec<(String, i64, i64, f64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|(_, _, count, _)| *count == 2));
        assert_eq!(rows[0].1, 1);
        assert_eq!(rows[1].1, 2);
        // bger inferred from the docket shape agrees with the bger candidate's
        // own court but disagrees with the zhobger one, so the bger row must
        // score strictly higher.
        let bger_row = rows.iter().find(|(id, ..)| id == "bger_4a_100_2017").unwrap();
        let zhobger_row = rows.iter().find(|(id, ..)| id == "zhobger_4a_100_2017").unwrap();
        assert!(bger_row.3 > zhobger_row.3);
    }
}
