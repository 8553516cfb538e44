//! Citation-graph reader for the `/citations/{id}` surface (spec.md §6),
//! grounded on `examples/original_source/search_stack/hybrid_service.py`'s
//! `ReferenceGraphStore`: that reader tolerates reference-graph databases
//! built by older versions of the builder, so it introspects the schema
//! before querying rather than assuming today's column set.
//!
//! Three tiers, tried in order, so a caller always gets *something* instead
//! of a 500 when pointed at an older `reference_graph.db`:
//! 1. `citation_targets` present — full resolution (`target_decision_id`,
//!    `match_type`, `confidence_score`).
//! 2. a legacy `target_decision_id` column directly on `decision_citations`
//!    — resolution exists but wasn't split into its own table.
//! 3. bare edges — `target_ref`/`target_type` only, no resolution at all.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CitationEdge {
    pub target_ref: String,
    pub target_type: String,
    pub target_decision_id: Option<String>,
    pub match_type: Option<String>,
    pub mention_count: i64,
    pub confidence_score: Option<f64>,
    pub weighted_mention_count: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CitationsResponse {
    pub decision_id: String,
    pub outgoing: Vec<CitationEdge>,
    pub incoming: Vec<CitationEdge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaTier {
    Resolved,
    LegacyColumn,
    Bare,
}

fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM sqlite_master WHERE type='table' AND name=?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let found = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<String>>>()?
        .into_iter()
        .any(|col| col == column);
    Ok(found)
}

fn detect_tier(conn: &Connection) -> Result<SchemaTier> {
    if has_table(conn, "citation_targets")? {
        return Ok(SchemaTier::Resolved);
    }
    if has_column(conn, "decision_citations", "target_decision_id")? {
        return Ok(SchemaTier::LegacyColumn);
    }
    Ok(SchemaTier::Bare)
}

fn resolved_outgoing(conn: &Connection, decision_id: &str, limit: i64) -> Result<Vec<CitationEdge>> {
    let mut stmt = conn.prepare(
        "SELECT c.target_ref, c.target_type, MAX(best.target_decision_id), MAX(best.match_type),
                COUNT(*) AS mention_count, MAX(best.confidence)
         FROM decision_citations c
         LEFT JOIN citation_targets best
             ON best.citation_id = c.id AND best.candidate_rank = 1
         WHERE c.source_decision_id = ?1 AND c.is_prior_instance = 0
         GROUP BY c.target_ref, c.target_type
         ORDER BY mention_count DESC
         LIMIT ?2",
    )?;
    collect_edges(&mut stmt, decision_id, limit)
}

fn resolved_incoming(conn: &Connection, decision_id: &str, limit: i64) -> Result<Vec<CitationEdge>> {
    let mut stmt = conn.prepare(
        "SELECT c.target_ref, c.target_type, ct.target_decision_id, ct.match_type,
                COUNT(*) AS mention_count, MAX(ct.confidence) AS confidence
         FROM citation_targets ct
         JOIN decision_citations c ON c.id = ct.citation_id
         WHERE ct.target_decision_id = ?1 AND c.is_prior_instance = 0
         GROUP BY c.target_ref, c.target_type
         ORDER BY mention_count DESC
         LIMIT ?2",
    )?;
    collect_edges(&mut stmt, decision_id, limit)
}

fn legacy_outgoing(conn: &Connection, decision_id: &str, limit: i64) -> Result<Vec<CitationEdge>> {
    let mut stmt = conn.prepare(
        "SELECT target_ref, target_type, target_decision_id, NULL AS match_type,
                COUNT(*) AS mention_count, NULL AS confidence
         FROM decision_citations
         WHERE source_decision_id = ?1 AND is_prior_instance = 0
         GROUP BY target_ref, target_type
         ORDER BY mention_count DESC
         LIMIT ?2",
    )?;
    collect_edges(&mut stmt, decision_id, limit)
}

fn legacy_incoming(conn: &Connection, decision_id: &str, limit: i64) -> Result<Vec<CitationEdge>> {
    let mut stmt = conn.prepare(
        "SELECT target_ref, target_type, target_decision_id, NULL AS match_type,
                COUNT(*) AS mention_count, NULL AS confidence
         FROM decision_citations
         WHERE target_decision_id = ?1 AND is_prior_instance = 0
         GROUP BY target_ref, target_type
         ORDER BY mention_count DESC
         LIMIT ?2",
    )?;
    collect_edges(&mut stmt, decision_id, limit)
}

fn bare_outgoing(conn: &Connection, decision_id: &str, limit: i64) -> Result<Vec<CitationEdge>> {
    let mut stmt = conn.prepare(
        "SELECT target_ref, target_type, NULL AS target_decision_id, NULL AS match_type,
                COUNT(*) AS mention_count, NULL AS confidence
         FROM decision_citations
         WHERE source_decision_id = ?1 AND is_prior_instance = 0
         GROUP BY target_ref, target_type
         ORDER BY mention_count DESC
         LIMIT ?2",
    )?;
    collect_edges(&mut stmt, decision_id, limit)
}

fn collect_edges(stmt: &mut rusqlite::Statement<'_>, decision_id: &str, limit: i64) -> Result<Vec<CitationEdge>> {
    let rows = stmt
        .query_map(rusqlite::params![decision_id, limit], |row| {
            let mention_count: i64 = row.get(4)?;
            let confidence_score: Option<f64> = row.get(5)?;
            Ok(CitationEdge {
                target_ref: row.get(0)?,
                target_type: row.get(1)?,
                target_decision_id: row.get(2)?,
                match_type: row.get(3)?,
                mention_count,
                confidence_score,
                weighted_mention_count: confidence_score.map(|c| c * mention_count as f64),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Read the full outgoing/incoming citation edge set for `decision_id`,
/// per spec.md §6's `GET /citations/{id}` shape. `incoming` is empty under
/// the bare tier: without any resolution there is no way to know which
/// decisions cite this one.
pub fn citations_for_decision(conn: &Connection, decision_id: &str, limit: i64) -> Result<CitationsResponse> {
    let tier = detect_tier(conn)?;
    let (outgoing, incoming) = match tier {
        SchemaTier::Resolved => (
            resolved_outgoing(conn, decision_id, limit)?,
            resolved_incoming(conn, decision_id, limit)?,
        ),
        SchemaTier::LegacyColumn => (
            legacy_outgoing(conn, decision_id, limit)?,
            legacy_incoming(conn, decision_id, limit)?,
        ),
        SchemaTier::Bare => (bare_outgoing(conn, decision_id, limit)?, Vec::new()),
    };
    Ok(CitationsResponse {
        decision_id: decision_id.to_string(),
        outgoing,
        incoming,
    })
}
