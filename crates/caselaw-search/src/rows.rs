//! Shared `rusqlite::Row -> Decision` conversion, ported from
//! `caselaw_store::queries::row_to_decision` so queries that join the FTS
//! shadow table still decode `decisions` columns the same way the store's
//! own read path does.

use caselaw_core::Decision;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;

fn get_opt_string(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    row.get(idx)
}

fn get_opt_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
}

/// Decode a `Decision` from a row whose first 33 columns are
/// `caselaw_store::schema::INSERT_COLUMNS` in order (optionally aliased,
/// e.g. `d.decision_id`), regardless of any extra trailing columns (bm25
/// score, highlight snippets) the caller's `SELECT` also projects.
pub fn decision_from_fts_row(row: &Row<'_>) -> rusqlite::Result<Decision> {
    decision_from_plain_row(row)
}

pub fn decision_from_plain_row(row: &Row<'_>) -> rusqlite::Result<Decision> {
    let cited_raw: String = row.get(26)?;
    let cited_decisions: Vec<String> = serde_json::from_str(&cited_raw).unwrap_or_default();
    let scraped_raw: String = row.get(27)?;
    let scraped_at = DateTime::parse_from_rfc3339(&scraped_raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Decision {
        decision_id: row.get(0)?,
        canonical_key: row.get(1)?,
        court: row.get(2)?,
        canton: row.get(3)?,
        chamber: get_opt_string(row, 4)?,
        docket_number: row.get(5)?,
        docket_number_2: get_opt_string(row, 6)?,
        decision_date: get_opt_date(row, 7)?,
        publication_date: get_opt_date(row, 8)?,
        language: row.get(9)?,
        title: get_opt_string(row, 10)?,
        legal_area: get_opt_string(row, 11)?,
        regeste: get_opt_string(row, 12)?,
        abstract_de: get_opt_string(row, 13)?,
        abstract_fr: get_opt_string(row, 14)?,
        abstract_it: get_opt_string(row, 15)?,
        full_text: row.get(16)?,
        decision_type: get_opt_string(row, 17)?,
        outcome: get_opt_string(row, 18)?,
        judges: get_opt_string(row, 19)?,
        clerks: get_opt_string(row, 20)?,
        collection: get_opt_string(row, 21)?,
        appeal_info: get_opt_string(row, 22)?,
        source_url: row.get(23)?,
        pdf_url: get_opt_string(row, 24)?,
        bge_reference: get_opt_string(row, 25)?,
        cited_decisions,
        scraped_at,
        external_id: get_opt_string(row, 28)?,
        source: get_opt_string(row, 29)?,
        source_id: get_opt_string(row, 30)?,
        source_spider: get_opt_string(row, 31)?,
        content_hash: get_opt_string(row, 32)?,
    })
}
