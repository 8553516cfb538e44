//! Read-side queries over the `decisions` table (spec.md §4.8:
//! `get_decision`, `list_courts`, `get_statistics`), sharing
//! `schema::INSERT_COLUMNS`/`select_all_sql` with the ingester so row layout
//! cannot drift between writer and reader.

use caselaw_core::Decision;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::Result;
use crate::schema::select_all_sql;

fn get_opt_string(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    row.get(idx)
}

fn get_opt_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
}

fn row_to_decision(row: &Row<'_>) -> rusqlite::Result<Decision> {
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

/// Look up a decision by `decision_id`, and fall back to treating the input
/// as a docket/partial-docket if no exact ID match exists (spec.md §4.8:
/// "`decision_id` (may also be a docket or partial docket)").
pub fn get_decision(conn: &Connection, id_or_docket: &str) -> Result<Option<Decision>> {
    let exact_sql = format!("{} WHERE decision_id = ?1", select_all_sql());
    if let Some(decision) = conn
        .query_row(&exact_sql, [id_or_docket], row_to_decision)
        .optional()?
    {
        return Ok(Some(decision));
    }

    let normalized = caselaw_core::normalize::normalize_docket(id_or_docket);
    let docket_sql = format!(
        "{} WHERE docket_number = ?1 ORDER BY decision_date DESC LIMIT 1",
        select_all_sql()
    );
    if let Some(decision) = conn
        .query_row(&docket_sql, [&normalized], row_to_decision)
        .optional()?
    {
        return Ok(Some(decision));
    }

    let partial_sql = format!(
        "{} WHERE docket_number LIKE ?1 ORDER BY decision_date DESC LIMIT 1",
        select_all_sql()
    );
    let pattern = format!("%{normalized}%");
    conn.query_row(&partial_sql, [&pattern], row_to_decision)
        .optional()
        .map_err(Into::into)
}

/// One decision's identity, language, and text columns, the minimum a
/// vector-store build needs (`caselaw-cli`'s `build-vectors`, mirroring how
/// `caselaw_graph::load_decision_rows` reads a flat projection rather than
/// the full `Decision` for its own build step).
#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub decision_id: String,
    pub language: String,
    pub regeste: Option<String>,
    pub full_text: String,
}

/// Read every decision's `(decision_id, language, regeste, full_text)`,
/// ordered by `decision_id` for reproducible shard partitioning, optionally
/// capped at `limit` rows.
pub fn list_embedding_inputs(conn: &Connection, limit: Option<usize>) -> Result<Vec<EmbeddingRow>> {
    let sql = match limit {
        Some(limit) => format!(
            "SELECT decision_id, language, regeste, full_text FROM decisions ORDER BY decision_id LIMIT {limit}"
        ),
        None => "SELECT decision_id, language, regeste, full_text FROM decisions ORDER BY decision_id".to_string(),
    };
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(EmbeddingRow {
                decision_id: row.get(0)?,
                language: row.get(1)?,
                regeste: row.get(2)?,
                full_text: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CourtCount {
    pub court_code: String,
    pub count: i64,
}

/// `list_courts` (spec.md §4.8): distinct courts with row counts, most
/// populous first.
pub fn list_courts(conn: &Connection) -> Result<Vec<CourtCount>> {
    let mut stmt = conn.prepare(
        "SELECT court, COUNT(*) AS n FROM decisions GROUP BY court ORDER BY n DESC, court ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CourtCount {
                court_code: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Statistics {
    pub total_decisions: i64,
    pub by_court: Vec<CourtCount>,
    pub by_language: Vec<(String, i64)>,
}

/// Aggregate counts, optionally filtered by `court`/`canton`/`year`
/// (spec.md §4.8's `get_statistics`).
pub fn get_statistics(
    conn: &Connection,
    court: Option<&str>,
    canton: Option<&str>,
    year: Option<i32>,
) -> Result<Statistics> {
    let mut clauses = Vec::new();
    let mut params: Vec<String> = Vec::new();
    if let Some(court) = court {
        clauses.push("court = ?".to_string());
        params.push(court.to_ascii_lowercase());
    }
    if let Some(canton) = canton {
        clauses.push("canton = ?".to_string());
        params.push(canton.to_ascii_uppercase());
    }
    if let Some(year) = year {
        clauses.push("strftime('%Y', decision_date) = ?".to_string());
        params.push(year.to_string());
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let total_sql = format!("SELECT COUNT(*) FROM decisions{where_clause}");
    let total_decisions: i64 = conn.query_row(
        &total_sql,
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let by_court_sql = format!(
        "SELECT court, COUNT(*) AS n FROM decisions{where_clause} GROUP BY court ORDER BY n DESC"
    );
    let mut stmt = conn.prepare(&by_court_sql)?;
    let by_court = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(CourtCount {
                court_code: row.get(0)?,
                count: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    drop(stmt);

    let by_language_sql = format!(
        "SELECT language, COUNT(*) AS n FROM decisions{where_clause} GROUP BY language ORDER BY n DESC"
    );
    let mut stmt = conn.prepare(&by_language_sql)?;
    let by_language = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Statistics {
        total_decisions,
        by_court,
        by_language,
    })
}
