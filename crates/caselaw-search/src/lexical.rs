//! Lexical query shaping, FTS5 execution, and BM25-based reranking
//! (spec.md §4.5).
//!
//! Ported from `query_planner.py`'s `_build_lexical_query` (field boosts per
//! intent) adapted to the FTS5-only backend this workspace carries (no
//! OpenSearch): spec.md §4.5 says "When the downstream lexical engine is an
//! FTS5-class engine ... the planner instead builds a best-effort FTS5 query
//! string" with defensive sanitization and a parse-failure fallback. The
//! per-column boosts are expressed through FTS5's `bm25(tbl, w0, w1, ...)`
//! weighting function rather than OpenSearch's per-field `multi_match`
//! boost syntax, since that is the closest FTS5-native equivalent.
//!
//! Deviation: the original's CITATION intent boosts a `decision_refs` field
//! that has no counterpart in this schema (raw `cited_decisions` strings are
//! stored as a JSON array, not tokenized into the FTS index); citation
//! intent here instead leans on `regeste`/`title`/`full_text`, where
//! citation strings still appear in the source text.

use std::collections::HashMap;

use caselaw_core::Decision;
use caselaw_core::normalize::normalize_docket;
use rusqlite::{Connection, Row, params_from_iter};
use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::filters::SearchFilters;
use crate::intent::{QueryIntent, detect_query_intent};

/// Column order of `decisions_fts` per `caselaw_store::schema` — needed so
/// `bm25()` weight positions line up with the virtual table definition.
const FTS_COLUMN_COUNT: usize = 8;

/// Per-intent `bm25()` weights, in `decisions_fts` column order:
/// `(decision_id, court, canton, docket_number, language, title, regeste, full_text)`.
fn bm25_weights(intent: QueryIntent) -> [f64; FTS_COLUMN_COUNT] {
    match intent {
        QueryIntent::Docket => [0.0, 0.0, 0.0, 6.0, 0.0, 0.0, 0.0, 0.0],
        QueryIntent::Statute => [0.0, 0.0, 0.0, 0.0, 0.0, 4.0, 5.0, 2.0],
        QueryIntent::Citation => [0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0, 1.0],
        QueryIntent::Boolean => [0.0, 0.0, 0.0, 6.0, 0.0, 4.0, 4.0, 1.5],
        QueryIntent::NaturalLanguage => [0.0, 0.0, 0.0, 5.0, 0.0, 5.0, 4.0, 1.7],
    }
}

/// Strip unmatched quotes and stray structural characters (`:`, unbalanced
/// parens) before composing an FTS5 expression (spec.md §4.5).
#[must_use]
pub fn sanitize_fts5_query(query: &str) -> String {
    let mut s = query.replace(':', " ").replace(['*', '^'], " ");

    let open = s.matches('(').count();
    let close = s.matches(')').count();
    if open != close {
        s = s.replace('(', " ").replace(')', " ");
    }

    let quotes = s.matches('"').count();
    if quotes % 2 != 0 {
        s = s.replace('"', " ");
    }

    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A plain tokenized OR query over the searchable fields, used when the
/// intent-shaped FTS5 expression fails to parse (spec.md §4.5).
fn plain_or_query(query: &str) -> String {
    sanitize_fts5_query(query)
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Build the intent-shaped FTS5 MATCH expression (before sanitization
/// fallback): CITATION and NATURAL_LANGUAGE use `OR` between terms (spec's
/// "or" multi-match operator); STATUTE and BOOLEAN keep FTS5's implicit
/// `AND` (spec's "and" operator); BOOLEAN additionally passes the user's own
/// `AND|OR|NOT|NEAR`/quoted-phrase syntax through untouched beyond
/// sanitization, since the user is writing the boolean expression directly.
fn shape_match_query(intent: QueryIntent, sanitized: &str) -> String {
    match intent {
        QueryIntent::Citation | QueryIntent::NaturalLanguage => {
            let terms: Vec<&str> = sanitized.split_whitespace().collect();
            if terms.is_empty() {
                String::new()
            } else {
                terms.join(" OR ")
            }
        }
        QueryIntent::Docket | QueryIntent::Statute | QueryIntent::Boolean => sanitized.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LexicalHit {
    pub decision: Decision,
    /// Raw bm25 score, higher-is-better (negated from SQLite's native
    /// lower-is-better convention).
    pub bm25_score: f64,
    /// Final reranked score (spec.md §4.5: "the returned row shape includes
    /// a `relevance_score` key (the rerank score), not the underlying
    /// rank").
    pub relevance_score: f64,
    pub highlight: HashMap<String, Vec<String>>,
}

fn row_to_hit(row: &Row<'_>) -> rusqlite::Result<(Decision, f64, HashMap<String, Vec<String>>)> {
    let decision = crate::rows::decision_from_fts_row(row)?;
    let bm25_raw: f64 = row.get("bm25_raw")?;
    let title_hl: Option<String> = row.get("title_hl")?;
    let regeste_hl: Option<String> = row.get("regeste_hl")?;
    let full_text_hl: Option<String> = row.get("full_text_hl")?;

    let mut highlight = HashMap::new();
    if let Some(h) = title_hl.filter(|s| !s.is_empty()) {
        highlight.insert("title".to_string(), vec![h]);
    }
    if let Some(h) = regeste_hl.filter(|s| !s.is_empty()) {
        highlight.insert("regeste".to_string(), vec![h]);
    }
    if let Some(h) = full_text_hl.filter(|s| !s.is_empty()) {
        highlight.insert("full_text".to_string(), vec![h]);
    }

    Ok((decision, -bm25_raw, highlight))
}

/// Exact-match lookup used by the DOCKET intent's first clause (spec.md
/// §4.5: "OR of {exact match on normalized docket key, exact match on
/// decision_id, phrase match on docket_number with high boost}").
fn exact_docket_matches(conn: &Connection, query: &str, filters: &SearchFilters) -> Result<Vec<Decision>> {
    let normalized = normalize_docket(query);
    let query_as_id = query.to_ascii_lowercase().replace(['/', '.'], "_");
    let (filter_clause, filter_params) = filters.sql_clause();
    let where_extra = filter_clause.map_or_else(String::new, |c| format!(" AND {c}"));

    let sql = format!(
        "SELECT {} FROM decisions d WHERE (d.decision_id = ?1 OR d.docket_number = ?2 OR REPLACE(REPLACE(REPLACE(UPPER(d.docket_number), '-', '_'), '.', '_'), '/', '_') = ?3){where_extra} ORDER BY d.decision_date DESC",
        select_columns(),
    );
    let mut params: Vec<String> = vec![query_as_id, query.to_string(), normalized];
    params.extend(filter_params);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), crate::rows::decision_from_plain_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn select_columns() -> String {
    caselaw_store::schema::INSERT_COLUMNS
        .iter()
        .map(|c| format!("d.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rescore a BM25 candidate per spec.md §4.5's reranker: "exact-docket-match
/// bonus, phrase occurrence in `title`/`regeste`, token coverage in
/// `title + regeste` vs. `full_text`".
fn rerank_score(query: &str, decision: &Decision, bm25_score: f64) -> f64 {
    let query_lower = query.trim().to_lowercase();
    let tokens: Vec<&str> = query_lower.split_whitespace().collect();
    let title_regeste = format!(
        "{} {}",
        decision.title.as_deref().unwrap_or(""),
        decision.regeste.as_deref().unwrap_or("")
    )
    .to_lowercase();
    let full_text = decision.full_text.to_lowercase();

    let docket_bonus = if !query_lower.is_empty() && normalize_docket(&query_lower) == decision.docket_norm() {
        10.0
    } else {
        0.0
    };

    let phrase_bonus = if query_lower.len() > 3 && title_regeste.contains(&query_lower) {
        2.0
    } else {
        0.0
    };

    let coverage = |haystack: &str| -> f64 {
        if tokens.is_empty() {
            0.0
        } else {
            tokens.iter().filter(|t| haystack.contains(*t)).count() as f64 / tokens.len() as f64
        }
    };
    let title_coverage = coverage(&title_regeste);
    let full_coverage = coverage(&full_text);
    let coverage_bonus = title_coverage * 1.5 - full_coverage.min(title_coverage) * 0.5;

    bm25_score + docket_bonus + phrase_bonus + coverage_bonus
}

/// Run the lexical search path end-to-end: intent detection, filter/query
/// composition, FTS5 execution with a parse-failure fallback, and
/// reranking. `limit` is the caller's requested page size; the reranker
/// retrieves up to `3 * limit` candidates first (spec.md §4.5).
pub fn search_lexical(
    conn: &Connection,
    query: &str,
    filters: &SearchFilters,
    limit: usize,
) -> Result<Vec<LexicalHit>> {
    let limit = limit.max(1);
    let intent = detect_query_intent(query);

    if intent == QueryIntent::Docket {
        let exact = exact_docket_matches(conn, query, filters)?;
        if !exact.is_empty() {
            return Ok(exact
                .into_iter()
                .take(limit)
                .map(|decision| LexicalHit {
                    relevance_score: 1.0,
                    bm25_score: 1.0,
                    highlight: HashMap::new(),
                    decision,
                })
                .collect());
        }
    }

    let candidate_limit = (limit * 3).max(limit);
    let sanitized = sanitize_fts5_query(query);
    if sanitized.is_empty() {
        return Ok(Vec::new());
    }
    let shaped = shape_match_query(intent, &sanitized);

    let hits = match run_fts_query(conn, &shaped, intent, filters, candidate_limit) {
        Ok(hits) => hits,
        Err(_) => {
            let fallback = plain_or_query(query);
            if fallback.is_empty() {
                return Ok(Vec::new());
            }
            run_fts_query(conn, &fallback, QueryIntent::NaturalLanguage, filters, candidate_limit)?
        }
    };

    let mut reranked: Vec<LexicalHit> = hits
        .into_iter()
        .map(|(decision, bm25_score, highlight)| {
            let relevance_score = rerank_score(query, &decision, bm25_score);
            LexicalHit {
                decision,
                bm25_score,
                relevance_score,
                highlight,
            }
        })
        .collect();
    reranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.decision.decision_id.cmp(&b.decision.decision_id))
    });
    reranked.truncate(limit);
    Ok(reranked)
}

fn run_fts_query(
    conn: &Connection,
    match_expr: &str,
    intent: QueryIntent,
    filters: &SearchFilters,
    limit: usize,
) -> Result<Vec<(Decision, f64, HashMap<String, Vec<String>>)>> {
    if match_expr.is_empty() {
        return Ok(Vec::new());
    }
    let weights = bm25_weights(intent);
    let weight_args = weights.iter().map(|w| w.to_string()).collect::<Vec<_>>().join(", ");
    let (filter_clause, filter_params) = filters.sql_clause();
    let where_extra = filter_clause.map_or_else(String::new, |c| format!(" AND {c}"));

    let sql = format!(
        "SELECT {cols}, bm25(decisions_fts, {weight_args}) AS bm25_raw, \
         highlight(decisions_fts, 5, '[', ']') AS title_hl, \
         highlight(decisions_fts, 6, '[', ']') AS regeste_hl, \
         snippet(decisions_fts, 7, '[', ']', '...', 10) AS full_text_hl \
         FROM decisions_fts JOIN decisions d ON d.rowid = decisions_fts.rowid \
         WHERE decisions_fts MATCH ?1{where_extra} \
         ORDER BY bm25_raw LIMIT ?{param_index}",
        cols = select_columns(),
        param_index = filter_params.len() + 2,
    );

    let mut params: Vec<String> = vec![match_expr.to_string()];
    params.extend(filter_params);
    params.push(limit.to_string());

    let mut stmt = conn.prepare(&sql).map_err(SearchError::from)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), row_to_hit)
        .map_err(SearchError::from)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(SearchError::from)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_unmatched_quote() {
        let sanitized = sanitize_fts5_query("\"Asyl und Wegweisung");
        assert!(!sanitized.contains('"'));
        assert!(sanitized.contains("Asyl"));
    }

    #[test]
    fn sanitizes_unbalanced_parens() {
        let sanitized = sanitize_fts5_query("Mietrecht (Kündigung");
        assert!(!sanitized.contains('('));
    }

    #[test]
    fn sanitizes_colon() {
        let sanitized = sanitize_fts5_query("full_text: Asyl");
        assert!(!sanitized.contains(':'));
    }

    #[test]
    fn balanced_parens_survive() {
        let sanitized = sanitize_fts5_query("Mietrecht (Kündigung)");
        assert!(sanitized.contains('('));
        assert!(sanitized.contains(')'));
    }
}
