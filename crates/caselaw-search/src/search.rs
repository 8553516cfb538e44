//! Top-level hybrid search orchestration (spec.md §4.5), ported from
//! `hybrid_service.py`'s `SQLiteSearchBackend`/`OpenSearchBackend.search`
//! shape: run the lexical leg, optionally run the vector leg, fuse with
//! [`crate::fusion::fuse_rrf`], and project into the response row shape the
//! tool-calling API surface expects.

use std::collections::HashMap;

use caselaw_core::Decision;
use rusqlite::Connection;
use serde::Serialize;

use crate::embed::Embedder;
use crate::error::Result;
use crate::filters::SearchFilters;
use crate::fusion::fuse_rrf;
use crate::lexical::{LexicalHit, search_lexical};
use crate::vector::{knn_decisions, vector_store_available};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResultItem {
    pub decision_id: String,
    pub court: String,
    pub canton: String,
    pub docket_number: String,
    pub decision_date: Option<String>,
    pub language: String,
    pub title: Option<String>,
    pub regeste: Option<String>,
    pub legal_area: Option<String>,
    pub source_url: String,
    pub pdf_url: Option<String>,
    pub relevance_score: f64,
    pub highlight: HashMap<String, Vec<String>>,
}

impl SearchResultItem {
    fn from_decision(decision: Decision, relevance_score: f64, highlight: HashMap<String, Vec<String>>) -> Self {
        Self {
            decision_id: decision.decision_id,
            court: decision.court,
            canton: decision.canton,
            docket_number: decision.docket_number,
            decision_date: decision.decision_date.map(|d| d.format("%Y-%m-%d").to_string()),
            language: decision.language,
            title: decision.title,
            regeste: decision.regeste,
            legal_area: decision.legal_area,
            source_url: decision.source_url,
            pdf_url: decision.pdf_url,
            relevance_score,
            highlight,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResponse {
    pub backend: &'static str,
    pub total: usize,
    pub results: Vec<SearchResultItem>,
}

/// Lexical-only search (no vector store configured or available): the
/// default backend (spec.md §4.5's `sqlite_fts5` path).
pub fn search_lexical_only(conn: &Connection, query: &str, filters: &SearchFilters, size: usize) -> Result<SearchResponse> {
    let hits = search_lexical(conn, query, filters, size)?;
    Ok(SearchResponse {
        backend: "sqlite_fts5",
        total: hits.len(),
        results: hits.into_iter().map(lexical_hit_to_item).collect(),
    })
}

fn lexical_hit_to_item(hit: LexicalHit) -> SearchResultItem {
    SearchResultItem::from_decision(hit.decision, hit.relevance_score, hit.highlight)
}

/// Full hybrid search: lexical FTS5 leg plus a dense-vector KNN leg fused by
/// reciprocal rank (spec.md §4.5). Falls back to `search_lexical_only` when
/// no vector store/embedder pair is available, or when the vector store has
/// no rows yet.
#[allow(clippy::too_many_arguments)]
pub fn search_hybrid(
    store_conn: &Connection,
    vector_conn: Option<&Connection>,
    embedder: Option<&dyn Embedder>,
    query: &str,
    filters: &SearchFilters,
    size: usize,
) -> Result<SearchResponse> {
    let Some(vector_conn) = vector_conn.filter(|c| vector_store_available(c)) else {
        return search_lexical_only(store_conn, query, filters, size);
    };
    let Some(embedder) = embedder else {
        return search_lexical_only(store_conn, query, filters, size);
    };

    let candidate_limit = crate::fusion::WINDOW_SIZE.min((size * 5).max(size));
    let lexical_hits = search_lexical(store_conn, query, filters, candidate_limit)?;
    let lexical_by_id: HashMap<String, LexicalHit> = lexical_hits
        .iter()
        .map(|h| (h.decision.decision_id.clone(), h.clone()))
        .collect();
    let lexical_ids: Vec<String> = lexical_hits.iter().map(|h| h.decision.decision_id.clone()).collect();

    let query_vector = embedder.embed_batch(std::slice::from_ref(&query.to_string()))?;
    let language = filters.normalized().language;
    let vector_hits = knn_decisions(vector_conn, &query_vector[0], language.as_deref(), candidate_limit)?;
    let vector_ids: Vec<String> = vector_hits.iter().map(|h| h.decision_id.clone()).collect();

    let fused = fuse_rrf(&lexical_ids, &vector_ids, size);

    let mut results = Vec::with_capacity(fused.len());
    for hit in fused {
        if let Some(lexical_hit) = lexical_by_id.get(&hit.decision_id) {
            results.push(SearchResultItem::from_decision(
                lexical_hit.decision.clone(),
                hit.score,
                lexical_hit.highlight.clone(),
            ));
        } else if let Some(decision) = caselaw_store::queries::get_decision(store_conn, &hit.decision_id)? {
            results.push(SearchResultItem::from_decision(decision, hit.score, HashMap::new()));
        }
    }

    Ok(SearchResponse {
        backend: "hybrid_rrf",
        total: results.len(),
        results,
    })
}
