//! `search_decisions` tool (spec.md §4.8): ranked hybrid search over the
//! decision store, with the same optional metadata filters as the HTTP
//! `/search` endpoint.

use caselaw_core::Result;
use caselaw_search::{search_hybrid, search_lexical_only, Embedder, SearchFilters, SearchResponse};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

const MAX_LIMIT: usize = 200;
const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchDecisionsRequest {
    pub query: String,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub canton: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub decision_type: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchDecisionsRequest {
    fn filters(&self) -> SearchFilters {
        SearchFilters {
            court: self.court.clone(),
            canton: self.canton.clone(),
            language: self.language.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            decision_type: self.decision_type.clone(),
            legal_area: None,
        }
    }

    fn clamped_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Run a ranked search, falling back to lexical-only when no vector store
/// or embedder is wired up (spec.md §4.5/§4.8).
pub fn search_decisions(
    store_conn: &Connection,
    vector_conn: Option<&Connection>,
    embedder: Option<&dyn Embedder>,
    request: &SearchDecisionsRequest,
) -> Result<SearchResponse> {
    let filters = request.filters();
    let limit = request.clamped_limit();
    let response = if vector_conn.is_some() && embedder.is_some() {
        search_hybrid(store_conn, vector_conn, embedder, &request.query, &filters, limit)?
    } else {
        search_lexical_only(store_conn, &request.query, &filters, limit)?
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caselaw_core::DecisionBuilder;
    use caselaw_store::ingester::insert_decision;
    use caselaw_store::schema::apply_schema;
    use chrono::NaiveDate;

    #[test]
    fn limit_is_clamped_to_the_spec_ceiling() {
        let request = SearchDecisionsRequest {
            query: "x".into(),
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(request.clamped_limit(), MAX_LIMIT);
    }

    #[test]
    fn default_limit_is_used_when_absent() {
        let request = SearchDecisionsRequest {
            query: "x".into(),
            ..Default::default()
        };
        assert_eq!(request.clamped_limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn search_decisions_falls_back_to_lexical_without_a_vector_backend() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        let decision = DecisionBuilder::new("bger", "ZH", "4A_1/2020", "de", "https://x/1")
            .decision_date(NaiveDate::from_ymd_opt(2020, 1, 1))
            .full_text("Streitigkeit über einen Mietvertrag in Zürich.")
            .build();
        insert_decision(&conn, &decision).unwrap();

        let request = SearchDecisionsRequest {
            query: "Mietvertrag Zürich".into(),
            ..Default::default()
        };
        let response = search_decisions(&conn, None, None, &request).unwrap();
        assert_eq!(response.backend, "sqlite_fts5");
        assert!(!response.results.is_empty());
    }
}
