//! Route dispatch (spec.md §6): `/health`, `/search`, `/decision/{id}`,
//! `/citations/{id}`, `/statute/{law_code}/{article}`.

use caselaw_tools::search::SearchDecisionsRequest;

use crate::http::{Method, Request, Response};
use crate::state::AppState;

const DEFAULT_CITATION_LIMIT: i64 = 200;
const MAX_CITATION_LIMIT: i64 = 200;

pub fn dispatch(state: &AppState, req: &Request) -> Response {
    let segments: Vec<&str> = req.path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
    match (req.method, segments.as_slice()) {
        (Method::Get, ["health"]) => health(state),
        (Method::Post, ["search"]) => search(state, req),
        (Method::Get, ["decision", id]) => decision(state, id),
        (Method::Get, ["citations", id]) => citations(state, req, id),
        (Method::Get, ["statute", law_code, article]) => statute(state, req, law_code, article),
        (Method::Get | Method::Post, _) => Response::error(404, "no such route"),
        (Method::Other, _) => Response::error(405, "method not allowed"),
    }
}

fn health(state: &AppState) -> Response {
    let graph_db = if state.graph_db_path.exists() { "available" } else { "not_built" };
    Response::json(
        200,
        &serde_json::json!({
            "status": "ok",
            "search_backend": state.search_backend,
            "graph_db": graph_db,
        }),
    )
}

fn search(state: &AppState, req: &Request) -> Response {
    let request: SearchDecisionsRequest = match serde_json::from_slice(&req.body) {
        Ok(req) => req,
        Err(err) => return Response::error(400, format!("invalid request body: {err}")),
    };
    if request.query.trim().is_empty() {
        return Response::error(400, "query must not be empty");
    }

    let store_conn = state.store_conn.lock().unwrap_or_else(|p| p.into_inner());
    let vector_guard = state.vector_conn.lock().unwrap_or_else(|p| p.into_inner());
    let vector_conn = vector_guard.as_ref();
    let embedder = state.embedder.as_deref();

    match caselaw_tools::search_decisions(&store_conn, vector_conn, embedder, &request) {
        Ok(response) => Response::json(200, &serde_json::json!(response)),
        Err(err) => Response::error(err.http_status(), err.to_string()),
    }
}

fn decision(state: &AppState, id: &str) -> Response {
    let conn = state.store_conn.lock().unwrap_or_else(|p| p.into_inner());
    match caselaw_tools::get_decision(&conn, id) {
        Ok(Some(decision)) => Response::json(200, &serde_json::json!(decision)),
        Ok(None) => Response::error(404, format!("decision not found: {id}")),
        Err(err) => Response::error(err.http_status(), err.to_string()),
    }
}

fn citations(state: &AppState, req: &Request, id: &str) -> Response {
    let limit = req
        .query_param("limit")
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_CITATION_LIMIT)
        .clamp(1, MAX_CITATION_LIMIT);

    let conn = match caselaw_graph::open_graph_db_readonly(&state.graph_db_path) {
        Ok(conn) => conn,
        Err(caselaw_graph::GraphError::NotFound(_)) => {
            return Response::error(503, "reference graph not available");
        }
        Err(err) => return Response::error(err.http_status(), err.to_string()),
    };
    match caselaw_graph::citations_for_decision(&conn, id, limit) {
        Ok(response) => Response::json(200, &serde_json::json!(response)),
        Err(err) => Response::error(err.http_status(), err.to_string()),
    }
}

fn statute(state: &AppState, req: &Request, law_code: &str, article: &str) -> Response {
    let limit: i64 = req
        .query_param("limit")
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_CITATION_LIMIT)
        .clamp(1, MAX_CITATION_LIMIT);

    let conn = match caselaw_graph::open_graph_db_readonly(&state.graph_db_path) {
        Ok(conn) => conn,
        Err(caselaw_graph::GraphError::NotFound(_)) => {
            return Response::error(503, "reference graph not available");
        }
        Err(err) => return Response::error(err.http_status(), err.to_string()),
    };

    let normalized = caselaw_extract::normalize_statute(article, None, law_code);
    let mut stmt = match conn.prepare(
        "SELECT ds.decision_id, COUNT(*) AS mentions
         FROM decision_statutes ds
         JOIN statutes s ON s.id = ds.statute_id
         WHERE s.normalized = ?1
         GROUP BY ds.decision_id
         ORDER BY mentions DESC
         LIMIT ?2",
    ) {
        Ok(stmt) => stmt,
        Err(err) => return Response::error(500, err.to_string()),
    };
    let rows = stmt.query_map(rusqlite::params![normalized, limit], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    });
    let rows = match rows {
        Ok(rows) => rows,
        Err(err) => return Response::error(500, err.to_string()),
    };

    let store_conn = state.store_conn.lock().unwrap_or_else(|p| p.into_inner());
    let mut results = Vec::new();
    for row in rows {
        let (decision_id, mentions) = match row {
            Ok(pair) => pair,
            Err(err) => return Response::error(500, err.to_string()),
        };
        match caselaw_tools::get_decision(&store_conn, &decision_id) {
            Ok(Some(decision)) => {
                results.push(serde_json::json!({
                    "decision_id": decision.decision_id,
                    "court": decision.court,
                    "canton": decision.canton,
                    "docket_number": decision.docket_number,
                    "decision_date": decision.decision_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    "mention_count": mentions,
                }));
            }
            Ok(None) => {}
            Err(err) => return Response::error(err.http_status(), err.to_string()),
        }
    }

    Response::json(
        200,
        &serde_json::json!({
            "law_code": law_code,
            "article": article,
            "results": results,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_returns_405_for_unsupported_methods() {
        let req = Request {
            method: Method::Other,
            path: "/health".into(),
            query: String::new(),
            body: Vec::new(),
        };
        let state = test_state();
        let response = dispatch(&state, &req);
        assert_eq!(response.status, 405);
    }

    #[test]
    fn dispatch_returns_404_for_unknown_routes() {
        let req = Request {
            method: Method::Get,
            path: "/nope".into(),
            query: String::new(),
            body: Vec::new(),
        };
        let state = test_state();
        let response = dispatch(&state, &req);
        assert_eq!(response.status, 404);
    }

    fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let paths = caselaw_core::PathLayout::new(dir.path());
        caselaw_store::open_store(&paths.decisions_db()).unwrap();
        AppState::open(&paths).unwrap()
    }
}
