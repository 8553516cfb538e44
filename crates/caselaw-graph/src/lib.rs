//! Reference graph: statute/citation extraction, multi-candidate resolution
//! with confidence scoring, prior-instance flagging, and appeal-chain
//! traversal over a derived `reference_graph.db` (spec.md §3/§4.6/§4.7).

pub mod build;
pub mod confidence;
pub mod error;
pub mod reader;
pub mod schema;
pub mod traversal;

pub use build::{build_reference_graph, load_decision_rows, DecisionRow, GraphBuildStats};
pub use confidence::{citation_confidence, infer_court_from_docket, ConfidenceInput};
pub use error::{GraphError, Result};
pub use reader::{citations_for_decision, CitationEdge, CitationsResponse};
pub use schema::apply_schema;
pub use traversal::{find_appeal_chain, AppealChainEntry};

use std::path::Path;

use rusqlite::Connection;

/// Open an existing reference-graph database read-write, per spec.md §5's
/// "opened read-write only by the ingester and graph builder". Returns
/// [`GraphError::NotFound`] rather than letting `rusqlite` surface a bare
/// I/O error, so callers can turn it into the §4.7 "not available" response
/// without raising.
pub fn open_graph_db(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(GraphError::NotFound(path.to_path_buf()));
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Open an existing reference-graph database read-only, for query paths
/// (spec.md §5: "the relational store is opened read-only by query paths").
pub fn open_graph_db_readonly(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(GraphError::NotFound(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    Ok(conn)
}
