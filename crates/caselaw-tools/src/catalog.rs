//! `list_courts` and `get_statistics` tools (spec.md §4.8): aggregate
//! catalog queries over the decision store.

use caselaw_core::Result;
use caselaw_store::{CourtCount, Statistics};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// `list_courts` (spec.md §4.8): distinct courts with row counts, most
/// populous first.
pub fn list_courts(conn: &Connection) -> Result<Vec<CourtCount>> {
    Ok(caselaw_store::queries::list_courts(conn)?)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetStatisticsRequest {
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub canton: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// `get_statistics` (spec.md §4.8): aggregate counts, optionally filtered.
pub fn get_statistics(conn: &Connection, request: &GetStatisticsRequest) -> Result<Statistics> {
    Ok(caselaw_store::queries::get_statistics(
        conn,
        request.court.as_deref(),
        request.canton.as_deref(),
        request.year,
    )?)
}
