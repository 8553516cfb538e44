//! `get_decision` tool (spec.md §4.8): full decision record lookup,
//! tolerant of a docket or partial docket in place of the canonical ID.

use caselaw_core::{Decision, Result};
use rusqlite::Connection;

/// Look up a decision by `decision_id`, falling back to a docket or partial
/// docket match (spec.md §4.8). Returns `Ok(None)` rather than an error
/// when nothing matches — the caller decides whether that's a 404.
pub fn get_decision(conn: &Connection, id_or_docket: &str) -> Result<Option<Decision>> {
    Ok(caselaw_store::queries::get_decision(conn, id_or_docket)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caselaw_core::DecisionBuilder;
    use caselaw_store::ingester::insert_decision;
    use caselaw_store::schema::apply_schema;

    #[test]
    fn finds_by_partial_docket() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        let decision = DecisionBuilder::new("bger", "ZH", "4A_291/2017", "de", "https://x/1")
            .full_text("text")
            .build();
        insert_decision(&conn, &decision).unwrap();

        let found = get_decision(&conn, "4A_291").unwrap().unwrap();
        assert_eq!(found.decision_id, "bger_4A_291_2017");
    }

    #[test]
    fn returns_none_instead_of_erroring_on_a_miss() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        assert!(get_decision(&conn, "nope").unwrap().is_none());
    }
}
