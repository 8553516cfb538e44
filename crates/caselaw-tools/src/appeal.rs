//! `find_appeal_chain` tool (spec.md §4.7/§4.8): bidirectional
//! prior-instance traversal starting from a decision.
//!
//! Unlike the other tools here, a missing reference graph is not an error
//! condition a caller needs to handle specially — spec.md §4.7 asks for
//! `{error: "...not available"}` rather than a raised exception, so this
//! returns an always-`Ok` outcome value instead of `caselaw_core::Result`.

use std::path::Path;

use caselaw_graph::{AppealChainEntry, GraphError};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AppealChainOutcome {
    Found {
        decision_id: String,
        chain: Vec<AppealChainEntry>,
    },
    Unavailable {
        error: String,
    },
}

/// Walk the reference graph at `graph_db_path` for `decision_id`'s appeal
/// chain. Degrades gracefully (never panics, never returns `Err`) when the
/// graph database is missing or the decision isn't in it.
pub fn find_appeal_chain(graph_db_path: &Path, decision_id: &str) -> AppealChainOutcome {
    let conn = match caselaw_graph::open_graph_db_readonly(graph_db_path) {
        Ok(conn) => conn,
        Err(GraphError::NotFound(_)) => {
            return AppealChainOutcome::Unavailable {
                error: "reference graph not available".to_string(),
            };
        }
        Err(other) => return AppealChainOutcome::Unavailable { error: other.to_string() },
    };

    match caselaw_graph::find_appeal_chain(&conn, decision_id) {
        Ok(chain) => AppealChainOutcome::Found {
            decision_id: decision_id.to_string(),
            chain,
        },
        Err(GraphError::UnknownDecision(id)) => AppealChainOutcome::Unavailable {
            error: format!("decision not found in reference graph: {id}"),
        },
        Err(other) => AppealChainOutcome::Unavailable { error: other.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caselaw_graph::{build_reference_graph, DecisionRow};
    use chrono::NaiveDate;

    #[test]
    fn missing_graph_file_degrades_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let outcome = find_appeal_chain(&path, "bger_1");
        assert!(matches!(outcome, AppealChainOutcome::Unavailable { .. }));
    }

    #[test]
    fn unknown_decision_degrades_gracefully() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        build_reference_graph(&path, &[]).unwrap();
        let outcome = find_appeal_chain(&path, "nope");
        assert!(matches!(outcome, AppealChainOutcome::Unavailable { .. }));
    }

    #[test]
    fn finds_a_chain_when_the_graph_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let ober_text = "Gegenstand\nBeschwerde gegen den Entscheid des Bezirksgerichts vom 01.01.2021 (ZPO.2021.1).\nErwägungen: ...";
        let decisions = vec![
            DecisionRow {
                decision_id: "bezirk_1".to_string(),
                court: "bezirksgericht".to_string(),
                canton: "ZH".to_string(),
                docket_number: "ZPO.2021.1".to_string(),
                decision_date: NaiveDate::from_ymd_opt(2021, 1, 1),
                full_text: "Urteil.".to_string(),
            },
            DecisionRow {
                decision_id: "ober_1".to_string(),
                court: "obergericht".to_string(),
                canton: "ZH".to_string(),
                docket_number: "OG.2022.5".to_string(),
                decision_date: NaiveDate::from_ymd_opt(2022, 1, 1),
                full_text: ober_text.to_string(),
            },
        ];
        build_reference_graph(&path, &decisions).unwrap();

        let outcome = find_appeal_chain(&path, "ober_1");
        match outcome {
            AppealChainOutcome::Found { decision_id, chain } => {
                assert_eq!(decision_id, "ober_1");
                assert_eq!(chain.len(), 1);
                assert_eq!(chain[0].decision_id, "bezirk_1");
            }
            AppealChainOutcome::Unavailable { error } => panic!("expected a chain, got {error}"),
        }
    }
}
