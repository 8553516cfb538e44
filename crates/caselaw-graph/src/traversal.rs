//! Appeal-chain traversal (spec.md §4.7), ported from
//! `examples/original_source/search_stack/test_appeal_chain.py`'s expected
//! traversal shape: walk `is_prior_instance` edges bidirectionally from a
//! starting decision and return the connected chain sorted by date.
//!
//! Unlike citation resolution elsewhere in this crate, prior-instance edges
//! are resolved through whichever candidate the builder ranked first
//! (`candidate_rank = 1`) — an appeal chain has exactly one prior instance
//! per step, so ambiguity here is a resolution-quality problem, not a thing
//! to expose to the caller.

use std::collections::{HashSet, VecDeque};

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::{GraphError, Result};

/// One decision in an appeal chain, relative to the decision the traversal
/// started from.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppealChainEntry {
    pub decision_id: String,
    pub court: String,
    pub canton: String,
    pub decision_date: Option<NaiveDate>,
    pub relation: &'static str,
}

fn decision_exists(conn: &Connection, decision_id: &str) -> Result<bool> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM decisions WHERE decision_id = ?1",
            [decision_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

/// Decisions this one cites as a prior instance (outgoing `is_prior_instance`
/// edges, resolved to their top-ranked candidate).
fn prior_instances_of(conn: &Connection, decision_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT ct.target_decision_id
         FROM decision_citations c
         JOIN citation_targets ct ON ct.citation_id = c.id
         WHERE c.source_decision_id = ?1 AND c.is_prior_instance = 1 AND ct.candidate_rank = 1",
    )?;
    let rows = stmt
        .query_map([decision_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

/// Decisions that cite this one as their prior instance (incoming edges).
fn appeals_of(conn: &Connection, decision_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT c.source_decision_id
         FROM decision_citations c
         JOIN citation_targets ct ON ct.citation_id = c.id
         WHERE ct.target_decision_id = ?1 AND c.is_prior_instance = 1 AND ct.candidate_rank = 1",
    )?;
    let rows = stmt
        .query_map([decision_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

struct DecisionIdentity {
    court: String,
    canton: String,
    decision_date: Option<NaiveDate>,
}

fn load_identity(conn: &Connection, decision_id: &str) -> Result<DecisionIdentity> {
    let row = conn.query_row(
        "SELECT court, canton, decision_date FROM decisions WHERE decision_id = ?1",
        [decision_id],
        |row| {
            let date_raw: Option<String> = row.get(2)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                date_raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            ))
        },
    )?;
    Ok(DecisionIdentity {
        court: row.0,
        canton: row.1,
        decision_date: row.2,
    })
}

/// Breadth-first walk over `is_prior_instance` edges in both directions,
/// starting from `decision_id`. Returns every other decision reachable
/// through the chain, sorted by `decision_date` ascending (decisions with
/// no date sort last), each annotated `relation = "prior_instance"`.
pub fn find_appeal_chain(conn: &Connection, decision_id: &str) -> Result<Vec<AppealChainEntry>> {
    if !decision_exists(conn, decision_id)? {
        return Err(GraphError::UnknownDecision(decision_id.to_string()));
    }

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(decision_id.to_string());
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(decision_id.to_string());
    let mut chain: Vec<String> = Vec::new();

    while let Some(current) = queue.pop_front() {
        let mut neighbors = prior_instances_of(conn, &current)?;
        neighbors.extend(appeals_of(conn, &current)?);
        for neighbor in neighbors {
            if visited.insert(neighbor.clone()) {
                chain.push(neighbor.clone());
                queue.push_back(neighbor);
            }
        }
    }

    let mut entries = Vec::with_capacity(chain.len());
    for id in chain {
        let identity = load_identity(conn, &id)?;
        entries.push(AppealChainEntry {
            decision_id: id,
            court: identity.court,
            canton: identity.canton,
            decision_date: identity.decision_date,
            relation: "prior_instance",
        });
    }
    entries.sort_by(|a, b| match (a.decision_date, b.decision_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.decision_id.cmp(&b.decision_id),
    });
    Ok(entries)
}
