//! Identity normalization shared by the ingester, the query planner, and the
//! reference graph resolver (spec.md §3, §8 invariants 1-2).
//!
//! Grounded on `examples/original_source/search_stack/reference_extraction.py`
//! (`_normalize_docket`) and `build_reference_graph.py` (`_docket_norm`) —
//! both original-source copies of the same algorithm, reunified here into one
//! function so the ingester and the graph builder can never drift apart.

use chrono::NaiveDate;

/// Normalize a docket number for identity/dedup purposes.
///
/// `upper(docket)` with `-`, `.`, `/` replaced by `_`, runs of `_` collapsed,
/// leading/trailing `_` trimmed, spaces replaced by `_`.
#[must_use]
pub fn normalize_docket(docket: &str) -> String {
    let mut out = String::with_capacity(docket.len());
    for ch in docket.trim().chars() {
        match ch {
            '-' | '.' | '/' | ' ' => out.push('_'),
            c => out.extend(c.to_uppercase()),
        }
    }
    collapse_underscores(&out)
}

fn collapse_underscores(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_underscore = false;
    for ch in s.chars() {
        if ch == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(ch);
    }
    out.trim_matches('_').to_string()
}

/// `decision_id = {court_code}_{normalized_docket}`.
#[must_use]
pub fn decision_id(court: &str, docket: &str) -> String {
    format!("{}_{}", court.to_ascii_lowercase(), normalize_docket(docket))
}

/// `canonical_key` derived from `(court, normalize(docket), decision_date)`.
///
/// The date suffix is the ISO date, or empty string when the date is
/// unknown. Per DESIGN.md's resolution of spec.md §9's open question, a
/// decision with an unknown date is treated as distinct from one with a
/// known date for the same court+docket (they only collide with another
/// unknown-date row for the same court+docket).
#[must_use]
pub fn canonical_key(court: &str, docket: &str, decision_date: Option<NaiveDate>) -> String {
    let date_suffix = decision_date.map_or_else(String::new, |d| d.format("%Y-%m-%d").to_string());
    format!(
        "{}|{}|{}",
        court.to_ascii_lowercase(),
        normalize_docket(docket),
        date_suffix
    )
}
