//! Metadata filter composition (spec.md §4.5), ported from
//! `query_planner.py`'s `SearchFilters`/`_build_filter_clauses`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canton: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_area: Option<String>,
}

impl SearchFilters {
    /// Normalize each field to the case spec.md §4.5 mandates: lowercase
    /// for everything except `canton`, which is uppercased.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            court: self.court.as_deref().map(str::to_ascii_lowercase),
            canton: self.canton.as_deref().map(str::to_ascii_uppercase),
            language: self.language.as_deref().map(str::to_ascii_lowercase),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            decision_type: self.decision_type.as_deref().map(str::to_ascii_lowercase),
            legal_area: self.legal_area.as_deref().map(str::to_ascii_lowercase),
        }
    }

    /// Build a `WHERE`-clause fragment (without the leading `WHERE`) and its
    /// bound parameters, joined with `AND`, for the FTS5 backend. Returns
    /// `(None, [])` when no filter is active.
    #[must_use]
    pub fn sql_clause(&self) -> (Option<String>, Vec<String>) {
        let normalized = self.normalized();
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(court) = normalized.court {
            clauses.push("d.court = ?".to_string());
            params.push(court);
        }
        if let Some(canton) = normalized.canton {
            clauses.push("d.canton = ?".to_string());
            params.push(canton);
        }
        if let Some(language) = normalized.language {
            clauses.push("d.language = ?".to_string());
            params.push(language);
        }
        if let Some(decision_type) = normalized.decision_type {
            clauses.push("d.decision_type = ?".to_string());
            params.push(decision_type);
        }
        if let Some(legal_area) = normalized.legal_area {
            clauses.push("d.legal_area = ?".to_string());
            params.push(legal_area);
        }
        if let Some(date_from) = normalized.date_from.filter(|s| is_iso_date(s)) {
            clauses.push("d.decision_date >= ?".to_string());
            params.push(date_from);
        }
        if let Some(date_to) = normalized.date_to.filter(|s| is_iso_date(s)) {
            clauses.push("d.decision_date < ?".to_string());
            params.push(date_to);
        }

        if clauses.is_empty() {
            (None, Vec::new())
        } else {
            (Some(clauses.join(" AND ")), params)
        }
    }
}

fn is_iso_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_per_field() {
        let filters = SearchFilters {
            court: Some("BGer".into()),
            canton: Some("zh".into()),
            language: Some("DE".into()),
            ..Default::default()
        };
        let normalized = filters.normalized();
        assert_eq!(normalized.court.as_deref(), Some("bger"));
        assert_eq!(normalized.canton.as_deref(), Some("ZH"));
        assert_eq!(normalized.language.as_deref(), Some("de"));
    }

    #[test]
    fn empty_filters_produce_no_clause() {
        let (clause, params) = SearchFilters::default().sql_clause();
        assert!(clause.is_none());
        assert!(params.is_empty());
    }

    #[test]
    fn date_range_becomes_half_open_clause() {
        let filters = SearchFilters {
            date_from: Some("2020-01-01".into()),
            date_to: Some("2021-01-01".into()),
            ..Default::default()
        };
        let (clause, params) = filters.sql_clause();
        let clause = clause.unwrap();
        assert!(clause.contains(">="));
        assert!(clause.contains('<') && !clause.contains("<="));
        assert_eq!(params, vec!["2020-01-01", "2021-01-01"]);
    }

    #[test]
    fn malformed_dates_are_dropped_not_injected() {
        let filters = SearchFilters {
            date_from: Some("not-a-date".into()),
            ..Default::default()
        };
        let (clause, params) = filters.sql_clause();
        assert!(clause.is_none());
        assert!(params.is_empty());
    }
}
