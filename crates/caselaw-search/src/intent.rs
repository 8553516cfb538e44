//! Query-intent detection (spec.md §4.5), ported from
//! `examples/original_source/search_stack/query_planner.py`'s
//! `detect_query_intent` and its `DOCKET_PATTERN`/`BGE_PATTERN`/
//! `STATUTE_PATTERN`/`BOOLEAN_PATTERN` constants.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryIntent {
    Docket,
    Citation,
    Statute,
    Boolean,
    NaturalLanguage,
}

impl QueryIntent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Docket => "docket",
            Self::Citation => "citation",
            Self::Statute => "statute",
            Self::Boolean => "boolean",
            Self::NaturalLanguage => "natural_language",
        }
    }
}

fn docket_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?xi)
            \b[A-Z]{1,4}[._-]\d{1,6}[./]\d{4}\b |
            \b[A-Z]{1,4}\.\d{4}\.\d{1,6}\b |
            \b\d+[A-Z]?[._-]\d{1,6}[./]\d{4}\b
            ",
        )
        .expect("static docket intent pattern")
    })
}

fn bge_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bBGE\s+\d{2,3}\s+[IVX]+\s+\d+\b").expect("static BGE pattern"))
}

fn statute_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:Art\.?|Artikel)\s*\d+[a-zA-Z]?(?:\s*Abs\.?\s*\d+[a-zA-Z]?)?\s*[A-Z]{2,10}\b")
            .expect("static statute intent pattern")
    })
}

fn boolean_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(AND|OR|NOT|NEAR)\b").expect("static boolean pattern"))
}

/// Detect the intent of a raw query string, in spec order: DOCKET, then
/// CITATION, then STATUTE, then BOOLEAN, else NATURAL_LANGUAGE.
#[must_use]
pub fn detect_query_intent(query: &str) -> QueryIntent {
    let q = query.trim();
    if q.is_empty() {
        return QueryIntent::NaturalLanguage;
    }
    if docket_pattern().is_match(q) {
        return QueryIntent::Docket;
    }
    if bge_pattern().is_match(q) {
        return QueryIntent::Citation;
    }
    if statute_pattern().is_match(q) {
        return QueryIntent::Statute;
    }
    if boolean_pattern().is_match(q) || q.contains('"') {
        return QueryIntent::Boolean;
    }
    QueryIntent::NaturalLanguage
}
