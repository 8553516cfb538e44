//! Statute reference, case citation, and prior-instance extraction from raw
//! decision text (spec.md §4.2, §4.6).
//!
//! Ported faithfully from `examples/original_source/search_stack/
//! reference_extraction.py`. Shared verbatim by `caselaw-extract` (which
//! runs it during ingestion to populate `Decision::cited_decisions`) and
//! `caselaw-graph` (which runs it again over the full corpus to build the
//! reference-graph tables) — the normalization must never drift between the
//! two call sites, so it lives in exactly one place.

use std::sync::OnceLock;

use regex::Regex;

/// Law-code tokens the statute regex's broad `[A-Z][A-Z0-9]{1,11}` capture
/// would otherwise mistake for an abbreviation — structural markers, and
/// common DE/FR/IT function words, per `_INVALID_LAW_CODES`.
const INVALID_LAW_CODES: &[&str] = &[
    // Statute structural markers
    "AL", "ABS", "ABSATZ", "ALIN", "ALINEA", "CPV", "PARA", "BIS", "TER", "QUATER", "QUINQUIES",
    "SEXIES", "FF", "SS", "SEGG", "ZIFF", "ZIFFER", "LIT", "BST", "BUCHST", "SATZ",
    // German articles, prepositions, conjunctions
    "AB", "AM", "AN", "AUS", "BEI", "BZW", "DA", "DAS", "DEM", "DEN", "DER", "DES", "DIE", "DIES",
    "DURCH", "EIN", "EINE", "EINEM", "EINEN", "EINER", "EINES", "ER", "ES", "GEGEN", "HA", "IM",
    "IN", "IST", "JE", "MIT", "NACH", "NEBEN", "NICHT", "NOCH", "NUR", "ODER", "OHNE", "SICH",
    "SIE", "SIND", "SOWIE", "UM", "UND", "UNTER", "VOM", "VON", "VOR", "WAR", "WIE", "WIRD", "ZU",
    "ZUM", "ZUR", "ZWISCHEN",
    // French articles, prepositions, conjunctions
    "AU", "AUX", "AVEC", "CE", "CES", "CETTE", "COMME", "DANS", "DE", "DU", "EN", "EST", "ET",
    "IL", "LA", "LE", "LES", "MAIS", "OU", "PAR", "PEUT", "POUR", "QUE", "QUI", "SE", "SONT",
    "SUR", "UN", "UNE",
    // Italian articles, prepositions
    "CHE", "CON", "CUI", "DAL", "DEI", "DEL", "DELL", "DELLA", "DELLE", "DELLO", "DI", "FRA",
    "GLI", "NEL", "NELL", "NELLA", "NON", "PER", "SUL", "TRA", "UNA", "UNO",
    // Ordinal / structural words
    "ART", "CUM", "DRITTER", "ERSTER", "LETT", "LET", "LETTRE", "LITT", "NAPR", "PHR", "PRIMA",
    "RZ", "SECONDA", "ZWEITER",
    // Common abbreviations that are not law codes
    "AD", "AGB", "BI", "CH", "NE", "NI", "NO", "OF", "QU", "RE", "SI",
];

fn invalid_law_code(code: &str) -> bool {
    INVALID_LAW_CODES.contains(&code)
}

fn statute_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?xi)
            \b(?:Art\.?|Artikel)\s*
            (?P<article>\d+(?:\s*(?:bis|ter|quater|quinquies|sexies)|[a-z](?![a-z]))?)\s*
            (?:(?:Abs\.?|Absatz|al\.?|alin(?:ea)?\.?|cpv\.?|co\.?|para\.?)\s*
                (?P<paragraph>\d+(?:\s*(?:bis|ter|quater|quinquies|sexies)|[a-z](?![a-z]))?))?\s*
            (?:(?:ff|ss|segg)\.?\s+)?
            (?:(?:Ziff(?:er)?|lit|Bst|Buchst|S|Satz|ch|let|n)\.?\s*(?:\d+|[a-z])\s+)?
            (?P<law>[A-Z][A-Z0-9]{1,11}(?:/[A-Z0-9]{2,6})?)
            \b
            ",
        )
        .expect("static statute pattern")
    })
}

fn bge_lookback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bBGE\s*$").expect("static BGE lookback pattern"))
}

fn bge_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bBGE\s+(?P<vol>\d{2,3})\s+(?P<div>[IVX]{1,4})\s+(?P<page>\d{1,4})\b")
            .expect("static BGE pattern")
    })
}

/// `DOCKET_PATTERNS[0..2]` (skipping the BGE-internal-style pattern) —
/// used both for full-text docket citation extraction and, restricted to
/// the first two, for splitting parenthetical prior-instance content.
fn docket_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"\b[A-Z0-9]{1,4}[._-]\d{1,6}[/_]\d{4}\b").expect("docket pattern 0"),
            Regex::new(r"\b[A-Z]{1,6}\.\d{4}\.\d{1,6}\b").expect("docket pattern 1"),
            Regex::new(r"\b\d{2,3}\s+[IVX]{1,4}\s+\d{1,4}\b").expect("docket pattern 2"),
        ]
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatuteReference {
    pub raw: String,
    pub law_code: String,
    pub article: String,
    pub paragraph: Option<String>,
    pub normalized: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationType {
    Bge,
    Docket,
}

impl CitationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bge => "bge",
            Self::Docket => "docket",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseCitation {
    pub raw: String,
    pub citation_type: CitationType,
    pub normalized: String,
}

/// Both reference kinds extracted from one text, per `extract_references`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedReferences {
    pub statutes: Vec<StatuteReference>,
    pub citations: Vec<CaseCitation>,
}

#[must_use]
pub fn extract_references(text: &str) -> ExtractedReferences {
    ExtractedReferences {
        statutes: extract_statute_references(text),
        citations: extract_case_citations(text),
    }
}

/// Strip internal whitespace and lowercase, used to normalize an
/// article/paragraph token ("8  bis" -> "8bis").
fn collapse_and_lower(s: &str) -> String {
    s.split_whitespace().collect::<String>().to_lowercase()
}

#[must_use]
pub fn extract_statute_references(text: &str) -> Vec<StatuteReference> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut refs = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for caps in statute_pattern().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always matches");
        let raw = whole.as_str().trim().to_string();
        let article = caps
            .name("article")
            .map(|m| collapse_and_lower(m.as_str()))
            .unwrap_or_default();
        let paragraph = caps.name("paragraph").map(|m| collapse_and_lower(m.as_str()));
        let law_raw = caps.name("law").expect("law group always present when matched").as_str();

        // Require the matched text to look like a legal abbreviation, not a
        // regular word: lowercase words and long title-case words are
        // filtered here; short title-case tokens are left to the blocklist.
        let n_upper = law_raw.chars().filter(char::is_ascii_uppercase).count();
        if n_upper == 0 {
            continue;
        }
        if n_upper == 1 && law_raw.len() > 3 {
            continue;
        }

        let law_code = law_raw.to_uppercase();
        if invalid_law_code(&law_code) {
            continue;
        }

        let normalized = normalize_statute(&article, paragraph.as_deref(), &law_code);
        if !seen.insert(normalized.clone()) {
            continue;
        }
        refs.push(StatuteReference {
            raw,
            law_code,
            article,
            paragraph,
            normalized,
        });
    }
    refs
}

#[must_use]
pub fn extract_case_citations(text: &str) -> Vec<CaseCitation> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut refs = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for caps in bge_pattern().captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always matches");
        let raw = whole.as_str().trim().to_string();
        let vol = &caps["vol"];
        let div = caps["div"].to_uppercase();
        let page = &caps["page"];
        let normalized = format!("BGE {vol} {div} {page}");
        if !seen.insert(normalized.clone()) {
            continue;
        }
        refs.push(CaseCitation {
            raw,
            citation_type: CitationType::Bge,
            normalized,
        });
    }

    let patterns = docket_patterns();
    for (idx, pattern) in patterns.iter().enumerate() {
        let is_last = idx == patterns.len() - 1;
        for m in pattern.find_iter(text) {
            if is_last {
                // Avoid double-counting BGE refs as docket-style refs: the
                // third pattern (`151 I 62`) also matches BGE's own
                // "<vol> <div> <page>" shape with the "BGE " prefix dropped.
                let lookback_start = m.start().saturating_sub(8);
                let prefix = &text[lookback_start..m.start()];
                if bge_lookback_re().is_match(prefix) {
                    continue;
                }
            }
            let raw = m.as_str().trim().to_string();
            let normalized = normalize_docket(&raw);
            if normalized.is_empty() || !seen.insert(normalized.clone()) {
                continue;
            }
            refs.push(CaseCitation {
                raw,
                citation_type: CitationType::Docket,
                normalized,
            });
        }
    }

    refs
}

/// Build the same `normalized` key used for `statutes.normalized` /
/// `StatuteReference::normalized`, for callers that need to look a statute
/// up by `(law_code, article, paragraph)` rather than parse it out of text
/// (spec.md §6: `GET /statute/{law_code}/{article}`).
#[must_use]
pub fn normalize_statute(article: &str, paragraph: Option<&str>, law_code: &str) -> String {
    paragraph.map_or_else(
        || format!("ART.{article}.{}", law_code.to_uppercase()),
        |p| format!("ART.{article}.ABS.{}.{}", p.to_lowercase(), law_code.to_uppercase()),
    )
}

/// Normalize a free-text docket/citation mention for dedup/graph-join
/// purposes. Preserves BGE-style spacing (`"151 I 62"`), otherwise collapses
/// punctuation to `_`.
#[must_use]
pub fn normalize_docket(text: &str) -> String {
    let compact: String = text
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    static BGE_SHAPE: OnceLock<Regex> = OnceLock::new();
    let bge_shape =
        BGE_SHAPE.get_or_init(|| Regex::new(r"^\d{2,3}\s+[IVX]{1,4}\s+\d{1,4}$").expect("static"));
    if bge_shape.is_match(&compact) {
        return compact;
    }

    let mut normalized = text.trim().to_uppercase();
    normalized = normalized.replace(['-', '.', '/'], "_");
    while normalized.contains("__") {
        normalized = normalized.replace("__", "_");
    }
    normalized.trim_matches('_').to_string()
}

// ---------------------------------------------------------------------
// Prior instance extraction (appeal chain tracking)
// ---------------------------------------------------------------------

fn gegenstand_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:Gegenstand|Objet|Oggetto)\b").expect("static"))
}

fn body_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:Erwägung(?:en)?|Sachverhalt|Considérant|Faits|Considerando|Fatti|Visto|In\s+Erwägung)\s*:",
        )
        .expect("static")
    })
}

fn prior_instance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)\b(?:Beschwerde|Berufung|Rekurs|Einsprache|recours|appel|ricorso)\s+(?:gegen|contre|contro)\b[^(]{10,500}?\(([^)]{3,100})\)",
        )
        .expect("static")
    })
}

fn paren_docket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[A-Z0-9]{1,6}[./_-]\d{2,6}[./_-]\d{2,6}(?:\s*[-\u{2013}]\s*[A-Z0-9]{1,6}[./_-]\d{2,6}[./_-]\d{2,6})?",
        )
        .expect("static")
    })
}

/// Extract the prior-instance docket(s) from a decision's header section
/// (spec.md §4.6's appeal-chain wiring), e.g. the `(SBK.2025.285)` in
/// "Beschwerde gegen den Entscheid des Obergerichts ... (SBK.2025.285)".
#[must_use]
pub fn extract_prior_instance(text: Option<&str>) -> Vec<String> {
    let Some(text) = text else {
        return Vec::new();
    };
    if text.is_empty() {
        return Vec::new();
    }

    let header = extract_header_section(text);

    let mut dockets = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for caps in prior_instance_re().captures_iter(&header) {
        let Some(paren) = caps.get(1) else { continue };
        for docket in extract_dockets_from_paren(paren.as_str().trim()) {
            if seen.insert(docket.clone()) {
                dockets.push(docket);
            }
        }
    }
    dockets
}

/// Text between the `Gegenstand`/`Objet`/`Oggetto` header marker and the
/// first body-section marker, or the first 2000 characters if no
/// `Gegenstand` marker is found.
fn extract_header_section(text: &str) -> String {
    let Some(gegenstand) = gegenstand_re().find(text) else {
        let end = text.char_indices().nth(2000).map_or(text.len(), |(i, _)| i);
        return text[..end].to_string();
    };
    let start = gegenstand.start();
    let search_from = (start + 10).min(text.len());
    let end = body_start_re()
        .find_at(text, search_from)
        .map_or_else(
            || {
                let cap = start + 2000;
                text.char_indices()
                    .map(|(i, _)| i)
                    .find(|i| *i >= cap)
                    .unwrap_or(text.len())
            },
            |m| m.start(),
        );
    text[start..end].to_string()
}

/// Split parenthetical prior-instance content on ` - `/`,`/`;` and extract a
/// normalized docket from each part, per `_extract_dockets_from_paren`.
fn extract_dockets_from_paren(content: &str) -> Vec<String> {
    if content.is_empty() || content.trim() == "..." || content.trim() == "\u{2026}" {
        return Vec::new();
    }

    static SPLIT_RE: OnceLock<Regex> = OnceLock::new();
    let split_re =
        SPLIT_RE.get_or_init(|| Regex::new(r"\s+[-\u{2013}]\s+|[,;]\s*").expect("static"));

    let mut results = Vec::new();
    for part in split_re.split(content) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let mut found = false;
        for pattern in &docket_patterns()[..2] {
            let matches: Vec<&str> = pattern.find_iter(part).map(|m| m.as_str()).collect();
            if !matches.is_empty() {
                for raw in matches {
                    let normalized = normalize_docket(raw);
                    if !normalized.is_empty() {
                        results.push(normalized);
                        found = true;
                    }
                }
                break;
            }
        }
        if found {
            continue;
        }

        if let Some(m) = paren_docket_re().find(part) {
            let normalized = normalize_docket(m.as_str());
            if normalized.len() >= 5 {
                results.push(normalized);
                continue;
            }
        }

        if (5..=40).contains(&part.len())
            && part.chars().any(|c| c.is_ascii_digit())
            && part.chars().any(|c| c.is_ascii_alphabetic())
            && !part.contains(' ')
        {
            let normalized = normalize_docket(part);
            if normalized.len() >= 5 {
                results.push(normalized);
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_simple_article_reference() {
        let refs = extract_statute_references("Art. 8 EMRK garantiert das Recht.");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].law_code, "EMRK");
        assert_eq!(refs[0].article, "8");
        assert_eq!(refs[0].normalized, "ART.8.EMRK");
    }

    #[test]
    fn extracts_article_with_paragraph() {
        let refs = extract_statute_references("gemäss Art. 34 Abs. 2 BV ist dies zulässig");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].paragraph.as_deref(), Some("2"));
        assert_eq!(refs[0].normalized, "ART.34.ABS.2.BV");
    }

    #[test]
    fn rejects_blocklisted_law_codes() {
        let refs = extract_statute_references("Art. 8 Abs. 2 der Verfassung");
        assert!(refs.is_empty());
    }

    #[test]
    fn dedups_repeated_statute_mentions() {
        let refs = extract_statute_references("Art. 8 EMRK ... und wieder Art. 8 EMRK.");
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn extracts_bge_citation() {
        let citations = extract_case_citations("Gemäss BGE 147 I 268 gilt...");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].citation_type, CitationType::Bge);
        assert_eq!(citations[0].normalized, "BGE 147 I 268");
    }

    #[test]
    fn docket_style_bge_reference_is_not_double_counted() {
        let citations = extract_case_citations("siehe BGE 147 I 268 und sonst nichts.");
        assert_eq!(citations.len(), 1);
    }

    #[test]
    fn extracts_docket_citation() {
        let citations = extract_case_citations("Vgl. Urteil 4A_291/2017 des Bundesgerichts.");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].citation_type, CitationType::Docket);
        assert_eq!(citations[0].normalized, "4A_291_2017");
    }

    #[test]
    fn extracts_prior_instance_from_header() {
        let text = "Gegenstand\nBeschwerde gegen den Entscheid des Obergerichts vom 13.11.2025 (SBK.2025.285).\nErwägungen: ...";
        let dockets = extract_prior_instance(Some(text));
        assert_eq!(dockets, vec!["SBK_2025_285".to_string()]);
    }

    #[test]
    fn extracts_multiple_prior_instance_dockets_separated_by_dash() {
        let text = "Gegenstand\nrecours contre l'arrêt de la Cour de justice du 6 août 2024 (A/1168/2024 - ATA/917/2024).\nConsidérant: ...";
        let dockets = extract_prior_instance(Some(text));
        assert_eq!(dockets.len(), 2);
    }

    #[test]
    fn no_gegenstand_marker_falls_back_to_first_slice() {
        assert_eq!(extract_prior_instance(Some("")), Vec::<String>::new());
        assert_eq!(extract_prior_instance(None), Vec::<String>::new());
    }
}
