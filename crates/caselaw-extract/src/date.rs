//! Decision-date parsing (spec.md §4.2), grounded on
//! `examples/original_source/scrapers/bger.py`'s `_resolve_date` (tries
//! `%d.%m.%Y` then `%Y-%m-%d`) and `_parse_rss_date` (RFC-822, with a
//! manual month-name fallback), supplemented with localized DE/FR/IT month
//! names since header text like "13. November 2025" / "6 août 2024" /
//! "31 marzo 2025" appears throughout decision headers (spec.md §4.6).

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

const MONTHS_DE: &[(&str, u32)] = &[
    ("januar", 1), ("februar", 2), ("märz", 3), ("maerz", 3), ("april", 4),
    ("mai", 5), ("juni", 6), ("juli", 7), ("august", 8), ("september", 9),
    ("oktober", 10), ("november", 11), ("dezember", 12),
];

const MONTHS_FR: &[(&str, u32)] = &[
    ("janvier", 1), ("février", 2), ("fevrier", 2), ("mars", 3), ("avril", 4),
    ("mai", 5), ("juin", 6), ("juillet", 7), ("août", 8), ("aout", 8),
    ("septembre", 9), ("octobre", 10), ("novembre", 11), ("décembre", 12), ("decembre", 12),
];

const MONTHS_IT: &[(&str, u32)] = &[
    ("gennaio", 1), ("febbraio", 2), ("marzo", 3), ("aprile", 4), ("maggio", 5),
    ("giugno", 6), ("luglio", 7), ("agosto", 8), ("settembre", 9),
    ("ottobre", 10), ("novembre", 11), ("dicembre", 12),
];

const MONTHS_EN: &[(&str, u32)] = &[
    ("jan", 1), ("feb", 2), ("mar", 3), ("apr", 4), ("may", 5), ("jun", 6),
    ("jul", 7), ("aug", 8), ("sep", 9), ("oct", 10), ("nov", 11), ("dec", 12),
];

fn month_number(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    [MONTHS_DE, MONTHS_FR, MONTHS_IT, MONTHS_EN]
        .iter()
        .find_map(|table| table.iter().find(|(name, _)| *name == lower).map(|(_, n)| *n))
}

fn dotted_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").expect("static"))
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("static"))
}

fn localized_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})\.?\s+([A-Za-z\u{e0}-\u{f6}\u{f8}-\u{ff}]+)\s+(\d{4})\b")
            .expect("static")
    })
}

fn rfc822_month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\s+(\w{3})\s+(\d{4})").expect("static"))
}

/// Parse `DD.MM.YYYY` or `YYYY-MM-DD`, per `_resolve_date`.
#[must_use]
pub fn parse_simple_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(caps) = dotted_date_re().captures(value) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = iso_date_re().captures(value) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Parse a localized date such as "13. November 2025", "6 août 2024", or
/// "31 marzo 2025" — the shapes seen in prior-instance header excerpts.
#[must_use]
pub fn parse_localized_date(value: &str) -> Option<NaiveDate> {
    let caps = localized_date_re().captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse an RFC-822-style RSS `pubDate`, falling back to a bare
/// `"<day> <Mon> <year>"` scan on strict-format failure, per
/// `_parse_rss_date`.
#[must_use]
pub fn parse_rfc822_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc2822(value) {
        return Some(parsed.date_naive());
    }
    let caps = rfc822_month_re().captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Try every known format, in the order a decision field is most likely to
/// appear in: simple numeric, localized month name, RFC-822.
#[must_use]
pub fn parse_any_date(value: &str) -> Option<NaiveDate> {
    parse_simple_date(value)
        .or_else(|| parse_localized_date(value))
        .or_else(|| parse_rfc822_date(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_date() {
        assert_eq!(parse_simple_date("13.11.2025"), NaiveDate::from_ymd_opt(2025, 11, 13));
    }

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_simple_date("2025-11-13"), NaiveDate::from_ymd_opt(2025, 11, 13));
    }

    #[test]
    fn parses_german_localized_date() {
        assert_eq!(parse_localized_date("13. November 2025"), NaiveDate::from_ymd_opt(2025, 11, 13));
    }

    #[test]
    fn parses_french_localized_date() {
        assert_eq!(parse_localized_date("6 août 2024"), NaiveDate::from_ymd_opt(2024, 8, 6));
    }

    #[test]
    fn parses_italian_localized_date() {
        assert_eq!(parse_localized_date("31 marzo 2025"), NaiveDate::from_ymd_opt(2025, 3, 31));
    }

    #[test]
    fn parses_rfc822_date() {
        assert_eq!(
            parse_rfc822_date("Thu, 13 Nov 2025 10:00:00 +0100"),
            NaiveDate::from_ymd_opt(2025, 11, 13)
        );
    }

    #[test]
    fn any_date_tries_every_format() {
        assert!(parse_any_date("2025-11-13").is_some());
        assert!(parse_any_date("13. November 2025").is_some());
        assert!(parse_any_date("not a date").is_none());
    }
}
