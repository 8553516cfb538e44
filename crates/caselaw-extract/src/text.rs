//! Raw-text cleanup shared by every extractor (spec.md §4.2): mojibake
//! repair, HTML stripping with entity decoding, and whitespace
//! normalization.
//!
//! Grounded on `mcp-agent-mail-search-core/src/canonical.rs`'s
//! `strip_markdown` idiom (a battery of `LazyLock<Regex>` passes chained
//! over an owned `String`), adapted from Markdown to HTML since court
//! portals serve HTML, not Markdown.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<script.*?</script>|<style.*?</style>|<[^>]+>").expect("static"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0b\x0c\r]+").expect("static"))
}

fn blank_lines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static"))
}

/// Common named/numeric HTML entities found in Swiss court HTML exports.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&auml;", "\u{e4}"),
    ("&ouml;", "\u{f6}"),
    ("&uuml;", "\u{fc}"),
    ("&Auml;", "\u{c4}"),
    ("&Ouml;", "\u{d6}"),
    ("&Uuml;", "\u{dc}"),
    ("&szlig;", "\u{df}"),
    ("&eacute;", "\u{e9}"),
    ("&egrave;", "\u{e8}"),
    ("&agrave;", "\u{e0}"),
    ("&ccedil;", "\u{e7}"),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&laquo;", "\u{ab}"),
    ("&raquo;", "\u{bb}"),
];

/// Mojibake byte sequences observed when UTF-8 text was mis-decoded as
/// Latin-1/Windows-1252 upstream, mapped back to the intended character.
/// Covers the German-umlaut/French-accent garbling most common in scraped
/// Swiss court HTML.
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{c3}\u{a4}", "\u{e4}"),
    ("\u{c3}\u{b6}", "\u{f6}"),
    ("\u{c3}\u{bc}", "\u{fc}"),
    ("\u{c3}\u{84}", "\u{c4}"),
    ("\u{c3}\u{96}", "\u{d6}"),
    ("\u{c3}\u{9c}", "\u{dc}"),
    ("\u{c3}\u{9f}", "\u{df}"),
    ("\u{c3}\u{a9}", "\u{e9}"),
    ("\u{c3}\u{a8}", "\u{e8}"),
    ("\u{c3}\u{a0}", "\u{e0}"),
    ("\u{c3}\u{a7}", "\u{e7}"),
];

/// Decode HTML entities and repair common UTF-8-as-Latin-1 mojibake.
#[must_use]
pub fn repair_mojibake(input: &str) -> String {
    let mut text = input.to_string();
    for (entity, replacement) in HTML_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    for (garbled, fixed) in MOJIBAKE {
        if text.contains(garbled) {
            text = text.replace(garbled, fixed);
        }
    }
    text.nfc().collect()
}

/// Strip HTML tags (including `<script>`/`<style>` bodies), decode
/// entities, and collapse whitespace. Paragraph breaks (`<p>`, `<br>`,
/// `<div>`) become newlines before tags are removed, so paragraph
/// structure survives for the chunker/header-extraction passes downstream.
#[must_use]
pub fn strip_html(input: &str) -> String {
    static BREAK_RE: OnceLock<Regex> = OnceLock::new();
    let break_re = BREAK_RE.get_or_init(|| {
        Regex::new(r"(?i)<(?:br|/p|/div|/li|/tr)\s*/?>").expect("static")
    });

    let with_breaks = break_re.replace_all(input, "\n");
    let stripped = html_tag_re().replace_all(&with_breaks, "");
    let decoded = repair_mojibake(&stripped);
    normalize_whitespace(&decoded)
}

/// Collapse runs of horizontal whitespace, trim each line, and cap
/// consecutive blank lines at two (preserving paragraph breaks).
#[must_use]
pub fn normalize_whitespace(input: &str) -> String {
    let collapsed = whitespace_re().replace_all(input, " ");
    let trimmed: String = collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    blank_lines_re().replace_all(&trimmed, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_paragraph_breaks() {
        let html = "<p>Erster Satz.</p><p>Zweiter Satz.</p>";
        let text = strip_html(html);
        assert_eq!(text, "Erster Satz.\n\nZweiter Satz.");
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(repair_mojibake("K&auml;fer &amp; Co"), "K\u{e4}fer & Co");
    }

    #[test]
    fn repairs_double_encoded_umlauts() {
        assert_eq!(repair_mojibake("Gr\u{c3}\u{b6}sse"), "Gr\u{f6}sse");
    }

    #[test]
    fn drops_script_and_style_bodies_entirely() {
        let html = "<style>.x{color:red}</style><script>alert(1)</script><p>Text</p>";
        assert_eq!(strip_html(html), "Text");
    }

    #[test]
    fn collapses_excess_blank_lines() {
        let text = "a\n\n\n\n\nb";
        assert_eq!(normalize_whitespace(text), "a\n\nb");
    }
}
