//! Decision chunking for chunk-level embedding (spec.md §4.4), ported from
//! `examples/original_source/search_stack/chunker.py`'s
//! `chunk_decision`/`_split_by_sections`/`_split_by_paragraphs`/`_split_positional`.

use std::sync::OnceLock;

use regex::Regex;

const MIN_SECTION_CHARS: usize = 50;

fn section_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(
                r"(?im)^\s*(?:[A-Z][.)]\s*|[IVXLC]+[.)]\s*)?(?:Sachverhalt|Faits|Fatti|Tatbestand)",
            )
            .expect("static section pattern 0"),
            Regex::new(
                r"(?im)^\s*(?:[A-Z][.)]\s*|[IVXLC]+[.)]\s*)?(?:Erwägungen?|Consid[ée]rants?|Considerandi|Begründung|Motivazione|Motivation|In Erwägung)",
            )
            .expect("static section pattern 1"),
            Regex::new(
                r"(?im)^\s*(?:[A-Z][.)]\s*|[IVXLC]+[.)]\s*)?(?:Dispositiv|Dispositif|Dispositivo|Urteilsformel|Demnach erkennt)",
            )
            .expect("static section pattern 2"),
        ]
    })
}

/// Split a decision's text into up to `max_chunks` meaningful sections, each
/// truncated to `max_chunk_chars` (spec.md §4.4).
#[must_use]
pub fn chunk_decision(text: Option<&str>, max_chunks: usize, max_chunk_chars: usize) -> Vec<String> {
    let Some(text) = text else { return Vec::new() };
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() < 100 {
        return vec![truncate_chars(text, max_chunk_chars)];
    }

    let by_sections = split_by_sections(text, max_chunks);
    if by_sections.len() >= 2 {
        return by_sections
            .into_iter()
            .take(max_chunks)
            .map(|c| truncate_chars(&c, max_chunk_chars))
            .collect();
    }

    let by_paragraphs = split_by_paragraphs(text, max_chunks);
    if by_paragraphs.len() >= 2 {
        return by_paragraphs
            .into_iter()
            .take(max_chunks)
            .map(|c| truncate_chars(&c, max_chunk_chars))
            .collect();
    }

    split_positional(text, max_chunks, max_chunk_chars)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn split_by_sections(text: &str, max_chunks: usize) -> Vec<String> {
    let mut split_points: Vec<usize> = Vec::new();
    for pattern in section_patterns() {
        for m in pattern.find_iter(text) {
            split_points.push(m.start());
        }
    }
    if split_points.is_empty() {
        return Vec::new();
    }
    split_points.sort_unstable();
    split_points.dedup();

    let mut sections = Vec::new();
    if split_points[0] > MIN_SECTION_CHARS {
        sections.push(text[..split_points[0]].trim().to_string());
    }
    for (i, &start) in split_points.iter().enumerate() {
        let end = split_points.get(i + 1).copied().unwrap_or(text.len());
        let section = text[start..end].trim().to_string();
        if section.chars().count() >= MIN_SECTION_CHARS {
            sections.push(section);
        }
    }

    if sections.len() >= 2 {
        sections.truncate(max_chunks);
        sections
    } else {
        Vec::new()
    }
}

fn split_by_paragraphs(text: &str, max_chunks: usize) -> Vec<String> {
    static PARA_SPLIT: OnceLock<Regex> = OnceLock::new();
    let re = PARA_SPLIT.get_or_init(|| Regex::new(r"\n\s*\n").expect("static paragraph split"));
    let paragraphs: Vec<String> = re
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    if paragraphs.len() < 2 {
        return Vec::new();
    }
    if paragraphs.len() <= max_chunks {
        return paragraphs;
    }

    let total_len: usize = paragraphs.iter().map(|p| p.chars().count()).sum();
    let target_len = total_len / max_chunks.max(1);

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;
    for p in paragraphs {
        current_len += p.chars().count();
        current.push(p);
        if current_len >= target_len && chunks.len() < max_chunks.saturating_sub(1) {
            chunks.push(current.join("\n\n"));
            current = Vec::new();
            current_len = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }
    chunks.truncate(max_chunks);
    chunks
}

fn split_positional(text: &str, max_chunks: usize, max_chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let slice = |start: usize, len: usize| -> String {
        let end = (start + len).min(n);
        chars[start.min(n)..end].iter().collect()
    };

    match max_chunks {
        0 => Vec::new(),
        1 => vec![slice(0, max_chunk_chars)],
        2 => vec![slice(0, max_chunk_chars), slice(n / 2, max_chunk_chars)],
        _ => vec![
            slice(0, max_chunk_chars),
            slice(n / 3, max_chunk_chars),
            slice(2 * n / 3, max_chunk_chars),
        ]
        .into_iter()
        .take(max_chunks)
        .collect(),
    }
}
