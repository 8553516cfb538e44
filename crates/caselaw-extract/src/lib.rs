//! Site-agnostic extraction: text cleanup, date/language detection,
//! statute/citation reference extraction, and the extractor driver loop
//! (spec.md §4.2, §4.6).

pub mod date;
pub mod extractor;
pub mod lang;
pub mod pdf;
pub mod reference;
pub mod text;

pub use date::{parse_any_date, parse_localized_date, parse_rfc822_date, parse_simple_date};
pub use extractor::{
    run_extractor, DecisionSink, DecisionStub, Extractor, MemoryStateJournal, RunStats,
    StateJournal,
};
pub use lang::detect_language;
pub use pdf::{NoPdfExtractor, PdfExtractor, PdfNotConfigured};
pub use reference::{
    extract_case_citations, extract_prior_instance, extract_references,
    extract_statute_references, normalize_docket, normalize_statute, CaseCitation, CitationType,
    ExtractedReferences, StatuteReference,
};
pub use text::{normalize_whitespace, repair_mojibake, strip_html};
