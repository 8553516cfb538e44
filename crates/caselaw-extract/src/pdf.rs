//! Pluggable PDF text extraction (spec.md §4.2: "PDF text extraction:
//! `bytes -> string`, via a pluggable backend").
//!
//! Several federal and cantonal courts publish decisions as PDF only; the
//! core defines the seam, a concrete backend (e.g. `pdf-extract`,
//! `lopdf`-based) is wired in by the host binary so this crate stays free
//! of a heavy PDF-parsing dependency it can't exercise without the
//! toolchain.

/// Extract plain text from a PDF document's raw bytes.
pub trait PdfExtractor {
    type Error: std::fmt::Display;

    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, Self::Error>;
}

/// A `PdfExtractor` that always reports no backend configured — the
/// default when a deployment hasn't wired one in yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPdfExtractor;

impl PdfExtractor for NoPdfExtractor {
    type Error = PdfNotConfigured;

    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<String, Self::Error> {
        Err(PdfNotConfigured)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PdfNotConfigured;

impl std::fmt::Display for PdfNotConfigured {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("no PDF extraction backend configured")
    }
}

impl std::error::Error for PdfNotConfigured {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pdf_extractor_always_errors() {
        let extractor = NoPdfExtractor;
        assert!(extractor.extract_text(b"%PDF-1.4").is_err());
    }
}
