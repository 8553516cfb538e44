//! The canonical `Decision` record (spec.md §3).
//!
//! Every extractor across every court produces a `Decision`. The ingester
//! normalizes it, computes `decision_id`/`canonical_key`, and upserts it into
//! the relational store (`caselaw-store`). This is the single schema shared
//! by the FTS index, the vector store, and the reference graph.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{canonical_key, decision_id, normalize_docket};

/// Language of a decision's text. Only the four official/national languages
/// of Switzerland that appear in court decisions are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    Fr,
    It,
    Rm,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::De => "de",
            Self::Fr => "fr",
            Self::It => "it",
            Self::Rm => "rm",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "de" => Some(Self::De),
            "fr" => Some(Self::Fr),
            "it" => Some(Self::It),
            "rm" => Some(Self::Rm),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical Swiss court decision record (spec.md §3).
///
/// Field order matches `caselaw_store::schema::INSERT_COLUMNS` — the two are
/// the single source of truth for row layout and must be kept in sync by
/// hand (there is no derive macro bridging them, matching the teacher's
/// `db_schema.py` convention of one Python module owning both).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    // === Identity ===
    pub decision_id: String,
    pub canonical_key: String,
    pub court: String,
    pub canton: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chamber: Option<String>,

    // === Case identification ===
    pub docket_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docket_number_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,

    // === Content ===
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regeste: Option<String>,
    /// Trilingual BGE Leitentscheid abstracts (supplemented from
    /// `original_source/models.py`; `spec.md`'s table omits them but they
    /// are carried the same way as `regeste`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_de: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_fr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_it: Option<String>,
    #[serde(default)]
    pub full_text: String,

    // === Metadata ===
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judges: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clerks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appeal_info: Option<String>,

    // === References ===
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bge_reference: Option<String>,
    #[serde(default)]
    pub cited_decisions: Vec<String>,

    // === Provenance ===
    pub scraped_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_spider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

/// Builder used by extractors so `decision_id`/`canonical_key` are always
/// derived rather than hand-typed (spec.md §8 invariant 1).
pub struct DecisionBuilder {
    court: String,
    canton: String,
    docket_number: String,
    decision_date: Option<NaiveDate>,
    language: String,
    full_text: String,
    source_url: String,
    scraped_at: DateTime<Utc>,
}

impl DecisionBuilder {
    #[must_use]
    pub fn new(
        court: impl Into<String>,
        canton: impl Into<String>,
        docket_number: impl Into<String>,
        language: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            court: court.into().to_ascii_lowercase(),
            canton: canton.into().to_ascii_uppercase(),
            docket_number: docket_number.into(),
            decision_date: None,
            language: language.into().to_ascii_lowercase(),
            full_text: String::new(),
            source_url: source_url.into(),
            scraped_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn decision_date(mut self, date: Option<NaiveDate>) -> Self {
        self.decision_date = date;
        self
    }

    #[must_use]
    pub fn full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = text.into();
        self
    }

    #[must_use]
    pub fn scraped_at(mut self, ts: DateTime<Utc>) -> Self {
        self.scraped_at = ts;
        self
    }

    /// Finalize into a `Decision`, deriving `decision_id` and `canonical_key`.
    #[must_use]
    pub fn build(self) -> Decision {
        let decision_id = decision_id(&self.court, &self.docket_number);
        let canonical_key = canonical_key(&self.court, &self.docket_number, self.decision_date);
        Decision {
            decision_id,
            canonical_key,
            court: self.court,
            canton: self.canton,
            chamber: None,
            docket_number: self.docket_number,
            docket_number_2: None,
            decision_date: self.decision_date,
            publication_date: None,
            language: self.language,
            title: None,
            legal_area: None,
            regeste: None,
            abstract_de: None,
            abstract_fr: None,
            abstract_it: None,
            full_text: self.full_text,
            decision_type: None,
            outcome: None,
            judges: None,
            clerks: None,
            collection: None,
            appeal_info: None,
            source_url: self.source_url,
            pdf_url: None,
            bge_reference: None,
            cited_decisions: Vec::new(),
            scraped_at: self.scraped_at,
            external_id: None,
            source: None,
            source_id: None,
            source_spider: None,
            content_hash: None,
        }
    }
}

impl Decision {
    /// Recompute `decision_id`/`canonical_key` from the current
    /// `court`/`docket_number`/`decision_date`. The ingester calls this after
    /// normalizing mojibake/case on untrusted extractor output, so identity
    /// is always a pure function of the normalized fields, never whatever the
    /// extractor happened to set.
    pub fn recompute_identity(&mut self) {
        self.court = self.court.to_ascii_lowercase();
        self.canton = self.canton.to_ascii_uppercase();
        self.language = self.language.to_ascii_lowercase();
        self.decision_id = decision_id(&self.court, &self.docket_number);
        self.canonical_key = canonical_key(&self.court, &self.docket_number, self.decision_date);
    }

    #[must_use]
    pub fn docket_norm(&self) -> String {
        normalize_docket(&self.docket_number)
    }
}
