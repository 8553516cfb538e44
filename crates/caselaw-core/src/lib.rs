//! Domain types, normalization, configuration, and path layout shared by
//! every crate in the caselaw retrieval/knowledge-graph core.

pub mod config;
pub mod decision;
pub mod error;
pub mod normalize;
pub mod paths;

pub use config::Config;
pub use decision::{Decision, DecisionBuilder, Language};
pub use error::{Error, Result};
pub use normalize::{canonical_key, decision_id, normalize_docket};
pub use paths::PathLayout;

/// Registered court codes (spec.md §3: "lowercase, drawn from a registered
/// set (≈90 courts)"). This is a representative subset covering the federal
/// courts and the cantonal courts referenced elsewhere in this crate's
/// tests/fixtures; the full ≈90-entry registry is populated by the
/// extractor plugin registry (`caselaw-extract`), one entry per shipped
/// extractor, which is out of this core's scope per spec.md §1.
pub const FEDERAL_COURTS: &[&str] = &["bger", "bge", "bvger", "bstger", "bpatger"];
