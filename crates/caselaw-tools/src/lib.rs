//! Tool-calling API surface (spec.md §4.8): five typed, read-only
//! operations over the decision store, search engine, and reference graph,
//! designed to be called by an LLM orchestrator.
//! - `search_decisions`
//! - `get_decision`
//! - `list_courts`
//! - `get_statistics`
//! - `find_appeal_chain`

#![forbid(unsafe_code)]

pub mod appeal;
pub mod catalog;
pub mod decision;
pub mod search;

pub use appeal::{find_appeal_chain, AppealChainOutcome};
pub use catalog::{get_statistics, list_courts, GetStatisticsRequest};
pub use decision::get_decision;
pub use search::{search_decisions, SearchDecisionsRequest};
