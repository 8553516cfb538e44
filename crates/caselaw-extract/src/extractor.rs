//! Extractor trait + driver loop (spec.md §4.2).

use std::collections::HashSet;

use caselaw_core::Decision;

/// Partial metadata discovered for one decision before its full text has
/// been fetched: just enough to dedup against the state journal and issue
/// the follow-up fetch.
#[derive(Debug, Clone)]
pub struct DecisionStub {
    pub decision_id: String,
    pub fetch_url: String,
}

/// Site-specific extractor contract (spec.md §4.2). One implementation per
/// court/source; the driver below is source-agnostic.
pub trait Extractor {
    type Error: std::fmt::Display;

    /// Stable court code, e.g. `"bger"`.
    fn court_code(&self) -> &str;

    /// Lazily discover stubs newer than `since` (or all known stubs when
    /// `since` is `None`). Raising here terminates the whole run.
    fn discover_new(
        &mut self,
        since: Option<chrono::NaiveDate>,
    ) -> Result<Box<dyn Iterator<Item = DecisionStub>>, Self::Error>;

    /// Fetch and parse one stub into a full `Decision`, or `None` if the
    /// source has since removed/withdrawn it. Raising here only increments
    /// the run's error counter; the driver continues.
    fn fetch_decision(&mut self, stub: &DecisionStub) -> Result<Option<Decision>, Self::Error>;
}

/// Where the driver writes successfully-fetched decisions — the per-source
/// append-only JSONL record log (`caselaw-store::journal`), abstracted so
/// the driver has no direct store dependency.
pub trait DecisionSink {
    fn write(&mut self, decision: &Decision) -> std::io::Result<()>;
}

/// Tracks already-ingested decision IDs for one court, abstracted over the
/// on-disk state journal (spec.md §4.2: `state.contains(...)` / `state.add(...)`).
pub trait StateJournal {
    fn contains(&self, decision_id: &str) -> bool;
    fn add(&mut self, decision_id: &str);
}

/// In-memory `StateJournal` used by tests and as the seed for a freshly
/// initialized on-disk journal.
#[derive(Debug, Default)]
pub struct MemoryStateJournal {
    known: HashSet<String>,
}

impl MemoryStateJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateJournal for MemoryStateJournal {
    fn contains(&self, decision_id: &str) -> bool {
        self.known.contains(decision_id)
    }

    fn add(&mut self, decision_id: &str) {
        self.known.insert(decision_id.to_string());
    }
}

/// Outcome of one driver run (spec.md §4.2/§8: "terminates the run with a
/// partial result").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub fetched: usize,
    pub skipped_known: usize,
    pub errors: usize,
    /// `true` if the run stopped because `max_decisions` was reached, not
    /// because `discover_new` was exhausted.
    pub capped: bool,
    /// `true` if the run stopped because the error ceiling was hit.
    pub error_ceiling_hit: bool,
}

/// Run one extractor to completion against a sink and state journal,
/// honoring `max_decisions` and `max_errors` (spec.md §4.2/§9).
pub fn run_extractor<E, S, J>(
    extractor: &mut E,
    sink: &mut S,
    state: &mut J,
    since: Option<chrono::NaiveDate>,
    max_decisions: usize,
    max_errors: usize,
) -> RunStats
where
    E: Extractor,
    S: DecisionSink,
    J: StateJournal,
{
    let mut stats = RunStats::default();

    let stubs = match extractor.discover_new(since) {
        Ok(stubs) => stubs,
        Err(err) => {
            tracing::error!(court = extractor.court_code(), error = %err, "discover_new failed, aborting run");
            return stats;
        }
    };

    for stub in stubs {
        if stats.fetched >= max_decisions {
            stats.capped = true;
            break;
        }
        if state.contains(&stub.decision_id) {
            stats.skipped_known += 1;
            continue;
        }

        match extractor.fetch_decision(&stub) {
            Ok(Some(decision)) => {
                if let Err(io_err) = sink.write(&decision) {
                    tracing::error!(decision_id = %decision.decision_id, error = %io_err, "failed to write decision to sink");
                    stats.errors += 1;
                } else {
                    state.add(&decision.decision_id);
                    stats.fetched += 1;
                }
            }
            Ok(None) => {
                // Source withdrew the decision between discovery and fetch;
                // not an error, just nothing to ingest.
            }
            Err(err) => {
                tracing::warn!(decision_id = %stub.decision_id, error = %err, "fetch_decision failed");
                stats.errors += 1;
            }
        }

        if stats.errors >= max_errors {
            stats.error_ceiling_hit = true;
            break;
        }
    }

    stats
}
