//! Reciprocal Rank Fusion (spec.md §4.5), ported from the idiom in
//! `mcp-agent-mail-search-core/src/fusion.rs` (rank-based contribution,
//! deterministic tie-breaking) but keyed on `decision_id` strings instead of
//! integer doc ids, and pinned to the spec's fixed parameters
//! (`rank_constant = 60`, `window_size = 300`) rather than an env-tunable k.

use std::collections::HashMap;

pub const RANK_CONSTANT: f64 = 60.0;
pub const WINDOW_SIZE: usize = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub decision_id: String,
    pub score: f64,
    pub lexical_rank: Option<usize>,
    pub vector_rank: Option<usize>,
}

#[inline]
fn contribution(rank: Option<usize>) -> f64 {
    rank.map_or(0.0, |r| 1.0 / (RANK_CONSTANT + r as f64))
}

/// Fuse a lexical ranking and a vector ranking (each already truncated to
/// `window_size` by the caller) by reciprocal rank. `lexical`/`vector` are
/// ordered best-first; rank is derived from position (1-based). A document
/// missing from one list contributes 0 from that side (spec.md §4.5:
/// "missing rank counts as ∞, contributing 0").
#[must_use]
pub fn fuse_rrf(lexical: &[String], vector: &[String], size: usize) -> Vec<FusedHit> {
    let lexical_ranks: HashMap<&str, usize> = lexical
        .iter()
        .take(WINDOW_SIZE)
        .enumerate()
        .map(|(i, id)| (id.as_str(), i + 1))
        .collect();
    let vector_ranks: HashMap<&str, usize> = vector
        .iter()
        .take(WINDOW_SIZE)
        .enumerate()
        .map(|(i, id)| (id.as_str(), i + 1))
        .collect();

    let mut union: Vec<&str> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for id in lexical.iter().take(WINDOW_SIZE).chain(vector.iter().take(WINDOW_SIZE)) {
        if seen.insert(id.as_str()) {
            union.push(id.as_str());
        }
    }

    let mut fused: Vec<FusedHit> = union
        .into_iter()
        .map(|id| {
            let lexical_rank = lexical_ranks.get(id).copied();
            let vector_rank = vector_ranks.get(id).copied();
            FusedHit {
                decision_id: id.to_string(),
                score: contribution(lexical_rank) + contribution(vector_rank),
                lexical_rank,
                vector_rank,
            }
        })
        .collect();

    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.decision_id.cmp(&b.decision_id))
    });
    fused.truncate(size);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_source_hits_are_not_penalized() {
        let lexical = vec!["a".to_string(), "b".to_string()];
        let vector: Vec<String> = Vec::new();
        let fused = fuse_rrf(&lexical, &vector, 10);
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-12);
        assert_eq!(fused[0].vector_rank, None);
    }

    #[test]
    fn overlapping_docs_sum_both_contributions() {
        let lexical = vec!["a".to_string(), "b".to_string()];
        let vector = vec!["b".to_string(), "a".to_string()];
        let fused = fuse_rrf(&lexical, &vector, 10);
        let a = fused.iter().find(|h| h.decision_id == "a").unwrap();
        assert!((a.score - (1.0 / 61.0 + 1.0 / 62.0)).abs() < 1e-12);
    }

    #[test]
    fn merged_length_is_bounded_by_union_and_size() {
        let lexical: Vec<String> = (0..5).map(|i| format!("L{i}")).collect();
        let vector: Vec<String> = (0..5).map(|i| format!("V{i}")).collect();
        let fused = fuse_rrf(&lexical, &vector, 100);
        assert_eq!(fused.len(), 10);
    }

    #[test]
    fn result_is_sorted_descending() {
        let lexical = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vector = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        let fused = fuse_rrf(&lexical, &vector, 10);
        for pair in fused.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn truncates_to_requested_size() {
        let lexical: Vec<String> = (0..10).map(|i| format!("d{i}")).collect();
        let fused = fuse_rrf(&lexical, &[], 3);
        assert_eq!(fused.len(), 3);
    }
}
