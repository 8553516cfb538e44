//! Citation confidence scoring (spec.md §4.6), ported from
//! `build_reference_graph.py`'s `_citation_confidence`/`_infer_court_from_docket`.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

const BASE_CONFIDENCE: f64 = 0.55;
const BSTGER_PREFIXES: &[&str] = &[
    "BB", "BG", "BH", "BK", "BN", "BP", "CA", "CB", "CR", "RR", "SK", "SN", "SP", "TP",
];

fn bger_docket_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[1-9][A-Z]_\d").expect("static"))
}

fn bvger_docket_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-F]_\d{1,6}_\d{4}").expect("static"))
}

/// Infer a court code from a normalized docket number, matching
/// `_infer_court_from_docket`'s three patterns (BGer/BVGer/BStGer). Returns
/// `None` when the docket shape doesn't match any of the three.
#[must_use]
pub fn infer_court_from_docket(docket_norm: &str) -> Option<&'static str> {
    if bger_docket_pattern().is_match(docket_norm) {
        return Some("bger");
    }
    if bvger_docket_pattern().is_match(docket_norm) {
        return Some("bvger");
    }
    let prefix = docket_norm.get(..2)?.to_uppercase();
    if BSTGER_PREFIXES.contains(&prefix.as_str()) {
        return Some("bstger");
    }
    None
}

/// Inputs to `_citation_confidence`, gathered by the resolver's SQL join
/// between the citing decision and one candidate target.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInput<'a> {
    pub source_court: &'a str,
    pub source_canton: &'a str,
    pub source_date: Option<NaiveDate>,
    pub target_court: &'a str,
    pub target_canton: &'a str,
    pub target_date: Option<NaiveDate>,
    pub target_docket_norm: &'a str,
    pub candidate_rank: i64,
    pub candidate_count: i64,
}

/// Score a single citation-to-target candidate match in `[0.05, 0.99]`, per
/// `_citation_confidence`.
#[must_use]
pub fn citation_confidence(input: ConfidenceInput<'_>) -> f64 {
    let mut score = BASE_CONFIDENCE;

    if let Some(inferred) = infer_court_from_docket(input.target_docket_norm) {
        if inferred == input.target_court {
            score += 0.20;
        } else {
            score -= 0.20;
        }
    }

    if input.source_canton.eq_ignore_ascii_case(input.target_canton) {
        score += 0.10;
    }
    if input.source_court.eq_ignore_ascii_case(input.target_court) {
        score += 0.08;
    }

    if let (Some(source_date), Some(target_date)) = (input.source_date, input.target_date) {
        if target_date <= source_date {
            score += 0.15;
        } else {
            score -= 0.15;
        }
        let gap_days = (source_date - target_date).num_days().abs();
        if gap_days <= 365 {
            score += 0.10;
        } else if gap_days <= 3 * 365 {
            score += 0.05;
        }
    }

    match input.candidate_rank {
        1 => score += 0.05,
        2 => score += 0.02,
        _ => {}
    }

    if input.candidate_count > 1 {
        let penalty = 0.03 * (input.candidate_count - 1) as f64;
        score -= penalty.min(0.15);
    }

    score.clamp(0.05, 0.99)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_bger_from_docket() {
        assert_eq!(infer_court_from_docket("4A_291_2017"), Some("bger"));
    }

    #[test]
    fn infers_bvger_from_docket() {
        assert_eq!(infer_court_from_docket("A_1234_2021"), Some("bvger"));
    }

    #[test]
    fn infers_bstger_from_prefix() {
        assert_eq!(infer_court_from_docket("SK_2021_5"), Some("bstger"));
    }

    #[test]
    fn unmatched_shape_infers_nothing() {
        assert_eq!(infer_court_from_docket("ZH_2021_5"), None);
    }

    #[test]
    fn matching_court_and_canton_and_recent_date_scores_high() {
        let input = ConfidenceInput {
            source_court: "bger",
            source_canton: "ZH",
            source_date: NaiveDate::from_ymd_opt(2020, 6, 1),
            target_court: "bger",
            target_canton: "ZH",
            target_date: NaiveDate::from_ymd_opt(2019, 6, 1),
            target_docket_norm: "4A_291_2017",
            candidate_rank: 1,
            candidate_count: 1,
        };
        let score = citation_confidence(input);
        assert!(score > 0.9, "expected high confidence, got {score}");
    }

    #[test]
    fn future_target_date_is_penalized() {
        let base = ConfidenceInput {
            source_court: "bger",
            source_canton: "ZH",
            source_date: NaiveDate::from_ymd_opt(2019, 1, 1),
            target_court: "bger",
            target_canton: "ZH",
            target_date: None,
            target_docket_norm: "4A_291_2017",
            candidate_rank: 1,
            candidate_count: 1,
        };
        let past = citation_confidence(ConfidenceInput {
            target_date: NaiveDate::from_ymd_opt(2018, 1, 1),
            ..base
        });
        let future = citation_confidence(ConfidenceInput {
            target_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..base
        });
        assert!(past > future);
    }

    #[test]
    fn temporal_proximity_bonus_applies_even_to_an_implausible_future_date() {
        // Target dated after the source is "implausible" (-0.15), but the
        // |delta| <= 1 year proximity bonus (+0.10) is unconditional and
        // must still apply on top of that penalty.
        let implausible_far = ConfidenceInput {
            source_court: "bger",
            source_canton: "ZH",
            source_date: NaiveDate::from_ymd_opt(2019, 1, 1),
            target_court: "bger",
            target_canton: "ZH",
            target_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            target_docket_norm: "4A_291_2017",
            candidate_rank: 1,
            candidate_count: 1,
        };
        let implausible_near = ConfidenceInput {
            target_date: NaiveDate::from_ymd_opt(2019, 6, 1),
            ..implausible_far
        };
        let far_score = citation_confidence(implausible_far);
        let near_score = citation_confidence(implausible_near);
        assert!(
            (near_score - far_score - 0.10).abs() < 1e-9,
            "expected the near future date to score exactly 0.10 higher than the far one, got near={near_score} far={far_score}"
        );
    }

    #[test]
    fn stacked_penalties_clamp_at_the_floor() {
        let input = ConfidenceInput {
            source_court: "bstger",
            source_canton: "ZH",
            source_date: NaiveDate::from_ymd_opt(2019, 1, 1),
            target_court: "zhger",
            target_canton: "BE",
            // matches the BGer docket shape but the candidate's own court
            // disagrees with that inference -> -0.20
            // dated more than 3 years after the source so neither proximity
            // bonus applies, on top of the -0.15 implausibility penalty
            target_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            target_docket_norm: "4A_291_2017",
            candidate_rank: 5,
            candidate_count: 6,
        };
        assert!((citation_confidence(input) - 0.05).abs() < 1e-9);
    }
}
