use caselaw_core::{Decision, DecisionBuilder};

#[test]
fn builder_derives_decision_id_and_canonical_key() {
    let decision: Decision = DecisionBuilder::new(
        "BGer",
        "ch",
        "4A_291/2017",
        "de",
        "https://example.invalid/4a_291_2017",
    )
    .full_text("some text")
    .build();

    assert_eq!(decision.decision_id, "bger_4A_291_2017");
    assert_eq!(decision.court, "bger");
    assert_eq!(decision.canton, "CH");
    assert!(decision.canonical_key.starts_with("bger|4A_291_2017|"));
}

#[test]
fn recompute_identity_is_pure_function_of_normalized_fields() {
    let mut a = DecisionBuilder::new("bl_gerichte", "BL", "400.2020.1", "de", "u").build();
    let mut b = DecisionBuilder::new("bl_gerichte", "BL", "400_2020_1", "de", "u").build();
    a.recompute_identity();
    b.recompute_identity();
    assert_eq!(a.decision_id, b.decision_id);
    assert_eq!(a.canonical_key, b.canonical_key);
}
