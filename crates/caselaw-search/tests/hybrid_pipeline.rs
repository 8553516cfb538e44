//! End-to-end exercise of ingest -> FTS5 -> vector store -> hybrid search,
//! grounded on the teacher crate's `tests/fault_injection.rs` style of
//! driving the whole pipeline through its public API rather than a single
//! module in isolation.

use caselaw_core::DecisionBuilder;
use caselaw_search::{
    build_vector_store, search_hybrid, search_lexical_only, EmbeddingSource, HashEmbedder, SearchFilters,
};
use caselaw_store::{apply_schema, insert_decision};
use chrono::NaiveDate;
use rusqlite::Connection;

fn decision(court: &str, canton: &str, docket: &str, title: &str, full_text: &str, year: i32) -> caselaw_core::Decision {
    let mut d = DecisionBuilder::new(court, canton, docket, "de", format!("https://example/{docket}"))
        .decision_date(NaiveDate::from_ymd_opt(year, 1, 1))
        .full_text(full_text)
        .build();
    d.title = Some(title.to_string());
    d
}

#[test]
fn hybrid_search_ranks_above_lexical_only_baseline() {
    let store = Connection::open_in_memory().unwrap();
    apply_schema(&store).unwrap();

    let asyl = decision(
        "bger",
        "ZH",
        "2C_55/2019",
        "Asylbeschwerde",
        "Der Beschwerdeführer ersucht um Asyl wegen drohender Verfolgung und widersetzt sich der Wegweisung.",
        2019,
    );
    let miet = decision(
        "bger",
        "BE",
        "4A_10/2019",
        "Mietstreit",
        "Die Parteien streiten über eine ausserordentliche Kündigung des Mietverhältnisses.",
        2019,
    );
    insert_decision(&store, &asyl).unwrap();
    insert_decision(&store, &miet).unwrap();

    let lexical_only = search_lexical_only(&store, "Asyl Wegweisung", &SearchFilters::default(), 10).unwrap();
    assert_eq!(lexical_only.backend, "sqlite_fts5");
    assert_eq!(lexical_only.results[0].decision_id, asyl.decision_id);

    let dir = tempfile::tempdir().unwrap();
    let vectors_path = dir.path().join("vectors.db");
    let embedder = HashEmbedder::new(64, 128);
    let sources = vec![
        EmbeddingSource {
            decision_id: &asyl.decision_id,
            language: "de",
            regeste: None,
            full_text: &asyl.full_text,
        },
        EmbeddingSource {
            decision_id: &miet.decision_id,
            language: "de",
            regeste: None,
            full_text: &miet.full_text,
        },
    ];
    let stats = build_vector_store(&vectors_path, &sources, &embedder, 32, false, false, None).unwrap();
    assert_eq!(stats.embedded, 2);

    let vec_conn = Connection::open(&vectors_path).unwrap();
    let hybrid = search_hybrid(
        &store,
        Some(&vec_conn),
        Some(&embedder),
        "Asyl Wegweisung",
        &SearchFilters::default(),
        10,
    )
    .unwrap();
    assert_eq!(hybrid.backend, "hybrid_rrf");
    assert_eq!(hybrid.results[0].decision_id, asyl.decision_id);
    assert!(hybrid.results.iter().any(|r| r.decision_id == miet.decision_id) || hybrid.results.len() == 1);
}

#[test]
fn filters_restrict_results_to_matching_canton() {
    let store = Connection::open_in_memory().unwrap();
    apply_schema(&store).unwrap();
    let a = decision("bger", "ZH", "1C_1/2021", "Fall A", "Verwaltungsrecht Baubewilligung", 2021);
    let b = decision("bger", "BE", "1C_2/2021", "Fall B", "Verwaltungsrecht Baubewilligung", 2021);
    insert_decision(&store, &a).unwrap();
    insert_decision(&store, &b).unwrap();

    let filters = SearchFilters {
        canton: Some("zh".to_string()),
        ..Default::default()
    };
    let response = search_lexical_only(&store, "Baubewilligung", &filters, 10).unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].decision_id, a.decision_id);
}
