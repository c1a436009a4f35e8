//! Integration tests for the IVAC preparation pipeline.
//!
//! These tests verify end-to-end behavior from raw text or raw frames to
//! checks, aggregates, scores and exports.

use ivac_prep::config::{DuplicateRemoval, NumericImputation};
use ivac_prep::{
    CheckKind, IvacError, Pipeline, PipelineConfig, PipelineStage, SourceLocation, ViewFilter,
    clean, impute, load, make_tables, normalize_column_name, run_checks, score,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn sample_location() -> SourceLocation {
    SourceLocation::Path(fixtures_path().join("ivac_sample.csv"))
}

/// The three-row table from the reference scenario.
fn scenario_raw() -> DataFrame {
    df![
        "Session" => ["2023", "2023", "2024"],
        "UAI" => ["0010001A", "0010002B", "0010001A"],
        "Taux de Réussite G" => ["88.5", "150", "90.0"],
        "VA du taux de réussite G" => ["3.2", "-60", "1.0"],
    ]
    .unwrap()
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name).unwrap().f64().unwrap().into_iter().collect()
}

fn str_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("value should be present");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[test]
fn test_scenario_cleaning_checks_and_timeseries() {
    let raw = scenario_raw();
    let tables = make_tables(&raw).unwrap();

    assert_eq!(
        f64_column(&tables.cleaned, "valeur_ajoutee"),
        vec![Some(3.2), Some(-60.0), Some(1.0)]
    );

    let checks = run_checks(&tables.cleaned).unwrap();
    assert_eq!(checks.rows(CheckKind::InvalidSuccessRate), &[1]);
    assert_eq!(checks.rows(CheckKind::ExtremeValueAdded), &[1]);

    let ts = &tables.timeseries;
    assert_eq!(
        str_column(ts, "session_str"),
        vec![Some("2023".to_string()), Some("2024".to_string())]
    );
    let va = f64_column(ts, "valeur_ajoutee");
    assert_close(va[0], -28.4);
    assert_close(va[1], 1.0);
}

#[test]
fn test_scenario_cleaning_is_deterministic_and_non_mutating() {
    let raw = scenario_raw();
    let before = raw.clone();

    let first = clean(&raw).unwrap();
    let second = clean(&raw).unwrap();

    assert!(first.df.equals_missing(&second.df));
    assert!(raw.equals_missing(&before));
    assert_eq!(
        first.source_of("valeur_ajoutee"),
        Some(&["va_du_taux_de_reussite_g".to_string()][..])
    );
}

#[test]
fn test_scenario_score_within_bounds() {
    let cleaned = clean(&scenario_raw()).unwrap().df;
    let value = score(&cleaned).unwrap();

    assert!((0.0..=100.0).contains(&value));
    assert_eq!(score(&DataFrame::empty()).unwrap(), 0.0);
}

#[test]
fn test_impute_median_leaves_input_unchanged() {
    let cleaned = df![
        "valeur_ajoutee" => [Some(1.0), None, Some(3.0)],
    ]
    .unwrap();
    let before = cleaned.clone();

    let imputed = impute(
        &cleaned,
        &["valeur_ajoutee".to_string()],
        NumericImputation::Median,
        None,
    )
    .unwrap();

    assert!(cleaned.equals_missing(&before));
    assert_eq!(
        f64_column(&imputed, "valeur_ajoutee"),
        vec![Some(1.0), Some(2.0), Some(3.0)]
    );
}

#[test]
fn test_normalizer_on_real_headers() {
    for header in [
        "Taux de Réussite G",
        "VA du taux de réussite G",
        "Note à l'écrit G",
        "Région académique",
    ] {
        let once = normalize_column_name(header);
        assert_eq!(normalize_column_name(&once), once);
    }
    assert_eq!(normalize_column_name("Note à l'écrit G"), "note_a_l_ecrit_g");
}

// ============================================================================
// Loading From Disk
// ============================================================================

#[test]
fn test_load_fixture_skips_preamble_and_sorts() {
    let raw = load(&sample_location()).unwrap();

    assert_eq!(raw.height(), 4);
    assert!(raw.column("num_ligne").is_ok());
    let ids: Vec<Option<i64>> = raw
        .column("num_ligne")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(4)]);
}

#[test]
fn test_missing_source_is_a_source_error() {
    let err = load(&SourceLocation::parse("/no/such/ivac.csv")).unwrap_err();

    assert!(matches!(err, IvacError::SourceNotFound { .. }));
    assert_eq!(err.location(), Some("/no/such/ivac.csv"));
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_pipeline_run_on_fixture() {
    let pipeline = Pipeline::builder().build().unwrap();
    let output = pipeline.run(&sample_location()).unwrap();
    let df = &output.cleaned.df;

    assert_eq!(df.height(), 4);
    assert!(output.loaded_at.is_some());

    // row_id comes from the legacy row sequence
    assert!(output.diff.engineered.contains(&"row_id".to_string()));
    assert!(output.diff.dropped.contains(&"num_ligne".to_string()));

    assert_eq!(
        str_column(df, "secteur"),
        vec![
            Some("PUBLIC".to_string()),
            Some("PRIVÉ".to_string()),
            Some("PUBLIC".to_string()),
            Some("PUBLIC".to_string()),
        ]
    );
    assert_eq!(
        f64_column(df, "nb_candidats_total"),
        vec![Some(120.0), Some(50.0), Some(120.0), Some(0.0)]
    );

    let summary = output.checks.summary();
    assert_eq!(summary.get("invalid_success_rate_g"), Some(&1));
    assert_eq!(summary.get("extreme_value_added"), Some(&1));
    assert_eq!(summary.get("invalid_uai_format"), Some(&1));
    assert_eq!(summary.get("logic_zero_candidates_but_rate"), Some(&1));
    assert_eq!(output.checks.total_issue_count(), 4);

    assert_eq!(output.clean_score.validity, 50.0);
    assert!((0.0..=100.0).contains(&output.clean_score.overall));

    let ts = &output.tables.timeseries;
    assert_close(f64_column(ts, "valeur_ajoutee")[0], -28.4);
    assert_close(f64_column(ts, "taux_reussite_g")[1], 82.5);
}

#[test]
fn test_pipeline_run_uses_cache() {
    let pipeline = Pipeline::builder().build().unwrap();

    let first = pipeline.run(&sample_location()).unwrap();
    let cached = pipeline.cache().current().expect("entry should be cached");
    let second = pipeline.run(&sample_location()).unwrap();

    assert_eq!(first.loaded_at, second.loaded_at);
    assert_eq!(Some(cached.loaded_at), second.loaded_at);
}

#[test]
fn test_failed_reload_keeps_previous_entry() {
    let pipeline = Pipeline::builder().build().unwrap();
    pipeline.run(&sample_location()).unwrap();

    let err = pipeline
        .run(&SourceLocation::parse("/no/such/ivac.csv"))
        .unwrap_err();

    assert!(err.is_source_error());
    let current = pipeline.cache().current().expect("previous entry kept");
    assert_eq!(current.raw.height(), 4);
}

#[test]
fn test_pipeline_sandbox_with_dedup_and_imputation() {
    let config = PipelineConfig::builder()
        .duplicate_removal(DuplicateRemoval::Key)
        .numeric_imputation(NumericImputation::Mean)
        .group_by("session_str")
        .build()
        .unwrap();

    let output = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&sample_location())
        .unwrap();

    // No repeated (uai, session) keys in the fixture
    assert_eq!(output.sandbox.height(), 4);
    // The 2024 group has one known value added (1.0)
    assert_eq!(
        f64_column(&output.sandbox, "valeur_ajoutee"),
        vec![Some(3.2), Some(-60.0), Some(1.0), Some(1.0)]
    );
    // The cleaned table stays pristine
    assert_eq!(
        output.cleaned.df.column("valeur_ajoutee").unwrap().null_count(),
        1
    );
}

#[test]
fn test_pipeline_progress_stages_reported() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&stages);

    Pipeline::builder()
        .on_progress(move |update| seen.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .run(&sample_location())
        .unwrap();

    assert_eq!(
        *stages.lock().unwrap(),
        vec![
            PipelineStage::Loading,
            PipelineStage::Aggregation,
            PipelineStage::Checks,
            PipelineStage::Outliers,
            PipelineStage::Sandbox,
            PipelineStage::Scoring,
            PipelineStage::Complete,
        ]
    );
}

#[test]
fn test_pipeline_export_writes_filtered_view_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::builder()
        .filter(ViewFilter {
            sessions: vec![2023],
            ..ViewFilter::default()
        })
        .output_dir(dir.path())
        .build()
        .unwrap();

    let pipeline = Pipeline::builder().config(config).build().unwrap();
    let output = pipeline.run(&sample_location()).unwrap();
    let files = pipeline.export(&output).unwrap();

    let filtered = std::fs::read_to_string(&files.filtered).unwrap();
    // Header plus the two 2023 rows
    assert_eq!(filtered.lines().count(), 3);

    let report = std::fs::read_to_string(&files.report).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "Metric,Value");
    assert_eq!(lines[1], "Rows,4");
}

#[test]
fn test_pipeline_summary_serializes() {
    let output = Pipeline::builder()
        .build()
        .unwrap()
        .process(&scenario_raw())
        .unwrap();

    let json = serde_json::to_value(output.summary()).unwrap();

    assert_eq!(json["raw_shape"], serde_json::json!([3, 4]));
    assert_eq!(json["checks"]["invalid_success_rate_g"], 1);
    assert!(json["clean_score"]["overall"].is_number());
    assert!(json.get("loaded_at").is_none());
}
