//! Tests for the threshold t-test

use parcelfit::pipeline::{
    drop_source_identifiers, prepare, threshold_t_test, welch_t_test, PipelineError,
    PrepareConfig,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::create_property_dataframe;

#[test]
fn test_tax_value_split_detects_size_effect() {
    // The fixture's log error grows with size, and assessed value tracks size.
    let raw = drop_source_identifiers(create_property_dataframe(300, 8)).unwrap();
    let prepared = prepare(&raw, &PrepareConfig::default()).unwrap();

    let test = threshold_t_test(&prepared, "tax_assessed_value", 250_000.0, "log_error", 0.05)
        .unwrap();
    let result = &test.result;

    assert_eq!(result.n_a + result.n_b, prepared.height());
    assert!(result.n_a >= 2 && result.n_b >= 2);
    assert!(result.mean_a < result.mean_b);
    assert!(result.statistic < 0.0);
    assert!(result.reject_null(), "p = {}", result.p_value);
}

#[test]
fn test_groups_from_same_distribution_are_not_rejected() {
    let df = df! {
        "v" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        "y" => [0.1f64, 0.3, 0.2, 0.4, 0.3, 0.1, 0.4, 0.2],
    }
    .unwrap();
    let test = threshold_t_test(&df, "v", 4.5, "y", 0.05).unwrap();
    assert_eq!((test.result.n_a, test.result.n_b), (4, 4));
    assert!((test.result.mean_a - test.result.mean_b).abs() < 1e-12);
    assert!(!test.result.reject_null());
}

#[test]
fn test_threshold_row_goes_to_upper_group() {
    let df = df! {
        "v" => [1.0f64, 2.0, 3.0, 3.0, 4.0],
        "y" => [1.0f64, 2.0, 3.0, 5.0, 4.0],
    }
    .unwrap();
    let test = threshold_t_test(&df, "v", 3.0, "y", 0.05).unwrap();
    assert_eq!((test.result.n_a, test.result.n_b), (2, 3));
}

#[test]
fn test_missing_and_non_finite_rows_are_skipped() {
    let df = df! {
        "v" => [Some(1.0f64), Some(2.0), None, Some(f64::NAN), Some(5.0), Some(6.0)],
        "y" => [Some(1.0f64), Some(2.0), Some(9.0), Some(9.0), Some(5.0), None],
    }
    .unwrap();
    let err = threshold_t_test(&df, "v", 3.0, "y", 0.05).unwrap_err();
    // Only one usable row is left above the threshold.
    assert!(err.to_string().contains("at least two values"));
}

#[test]
fn test_missing_column() {
    let df = df! { "y" => [1.0f64, 2.0] }.unwrap();
    let err = threshold_t_test(&df, "tax_assessed_value", 1.0, "y", 0.05).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingColumn { .. })
    ));
}

#[test]
fn test_welch_matches_hand_computation() {
    let a = [0.02, 0.03, 0.01, 0.05];
    let b = [0.06, 0.08, 0.07, 0.09, 0.05];
    let result = welch_t_test(&a, &b, 0.05).unwrap();

    // Squared deviations from the means 0.0275 and 0.07
    let var_a: f64 = (0.00005625 + 0.00000625 + 0.00030625 + 0.00050625) / 3.0;
    let var_b: f64 = (0.0001 + 0.0001 + 0.0 + 0.0004 + 0.0004) / 4.0;
    let se = (var_a / 4.0 + var_b / 5.0).sqrt();
    assert!((result.statistic - (0.0275 - 0.07) / se).abs() < 1e-9);
    assert!(result.p_value > 0.0 && result.p_value < 0.05);
    assert!(result.reject_null());
}
