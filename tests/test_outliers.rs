//! Tests for IQR outlier trimming

use parcelfit::pipeline::{remove_outliers, trim_outliers};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::{create_property_dataframe, floats};

fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

#[test]
fn test_huge_k_is_a_no_op() {
    let df = create_property_dataframe(200, 3);
    let out = remove_outliers(
        &df,
        1000.0,
        &names(&["taxvaluedollarcnt", "calculatedfinishedsquarefeet"]),
    )
    .unwrap();
    assert!(out.equals(&df));
}

#[test]
fn test_extreme_value_removed() {
    let df = df! {
        "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 100.0],
    }
    .unwrap();
    let trim = trim_outliers(&df, 1.5, &names(&["x"])).unwrap();
    assert_eq!(trim.frame.height(), 8);
    assert_eq!(trim.steps[0].q1, 3.0);
    assert_eq!(trim.steps[0].q3, 7.0);
    assert_eq!(trim.steps[0].rows_before, 9);
    assert_eq!(trim.steps[0].rows_after, 8);
}

#[test]
fn test_bounds_are_strict() {
    // q1 = 2, q3 = 4, k = 0 leaves only the values strictly between.
    let df = df! { "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0] }.unwrap();
    let out = remove_outliers(&df, 0.0, &names(&["x"])).unwrap();
    assert_eq!(floats(&out, "x"), vec![Some(3.0)]);
}

#[test]
fn test_nulls_are_removed() {
    let df = df! { "x" => [Some(1.0f64), None, Some(2.0), Some(3.0)] }.unwrap();
    let out = remove_outliers(&df, 1.5, &names(&["x"])).unwrap();
    assert_eq!(out.height(), 3);
}

#[test]
fn test_column_order_matters() {
    let df = df! {
        "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
        "b" => [100.0f64, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
    }
    .unwrap();

    let ab = trim_outliers(&df, 1.5, &names(&["a", "b"])).unwrap();
    let ba = trim_outliers(&df, 1.5, &names(&["b", "a"])).unwrap();

    // The second column's quartiles are computed on the already-trimmed table.
    assert_ne!(ab.steps[1].q1, ba.steps[0].q1);
    assert_eq!(ab.steps[0].column, "a");
    assert_eq!(ba.steps[0].column, "b");
}
