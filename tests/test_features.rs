//! Tests for feature engineering

use parcelfit::pipeline::features::{
    add_age_bins, add_location_flag, add_property_age, add_ratio_features, rename_columns,
    NON_AVERAGE_ZIP_CODES,
};
use parcelfit::pipeline::{engineer_features, FeatureConfig, PipelineError, LOCATION_FLAG_COLUMN};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::{assert_has_columns, assert_missing_columns, create_property_dataframe, floats};

#[test]
fn test_location_flag_marks_exactly_flagged_rows() {
    // 100 rows, 10 of them in a non-average zip code.
    let zips: Vec<i64> = (0..100)
        .map(|i| if i % 10 == 0 { NON_AVERAGE_ZIP_CODES[i / 10] } else { 90000 + i as i64 })
        .collect();
    let df = df! { "zip_code" => zips }.unwrap();

    let out = add_location_flag(&df, "zip_code", NON_AVERAGE_ZIP_CODES, LOCATION_FLAG_COLUMN).unwrap();
    let flag = out.column(LOCATION_FLAG_COLUMN).unwrap();

    assert_eq!(flag.dtype(), &DataType::Boolean);
    assert_eq!(flag.bool().unwrap().sum(), Some(10));
}

#[test]
fn test_location_flag_null_code_is_false() {
    let df = df! { "zip_code" => [Some(96020.0f64), None] }.unwrap();
    let out = add_location_flag(&df, "zip_code", NON_AVERAGE_ZIP_CODES, "flag").unwrap();
    let flags: Vec<Option<bool>> = out.column("flag").unwrap().bool().unwrap().into_iter().collect();
    assert_eq!(flags, vec![Some(true), Some(false)]);
}

#[test]
fn test_property_age_and_bins() {
    let df = df! { "year_built" => [Some(1925.0f64), Some(2001.0), Some(1700.0), None] }.unwrap();

    let aged = add_property_age(&df, 2017).unwrap();
    assert_eq!(
        floats(&aged, "property_age"),
        vec![Some(92.0), Some(16.0), Some(317.0), None]
    );

    let binned = add_age_bins(&df, &[1800, 1925, 1950, 1975, 2000, 2020]).unwrap();
    let bins: Vec<Option<String>> = binned
        .column("year_built_bin")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    assert_eq!(
        bins,
        vec![
            Some("1800-1925".to_string()),
            Some("2000-2020".to_string()),
            None,
            None
        ]
    );
}

#[test]
fn test_ratio_division_by_zero_and_null() {
    let df = df! {
        "square_feet" => [Some(1000.0f64), Some(1200.0), None],
        "bedrooms" => [Some(0.0f64), Some(3.0), Some(2.0)],
        "bathrooms" => [Some(2.0f64), Some(0.0), Some(1.0)],
        "tax_amount" => [Some(100.0f64), Some(0.0), Some(50.0)],
        "tax_assessed_value" => [Some(10_000.0f64), Some(0.0), Some(5_000.0)],
    }
    .unwrap();

    let out = add_ratio_features(&df).unwrap();

    let per_bedroom = floats(&out, "size_per_bedroom");
    assert_eq!(per_bedroom[0], Some(f64::INFINITY));
    assert_eq!(per_bedroom[1], Some(400.0));
    assert_eq!(per_bedroom[2], None);

    let tax_rate = floats(&out, "tax_rate");
    assert!(tax_rate[1].unwrap().is_nan());
    assert_eq!(floats(&out, "total_rooms"), vec![Some(2.0), Some(3.0), Some(3.0)]);
}

#[test]
fn test_rename_skips_absent_columns() {
    let df = df! { "bedroomcnt" => [1.0f64] }.unwrap();
    let renames = vec![
        ("bedroomcnt".to_string(), "bedrooms".to_string()),
        ("nosuchcolumn".to_string(), "whatever".to_string()),
    ];
    let out = rename_columns(&df, &renames).unwrap();
    assert_has_columns(&out, &["bedrooms"]);
    assert_missing_columns(&out, &["bedroomcnt", "whatever"]);
}

#[test]
fn test_engineer_features_default_config() {
    let df = create_property_dataframe(50, 7);
    let out = engineer_features(&df, &FeatureConfig::default()).unwrap();
    assert_has_columns(
        &out,
        &[
            "square_feet",
            "tax_assessed_value",
            "property_age",
            "year_built_bin",
            LOCATION_FLAG_COLUMN,
            "log_error",
        ],
    );
    assert_missing_columns(&out, &["size_per_bedroom"]);
    // Every tenth row of the fixture sits in a flagged zip code.
    assert_eq!(out.column(LOCATION_FLAG_COLUMN).unwrap().bool().unwrap().sum(), Some(5));
}

#[test]
fn test_missing_source_column_fails() {
    let df = df! { "other" => [1.0f64] }.unwrap();
    let err = add_property_age(&df, 2017).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingColumn { .. })
    ));
}
