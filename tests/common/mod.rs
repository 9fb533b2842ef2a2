//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

/// A non-average zip code and an ordinary one
pub const FLAGGED_ZIP: i64 = 96020;
pub const ORDINARY_ZIP: i64 = 97001;

/// Create a raw property table shaped like the source query.
///
/// This DataFrame includes:
/// - `parcelid`, `id`: identifiers dropped after acquisition
/// - the raw numeric columns renamed by feature engineering
/// - `propertylandusedesc`: mostly single-family, every 10th row a duplex
/// - `poolcnt`: 90% missing (dropped at the default 0.8 column threshold)
/// - `logerror`: target, loosely tied to size
pub fn create_property_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut bedrooms = Vec::with_capacity(rows);
    let mut bathrooms = Vec::with_capacity(rows);
    let mut square_feet = Vec::with_capacity(rows);
    let mut tax_value = Vec::with_capacity(rows);
    let mut tax_amount = Vec::with_capacity(rows);
    let mut year_built = Vec::with_capacity(rows);
    let mut zip = Vec::with_capacity(rows);
    let mut land_use = Vec::with_capacity(rows);
    let mut pool = Vec::with_capacity(rows);
    let mut log_error = Vec::with_capacity(rows);

    for i in 0..rows {
        let sqft: f64 = rng.gen_range(800.0..4000.0);
        let value = sqft * 150.0 + rng.gen_range(-20_000.0..20_000.0);
        bedrooms.push(rng.gen_range(1..=5) as f64);
        bathrooms.push(rng.gen_range(1..=4) as f64);
        square_feet.push(sqft);
        tax_value.push(value);
        tax_amount.push(value * 0.012);
        year_built.push(rng.gen_range(1901..=2015) as f64);
        zip.push(if i % 10 == 3 { FLAGGED_ZIP } else { ORDINARY_ZIP + (i % 7) as i64 });
        land_use.push(if i % 10 == 9 {
            "Duplex (2 Units, Any Combination)"
        } else {
            "Single Family Residential"
        });
        pool.push(if i % 10 == 0 { Some(1.0f64) } else { None });
        log_error.push(0.00002 * sqft + rng.gen_range(-0.05..0.05));
    }

    df! {
        "parcelid" => (0..rows as i64).map(|i| 10_000_000 + i).collect::<Vec<_>>(),
        "id" => (0..rows as i64).collect::<Vec<_>>(),
        "bedroomcnt" => bedrooms,
        "bathroomcnt" => bathrooms,
        "calculatedfinishedsquarefeet" => square_feet,
        "taxvaluedollarcnt" => tax_value,
        "taxamount" => tax_amount,
        "yearbuilt" => year_built,
        "regionidzip" => zip,
        "propertylandusedesc" => land_use,
        "poolcnt" => pool,
        "logerror" => log_error,
    }
    .unwrap()
}

/// Two well-separated groups on `x` and `y`, `per_group` rows each
pub fn create_two_group_dataframe(per_group: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(per_group * 2);
    let mut y = Vec::with_capacity(per_group * 2);
    for group in 0..2 {
        let center = group as f64 * 10.0;
        for _ in 0..per_group {
            x.push(center + rng.gen_range(-0.5..0.5));
            y.push(center + rng.gen_range(-0.5..0.5));
        }
    }
    df! { "x" => x, "y" => y }.unwrap()
}

/// Create a DataFrame with specific missing value patterns
pub fn create_missing_test_dataframe() -> DataFrame {
    df! {
        "col_complete" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        "col_20pct_missing" => [Some(1.0f64), None, Some(3.0), Some(4.0), Some(5.0)],
        "col_40pct_missing" => [Some(1.0f64), Some(2.0), None, None, Some(5.0)],
        "col_all_missing" => [None::<f64>, None, None, None, None],
        "propertylandusedesc" => ["Single Family Residential", "Condominium", "Duplex (2 Units, Any Combination)", "Townhouse", "Single Family Residential"],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Column values as f64, nulls included
pub fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
