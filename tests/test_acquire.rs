//! Tests for acquisition, the CSV cache and the dataset loader

use parcelfit::pipeline::{
    acquire, drop_source_identifiers, get_column_names, load_dataset, load_dataset_with_progress,
    save_dataset, AcquireConfig,
};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::{assert_has_columns, assert_missing_columns, create_property_dataframe, create_temp_csv, create_temp_parquet};

#[test]
fn test_acquire_writes_cache_and_drops_ids() {
    let mut df = create_property_dataframe(20, 1);
    let (dir, source) = create_temp_parquet(&mut df);
    let cache = dir.path().join("cache.csv");

    let config = AcquireConfig::new(&source, &cache);
    let acquired = acquire(&config, true, true).unwrap();

    assert!(cache.exists());
    assert_missing_columns(&acquired, &["parcelid", "id"]);
    assert_eq!(acquired.height(), 20);

    // The cache keeps the untransformed source table.
    let cached_columns = get_column_names(&cache).unwrap();
    assert!(cached_columns.contains(&"parcelid".to_string()));
}

#[test]
fn test_acquire_reads_existing_cache() {
    let mut df = create_property_dataframe(10, 2);
    let (dir, source) = create_temp_csv(&mut df);
    let cache = dir.path().join("cache.csv");

    // A cache that differs from the source proves which one was read.
    let mut cached = df.head(Some(3));
    save_dataset(&mut cached, &cache).unwrap();

    let config = AcquireConfig::new(&source, &cache);
    assert_eq!(acquire(&config, true, false).unwrap().height(), 3);
    assert_eq!(acquire(&config, false, false).unwrap().height(), 10);
}

#[test]
fn test_post_fetch_applies_on_both_paths() {
    let mut df = create_property_dataframe(5, 3);
    let (dir, source) = create_temp_csv(&mut df);
    let cache = dir.path().join("cache.csv");
    let config = AcquireConfig::new(&source, &cache);

    let fresh = acquire(&config, true, true).unwrap();
    let from_cache = acquire(&config, true, true).unwrap();
    assert_eq!(fresh.get_column_names(), from_cache.get_column_names());
    assert_missing_columns(&from_cache, &["id"]);
}

#[test]
fn test_no_post_fetch_keeps_ids() {
    let mut df = create_property_dataframe(5, 4);
    let (dir, source) = create_temp_csv(&mut df);
    let mut config = AcquireConfig::new(&source, dir.path().join("cache.csv"));
    config.post_fetch = None;

    let acquired = acquire(&config, false, false).unwrap();
    assert_has_columns(&acquired, &["id", "parcelid"]);
    assert!(!dir.path().join("cache.csv").exists());
}

#[test]
fn test_drop_source_identifiers() {
    let df = create_property_dataframe(3, 5);
    let out = drop_source_identifiers(df).unwrap();
    assert_missing_columns(&out, &["id", "parcelid"]);
    assert_has_columns(&out, &["bedroomcnt", "logerror"]);
}

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "a,b,c").unwrap();
    writeln!(file, "1,2,3").unwrap();
    writeln!(file, "4,5,6").unwrap();
    drop(file);

    let (df, rows, cols, mem_mb) = load_dataset_with_progress(&csv_path, 100).unwrap();

    assert_eq!(rows, 2);
    assert_eq!(cols, 3);
    assert_eq!(df.get_column_names(), &["a", "b", "c"]);
    assert!(mem_mb >= 0.0);
}

#[test]
fn test_unsupported_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.xlsx");
    std::fs::write(&path, "x").unwrap();

    let err = load_dataset(&path, 100).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"));
}

#[test]
fn test_save_creates_parent_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("out.csv");
    let mut df = df! { "x" => [1i64, 2] }.unwrap();

    save_dataset(&mut df, &path).unwrap();
    assert_eq!(load_dataset(&path, 100).unwrap().height(), 2);
}
