//! Missing value thresholds and category filtering

use anyhow::Result;
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::frame::{filter_rows, require_column, string_values};

/// Land-use descriptions that describe a single residential unit
pub const SINGLE_UNIT_PROPERTY_TYPES: &[&str] = &[
    "Single Family Residential",
    "Condominium",
    "Cluster Home",
    "Mobile Home",
    "Manufactured, Modular, Prefabricated Homes",
    "Townhouse",
    "Planned Unit Development",
    "Residential General",
];

/// Thresholds and category filter applied by [`clean`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanConfig {
    /// Minimum fraction of non-null values a column needs to be kept
    pub prop_required_column: f64,
    /// Minimum fraction of non-null values a row needs to be kept
    pub prop_required_row: f64,
    /// Column holding the property type; `None` disables category filtering
    pub category_column: Option<String>,
    /// Property types retained by the category filter
    pub allowed_categories: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            prop_required_column: 0.8,
            prop_required_row: 1.0,
            category_column: Some("propertylandusedesc".to_string()),
            allowed_categories: SINGLE_UNIT_PROPERTY_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Null summary for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnNulls {
    pub column: String,
    pub rows_missing: usize,
    pub percent_missing: f64,
}

/// Rows grouped by how many of their columns are missing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowNullGroup {
    pub columns_missing: usize,
    pub percent_missing: f64,
    pub rows: usize,
}

/// Null or NaN, both count as missing
fn is_missing(value: &AnyValue) -> bool {
    match value {
        AnyValue::Null => true,
        AnyValue::Float64(v) => v.is_nan(),
        AnyValue::Float32(v) => v.is_nan(),
        _ => false,
    }
}

/// Round half to even
fn round_threshold(value: f64) -> usize {
    value.round_ties_even().max(0.0) as usize
}

fn validate_proportion(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(PipelineError::InvalidConfig(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, value
        ))
        .into());
    }
    Ok(())
}

/// Count missing cells per column
fn column_missing_counts(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .map(|column| {
            let missing = column
                .as_materialized_series()
                .iter()
                .filter(|v| is_missing(v))
                .count();
            (column.name().to_string(), missing)
        })
        .collect()
}

/// Count missing cells per row
fn row_missing_counts(df: &DataFrame) -> Vec<usize> {
    let mut counts = vec![0usize; df.height()];
    for column in df.get_columns() {
        for (count, value) in counts
            .iter_mut()
            .zip(column.as_materialized_series().iter())
        {
            if is_missing(&value) {
                *count += 1;
            }
        }
    }
    counts
}

/// Drop sparse columns, then sparse rows.
///
/// A column is dropped when its non-null count is below
/// `round(rows * prop_required_column)`. Rows are then judged against the
/// reduced table: a row is dropped when its non-null count is below
/// `round(columns * prop_required_row)`. Either step may leave nothing behind.
pub fn drop_missing_values(
    df: &DataFrame,
    prop_required_column: f64,
    prop_required_row: f64,
) -> Result<DataFrame> {
    validate_proportion("prop_required_column", prop_required_column)?;
    validate_proportion("prop_required_row", prop_required_row)?;

    let rows = df.height();
    let column_threshold = round_threshold(rows as f64 * prop_required_column);

    let columns_to_drop: Vec<String> = column_missing_counts(df)
        .into_iter()
        .filter(|(_, missing)| rows - missing < column_threshold)
        .map(|(name, _)| name)
        .collect();

    debug!(
        "dropping {} column(s) with fewer than {} non-null values",
        columns_to_drop.len(),
        column_threshold
    );
    let reduced = df.drop_many(columns_to_drop.iter().map(|s| s.as_str()));

    let width = reduced.width();
    let row_threshold = round_threshold(width as f64 * prop_required_row);
    let keep: Vec<bool> = row_missing_counts(&reduced)
        .into_iter()
        .map(|missing| width - missing >= row_threshold)
        .collect();

    filter_rows(&reduced, &keep)
}

/// Keep only rows whose category is in the allowed set. Nulls never match.
pub fn filter_categories(df: &DataFrame, column: &str, allowed: &[String]) -> Result<DataFrame> {
    require_column(df, column)?;
    let keep: Vec<bool> = string_values(df, column)?
        .into_iter()
        .map(|value| value.is_some_and(|v| allowed.iter().any(|a| *a == v)))
        .collect();
    filter_rows(df, &keep)
}

/// Run the cleaner: column threshold, row threshold, then the category filter
pub fn clean(df: &DataFrame, config: &CleanConfig) -> Result<DataFrame> {
    let (rows_in, cols_in) = df.shape();
    let mut cleaned = drop_missing_values(df, config.prop_required_column, config.prop_required_row)?;

    if let Some(column) = &config.category_column {
        cleaned = filter_categories(&cleaned, column, &config.allowed_categories)?;
    }

    info!(
        "cleaned {}x{} table down to {}x{}",
        rows_in,
        cols_in,
        cleaned.height(),
        cleaned.width()
    );
    Ok(cleaned)
}

/// Missing counts and ratios for every column, in column order
pub fn summarize_column_nulls(df: &DataFrame) -> Vec<ColumnNulls> {
    let rows = df.height();
    column_missing_counts(df)
        .into_iter()
        .map(|(column, rows_missing)| ColumnNulls {
            column,
            rows_missing,
            percent_missing: if rows == 0 {
                0.0
            } else {
                rows_missing as f64 / rows as f64
            },
        })
        .collect()
}

/// Histogram of rows by number of missing columns, ascending
pub fn summarize_row_nulls(df: &DataFrame) -> Vec<RowNullGroup> {
    let width = df.width();
    let mut groups: std::collections::BTreeMap<usize, usize> = std::collections::BTreeMap::new();
    for missing in row_missing_counts(df) {
        *groups.entry(missing).or_insert(0) += 1;
    }

    groups
        .into_iter()
        .map(|(columns_missing, rows)| RowNullGroup {
            columns_missing,
            percent_missing: if width == 0 {
                0.0
            } else {
                columns_missing as f64 / width as f64
            },
            rows,
        })
        .collect()
}
