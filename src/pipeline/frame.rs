//! Column access helpers shared by the pipeline stages

use anyhow::{Context, Result};
use polars::prelude::*;
use sha2::{Digest, Sha256};

use super::error::PipelineError;

/// Get a column by name, failing with `PipelineError::MissingColumn` when absent
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| PipelineError::missing_column(df, name).into())
}

/// Check that every listed column exists before a stage touches any of them
pub fn require_columns(df: &DataFrame, names: &[String]) -> Result<()> {
    for name in names {
        require_column(df, name)?;
    }
    Ok(())
}

/// Get a list of column names as owned strings
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Extract a numeric (or boolean) column as `Option<f64>` values.
///
/// String columns are rejected instead of being cast, since a non-strict
/// cast would silently turn every unparsable value into null.
pub fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = require_column(df, name)?;
    let dtype = column.dtype();

    if !(dtype.is_primitive_numeric() || dtype == &DataType::Boolean) {
        anyhow::bail!(
            "Column '{}' must be numeric, found {}",
            name,
            dtype
        );
    }

    let float_col = column
        .cast(&DataType::Float64)
        .with_context(|| format!("Failed to cast column '{}' to Float64", name))?;

    Ok(float_col.f64()?.into_iter().collect())
}

/// Extract a numeric column that must hold a finite value in every row.
///
/// Nulls and non-finite values (NaN, `inf`, `-inf`) are rejected with the
/// offending row, so model inputs never carry them into a fit.
pub fn dense_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    float_values(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            None => Err(anyhow::anyhow!(
                "Column '{}' has a null value at row {}",
                name,
                row
            )),
            Some(value) if !value.is_finite() => Err(PipelineError::NonFiniteValue {
                column: name.to_string(),
                row,
                value,
            }
            .into()),
            Some(value) => Ok(value),
        })
        .collect()
}

/// Extract a column as display strings, keeping nulls as `None`
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = require_column(df, name)?;
    let values = column
        .as_materialized_series()
        .iter()
        .map(|value| match value {
            AnyValue::Null => None,
            AnyValue::String(s) => Some(s.to_string()),
            AnyValue::StringOwned(s) => Some(s.to_string()),
            other => Some(other.to_string()),
        })
        .collect();
    Ok(values)
}

/// Return a copy of `df` with the column added, or replaced if the name exists
pub fn with_replaced_column(df: &DataFrame, column: Column) -> Result<DataFrame> {
    let mut out = df.clone();
    out.with_column(column)?;
    Ok(out)
}

/// Keep the rows whose flag is true
pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice(PlSmallStr::from_static("mask"), keep);
    Ok(df.filter(&mask)?)
}

/// Take rows by position, in the given order
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let indices: Vec<IdxSize> = rows.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec(PlSmallStr::from_static("idx"), indices);
    Ok(df.take(&idx)?)
}

/// Hash every row's values into a fingerprint independent of row position.
///
/// SHA-256 over the rendered cell values, so a fingerprint is the same on
/// every platform and toolchain.
pub fn row_fingerprints(df: &DataFrame) -> Vec<u64> {
    let mut hashers: Vec<Sha256> = (0..df.height()).map(|_| Sha256::new()).collect();

    for column in df.get_columns() {
        for (hasher, value) in hashers
            .iter_mut()
            .zip(column.as_materialized_series().iter())
        {
            let rendered = value.to_string();
            // Length prefix keeps ("ab", "c") and ("a", "bc") apart.
            hasher.update((rendered.len() as u64).to_le_bytes());
            hasher.update(rendered.as_bytes());
        }
    }

    hashers
        .into_iter()
        .map(|h| {
            let digest = h.finalize();
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            u64::from_le_bytes(head)
        })
        .collect()
}
