//! Sequential IQR-based outlier trimming
//!
//! Exploration only: the trimmed table is never handed to the partitioner
//! by the CLI's main run.
//!
//! Columns are trimmed one after another. The quartiles of each column are
//! computed on the table already trimmed by every earlier column, so the
//! column order changes the result.

use anyhow::Result;
use log::debug;
use polars::prelude::*;
use serde::Serialize;

use super::frame::{filter_rows, float_values, require_columns};
use super::stats::quartiles;

/// Bounds used for one column and how many rows survived it
#[derive(Debug, Clone, Serialize)]
pub struct TrimStep {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
    pub rows_before: usize,
    pub rows_after: usize,
}

/// Result of [`trim_outliers`]
#[derive(Debug, Clone)]
pub struct OutlierTrim {
    pub frame: DataFrame,
    pub steps: Vec<TrimStep>,
}

/// Trim rows outside `(Q1 - k*IQR, Q3 + k*IQR)` column by column and report
/// the bounds used at each step.
///
/// Bounds are exclusive. Null and NaN values never fall inside them, so
/// those rows are removed by the first column where they occur.
pub fn trim_outliers(df: &DataFrame, k: f64, columns: &[String]) -> Result<OutlierTrim> {
    require_columns(df, columns)?;

    let mut frame = df.clone();
    let mut steps = Vec::with_capacity(columns.len());

    for column in columns {
        let values = float_values(&frame, column)?;
        let (q1, q3) = quartiles(&values);
        let iqr = q3 - q1;
        let lower = q1 - k * iqr;
        let upper = q3 + k * iqr;

        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|x| x > lower && x < upper))
            .collect();

        let rows_before = frame.height();
        frame = filter_rows(&frame, &keep)?;
        debug!(
            "outliers on '{}': bounds ({:.4}, {:.4}), {} -> {} rows",
            column,
            lower,
            upper,
            rows_before,
            frame.height()
        );

        steps.push(TrimStep {
            column: column.clone(),
            q1,
            q3,
            lower,
            upper,
            rows_before,
            rows_after: frame.height(),
        });
    }

    Ok(OutlierTrim { frame, steps })
}

/// Remove outliers sequentially from the listed columns
pub fn remove_outliers(df: &DataFrame, k: f64, columns: &[String]) -> Result<DataFrame> {
    Ok(trim_outliers(df, k, columns)?.frame)
}
