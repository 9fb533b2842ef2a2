//! Typed failures raised by pipeline stages.
//!
//! Stage functions return `anyhow::Result` like the rest of the crate; the
//! variants here are the failures a caller may want to match on, recovered
//! with `err.downcast_ref::<PipelineError>()`.

use thiserror::Error;

use super::split::Partition;

/// Errors raised by the cleaning, scaling, clustering and modeling stages.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// A referenced column is absent from the input table.
    #[error("Column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A stage that needs at least one row received an empty partition.
    #[error("{stage} requires at least one row, but the {partition} partition is empty")]
    EmptyPartition {
        stage: &'static str,
        partition: Partition,
    },

    /// A model input holds NaN or an infinity.
    #[error("Column '{column}' has a non-finite value ({value}) at row {row}")]
    NonFiniteValue {
        column: String,
        row: usize,
        value: f64,
    },

    /// The scaling strategy name is not one of the supported scalers.
    #[error("Unknown scaling strategy: '{0}'. Use 'minmax', 'standard' or 'robust'.")]
    UnknownStrategy(String),

    /// A stage configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Build a `MissingColumn` error listing the columns the frame does have.
    pub fn missing_column(df: &polars::prelude::DataFrame, column: &str) -> Self {
        PipelineError::MissingColumn {
            column: column.to_string(),
            available: df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
