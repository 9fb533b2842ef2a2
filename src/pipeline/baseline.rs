//! Constant-prediction baseline

use std::fmt;

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::error::PipelineError;
use super::frame::dense_values;
use super::split::Partition;
use super::stats::{mean, median, rmse};

/// Which central tendency the baseline predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineKind {
    Mean,
    Median,
}

impl fmt::Display for BaselineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineKind::Mean => write!(f, "mean"),
            BaselineKind::Median => write!(f, "median"),
        }
    }
}

/// The constant chosen from train's target, reused unchanged for every partition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baseline {
    pub kind: BaselineKind,
    pub value: f64,
    pub train_rmse: f64,
}

impl Baseline {
    /// Predict the constant for `n` rows
    pub fn predict(&self, n: usize) -> Vec<f64> {
        vec![self.value; n]
    }
}

/// Pick the median or the mean of `target`, whichever has the lower RMSE.
/// The median wins only when strictly better.
pub fn establish_baseline(target: &[f64]) -> Result<Baseline> {
    if target.is_empty() {
        return Err(PipelineError::EmptyPartition {
            stage: "baseline",
            partition: Partition::Train,
        }
        .into());
    }

    let median_value = median(target);
    let mean_value = mean(target);
    let median_rmse = rmse(target, &vec![median_value; target.len()]);
    let mean_rmse = rmse(target, &vec![mean_value; target.len()]);

    Ok(if median_rmse < mean_rmse {
        Baseline {
            kind: BaselineKind::Median,
            value: median_value,
            train_rmse: median_rmse,
        }
    } else {
        Baseline {
            kind: BaselineKind::Mean,
            value: mean_value,
            train_rmse: mean_rmse,
        }
    })
}

/// Baseline from a frame's target column
pub fn baseline_from_frame(train: &DataFrame, target: &str) -> Result<Baseline> {
    establish_baseline(&dense_values(train, target)?)
}
