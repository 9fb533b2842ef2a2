//! Train-fitted numeric rescaling
//!
//! Every strategy reduces to `(x - center) / scale` with per-column
//! parameters computed from the train partition only. Validate and test
//! only ever have the fitted transform applied.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::frame::{float_values, require_columns};
use super::split::{DataSplit, Partition};
use super::stats::{mean, median, population_std, quantile_sorted, sorted_present};

/// Rescaling strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingStrategy {
    /// `(x - min) / (max - min)`
    #[default]
    MinMax,
    /// `(x - mean) / std`
    Standard,
    /// `(x - median) / IQR`
    Robust,
}

impl fmt::Display for ScalingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingStrategy::MinMax => write!(f, "minmax"),
            ScalingStrategy::Standard => write!(f, "standard"),
            ScalingStrategy::Robust => write!(f, "robust"),
        }
    }
}

impl FromStr for ScalingStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minmax" | "min-max" | "minmaxscaler" => Ok(ScalingStrategy::MinMax),
            "standard" | "standardscaler" => Ok(ScalingStrategy::Standard),
            "robust" | "robustscaler" => Ok(ScalingStrategy::Robust),
            _ => Err(PipelineError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Fitted parameters for one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnScaling {
    pub column: String,
    pub center: f64,
    pub scale: f64,
}

/// Per-column parameters fitted on train, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingModel {
    pub strategy: ScalingStrategy,
    pub columns: Vec<ColumnScaling>,
}

impl ScalingModel {
    /// Fit the strategy's parameters on `train`'s columns.
    ///
    /// Nulls and NaN are ignored. An infinite train value fails with
    /// `NonFiniteValue`, since no finite range could contain it.
    pub fn fit(train: &DataFrame, columns: &[String], strategy: ScalingStrategy) -> Result<Self> {
        if train.height() == 0 {
            return Err(PipelineError::EmptyPartition {
                stage: "scaling",
                partition: Partition::Train,
            }
            .into());
        }
        require_columns(train, columns)?;

        let mut fitted = Vec::with_capacity(columns.len());
        for column in columns {
            let values = float_values(train, column)?;
            // NaN is missing and ignored below; an infinity would swallow the range.
            if let Some((row, value)) = values
                .iter()
                .enumerate()
                .find_map(|(row, v)| v.filter(|x| x.is_infinite()).map(|x| (row, x)))
            {
                return Err(PipelineError::NonFiniteValue {
                    column: column.clone(),
                    row,
                    value,
                }
                .into());
            }

            let sorted = sorted_present(&values);
            if sorted.is_empty() {
                anyhow::bail!("Column '{}' has no values to fit a scaler on", column);
            }

            let (center, scale) = match strategy {
                ScalingStrategy::MinMax => {
                    let min = sorted[0];
                    let max = sorted[sorted.len() - 1];
                    (min, max - min)
                }
                ScalingStrategy::Standard => (mean(&sorted), population_std(&sorted)),
                ScalingStrategy::Robust => (
                    median(&sorted),
                    quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25),
                ),
            };

            // Constant columns would divide by zero; leave them centred but unscaled.
            let scale = if scale == 0.0 || !scale.is_finite() { 1.0 } else { scale };

            debug!("{} scaler on '{}': center={}, scale={}", strategy, column, center, scale);
            fitted.push(ColumnScaling {
                column: column.clone(),
                center,
                scale,
            });
        }

        Ok(Self {
            strategy,
            columns: fitted,
        })
    }

    /// Apply the fitted transform, returning a new frame with only the fitted columns changed
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for scaling in &self.columns {
            let scaled: Vec<Option<f64>> = float_values(df, &scaling.column)?
                .into_iter()
                .map(|v| v.map(|x| (x - scaling.center) / scaling.scale))
                .collect();
            out.with_column(Column::new(scaling.column.as_str().into(), scaled))?;
        }
        Ok(out)
    }

    /// Fitted parameters for a column, if it was fitted
    pub fn get(&self, column: &str) -> Option<&ColumnScaling> {
        self.columns.iter().find(|c| c.column == column)
    }
}

/// Fit on train and apply to all three partitions
pub fn scale_data(
    split: &DataSplit,
    columns: &[String],
    strategy: ScalingStrategy,
) -> Result<(DataSplit, ScalingModel)> {
    split.require_rows("scaling")?;
    let model = ScalingModel::fit(&split.train, columns, strategy)?;
    let scaled = split.try_map(|_, df| model.transform(df))?;
    Ok((scaled, model))
}
