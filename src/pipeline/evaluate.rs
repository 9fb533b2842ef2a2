//! Score the baseline and the model battery on train and validate

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

use super::baseline::Baseline;
use super::frame::dense_values;
use super::regression::RegressionModel;
use super::split::DataSplit;
use super::stats::{r2_score, rmse};

/// Label the baseline is reported under
pub const BASELINE_LABEL: &str = "baseline";

/// Scores for one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub label: String,
    pub train_rmse: f64,
    pub validate_rmse: f64,
    /// Only set for the model chosen with [`Evaluation::score_test`]
    pub test_rmse: Option<f64>,
    pub train_r2: f64,
    pub validate_r2: f64,
}

/// Baseline first, then models in battery order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub scores: Vec<ModelScore>,
}

fn score(label: &str, train: (&[f64], &[f64]), validate: (&[f64], &[f64])) -> ModelScore {
    ModelScore {
        label: label.to_string(),
        train_rmse: rmse(train.0, train.1),
        validate_rmse: rmse(validate.0, validate.1),
        test_rmse: None,
        train_r2: r2_score(train.0, train.1),
        validate_r2: r2_score(validate.0, validate.1),
    }
}

impl Evaluation {
    pub fn get(&self, label: &str) -> Option<&ModelScore> {
        self.scores.iter().find(|s| s.label == label)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.scores.iter().map(|s| s.label.as_str()).collect()
    }

    /// Score one selected model (or the baseline) on the test partition.
    /// Returns the test RMSE and records it on that model's score.
    pub fn score_test(
        &mut self,
        label: &str,
        baseline: &Baseline,
        models: &[RegressionModel],
        test: &DataFrame,
        target: &str,
    ) -> Result<f64> {
        let actual = dense_values(test, target)?;
        let predicted = if label == BASELINE_LABEL {
            baseline.predict(actual.len())
        } else {
            models
                .iter()
                .find(|m| m.label == label)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "Unknown model '{}'. Available: {}",
                        label,
                        self.labels().join(", ")
                    )
                })?
                .predict(test)?
        };

        let value = rmse(&actual, &predicted);
        if let Some(entry) = self.scores.iter_mut().find(|s| s.label == label) {
            entry.test_rmse = Some(value);
        }
        Ok(value)
    }
}

/// RMSE and R² of the baseline and every model on train and validate.
/// Test is left untouched.
pub fn evaluate(
    baseline: &Baseline,
    models: &[RegressionModel],
    split: &DataSplit,
    target: &str,
) -> Result<Evaluation> {
    split.require_rows("evaluation")?;
    let train_y = dense_values(&split.train, target)?;
    let validate_y = dense_values(&split.validate, target)?;

    let mut scores = vec![score(
        BASELINE_LABEL,
        (&train_y, &baseline.predict(train_y.len())),
        (&validate_y, &baseline.predict(validate_y.len())),
    )];

    for model in models {
        let train_pred = model.predict(&split.train)?;
        let validate_pred = model.predict(&split.validate)?;
        scores.push(score(
            &model.label,
            (&train_y, &train_pred),
            (&validate_y, &validate_pred),
        ));
    }

    Ok(Evaluation { scores })
}
