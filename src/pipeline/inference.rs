//! Two-sample hypothesis tests used during exploration
//!
//! The main check splits the prepared table on a threshold of one column
//! (by default `tax_assessed_value < 250_000`) and asks whether the target
//! has the same mean on both sides, using Welch's unequal-variance t-test.

use std::fmt;

use anyhow::Result;
use log::debug;
use polars::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::error::PipelineError;
use super::frame::{float_values, require_column};
use super::stats::mean;

/// Default split point for the assessed value test
pub const DEFAULT_TAX_VALUE_THRESHOLD: f64 = 250_000.0;

/// Default significance level
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Outcome of a two-sided two-sample t-test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Welch-Satterthwaite degrees of freedom (not rounded)
    pub degrees_of_freedom: f64,
    pub mean_a: f64,
    pub mean_b: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub alpha: f64,
}

impl TTestResult {
    /// True when the equal-means hypothesis is rejected at `alpha`
    pub fn reject_null(&self) -> bool {
        self.p_value < self.alpha
    }
}

impl fmt::Display for TTestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t = {:.4}, df = {:.2}, p = {:.4}: {}",
            self.statistic,
            self.degrees_of_freedom,
            self.p_value,
            if self.reject_null() {
                "reject H0"
            } else {
                "fail to reject H0"
            }
        )
    }
}

/// Sample variance (divides by n - 1)
fn sample_variance(values: &[f64], m: f64) -> f64 {
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Welch's two-sided t-test for equal means without assuming equal variances
pub fn welch_t_test(a: &[f64], b: &[f64], alpha: f64) -> Result<TTestResult> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "alpha must be between 0 and 1 (exclusive), got {}",
            alpha
        ))
        .into());
    }
    if a.len() < 2 || b.len() < 2 {
        anyhow::bail!(
            "t-test needs at least two values per group, got {} and {}",
            a.len(),
            b.len()
        );
    }

    let (n_a, n_b) = (a.len() as f64, b.len() as f64);
    let (mean_a, mean_b) = (mean(a), mean(b));
    let se_a = sample_variance(a, mean_a) / n_a;
    let se_b = sample_variance(b, mean_b) / n_b;
    let se = (se_a + se_b).sqrt();
    if se == 0.0 || !se.is_finite() {
        anyhow::bail!("t-test is undefined: both groups are constant or non-finite");
    }

    let statistic = (mean_a - mean_b) / se;
    let degrees_of_freedom =
        (se_a + se_b).powi(2) / (se_a.powi(2) / (n_a - 1.0) + se_b.powi(2) / (n_b - 1.0));

    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| anyhow::anyhow!("Invalid t distribution (df = {}): {}", degrees_of_freedom, e))?;
    let p_value = (2.0 * dist.sf(statistic.abs())).min(1.0);

    Ok(TTestResult {
        statistic,
        p_value,
        degrees_of_freedom,
        mean_a,
        mean_b,
        n_a: a.len(),
        n_b: b.len(),
        alpha,
    })
}

/// A threshold test on one column, with the groups it compared
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTest {
    pub column: String,
    pub threshold: f64,
    pub target: String,
    /// Group `a` is `column < threshold`, group `b` the rest
    pub result: TTestResult,
}

/// Compare `target` for rows with `column < threshold` against all other rows.
///
/// Rows whose column or target value is null or non-finite are left out of
/// both groups.
pub fn threshold_t_test(
    df: &DataFrame,
    column: &str,
    threshold: f64,
    target: &str,
    alpha: f64,
) -> Result<ThresholdTest> {
    require_column(df, column)?;
    require_column(df, target)?;

    let mut below = Vec::new();
    let mut rest = Vec::new();
    for (value, y) in float_values(df, column)?
        .into_iter()
        .zip(float_values(df, target)?)
    {
        match (value, y) {
            (Some(v), Some(y)) if v.is_finite() && y.is_finite() => {
                if v < threshold {
                    below.push(y);
                } else {
                    rest.push(y);
                }
            }
            _ => {}
        }
    }

    debug!(
        "t-test on '{}' split at {}: {} below, {} at or above",
        column,
        threshold,
        below.len(),
        rest.len()
    );

    Ok(ThresholdTest {
        column: column.to_string(),
        threshold,
        target: target.to_string(),
        result: welch_t_test(&below, &rest, alpha)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welch_degrees_of_freedom() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let result = welch_t_test(&a, &b, DEFAULT_ALPHA).unwrap();

        // var_a = 2.5, var_b = 10: se^2 = 0.5 + 2.0
        assert!((result.statistic - (-3.0 / 2.5f64.sqrt())).abs() < 1e-12);
        assert!((result.degrees_of_freedom - 6.25 / 1.0625).abs() < 1e-12);
        assert!(result.p_value > 0.05 && result.p_value < 0.2);
        assert!(!result.reject_null());
    }

    #[test]
    fn test_symmetric_groups_have_p_one() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 2.0, 1.0];
        let result = welch_t_test(&a, &b, DEFAULT_ALPHA).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_groups_rejected() {
        assert!(welch_t_test(&[1.0], &[1.0, 2.0], DEFAULT_ALPHA).is_err());
        assert!(welch_t_test(&[1.0, 1.0], &[2.0, 2.0], DEFAULT_ALPHA).is_err());
    }

    #[test]
    fn test_bad_alpha() {
        let err = welch_t_test(&[1.0, 2.0], &[1.0, 3.0], 1.5).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidConfig(_))
        ));
    }
}
