//! Least squares and IRLS solvers on top of faer
//!
//! Both solve the centred normal equations
//! `(X'WX + penalty * I) beta = X'Wy` and recover the intercept from the
//! weighted means, so the intercept is never penalised.

use anyhow::Result;
use faer::prelude::*;
use faer::Mat;

use crate::pipeline::error::PipelineError;
use crate::pipeline::stats::mean;

/// Relative diagonal jitter that keeps rank-deficient expansions solvable
/// (a squared 0/1 column duplicates the column itself).
const RIDGE_JITTER: f64 = 1e-10;

/// Maximum IRLS iterations for log-link fits
pub const IRLS_MAX_ITER: usize = 100;

/// IRLS stops when no parameter moves more than this
pub const IRLS_TOL: f64 = 1e-6;

/// Intercept and one coefficient per design column
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearFit {
    /// Linear predictor for every row of the column-major design
    pub fn linear_predictor(&self, columns: &[Vec<f64>], rows: usize) -> Vec<f64> {
        let mut eta = vec![self.intercept; rows];
        for (column, beta) in columns.iter().zip(&self.coefficients) {
            for (e, x) in eta.iter_mut().zip(column) {
                *e += beta * x;
            }
        }
        eta
    }
}

/// Weighted ridge least squares with an unpenalised intercept.
///
/// `columns` is column-major; `weights` defaults to 1 for every row.
pub fn weighted_least_squares(
    columns: &[Vec<f64>],
    y: &[f64],
    weights: Option<&[f64]>,
    penalty: f64,
) -> Result<LinearFit> {
    let n = y.len();
    let p = columns.len();
    if n == 0 {
        anyhow::bail!("Cannot fit a regression on zero rows");
    }

    let ones;
    let w = match weights {
        Some(w) => w,
        None => {
            ones = vec![1.0; n];
            &ones
        }
    };
    let total_weight: f64 = w.iter().sum();
    if total_weight <= 0.0 || !total_weight.is_finite() {
        anyhow::bail!("Regression weights must sum to a positive finite value");
    }

    let weighted_mean =
        |v: &[f64]| v.iter().zip(w).map(|(x, wi)| x * wi).sum::<f64>() / total_weight;
    let y_mean = weighted_mean(y);
    let x_means: Vec<f64> = columns.iter().map(|c| weighted_mean(c)).collect();

    if p == 0 {
        return Ok(LinearFit {
            intercept: y_mean,
            coefficients: Vec::new(),
        });
    }

    let sqrt_w: Vec<f64> = w.iter().map(|wi| wi.sqrt()).collect();
    let xc = Mat::<f64>::from_fn(n, p, |i, j| (columns[j][i] - x_means[j]) * sqrt_w[i]);
    let yc = Mat::<f64>::from_fn(n, 1, |i, _| (y[i] - y_mean) * sqrt_w[i]);

    let mut gram = xc.transpose() * &xc;
    let rhs = xc.transpose() * &yc;

    let diag_mean = (0..p).map(|j| gram[(j, j)]).sum::<f64>() / p as f64;
    let jitter = RIDGE_JITTER * diag_mean.max(f64::MIN_POSITIVE);
    for j in 0..p {
        gram[(j, j)] += penalty + jitter;
    }

    let solution = gram.partial_piv_lu().solve(&rhs);
    let coefficients: Vec<f64> = (0..p).map(|j| solution[(j, 0)]).collect();

    if coefficients.iter().any(|c| !c.is_finite()) {
        anyhow::bail!("Least squares produced non-finite coefficients");
    }

    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_means)
            .map(|(b, m)| b * m)
            .sum::<f64>();

    Ok(LinearFit {
        intercept,
        coefficients,
    })
}

/// Check the target against the Tweedie power's support
pub fn validate_tweedie_target(y: &[f64], power: f64) -> Result<()> {
    if power > 0.0 && power < 1.0 || power < 0.0 || !power.is_finite() {
        return Err(PipelineError::InvalidConfig(format!(
            "Tweedie power must be 0 or at least 1, got {}",
            power
        ))
        .into());
    }
    if power >= 2.0 && y.iter().any(|&v| v <= 0.0) {
        anyhow::bail!("Tweedie power {} requires a strictly positive target", power);
    }
    if power >= 1.0 && (y.iter().any(|&v| v < 0.0) || mean(y) <= 0.0) {
        anyhow::bail!(
            "Tweedie power {} requires a non-negative target with a positive mean",
            power
        );
    }
    Ok(())
}

/// Penalised Tweedie GLM with a log link, fitted by iteratively reweighted
/// least squares. `alpha` is the L2 strength per row, as in the mean deviance objective.
pub fn fit_log_link_glm(columns: &[Vec<f64>], y: &[f64], power: f64, alpha: f64) -> Result<LinearFit> {
    let n = y.len();
    let penalty = alpha * n as f64;

    let mut fit = LinearFit {
        intercept: mean(y).ln(),
        coefficients: vec![0.0; columns.len()],
    };

    for _ in 0..IRLS_MAX_ITER {
        let eta = fit.linear_predictor(columns, n);
        let mu: Vec<f64> = eta.iter().map(|e| e.exp()).collect();
        let weights: Vec<f64> = mu.iter().map(|m| m.powf(2.0 - power)).collect();
        let working: Vec<f64> = eta
            .iter()
            .zip(&mu)
            .zip(y)
            .map(|((e, m), yi)| e + (yi - m) / m)
            .collect();

        let next = weighted_least_squares(columns, &working, Some(&weights), penalty)?;
        let moved = std::iter::once((next.intercept - fit.intercept).abs())
            .chain(
                next.coefficients
                    .iter()
                    .zip(&fit.coefficients)
                    .map(|(a, b)| (a - b).abs()),
            )
            .fold(0.0, f64::max);

        fit = next;
        if moved < IRLS_TOL {
            break;
        }
    }

    Ok(fit)
}
