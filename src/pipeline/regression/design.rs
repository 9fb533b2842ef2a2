//! Design matrices and degree-2 feature expansions

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::pipeline::frame::{dense_values, require_columns};

/// Feature expansion applied before fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expansion {
    /// Raw features
    None,
    /// Degree-2 polynomial terms without the bias column
    Polynomial,
    /// Raw features plus pairwise products, no squares
    Interaction,
}

/// Feature columns in column-major order. Nulls are rejected.
pub fn feature_columns(df: &DataFrame, features: &[String]) -> Result<Vec<Vec<f64>>> {
    require_columns(df, features)?;
    features.iter().map(|f| dense_values(df, f)).collect()
}

/// Expand columns in the usual degree-2 term order:
/// `x0, x1, .., x0*x0, x0*x1, .., x1*x1, ..` (squares skipped for interactions)
pub fn expand(columns: &[Vec<f64>], expansion: Expansion) -> Vec<Vec<f64>> {
    let mut out: Vec<Vec<f64>> = columns.to_vec();
    if expansion == Expansion::None {
        return out;
    }

    for i in 0..columns.len() {
        let start = if expansion == Expansion::Polynomial { i } else { i + 1 };
        for j in start..columns.len() {
            out.push(
                columns[i]
                    .iter()
                    .zip(&columns[j])
                    .map(|(a, b)| a * b)
                    .collect(),
            );
        }
    }
    out
}

/// Term names matching [`expand`]'s column order
pub fn expanded_names(features: &[String], expansion: Expansion) -> Vec<String> {
    let mut out: Vec<String> = features.to_vec();
    if expansion == Expansion::None {
        return out;
    }

    for i in 0..features.len() {
        let start = if expansion == Expansion::Polynomial { i } else { i + 1 };
        for j in start..features.len() {
            if i == j {
                out.push(format!("{}^2", features[i]));
            } else {
                out.push(format!("{} {}", features[i], features[j]));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_polynomial_term_order() {
        let expanded = expanded_names(&names(), Expansion::Polynomial);
        assert_eq!(
            expanded,
            vec!["a", "b", "c", "a^2", "a b", "a c", "b^2", "b c", "c^2"]
        );
    }

    #[test]
    fn test_interaction_skips_squares() {
        let expanded = expanded_names(&names(), Expansion::Interaction);
        assert_eq!(expanded, vec!["a", "b", "c", "a b", "a c", "b c"]);
    }

    #[test]
    fn test_expand_values() {
        let columns = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let expanded = expand(&columns, Expansion::Polynomial);
        assert_eq!(expanded.len(), 5);
        assert_eq!(expanded[2], vec![1.0, 4.0]);
        assert_eq!(expanded[3], vec![3.0, 8.0]);
        assert_eq!(expanded[4], vec![9.0, 16.0]);
    }
}
