//! Regression model battery
//!
//! Every model is a [`ModelSpec`] (a form plus a feature set) fitted on the
//! train partition. Forms differ only in the design expansion and the
//! solver: ordinary least squares for the linear family, IRLS for
//! log-link Tweedie fits.

pub mod design;
pub mod solve;

use std::fmt;

use anyhow::{Context, Result};
use log::{debug, info};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::frame::{dense_values, require_column};
use design::{expand, expanded_names, feature_columns, Expansion};
use solve::{fit_log_link_glm, validate_tweedie_target, weighted_least_squares, LinearFit};

/// Suffix appended to labels of models that also see the cluster indicators
pub const WITH_CLUSTERS_SUFFIX: &str = "_with_clusters";

/// Model family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "form")]
pub enum ModelForm {
    /// Ordinary least squares with intercept
    Linear,
    /// Generalised linear model with Tweedie variance and L2 penalty
    Tweedie { power: f64, alpha: f64 },
    /// Degree-2 polynomial expansion, then least squares
    Polynomial,
    /// Degree-2 interaction terms only, then least squares
    Interaction,
}

impl ModelForm {
    /// Default Tweedie settings: normal distribution, unit penalty
    pub fn tweedie() -> Self {
        ModelForm::Tweedie {
            power: 0.0,
            alpha: 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelForm::Linear => "linear_regression",
            ModelForm::Tweedie { .. } => "tweedie_regression",
            ModelForm::Polynomial => "polynomial_regression",
            ModelForm::Interaction => "interaction_regression",
        }
    }

    pub fn expansion(&self) -> Expansion {
        match self {
            ModelForm::Linear | ModelForm::Tweedie { .. } => Expansion::None,
            ModelForm::Polynomial => Expansion::Polynomial,
            ModelForm::Interaction => Expansion::Interaction,
        }
    }

    /// Link function: log for Tweedie powers of 1 and above, identity otherwise
    pub fn link(&self) -> Link {
        match self {
            ModelForm::Tweedie { power, .. } if *power >= 1.0 => Link::Log,
            _ => Link::Identity,
        }
    }
}

/// Which columns feed a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSet {
    Base,
    WithClusters,
}

/// One entry of the battery
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub form: ModelForm,
    pub feature_set: FeatureSet,
}

impl ModelSpec {
    pub fn label(&self) -> String {
        match self.feature_set {
            FeatureSet::Base => self.form.name().to_string(),
            FeatureSet::WithClusters => format!("{}{}", self.form.name(), WITH_CLUSTERS_SUFFIX),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Link {
    Identity,
    Log,
}

/// A fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionModel {
    pub label: String,
    pub features: Vec<String>,
    pub target: String,
    pub expansion: Expansion,
    pub link: Link,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Design term names, aligned with `coefficients`
    pub terms: Vec<String>,
}

impl RegressionModel {
    /// Fit `spec` on `train` using `features` to predict `target`
    pub fn fit(spec: &ModelSpec, train: &DataFrame, features: &[String], target: &str) -> Result<Self> {
        let label = spec.label();
        if train.height() == 0 {
            return Err(PipelineError::EmptyPartition {
                stage: "model fitting",
                partition: super::split::Partition::Train,
            }
            .into());
        }
        require_column(train, target)?;

        let y = dense_values(train, target)?;
        let columns = expand(&feature_columns(train, features)?, spec.form.expansion());
        let terms = expanded_names(features, spec.form.expansion());

        let fit: LinearFit = match spec.form {
            ModelForm::Tweedie { power, alpha } => {
                if alpha < 0.0 || !alpha.is_finite() {
                    return Err(PipelineError::InvalidConfig(format!(
                        "Tweedie alpha must be a non-negative number, got {}",
                        alpha
                    ))
                    .into());
                }
                validate_tweedie_target(&y, power)?;
                match spec.form.link() {
                    Link::Identity => {
                        weighted_least_squares(&columns, &y, None, alpha * y.len() as f64)
                    }
                    Link::Log => fit_log_link_glm(&columns, &y, power, alpha),
                }
            }
            _ => weighted_least_squares(&columns, &y, None, 0.0),
        }
        .with_context(|| format!("Failed to fit {}", label))?;

        debug!("{}: intercept {:.6}, {} terms", label, fit.intercept, terms.len());

        Ok(Self {
            label,
            features: features.to_vec(),
            target: target.to_string(),
            expansion: spec.form.expansion(),
            link: spec.form.link(),
            intercept: fit.intercept,
            coefficients: fit.coefficients,
            terms,
        })
    }

    /// Predictions for every row of `df`, which must contain the feature set
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let columns = expand(&feature_columns(df, &self.features)?, self.expansion);
        let fit = LinearFit {
            intercept: self.intercept,
            coefficients: self.coefficients.clone(),
        };
        let eta = fit.linear_predictor(&columns, df.height());
        Ok(match self.link {
            Link::Identity => eta,
            Link::Log => eta.into_iter().map(f64::exp).collect(),
        })
    }
}

/// Battery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub target: String,
    pub base_features: Vec<String>,
    pub forms: Vec<ModelForm>,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            target: "log_error".to_string(),
            base_features: vec![
                "square_feet".to_string(),
                "in_non_average_zip".to_string(),
                "tax_assessed_value".to_string(),
            ],
            forms: vec![
                ModelForm::Linear,
                ModelForm::tweedie(),
                ModelForm::Polynomial,
                ModelForm::Interaction,
            ],
        }
    }
}

impl BatteryConfig {
    /// Every (form, feature set) pair, base set first. The cluster set is
    /// only included when there are indicator columns to add.
    pub fn specs(&self, with_clusters: bool) -> Vec<ModelSpec> {
        let mut sets = vec![FeatureSet::Base];
        if with_clusters {
            sets.push(FeatureSet::WithClusters);
        }
        sets.into_iter()
            .flat_map(|feature_set| {
                self.forms.iter().map(move |&form| ModelSpec { form, feature_set })
            })
            .collect()
    }
}

/// Fit every model of the battery on `train` in parallel.
///
/// # Arguments
/// * `train` - Train partition, already scaled and cluster-encoded
/// * `config` - Target, base features, and model forms
/// * `cluster_columns` - Indicator columns added for the `_with_clusters` set
pub fn fit_battery(
    train: &DataFrame,
    config: &BatteryConfig,
    cluster_columns: &[String],
) -> Result<Vec<RegressionModel>> {
    let with_clusters: Vec<String> = config
        .base_features
        .iter()
        .chain(cluster_columns)
        .cloned()
        .collect();

    let specs = config.specs(!cluster_columns.is_empty());
    let models: Vec<RegressionModel> = specs
        .par_iter()
        .map(|spec| {
            let features = match spec.feature_set {
                FeatureSet::Base => &config.base_features,
                FeatureSet::WithClusters => &with_clusters,
            };
            RegressionModel::fit(spec, train, features, &config.target)
        })
        .collect::<Result<_>>()?;

    info!("fitted {} models on {} train rows", models.len(), train.height());
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let spec = ModelSpec {
            form: ModelForm::tweedie(),
            feature_set: FeatureSet::WithClusters,
        };
        assert_eq!(spec.label(), "tweedie_regression_with_clusters");
        assert_eq!(
            ModelSpec {
                form: ModelForm::Interaction,
                feature_set: FeatureSet::Base
            }
            .label(),
            "interaction_regression"
        );
    }

    #[test]
    fn test_specs_skip_cluster_set_without_indicators() {
        let config = BatteryConfig::default();
        assert_eq!(config.specs(false).len(), 4);
        assert_eq!(config.specs(true).len(), 8);
    }

    #[test]
    fn test_identity_tweedie_matches_ridge() {
        let train = df! {
            "x" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
            "y" => [2.0f64, 4.0, 6.0, 8.0, 10.0],
        }
        .unwrap();
        let features = vec!["x".to_string()];
        let ols = RegressionModel::fit(
            &ModelSpec {
                form: ModelForm::Linear,
                feature_set: FeatureSet::Base,
            },
            &train,
            &features,
            "y",
        )
        .unwrap();
        let tweedie = RegressionModel::fit(
            &ModelSpec {
                form: ModelForm::tweedie(),
                feature_set: FeatureSet::Base,
            },
            &train,
            &features,
            "y",
        )
        .unwrap();
        assert!((ols.coefficients[0] - 2.0).abs() < 1e-8);
        // Penalised slope is pulled towards zero: 20 / (10 + 5)
        assert!((tweedie.coefficients[0] - 20.0 / 15.0).abs() < 1e-6);
    }
}
