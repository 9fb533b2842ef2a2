//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::pipeline::{
    AcquireConfig, BatteryConfig, CleanConfig, FeatureConfig, KMeansConfig, ModelForm,
    PrepareConfig, ScalingStrategy,
};

/// parcelfit - Clean property records, cluster them and score a regression battery
#[derive(Parser, Debug)]
#[command(name = "parcelfit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Source table (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// JSON run report path.
    /// Defaults to the input directory with an '_evaluation.json' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// CSV cache of the source table.
    /// Defaults to the input directory with a '_cache.csv' suffix.
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Always read the source, ignoring an existing cache
    #[arg(long, default_value = "false")]
    pub refresh: bool,

    /// Do not write the source table to the cache
    #[arg(long, default_value = "false")]
    pub no_cache: bool,

    /// Keep the source id columns instead of dropping them after acquisition
    #[arg(long, default_value = "false")]
    pub keep_ids: bool,

    /// Target column (after renaming)
    #[arg(short, long, default_value = "log_error")]
    pub target: String,

    /// Minimum fraction of non-null values a column needs to be kept
    #[arg(long, default_value = "0.8", value_parser = validate_proportion)]
    pub prop_required_column: f64,

    /// Minimum fraction of non-null values a row needs to be kept
    #[arg(long, default_value = "1.0", value_parser = validate_proportion)]
    pub prop_required_row: f64,

    /// Raw column holding the property type
    #[arg(long, default_value = "propertylandusedesc")]
    pub category_column: String,

    /// Keep every property type instead of single-unit residential only
    #[arg(long, default_value = "false")]
    pub all_categories: bool,

    /// Add the ratio features (size per bedroom, tax rate, ...)
    #[arg(long, default_value = "false")]
    pub ratios: bool,

    /// Seed for partitioning
    #[arg(long, default_value = "24")]
    pub seed: u64,

    /// Column to stratify the partitions on
    #[arg(long)]
    pub stratify: Option<String>,

    /// Scaling strategy: "minmax", "standard" or "robust"
    #[arg(long, default_value = "minmax")]
    pub scaler: ScalingStrategy,

    /// Columns to rescale (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "square_feet,tax_assessed_value,property_age"
    )]
    pub scale_columns: Vec<String>,

    /// Columns k-means clusters on (comma-separated, scaled columns)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "square_feet,tax_assessed_value,property_age"
    )]
    pub cluster_columns: Vec<String>,

    /// Number of clusters
    #[arg(short, long, default_value = "4")]
    pub k: usize,

    /// Seed for k-means++ initialisation
    #[arg(long, default_value = "24")]
    pub kmeans_seed: u64,

    /// Independent k-means restarts
    #[arg(long, default_value = "10")]
    pub n_init: usize,

    /// Base features for the model battery (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "square_feet,in_non_average_zip,tax_assessed_value"
    )]
    pub features: Vec<String>,

    /// Tweedie power: 0 (normal), 1 (Poisson), between 1 and 2 (compound), 2 (gamma), ...
    #[arg(long, default_value = "0.0")]
    pub tweedie_power: f64,

    /// Tweedie L2 penalty strength
    #[arg(long, default_value = "1.0")]
    pub tweedie_alpha: f64,

    /// Score this model (or "baseline") on the test partition
    #[arg(long)]
    pub test_model: Option<String>,

    /// Write the scaled, clustered partitions as CSV files into this directory
    #[arg(long)]
    pub prepared_dir: Option<PathBuf>,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise missing values by column and by row
    Nulls,

    /// Trim IQR outliers from the prepared table (exploration only)
    Outliers {
        /// IQR multiplier
        #[arg(short, long, default_value = "1.5")]
        k: f64,

        /// Columns to trim, in order (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "tax_assessed_value")]
        columns: Vec<String>,

        /// Write the trimmed table here (CSV or Parquet)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Welch t-test of the target below vs at-or-above a column threshold
    Ttest {
        /// Column to split on (unscaled prepared table)
        #[arg(long, default_value = "tax_assessed_value")]
        column: String,

        /// Rows with column < threshold form the first group
        #[arg(long, default_value = "250000")]
        threshold: f64,

        /// Significance level
        #[arg(long, default_value = "0.05")]
        alpha: f64,
    },

    /// K-means inertia for a range of k on the scaled train partition
    Inertia {
        #[arg(long, default_value = "1")]
        min_k: usize,

        #[arg(long, default_value = "10")]
        max_k: usize,
    },
}

fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    parent.join(format!("{}{}", stem, suffix))
}

impl Cli {
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Report path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(
            self.output
                .clone()
                .unwrap_or_else(|| derived_path(input, "_evaluation.json")),
        )
    }

    /// Cache path, deriving from input if not explicitly provided.
    pub fn cache_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(
            self.cache
                .clone()
                .unwrap_or_else(|| derived_path(input, "_cache.csv")),
        )
    }

    pub fn acquire_config(&self) -> Option<AcquireConfig> {
        let mut config = AcquireConfig::new(self.input.clone()?, self.cache_path()?);
        config.infer_schema_length = self.infer_schema_length;
        if self.keep_ids {
            config.post_fetch = None;
        }
        Some(config)
    }

    pub fn clean_config(&self) -> CleanConfig {
        CleanConfig {
            prop_required_column: self.prop_required_column,
            prop_required_row: self.prop_required_row,
            category_column: if self.all_categories {
                None
            } else {
                Some(self.category_column.clone())
            },
            ..CleanConfig::default()
        }
    }

    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            add_ratios: self.ratios,
            ..FeatureConfig::default()
        }
    }

    pub fn prepare_config(&self) -> PrepareConfig {
        PrepareConfig {
            clean: self.clean_config(),
            features: self.feature_config(),
        }
    }

    pub fn kmeans_config(&self) -> KMeansConfig {
        KMeansConfig {
            k: self.k,
            seed: self.kmeans_seed,
            n_init: self.n_init,
            ..KMeansConfig::default()
        }
    }

    pub fn battery_config(&self) -> BatteryConfig {
        BatteryConfig {
            target: self.target.clone(),
            base_features: self.features.clone(),
            forms: vec![
                ModelForm::Linear,
                ModelForm::Tweedie {
                    power: self.tweedie_power,
                    alpha: self.tweedie_alpha,
                },
                ModelForm::Polynomial,
                ModelForm::Interaction,
            ],
        }
    }
}

/// Validator for fractions in [0, 1]
pub fn validate_proportion(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("proportion must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}
