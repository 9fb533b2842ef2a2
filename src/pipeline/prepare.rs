//! Cleaning followed by feature engineering

use anyhow::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::clean::{clean, CleanConfig};
use super::features::{engineer_features, FeatureConfig};

/// Configuration for [`prepare`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    pub clean: CleanConfig,
    pub features: FeatureConfig,
}

/// Clean the raw table, then derive features on the survivors
pub fn prepare(df: &DataFrame, config: &PrepareConfig) -> Result<DataFrame> {
    let cleaned = clean(df, &config.clean)?;
    engineer_features(&cleaned, &config.features)
}
