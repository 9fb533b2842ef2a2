//! JSON run report export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{
    Baseline, BatteryConfig, ClusterModel, Evaluation, KMeansConfig, ModelScore, PrepareConfig,
    RegressionModel, ScalingModel,
};
use crate::report::RunSummary;

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub parcelfit_version: String,
    pub input_file: String,
    pub target_column: String,
}

/// Every configuration the run used
#[derive(Serialize)]
pub struct RunConfig<'a> {
    pub prepare: &'a PrepareConfig,
    pub split_seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stratify: Option<&'a str>,
    pub scale_columns: &'a [String],
    pub kmeans: &'a KMeansConfig,
    pub cluster_features: &'a [String],
    pub battery: &'a BatteryConfig,
}

/// Complete run report
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub metadata: RunMetadata,
    pub config: RunConfig<'a>,
    pub summary: &'a RunSummary,
    pub baseline: &'a Baseline,
    pub scores: &'a [ModelScore],
    pub scaling: &'a ScalingModel,
    pub clusters: &'a ClusterModel,
    pub models: &'a [RegressionModel],
}

/// Fitted artifacts of a run, borrowed for export
pub struct RunArtifacts<'a> {
    pub summary: &'a RunSummary,
    pub baseline: &'a Baseline,
    pub evaluation: &'a Evaluation,
    pub scaling: &'a ScalingModel,
    pub clusters: &'a ClusterModel,
    pub models: &'a [RegressionModel],
}

/// Build the report for a finished run
pub fn build_run_report<'a>(
    input_file: &str,
    config: RunConfig<'a>,
    artifacts: &RunArtifacts<'a>,
) -> RunReport<'a> {
    RunReport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            parcelfit_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.to_string(),
            target_column: config.battery.target.clone(),
        },
        config,
        summary: artifacts.summary,
        baseline: artifacts.baseline,
        scores: &artifacts.evaluation.scores,
        scaling: artifacts.scaling,
        clusters: artifacts.clusters,
        models: artifacts.models,
    }
}

/// Write the report as pretty-printed JSON
///
/// # Arguments
/// * `report` - Report built with [`build_run_report`]
/// * `output_path` - Path to write the JSON file
pub fn export_run_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize run report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}
