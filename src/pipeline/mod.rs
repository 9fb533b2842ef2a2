//! Pipeline module - the stages from raw table to model evaluation

pub mod acquire;
pub mod baseline;
pub mod clean;
pub mod cluster;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod frame;
pub mod inference;
pub mod loader;
pub mod outliers;
pub mod prepare;
pub mod regression;
pub mod scale;
pub mod split;
pub mod stats;

pub use acquire::{acquire, drop_source_identifiers, AcquireConfig};
pub use baseline::{baseline_from_frame, establish_baseline, Baseline, BaselineKind};
pub use clean::{
    clean, drop_missing_values, filter_categories, summarize_column_nulls, summarize_row_nulls,
    CleanConfig, ColumnNulls, RowNullGroup,
};
pub use cluster::{assign_clusters, inertia_curve, ClusterModel, KMeansConfig, CLUSTER_COLUMN};
pub use error::PipelineError;
pub use evaluate::{evaluate, Evaluation, ModelScore, BASELINE_LABEL};
pub use features::{engineer_features, FeatureConfig, LOCATION_FLAG_COLUMN};
pub use inference::{threshold_t_test, welch_t_test, TTestResult, ThresholdTest};
pub use loader::*;
pub use outliers::{remove_outliers, trim_outliers, OutlierTrim, TrimStep};
pub use prepare::{prepare, PrepareConfig};
pub use regression::{fit_battery, BatteryConfig, FeatureSet, ModelForm, ModelSpec, RegressionModel};
pub use scale::{scale_data, ScalingModel, ScalingStrategy};
pub use split::{split_data, DataSplit, Partition};
