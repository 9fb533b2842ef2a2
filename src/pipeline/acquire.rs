//! Source acquisition with a local CSV cache

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;

use super::loader::{load_dataset, save_dataset};

/// Join-key and lookup id columns that carry no information once the
/// descriptive columns are joined in
pub const SOURCE_ID_COLUMNS: &[&str] = &[
    "heatingorsystemtypeid",
    "storytypeid",
    "propertylandusetypeid",
    "buildingclasstypeid",
    "architecturalstyletypeid",
    "airconditioningtypeid",
    "typeconstructiontypeid",
    "id",
    "parcelid",
];

/// Transform applied to the acquired table before it is returned
pub type PostFetch = fn(DataFrame) -> Result<DataFrame>;

/// Where to read the source from and where to cache it
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Source table (CSV or Parquet)
    pub source: PathBuf,
    /// Cache file, always CSV with a header row
    pub cache_path: PathBuf,
    /// Rows used for CSV schema inference (0 scans everything)
    pub infer_schema_length: usize,
    pub post_fetch: Option<PostFetch>,
}

impl AcquireConfig {
    pub fn new(source: impl Into<PathBuf>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            cache_path: cache_path.into(),
            infer_schema_length: 10000,
            post_fetch: Some(drop_source_identifiers),
        }
    }
}

/// Drop the id columns listed in [`SOURCE_ID_COLUMNS`] that are present
pub fn drop_source_identifiers(df: DataFrame) -> Result<DataFrame> {
    let present: Vec<&str> = SOURCE_ID_COLUMNS
        .iter()
        .copied()
        .filter(|c| df.get_column_index(c).is_some())
        .collect();
    Ok(df.drop_many(present))
}

/// Acquire the source table.
///
/// # Arguments
/// * `config` - Source, cache location and post-fetch transform
/// * `use_cache` - Read the cache verbatim when it exists
/// * `cache_result` - Write the freshly loaded source table to the cache
///
/// The cache always holds the untransformed source; `post_fetch` runs on
/// the returned table on both paths.
pub fn acquire(config: &AcquireConfig, use_cache: bool, cache_result: bool) -> Result<DataFrame> {
    let df = if use_cache && config.cache_path.exists() {
        info!("reading cached table from {}", config.cache_path.display());
        load_dataset(&config.cache_path, config.infer_schema_length)
            .with_context(|| format!("Failed to read cache {}", config.cache_path.display()))?
    } else {
        info!("reading source table from {}", config.source.display());
        let mut df = load_dataset(&config.source, config.infer_schema_length)?;
        if cache_result {
            save_dataset(&mut df, &config.cache_path)?;
            info!("cached {} rows to {}", df.height(), config.cache_path.display());
        }
        df
    };

    match config.post_fetch {
        Some(transform) => transform(df),
        None => Ok(df),
    }
}
