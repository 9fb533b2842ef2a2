//! Derived columns: ages, age bins, location flags and ratio features
//!
//! Every function takes the input frame by reference and returns a new frame.
//!
//! # Division policy
//!
//! Ratio features never fail. A null operand produces a null value; a zero
//! denominator produces the IEEE result (`inf`, `-inf` or `NaN`). Downstream
//! stages see these as ordinary missing or non-finite values.

use anyhow::Result;
use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::frame::{float_values, with_replaced_column};

/// Year the property records describe
pub const REFERENCE_YEAR: i32 = 2017;

/// Cutpoints for the `year_built_bin` column
pub const AGE_BIN_EDGES: &[i32] = &[1800, 1925, 1950, 1975, 2000, 2020];

/// Zip codes whose log error distribution differs from the overall average
pub const NON_AVERAGE_ZIP_CODES: &[i64] = &[
    95982, 95983, 95984, 95985, 95986, 95987, 95988, 95989, 95990, 95991, 95992, 95993,
    95994, 95996, 95997, 96020, 96024, 96025, 96026, 96028, 96029, 96030, 96037, 96038,
    96040, 96042, 96043, 96044, 96045, 96046, 96047, 96048, 96049, 96050, 96058, 96086,
];

/// Raw source column names and the names downstream stages use
pub const DEFAULT_RENAMES: &[(&str, &str)] = &[
    ("calculatedfinishedsquarefeet", "square_feet"),
    ("bedroomcnt", "bedrooms"),
    ("bathroomcnt", "bathrooms"),
    ("taxvaluedollarcnt", "tax_assessed_value"),
    ("taxamount", "tax_amount"),
    ("yearbuilt", "year_built"),
    ("regionidzip", "zip_code"),
    ("lotsizesquarefeet", "lot_size"),
    ("propertylandusedesc", "property_type"),
    ("logerror", "log_error"),
];

/// Which derived columns [`engineer_features`] produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// `(raw, semantic)` renames applied first; absent raw columns are skipped
    pub renames: Vec<(String, String)>,
    pub reference_year: i32,
    pub age_bin_edges: Vec<i32>,
    /// Column holding the location code
    pub location_column: String,
    /// Codes flagged by `in_non_average_zip`
    pub location_codes: Vec<i64>,
    pub add_age: bool,
    pub add_age_bins: bool,
    pub add_location_flag: bool,
    pub add_ratios: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            renames: DEFAULT_RENAMES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            reference_year: REFERENCE_YEAR,
            age_bin_edges: AGE_BIN_EDGES.to_vec(),
            location_column: "zip_code".to_string(),
            location_codes: NON_AVERAGE_ZIP_CODES.to_vec(),
            add_age: true,
            add_age_bins: true,
            add_location_flag: true,
            add_ratios: false,
        }
    }
}

/// Name of the Boolean location flag column
pub const LOCATION_FLAG_COLUMN: &str = "in_non_average_zip";

/// Rename columns to stable semantic names, skipping names not present
pub fn rename_columns(df: &DataFrame, renames: &[(String, String)]) -> Result<DataFrame> {
    let mut out = df.clone();
    for (from, to) in renames {
        if out.column(from).is_ok() {
            out.rename(from, to.as_str().into())?;
        }
    }
    Ok(out)
}

/// `property_age = reference_year - year_built`
pub fn add_property_age(df: &DataFrame, reference_year: i32) -> Result<DataFrame> {
    let ages: Vec<Option<f64>> = float_values(df, "year_built")?
        .into_iter()
        .map(|year| year.map(|y| reference_year as f64 - y))
        .collect();
    with_replaced_column(df, Column::new("property_age".into(), ages))
}

/// Label for the right-closed interval `(lo, hi]` containing `year`
fn age_bin_label(year: f64, edges: &[i32]) -> Option<String> {
    edges.windows(2).find_map(|pair| {
        let (lo, hi) = (pair[0] as f64, pair[1] as f64);
        (year > lo && year <= hi).then(|| format!("{}-{}", pair[0], pair[1]))
    })
}

/// Categorical `year_built_bin`; years outside the edges are null
pub fn add_age_bins(df: &DataFrame, edges: &[i32]) -> Result<DataFrame> {
    let bins: Vec<Option<String>> = float_values(df, "year_built")?
        .into_iter()
        .map(|year| year.and_then(|y| age_bin_label(y, edges)))
        .collect();
    with_replaced_column(df, Column::new("year_built_bin".into(), bins))
}

/// Boolean flag marking rows whose location code is in `codes`.
///
/// The flag is always a `Boolean` column; null codes are `false`.
pub fn add_location_flag(
    df: &DataFrame,
    location_column: &str,
    codes: &[i64],
    output: &str,
) -> Result<DataFrame> {
    let flags: Vec<bool> = float_values(df, location_column)?
        .into_iter()
        .map(|code| {
            code.is_some_and(|c| c.fract() == 0.0 && codes.contains(&(c as i64)))
        })
        .collect();
    with_replaced_column(df, Column::new(output.into(), flags))
}

fn divide(numerator: &[Option<f64>], denominator: &[Option<f64>]) -> Vec<Option<f64>> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| match (n, d) {
            (Some(n), Some(d)) => Some(n / d),
            _ => None,
        })
        .collect()
}

/// Size, room and tax ratios. See the module docs for the division policy.
pub fn add_ratio_features(df: &DataFrame) -> Result<DataFrame> {
    let square_feet = float_values(df, "square_feet")?;
    let bedrooms = float_values(df, "bedrooms")?;
    let bathrooms = float_values(df, "bathrooms")?;
    let tax_amount = float_values(df, "tax_amount")?;
    let assessed = float_values(df, "tax_assessed_value")?;

    let total_rooms: Vec<Option<f64>> = bedrooms
        .iter()
        .zip(&bathrooms)
        .map(|(b, ba)| match (b, ba) {
            (Some(b), Some(ba)) => Some(b + ba),
            _ => None,
        })
        .collect();

    let derived = [
        ("size_per_bedroom", divide(&square_feet, &bedrooms)),
        ("size_per_bathroom", divide(&square_feet, &bathrooms)),
        ("rooms_per_size", divide(&total_rooms, &square_feet)),
        ("tax_rate", divide(&tax_amount, &assessed)),
        ("value_per_size", divide(&assessed, &square_feet)),
        ("total_rooms", total_rooms.clone()),
    ];

    let mut out = df.clone();
    for (name, values) in derived {
        out.with_column(Column::new(name.into(), values))?;
    }
    Ok(out)
}

/// Apply the configured renames and derivations
pub fn engineer_features(df: &DataFrame, config: &FeatureConfig) -> Result<DataFrame> {
    let mut out = rename_columns(df, &config.renames)?;

    if config.add_age {
        out = add_property_age(&out, config.reference_year)?;
    }
    if config.add_age_bins {
        out = add_age_bins(&out, &config.age_bin_edges)?;
    }
    if config.add_location_flag {
        out = add_location_flag(
            &out,
            &config.location_column,
            &config.location_codes,
            LOCATION_FLAG_COLUMN,
        )?;
    }
    if config.add_ratios {
        out = add_ratio_features(&out)?;
    }

    debug!("engineered features: {} columns", out.width());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_bin_label_is_right_closed() {
        let edges = AGE_BIN_EDGES;
        assert_eq!(age_bin_label(1925.0, edges).as_deref(), Some("1800-1925"));
        assert_eq!(age_bin_label(1926.0, edges).as_deref(), Some("1925-1950"));
        assert_eq!(age_bin_label(1800.0, edges), None);
        assert_eq!(age_bin_label(2021.0, edges), None);
    }

    #[test]
    fn test_divide_propagates_nulls() {
        let out = divide(&[Some(1.0), None, Some(1.0)], &[Some(2.0), Some(2.0), None]);
        assert_eq!(out, vec![Some(0.5), None, None]);
    }
}
