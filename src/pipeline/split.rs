//! Train / validate / test partitioning
//!
//! The split is two-staged: 20% of the rows are held out as `test`, then
//! 30% of the remainder is held out as `validate`, leaving roughly
//! 56% / 24% / 20% of the table for train / validate / test.
//!
//! Every row gets a pseudo-random key derived from the seed, the stage and a
//! fingerprint of the row's values. Rows are held out in key order, so the
//! membership of each partition depends on the seed and the row contents,
//! not on where a row sits in the input.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use log::debug;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::frame::{require_column, row_fingerprints, string_values, take_rows};

/// Share of the full table held out as `test`
pub const TEST_FRACTION: f64 = 0.2;

/// Share of the train+validate remainder held out as `validate`
pub const VALIDATE_FRACTION: f64 = 0.3;

/// Seed used when the caller does not pick one
pub const DEFAULT_SEED: u64 = 24;

/// One of the three row subsets produced by [`split_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Validate,
    Test,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Validate, Partition::Test];
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Train => write!(f, "train"),
            Partition::Validate => write!(f, "validate"),
            Partition::Test => write!(f, "test"),
        }
    }
}

/// Three disjoint row subsets of one table
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: DataFrame,
    pub validate: DataFrame,
    pub test: DataFrame,
}

impl DataSplit {
    pub fn get(&self, partition: Partition) -> &DataFrame {
        match partition {
            Partition::Train => &self.train,
            Partition::Validate => &self.validate,
            Partition::Test => &self.test,
        }
    }

    /// Apply the same transform to every partition
    pub fn try_map<F>(&self, mut f: F) -> Result<DataSplit>
    where
        F: FnMut(Partition, &DataFrame) -> Result<DataFrame>,
    {
        Ok(DataSplit {
            train: f(Partition::Train, &self.train)?,
            validate: f(Partition::Validate, &self.validate)?,
            test: f(Partition::Test, &self.test)?,
        })
    }

    /// Row counts as `[train, validate, test]`
    pub fn sizes(&self) -> [usize; 3] {
        [self.train.height(), self.validate.height(), self.test.height()]
    }

    /// Fail with `EmptyPartition` if any partition has no rows
    pub fn require_rows(&self, stage: &'static str) -> Result<()> {
        for partition in Partition::ALL {
            if self.get(partition).height() == 0 {
                return Err(PipelineError::EmptyPartition { stage, partition }.into());
            }
        }
        Ok(())
    }
}

/// Per-row ordering keys for one split stage
fn split_keys(fingerprints: &[u64], seed: u64, stage: u64) -> Vec<u64> {
    fingerprints
        .iter()
        .map(|fp| {
            let mixed = seed ^ fp.rotate_left(17) ^ stage.wrapping_mul(0x9E37_79B9_7F4A_7C15);
            StdRng::seed_from_u64(mixed).gen::<u64>()
        })
        .collect()
}

/// Number of rows each stratum contributes to a holdout of `total` rows.
///
/// Largest-remainder allocation: every stratum gets the floor of its exact
/// share, and leftover rows go to the strata with the largest fractional
/// parts (ties to the stratum that sorts first).
fn allocate(group_sizes: &[usize], total: usize) -> Vec<usize> {
    let n: usize = group_sizes.iter().sum();
    if n == 0 {
        return vec![0; group_sizes.len()];
    }

    let exact: Vec<f64> = group_sizes
        .iter()
        .map(|&g| total as f64 * g as f64 / n as f64)
        .collect();
    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut leftover = total - counts.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..group_sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });

    for i in order {
        if leftover == 0 {
            break;
        }
        if counts[i] < group_sizes[i] {
            counts[i] += 1;
            leftover -= 1;
        }
    }
    counts
}

/// Hold out `ceil(fraction * rows)` rows. Returns `(kept, held_out)`, both ascending.
fn holdout(
    rows: &[usize],
    keys: &[u64],
    strata: Option<&[String]>,
    fraction: f64,
) -> (Vec<usize>, Vec<usize>) {
    let target = (fraction * rows.len() as f64).ceil() as usize;

    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for &row in rows {
        let label = strata.map_or("", |s| s[row].as_str());
        groups.entry(label).or_default().push(row);
    }

    let sizes: Vec<usize> = groups.values().map(Vec::len).collect();
    let counts = allocate(&sizes, target);

    let mut kept = Vec::with_capacity(rows.len() - target);
    let mut held = Vec::with_capacity(target);
    for (mut members, count) in groups.into_values().zip(counts) {
        members.sort_by_key(|&row| (keys[row], row));
        held.extend_from_slice(&members[..count]);
        kept.extend_from_slice(&members[count..]);
    }

    kept.sort_unstable();
    held.sort_unstable();
    (kept, held)
}

/// Split a table into train / validate / test.
///
/// With `stratify`, each value of that column keeps its share of rows in
/// every partition (up to rounding). Nulls form their own stratum.
pub fn split_data(df: &DataFrame, seed: u64, stratify: Option<&str>) -> Result<DataSplit> {
    let strata: Option<Vec<String>> = match stratify {
        Some(column) => {
            require_column(df, column)?;
            Some(
                string_values(df, column)?
                    .into_iter()
                    .map(|v| v.unwrap_or_else(|| "null".to_string()))
                    .collect(),
            )
        }
        None => None,
    };

    let fingerprints = row_fingerprints(df);
    let all_rows: Vec<usize> = (0..df.height()).collect();

    let test_keys = split_keys(&fingerprints, seed, 0);
    let (remainder, test_rows) = holdout(&all_rows, &test_keys, strata.as_deref(), TEST_FRACTION);

    let validate_keys = split_keys(&fingerprints, seed, 1);
    let (train_rows, validate_rows) = holdout(
        &remainder,
        &validate_keys,
        strata.as_deref(),
        VALIDATE_FRACTION,
    );

    debug!(
        "split {} rows into train={} validate={} test={}",
        df.height(),
        train_rows.len(),
        validate_rows.len(),
        test_rows.len()
    );

    Ok(DataSplit {
        train: take_rows(df, &train_rows)?,
        validate: take_rows(df, &validate_rows)?,
        test: take_rows(df, &test_rows)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sums_to_total() {
        let counts = allocate(&[50, 30, 20], 20);
        assert_eq!(counts, vec![10, 6, 4]);
        let counts = allocate(&[3, 3, 3], 2);
        assert_eq!(counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_holdout_sizes() {
        let rows: Vec<usize> = (0..10).collect();
        let keys: Vec<u64> = (0..10).rev().collect();
        let (kept, held) = holdout(&rows, &keys, None, 0.2);
        assert_eq!(held, vec![8, 9]);
        assert_eq!(kept.len(), 8);
    }

    #[test]
    fn test_partition_display() {
        assert_eq!(Partition::Validate.to_string(), "validate");
    }
}
