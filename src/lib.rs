//! parcelfit: property record modeling library
//!
//! Cleans raw property records, derives features, partitions the table
//! into train/validate/test, rescales and clusters on train-fitted
//! parameters, and scores a battery of regression models against a
//! constant baseline.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
