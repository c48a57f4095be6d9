//! Financial indicators
//!
//! - The immutable indicator catalog (codes, categories, thresholds)
//! - The calculator deriving raw ratios from transcribed financial facts

pub mod calculator;
pub mod catalog;

pub use calculator::{IndicatorCalculator, IndicatorResult};
pub use catalog::{
    codes, Category, IndicatorCatalog, IndicatorDefinition, ThresholdBucket, Thresholds,
};
