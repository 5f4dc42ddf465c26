use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-city counts of each distinct `active` value, cities in alphabetical order.
pub type CityActivityCounts = BTreeMap<String, BTreeMap<String, usize>>;

/// Outcome of filling missing values with a column median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianFill {
    pub column: String,
    pub median: f64,
    /// Number of values that were missing and have been filled.
    pub filled: usize,
}

/// Title/tag warranty counts and whether they agree.
///
/// Only the totals are compared; equal totals do not mean the same rows
/// agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyConsistency {
    /// Rows whose title mentions the warranty keyword.
    pub title_mentions: usize,
    /// Rows whose tags equal the warranty tag.
    pub tagged: usize,
    pub consistent: bool,
}

/// Listings priced at the second position from the top of the sorted price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondMostExpensive {
    pub price: f64,
    pub titles: Vec<String>,
}

/// Summary of the derived `recency` column, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencySummary {
    /// Rows whose `updated_at` could not be parsed.
    pub missing: usize,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
}

/// An analysis step that failed during a full report run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWarning {
    pub step: String,
    pub code: String,
    pub message: String,
}
