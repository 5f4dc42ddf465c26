//! Statistical imputation methods.

use crate::error::{AnalysisError, Result};
use crate::table::ListingTable;
use crate::types::MedianFill;
use crate::utils::{fill_numeric_nulls, numeric_values};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill every missing value of a numeric column with the median of the
    /// present values.
    ///
    /// Text that does not parse as a number counts as missing. Fails with
    /// [`AnalysisError::InsufficientData`] when no value is present.
    pub fn apply_numeric_median(table: &mut ListingTable, col_name: &str) -> Result<MedianFill> {
        let values = numeric_values(table.series(col_name)?)?;
        let missing = values.iter().filter(|v| v.is_none()).count();

        let median = Self::median(&values).ok_or_else(|| {
            AnalysisError::insufficient(
                format!("median of '{}'", col_name),
                format!("all {} values are missing", values.len()),
            )
        })?;

        let filled = fill_numeric_nulls(&values, col_name, median);
        table.replace_column(col_name, filled)?;

        debug!(
            "Filled {} missing values in '{}' with median {:.3}",
            missing, col_name, median
        );

        Ok(MedianFill {
            column: col_name.to_string(),
            median,
            filled: missing,
        })
    }

    /// Median of the present values; the mean of the two middle values when
    /// their count is even.
    pub fn median(values: &[Option<f64>]) -> Option<f64> {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        if present.is_empty() {
            return None;
        }
        Series::new(PlSmallStr::EMPTY, present).median()
    }
}
