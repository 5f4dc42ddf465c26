//! The in-memory listing table.
//!
//! [`ListingTable`] wraps a polars [`DataFrame`]. Operations that only read
//! take `&ListingTable`; operations that append derived columns take
//! `&mut ListingTable`. Rows are never removed from a table.

use crate::error::{AnalysisError, Result};
use crate::loader::load_csv_with_fallbacks;
use polars::prelude::*;
use std::path::Path;

/// Column names of the listing schema and of the derived columns.
pub mod columns {
    pub const MAKE: &str = "make";
    pub const MODEL: &str = "model";
    pub const TITLE: &str = "title";
    pub const TAGS: &str = "tags";
    pub const PRICE: &str = "price";
    pub const YEAR: &str = "year";
    pub const CITY: &str = "city";
    pub const ACTIVE: &str = "active";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const ENGINE_DISPLACEMENT: &str = "engine_displacement";

    pub const UNDER_WARRANTY: &str = "under warranty";
    pub const SANITY_CHECK: &str = "sanity_check";
    pub const RECENCY: &str = "recency";
    pub const UNIQUE_ID: &str = "unique id";
}

/// An ordered table of vehicle listings.
#[derive(Debug, Clone)]
pub struct ListingTable {
    df: DataFrame,
}

impl ListingTable {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }

    /// Load a table from a CSV file with a header row.
    pub fn from_csv(path: impl AsRef<Path>, infer_schema_length: usize) -> Result<Self> {
        let df = load_csv_with_fallbacks(path.as_ref(), infer_schema_length)?;
        Ok(Self::new(df))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn width(&self) -> usize {
        self.df.width()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Look up a column, failing with [`AnalysisError::MissingColumn`].
    pub fn series(&self, name: &str) -> Result<&Series> {
        self.df
            .column(name)
            .map(|col| col.as_materialized_series())
            .map_err(|_| AnalysisError::MissingColumn(name.to_string()))
    }

    /// Fail on the first absent column among `names`.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|name| !self.has_column(name)) {
            Some(missing) => Err(AnalysisError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    /// The first `rows` rows as a new frame.
    pub fn preview(&self, rows: usize) -> DataFrame {
        self.df.head(Some(rows))
    }

    /// Append a column, replacing any existing column of the same name in place.
    pub fn put_column(&mut self, series: Series) -> Result<()> {
        if series.len() != self.df.height() && self.df.width() > 0 {
            return Err(AnalysisError::Polars(PolarsError::ShapeMismatch(
                format!(
                    "column '{}' has {} rows, table has {}",
                    series.name(),
                    series.len(),
                    self.df.height()
                )
                .into(),
            )));
        }
        self.df.with_column(series)?;
        Ok(())
    }

    /// Replace an existing column.
    pub(crate) fn replace_column(&mut self, name: &str, series: Series) -> Result<()> {
        self.df.replace(name, series)?;
        Ok(())
    }
}

impl From<DataFrame> for ListingTable {
    fn from(df: DataFrame) -> Self {
        Self::new(df)
    }
}
