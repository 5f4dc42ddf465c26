//! Analysis operations over a listing table.
//!
//! [`TableAnalyzer`] owns one [`ListingTable`] and exposes every cleaning,
//! derivation and reporting operation as a method. Methods taking
//! `&mut self` append or rewrite columns; methods taking `&self` only read.
//!
//! Some operations read columns that others add, so order matters: for
//! example `under warranty` exists only after [`TableAnalyzer::derive_warranty_flag`].
//!
//! The free functions in [`aggregate`] and [`derive`] take the table
//! explicitly and can be used without the facade.

pub mod aggregate;
pub mod derive;

use crate::config::AnalyzerConfig;
use crate::error::{Result, ResultExt};
use crate::imputers::StatisticalImputer;
use crate::table::{ListingTable, columns};
use crate::types::{
    CityActivityCounts, MedianFill, RecencySummary, SecondMostExpensive, WarrantyConsistency,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Owns a listing table and answers questions about it.
#[derive(Debug, Clone)]
pub struct TableAnalyzer {
    table: ListingTable,
    config: AnalyzerConfig,
}

static_assertions::assert_impl_all!(TableAnalyzer: Send);

impl TableAnalyzer {
    pub fn new(table: impl Into<ListingTable>, config: AnalyzerConfig) -> Self {
        Self {
            table: table.into(),
            config,
        }
    }

    /// Load the table from a CSV file.
    pub fn from_csv(path: impl AsRef<Path>, config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        info!("Loading listings from: {}", path.display());
        let table = ListingTable::from_csv(path, config.infer_schema_length)
            .context(format!("Loading {}", path.display()))?;
        info!("Listings loaded: {} rows x {} columns", table.height(), table.width());
        Ok(Self::new(table, config))
    }

    pub fn table(&self) -> &ListingTable {
        &self.table
    }

    pub fn into_table(self) -> ListingTable {
        self.table
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// The first rows of the table.
    pub fn load_preview(&self) -> DataFrame {
        self.table.preview(self.config.preview_rows)
    }

    /// Rows repeating an earlier row in every column.
    pub fn find_duplicates(&self) -> Result<DataFrame> {
        let duplicates = aggregate::find_duplicates(&self.table)?;
        info!("Found {} duplicate rows", duplicates.height());
        Ok(duplicates)
    }

    /// Fill missing `engine_displacement` values with the median of the present ones.
    pub fn clean_engine_displacement(&mut self) -> Result<MedianFill> {
        let fill =
            StatisticalImputer::apply_numeric_median(&mut self.table, columns::ENGINE_DISPLACEMENT)?;
        info!(
            "Filled {} missing engine displacements with median {:.2}",
            fill.filled, fill.median
        );
        Ok(fill)
    }

    /// Append the `under warranty` column; returns how many rows are `YES`.
    pub fn derive_warranty_flag(&mut self) -> Result<usize> {
        let flagged = derive::derive_warranty_flag(&mut self.table, &self.config.warranty_tag)?;
        info!(
            "Derived '{}': {} of {} listings under warranty",
            columns::UNDER_WARRANTY,
            flagged,
            self.table.height()
        );
        Ok(flagged)
    }

    /// Compare warranty mentions in titles with warranty tags, by count only.
    pub fn check_warranty_consistency(&self) -> Result<WarrantyConsistency> {
        let result = aggregate::check_warranty_consistency(
            &self.table,
            &self.config.warranty_tag,
            &self.config.warranty_keyword,
        )?;
        if result.consistent {
            info!("Warranty info consistent: {} listings", result.tagged);
        } else {
            warn!(
                "Warranty info inconsistent: {} titles vs {} tags",
                result.title_mentions, result.tagged
            );
        }
        Ok(result)
    }

    /// Titles of the listing(s) at the second-highest position of the price list.
    pub fn second_most_expensive(&self) -> Result<SecondMostExpensive> {
        let result = aggregate::second_most_expensive(&self.table)?;
        info!(
            "Second most expensive price {}: {} listing(s)",
            result.price,
            result.titles.len()
        );
        Ok(result)
    }

    pub fn count_by_make(&self) -> Result<BTreeMap<String, usize>> {
        let counts = aggregate::count_by_make(&self.table)?;
        info!("Counted listings for {} makes", counts.len());
        Ok(counts)
    }

    /// Lowest price per make (not per make/model pair).
    pub fn cheapest_per_make(&self) -> Result<BTreeMap<String, Option<f64>>> {
        let cheapest = aggregate::cheapest_per_make(&self.table)?;
        info!("Found cheapest price for {} makes", cheapest.len());
        Ok(cheapest)
    }

    /// Append `sanity_check` and report whether every row was updated after creation.
    pub fn sanity_check_timestamps(&mut self) -> Result<bool> {
        let all_sane = derive::sanity_check_timestamps(&mut self.table)?;
        if all_sane {
            info!("All listings updated after creation");
        } else {
            warn!("Some listings have updated_at <= created_at");
        }
        Ok(all_sane)
    }

    pub fn active_counts_by_city(&self) -> Result<CityActivityCounts> {
        let counts = aggregate::active_counts_by_city(&self.table)?;
        info!("Active/inactive breakdown for {} cities", counts.len());
        Ok(counts)
    }

    /// Append `recency`, the time since `updated_at` measured from midnight UTC.
    pub fn derive_recency(&mut self) -> Result<RecencySummary> {
        let summary = derive::derive_recency(&mut self.table, self.config.recency_anchor())?;
        if summary.missing > 0 {
            warn!("{} listings have no parseable updated_at", summary.missing);
        }
        info!("Derived '{}' column", columns::RECENCY);
        Ok(summary)
    }

    /// Titles with the make removed, for rows whose title contains their make.
    pub fn extract_submodel(&self) -> Result<Vec<String>> {
        let submodels = derive::extract_submodel(&self.table)?;
        info!(
            "Extracted {} submodels from {} listings",
            submodels.len(),
            self.table.height()
        );
        Ok(submodels)
    }

    /// Append `unique id` and return a preview of the augmented table.
    pub fn build_unique_id_table(&mut self) -> Result<DataFrame> {
        let missing = derive::build_unique_id(&mut self.table)?;
        if missing > 0 {
            warn!("{} listings lack a component of the unique id", missing);
        }
        Ok(self.load_preview())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    fn analyzer() -> TableAnalyzer {
        let df = df![
            "make" => ["Ford", "Audi", "Ford", "Toyota", "Audi", "BMW"],
            "model" => ["Focus", "A3", "Fiesta", "Corolla", "A4", "X5"],
            "title" => ["Ford Focus WARRANTY", "Audi A3", "Ford Fiesta", "Corolla LE", "Audi A4", "BMW X5"],
            "tags" => ["{under_warranty}", "{}", "{}", "{}", "{}", "{}"],
            "price" => [5000.0, 9000.0, 3000.0, 4000.0, 12000.0, 20000.0],
            "engine_displacement" => [Some(1.6), None, Some(1.2), Some(1.8), None, Some(3.0)],
        ]
        .unwrap();
        TableAnalyzer::new(df, AnalyzerConfig::default())
    }

    #[test]
    fn test_preview_uses_configured_rows() {
        let analyzer = analyzer();
        assert_eq!(analyzer.load_preview().height(), 5);

        let config = AnalyzerConfig::builder().preview_rows(2).build().unwrap();
        let analyzer = TableAnalyzer::new(analyzer.into_table(), config);
        assert_eq!(analyzer.load_preview().height(), 2);
    }

    #[test]
    fn test_clean_engine_displacement() {
        let mut analyzer = analyzer();
        let fill = analyzer.clean_engine_displacement().unwrap();

        assert_eq!(fill.filled, 2);
        assert!((fill.median - 1.7).abs() < 1e-9);
        assert_eq!(
            analyzer
                .table()
                .series("engine_displacement")
                .unwrap()
                .null_count(),
            0
        );
    }

    #[test]
    fn test_warranty_flag_then_consistency() {
        let mut analyzer = analyzer();
        assert_eq!(analyzer.derive_warranty_flag().unwrap(), 1);
        assert!(analyzer.table().has_column("under warranty"));
        assert!(analyzer.check_warranty_consistency().unwrap().consistent);
    }

    #[test]
    fn test_second_most_expensive() {
        let result = analyzer().second_most_expensive().unwrap();
        assert_eq!(result.price, 12000.0);
        assert_eq!(result.titles, vec!["Audi A4".to_string()]);
    }

    #[test]
    fn test_submodels_skip_rows_without_make() {
        let submodels = analyzer().extract_submodel().unwrap();
        assert_eq!(submodels.len(), 5);
        assert_eq!(submodels[0], " Focus WARRANTY");
    }

    #[test]
    fn test_unique_id_requires_columns() {
        let mut analyzer = analyzer();
        let err = analyzer.build_unique_id_table().unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn(ref c) if c == "year"));
        assert!(!analyzer.table().has_column("unique id"));
    }
}
