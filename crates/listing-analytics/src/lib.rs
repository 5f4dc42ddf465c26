//! Vehicle Listing Analytics Library
//!
//! Cleaning and exploratory analysis of a tabular dataset of vehicle
//! listings, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Cleaning**: median imputation of missing engine displacements
//! - **Derived columns**: warranty flag, timestamp sanity flag, recency,
//!   unique identifier
//! - **Questions**: duplicate rows, second most expensive listing, counts and
//!   cheapest price per make, active/inactive breakdown per city, warranty
//!   consistency between titles and tags, submodels extracted from titles
//! - **Reporting**: one call runs everything and produces a serializable
//!   report plus an augmented CSV
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use listing_analytics::{AnalyzerConfig, TableAnalyzer};
//!
//! let mut analyzer = TableAnalyzer::from_csv("listings.csv", AnalyzerConfig::default())?;
//!
//! let duplicates = analyzer.find_duplicates()?;
//! analyzer.clean_engine_displacement()?;
//! analyzer.derive_warranty_flag()?;
//! let consistency = analyzer.check_warranty_consistency()?;
//! let second = analyzer.second_most_expensive()?;
//!
//! println!("{} duplicates, warranty consistent: {}", duplicates.height(), consistency.consistent);
//! println!("Second most expensive: {:?}", second.titles);
//! ```
//!
//! # Mutation
//!
//! Operations that add columns take `&mut self` (or `&mut ListingTable` in
//! the free-function form); everything else only reads. No operation removes
//! rows from the analyzed table.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod reporting;
pub mod table;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analyzer::TableAnalyzer;
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, ConfigValidationError};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use imputers::StatisticalImputer;
pub use reporting::{AnalysisReport, ReportGenerator};
pub use table::{ListingTable, columns};
pub use types::{
    CityActivityCounts, MedianFill, RecencySummary, SecondMostExpensive, StepWarning,
    WarrantyConsistency,
};
pub use utils::{parse_numeric_string, parse_timestamp, require_timestamp};
