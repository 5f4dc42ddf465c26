//! Report generation module.
//!
//! Runs the whole analysis against one table and collects the answers into
//! an [`AnalysisReport`], which can be printed, serialized or written to
//! disk together with the augmented table.
//!
//! # Example
//!
//! ```rust,ignore
//! use listing_analytics::{AnalyzerConfig, ReportGenerator, TableAnalyzer};
//!
//! let mut analyzer = TableAnalyzer::from_csv("listings.csv", AnalyzerConfig::default())?;
//! let report = ReportGenerator::run_all(&mut analyzer, Some("listings.csv"));
//!
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::new(PathBuf::from("output"));
//! generator.write_report_to_file(&report, "listings")?;
//! generator.export_table(analyzer.table(), "listings")?;
//! ```

mod generator;

pub use generator::{AnalysisReport, ReportGenerator};
