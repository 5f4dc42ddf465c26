use crate::analyzer::TableAnalyzer;
use crate::analyzer::derive::recency_in_days;
use crate::error::{AnalysisError, Result, ResultExt};
use crate::table::{ListingTable, columns};
use crate::types::{
    CityActivityCounts, MedianFill, RecencySummary, SecondMostExpensive, StepWarning,
    WarrantyConsistency,
};
use chrono::Utc;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Number of extracted submodels kept in a report.
const SUBMODEL_SAMPLE_SIZE: usize = 10;

// ============================================================================
// Report Types
// ============================================================================

/// Every answer produced by a full analysis run.
///
/// Fields are `None` (or empty) when the corresponding step failed; the
/// failure is listed in `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file, when the table came from one
    pub input_file: Option<String>,

    pub rows: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    pub duplicate_count: usize,
    pub engine_displacement: Option<MedianFill>,
    /// Listings flagged `YES` in `under warranty`
    pub under_warranty: Option<usize>,
    pub warranty_consistency: Option<WarrantyConsistency>,
    pub second_most_expensive: Option<SecondMostExpensive>,
    pub count_by_make: BTreeMap<String, usize>,
    pub cheapest_per_make: BTreeMap<String, Option<f64>>,
    /// Whether every listing was updated strictly after creation
    pub timestamps_sane: Option<bool>,
    pub active_by_city: CityActivityCounts,
    pub recency: Option<RecencySummary>,

    /// Rows that produced a submodel
    pub submodel_count: usize,
    /// First few extracted submodels
    pub submodel_samples: Vec<String>,
    /// Listings whose unique id could be built
    pub unique_ids: Option<usize>,

    /// Steps that failed, in execution order
    pub warnings: Vec<StepWarning>,
}

/// Runs the analysis steps in dependency order and writes their output.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Run every analysis step against the analyzer's table.
    ///
    /// Column-appending steps run before the steps that read their output. A
    /// failing step is recorded in [`AnalysisReport::warnings`] and the run
    /// continues.
    pub fn run_all(analyzer: &mut TableAnalyzer, input_file: Option<&str>) -> AnalysisReport {
        let rows = analyzer.table().height();
        let columns_before = analyzer.table().width();
        let mut warnings = Vec::new();

        let duplicate_count = record(&mut warnings, "find_duplicates", analyzer.find_duplicates())
            .map(|df| df.height())
            .unwrap_or(0);
        let engine_displacement = record(
            &mut warnings,
            "clean_engine_displacement",
            analyzer.clean_engine_displacement(),
        );
        let under_warranty = record(
            &mut warnings,
            "derive_warranty_flag",
            analyzer.derive_warranty_flag(),
        );
        let warranty_consistency = record(
            &mut warnings,
            "check_warranty_consistency",
            analyzer.check_warranty_consistency(),
        );
        let second_most_expensive = record(
            &mut warnings,
            "second_most_expensive",
            analyzer.second_most_expensive(),
        );
        let count_by_make =
            record(&mut warnings, "count_by_make", analyzer.count_by_make()).unwrap_or_default();
        let cheapest_per_make = record(
            &mut warnings,
            "cheapest_per_make",
            analyzer.cheapest_per_make(),
        )
        .unwrap_or_default();
        let timestamps_sane = record(
            &mut warnings,
            "sanity_check_timestamps",
            analyzer.sanity_check_timestamps(),
        );
        let active_by_city = record(
            &mut warnings,
            "active_counts_by_city",
            analyzer.active_counts_by_city(),
        )
        .unwrap_or_default();
        let recency = record(&mut warnings, "derive_recency", analyzer.derive_recency());
        let submodels =
            record(&mut warnings, "extract_submodel", analyzer.extract_submodel()).unwrap_or_default();
        let unique_ids = record(
            &mut warnings,
            "build_unique_id_table",
            analyzer.build_unique_id_table(),
        )
        .and_then(|_| analyzer.table().series(columns::UNIQUE_ID).ok())
        .map(|ids| ids.len() - ids.null_count());

        AnalysisReport {
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.map(String::from),
            rows,
            columns_before,
            columns_after: analyzer.table().width(),
            duplicate_count,
            engine_displacement,
            under_warranty,
            warranty_consistency,
            second_most_expensive,
            count_by_make,
            cheapest_per_make,
            timestamps_sane,
            active_by_city,
            recency,
            submodel_count: submodels.len(),
            submodel_samples: submodels.into_iter().take(SUBMODEL_SAMPLE_SIZE).collect(),
            unique_ids,
            warnings,
        }
    }

    /// Write a report to `<base_name>_report.json` in the output directory.
    pub fn write_report_to_file(&self, report: &AnalysisReport, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    /// Export the table to `<base_name>_augmented.csv` in the output directory.
    ///
    /// The `recency` duration column is written as whole days.
    pub fn export_table(&self, table: &ListingTable, base_name: &str) -> Result<PathBuf> {
        let mut df = table.frame().clone();
        if let Ok(recency) = table.series(columns::RECENCY) {
            df.with_column(recency_in_days(recency)?)?;
        }

        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(format!("{}_augmented.csv", base_name));
        let mut file = File::create(&output_path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(&mut df)
            .context(format!("Writing {}", output_path.display()))?;

        info!("Augmented table saved: {}", output_path.display());
        Ok(output_path)
    }
}

/// Keep a step's value, or log its failure and remember it as a warning.
fn record<T>(warnings: &mut Vec<StepWarning>, step: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Step '{}' failed: {}", step, err);
            warnings.push(step_warning(step, &err));
            None
        }
    }
}

fn step_warning(step: &str, err: &AnalysisError) -> StepWarning {
    StepWarning {
        step: step.to_string(),
        code: err.error_code().to_string(),
        message: err.to_string(),
    }
}
