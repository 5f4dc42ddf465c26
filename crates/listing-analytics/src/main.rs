//! CLI entry point for the listing analytics tool.

use anyhow::{Result, anyhow};
use clap::Parser;
use listing_analytics::{
    AnalysisReport, AnalyzerConfig, ReportGenerator, TableAnalyzer, require_timestamp,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cleaning and exploratory analytics for vehicle listings",
    long_about = "Loads a CSV of vehicle listings, fills missing engine displacements, derives \
                  warranty, sanity, recency and unique id columns, and answers a fixed set of \
                  questions about the data.\n\n\
                  EXAMPLES:\n  \
                  # Human-readable summary\n  \
                  listing-analytics -i listings.csv\n\n  \
                  # JSON report on stdout\n  \
                  listing-analytics -i listings.csv --json | jq .count_by_make\n\n  \
                  # Write report and augmented table to disk\n  \
                  listing-analytics -i listings.csv -r --export-table -o results/"
)]
struct Args {
    /// Path to the CSV file of listings
    #[arg(short, long)]
    input: String,

    /// Output directory for reports and exported tables
    #[arg(short, long, default_value = "./output")]
    output: String,

    /// Number of rows shown in previews
    #[arg(long, default_value = "5")]
    preview_rows: usize,

    /// Measure recency from this date instead of today (e.g. 2024-01-31)
    #[arg(long)]
    reference_date: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the final JSON report is printed.
    #[arg(long)]
    json: bool,

    /// Write a JSON report to the output directory as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Write the augmented table to the output directory as <input_name>_augmented.csv
    #[arg(long)]
    export_table: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true no subscriber is installed, so stdout only
/// carries the JSON report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let mut config_builder = AnalyzerConfig::builder()
        .preview_rows(args.preview_rows)
        .output_dir(&args.output);
    if let Some(ref raw) = args.reference_date {
        config_builder = config_builder.reference_time(require_timestamp("reference_date", raw)?);
    }
    let config = config_builder.build()?;

    let mut analyzer = TableAnalyzer::from_csv(&args.input, config).map_err(|e| {
        error!("Failed to load listings: {}", e);
        anyhow!("Failed to load {}: {}", args.input, e)
    })?;

    if !args.json {
        println!("\nPREVIEW");
        println!("{}", analyzer.load_preview());
    }

    let report = ReportGenerator::run_all(&mut analyzer, Some(&args.input));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_human_readable_summary(&report);
        println!("{}", analyzer.load_preview());
    }

    if args.emit_report || args.export_table {
        let stem = extract_file_stem(&args.input);
        let generator = ReportGenerator::new(PathBuf::from(&args.output));
        if args.emit_report {
            let path = generator.write_report_to_file(&report, &stem)?;
            info!("Report written to: {}", path.display());
        }
        if args.export_table {
            let path = generator.export_table(analyzer.table(), &stem)?;
            info!("Augmented table written to: {}", path.display());
        }
    }

    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("listings")
        .to_string()
}

/// Print the report for a terminal.
///
/// Uses `println!` on purpose: this is the command's output, not logging.
fn print_human_readable_summary(report: &AnalysisReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("LISTING ANALYSIS");
    println!("{}", "=".repeat(80));
    println!();

    if let Some(ref input) = report.input_file {
        println!("Input: {} ({} rows)", input, report.rows);
    }
    println!(
        "Columns: {} -> {} (derived columns appended)",
        report.columns_before, report.columns_after
    );
    println!();

    println!("Duplicate rows: {}", report.duplicate_count);
    if let Some(ref fill) = report.engine_displacement {
        println!(
            "Engine displacement: filled {} missing values with median {:.2}",
            fill.filled, fill.median
        );
    }
    if let Some(flagged) = report.under_warranty {
        println!("Listings under warranty: {}", flagged);
    }
    if let Some(ref consistency) = report.warranty_consistency {
        println!(
            "Warranty consistent: {} ({} titles vs {} tags)",
            consistency.consistent, consistency.title_mentions, consistency.tagged
        );
    }
    if let Some(ref second) = report.second_most_expensive {
        println!("Second most expensive ({}):", second.price);
        for title in &second.titles {
            println!("  - {}", title);
        }
    }
    println!();

    println!("{:<20} {:>8} {:>16}", "Make", "Count", "Cheapest");
    println!("{}", "-".repeat(46));
    for (make, count) in &report.count_by_make {
        let cheapest = report
            .cheapest_per_make
            .get(make)
            .copied()
            .flatten()
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        println!("{:<20} {:>8} {:>16}", truncate_str(make, 19), count, cheapest);
    }
    println!();

    if let Some(sane) = report.timestamps_sane {
        println!("All listings updated after creation: {}", sane);
    }
    if !report.active_by_city.is_empty() {
        println!("Active listings per city:");
        for (city, counts) in &report.active_by_city {
            let breakdown: Vec<String> = counts
                .iter()
                .map(|(active, count)| format!("{}={}", active, count))
                .collect();
            println!("  {:<20} {}", truncate_str(city, 19), breakdown.join(", "));
        }
    }
    if let Some(ref recency) = report.recency {
        println!(
            "Recency (days): min {:?}, max {:?}, unparseable {}",
            recency.min_days, recency.max_days, recency.missing
        );
    }
    println!("Submodels extracted: {}", report.submodel_count);
    for submodel in &report.submodel_samples {
        println!("  - {}", submodel.trim());
    }
    if let Some(ids) = report.unique_ids {
        println!("Unique ids built: {}", ids);
    }
    println!();

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  ! [{}] {}: {}", warning.code, warning.step, warning.message);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
