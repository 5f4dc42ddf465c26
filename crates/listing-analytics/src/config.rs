//! Configuration types for the listing analyzer.
//!
//! This module provides configuration options using the builder pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag value marking a listing as covered by a warranty.
pub const DEFAULT_WARRANTY_TAG: &str = "{under_warranty}";

/// Keyword searched for (case-insensitively) in listing titles.
pub const DEFAULT_WARRANTY_KEYWORD: &str = "WARRANTY";

/// Configuration for the [`TableAnalyzer`](crate::TableAnalyzer).
///
/// Use [`AnalyzerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use listing_analytics::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .preview_rows(10)
///     .output_dir("reports")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Number of rows returned by preview operations.
    /// Default: 5
    pub preview_rows: usize,

    /// Exact `tags` value that marks a listing as under warranty.
    /// Default: "{under_warranty}"
    pub warranty_tag: String,

    /// Keyword searched for in titles by the warranty consistency check.
    /// Default: "WARRANTY"
    pub warranty_keyword: String,

    /// Instant recency is measured from (normalized to midnight UTC).
    /// If None, the current time is used.
    /// Default: None
    pub reference_time: Option<DateTime<Utc>>,

    /// Number of rows the CSV reader inspects to infer column types.
    /// Default: 100
    pub infer_schema_length: usize,

    /// Output directory for reports and exported tables.
    /// Default: "output"
    pub output_dir: PathBuf,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            warranty_tag: DEFAULT_WARRANTY_TAG.to_string(),
            warranty_keyword: DEFAULT_WARRANTY_KEYWORD.to_string(),
            reference_time: None,
            infer_schema_length: 100,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl AnalyzerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.preview_rows == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "preview_rows".to_string(),
                value: self.preview_rows,
            });
        }

        if self.infer_schema_length == 0 {
            return Err(ConfigValidationError::InvalidCount {
                field: "infer_schema_length".to_string(),
                value: self.infer_schema_length,
            });
        }

        if self.warranty_tag.trim().is_empty() {
            return Err(ConfigValidationError::EmptyValue("warranty_tag".to_string()));
        }

        if self.warranty_keyword.trim().is_empty() {
            return Err(ConfigValidationError::EmptyValue(
                "warranty_keyword".to_string(),
            ));
        }

        Ok(())
    }

    /// The instant recency is measured from: the configured reference time,
    /// or now, truncated to midnight UTC.
    pub fn recency_anchor(&self) -> DateTime<Utc> {
        let now = self.reference_time.unwrap_or_else(Utc::now);
        now.date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be at least 1)")]
    InvalidCount { field: String, value: usize },

    #[error("'{0}' must not be empty")]
    EmptyValue(String),
}

impl From<ConfigValidationError> for crate::error::AnalysisError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::AnalysisError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`AnalyzerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalyzerConfigBuilder {
    preview_rows: Option<usize>,
    warranty_tag: Option<String>,
    warranty_keyword: Option<String>,
    reference_time: Option<DateTime<Utc>>,
    infer_schema_length: Option<usize>,
    output_dir: Option<PathBuf>,
}

impl AnalyzerConfigBuilder {
    /// Set the number of rows returned by preview operations.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Set the tag value that marks a listing as under warranty.
    pub fn warranty_tag(mut self, tag: impl Into<String>) -> Self {
        self.warranty_tag = Some(tag.into());
        self
    }

    /// Set the keyword searched for in listing titles.
    pub fn warranty_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.warranty_keyword = Some(keyword.into());
        self
    }

    /// Pin the instant recency is computed from.
    ///
    /// Useful for reproducible reports and tests.
    pub fn reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    /// Set the number of rows used for CSV schema inference.
    pub fn infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    /// Set the output directory for reports and exported tables.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalyzerConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalyzerConfig, ConfigValidationError> {
        let config = AnalyzerConfig {
            preview_rows: self.preview_rows.unwrap_or(5),
            warranty_tag: self
                .warranty_tag
                .unwrap_or_else(|| DEFAULT_WARRANTY_TAG.to_string()),
            warranty_keyword: self
                .warranty_keyword
                .unwrap_or_else(|| DEFAULT_WARRANTY_KEYWORD.to_string()),
            reference_time: self.reference_time,
            infer_schema_length: self.infer_schema_length.unwrap_or(100),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
        };

        config.validate()?;
        Ok(config)
    }
}
