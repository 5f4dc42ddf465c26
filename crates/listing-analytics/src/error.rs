//! Custom error types for the listing analytics library.
//!
//! This module provides the error hierarchy using `thiserror`. Errors are
//! serializable so they can be embedded in JSON reports and CLI output.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for table analysis operations.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A column required by an operation is absent from the table.
    #[error("Required column '{0}' not found in table")]
    MissingColumn(String),

    /// An operation needs more non-missing values than the table provides.
    #[error("Insufficient data for {operation}: {reason}")]
    InsufficientData { operation: String, reason: String },

    /// A timestamp or numeric field could not be parsed.
    #[error("Failed to parse '{value}' in column '{column}'")]
    Parse { column: String, value: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Shorthand for [`AnalysisError::InsufficientData`].
    pub fn insufficient(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        AnalysisError::InsufficientData {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumn(_) => "MISSING_COLUMN",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error comes from the shape of the table rather than its values.
    pub fn is_structural(&self) -> bool {
        match self {
            Self::MissingColumn(_) => true,
            Self::WithContext { source, .. } => source.is_structural(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            AnalysisError::MissingColumn("price".to_string()).error_code(),
            "MISSING_COLUMN"
        );
        assert_eq!(
            AnalysisError::insufficient("median", "no values").error_code(),
            "INSUFFICIENT_DATA"
        );
    }

    #[test]
    fn test_missing_column_names_column() {
        let error = AnalysisError::MissingColumn("engine_displacement".to_string());
        assert!(error.to_string().contains("engine_displacement"));
    }

    #[test]
    fn test_is_structural() {
        assert!(AnalysisError::MissingColumn("city".to_string()).is_structural());
        assert!(
            AnalysisError::MissingColumn("city".to_string())
                .with_context("Grouping by city")
                .is_structural()
        );
        assert!(!AnalysisError::insufficient("median", "empty").is_structural());
    }

    #[test]
    fn test_error_serialization() {
        let error = AnalysisError::MissingColumn("tags".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("MISSING_COLUMN"));
        assert!(json.contains("tags"));
    }

    #[test]
    fn test_with_context() {
        let error = AnalysisError::insufficient("second most expensive", "one price")
            .with_context("During report");
        assert!(error.to_string().contains("During report"));
        assert_eq!(error.error_code(), "INSUFFICIENT_DATA");
    }
}
