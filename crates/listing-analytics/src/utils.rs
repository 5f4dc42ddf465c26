//! Shared utilities for listing analysis.
//!
//! Helpers for turning polars columns into plain Rust values and for
//! parsing the loosely formatted numbers and timestamps found in listings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is floating point.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Common error/missing value markers in data.
pub const ERROR_MARKERS: [&str; 9] = [
    "error", "unknown", "n/a", "na", "nan", "null", "missing", "none", "#n/a",
];

/// Clean a string for numeric parsing by removing formatting characters.
///
/// ```rust,ignore
/// assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
/// ```
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Check if a string is an error/missing value marker.
pub fn is_error_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    ERROR_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a numeric value (f64).
///
/// Handles currency symbols, percentages and thousands separators.
/// Missing-value markers such as `N/A` yield `None`.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_error_marker(s) {
        return None;
    }
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Trailing zone designators chrono cannot parse by name.
static UTC_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(UTC|GMT|Z)$").expect("Invalid regex: UTC suffix"));

// `%#z` accepts `+00`, `+0000` and `+00:00`, with or without a leading space.
const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a listing timestamp into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD[ T]HH:MM:SS[.fff]` with an optional
/// `UTC`/`Z` suffix or a numeric offset in hours (`+00`, `+0000`, `+00:00`),
/// and bare dates (taken as midnight UTC).
/// Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive_part = UTC_SUFFIX.replace(trimmed, "");
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&naive_part, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&naive_part, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a timestamp that must be present, failing with
/// [`AnalysisError::Parse`](crate::error::AnalysisError::Parse).
pub fn require_timestamp(field: &str, raw: &str) -> crate::error::Result<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| crate::error::AnalysisError::Parse {
        column: field.to_string(),
        value: raw.to_string(),
    })
}

// =============================================================================
// Series Extraction Utilities
// =============================================================================

/// Render a float without a trailing `.0` when it holds a whole number.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Collect a Series as optional strings, preserving nulls.
///
/// Float columns render whole numbers without decimals so that a `year`
/// read as `2015.0` prints as `2015`. Durations render as their integer
/// count of time units.
pub fn string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    if matches!(series.dtype(), DataType::Duration(_)) {
        return string_values(&series.cast(&DataType::Int64)?);
    }
    if is_float_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect());
    }

    let as_str = series.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Collect a Series as optional f64 values.
///
/// Numeric columns are cast directly; string columns are parsed value by
/// value and anything unparseable becomes `None`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        let floats = series.cast(&DataType::Float64)?;
        return Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect());
    }

    let as_str = series.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_numeric_string))
        .collect())
}

/// Collect a Series as optional UTC timestamps.
///
/// Native datetime columns are rendered to text first, so both typed and
/// textual timestamps go through [`parse_timestamp`].
pub fn timestamp_values(series: &Series) -> PolarsResult<Vec<Option<DateTime<Utc>>>> {
    Ok(string_values(series)?
        .into_iter()
        .map(|v| v.as_deref().and_then(parse_timestamp))
        .collect())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(values: &[Option<f64>], name: &str, fill_value: f64) -> Series {
    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(fill_value)).collect();
    Series::new(name.into(), filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_clean_numeric_string() {
        assert_eq!(clean_numeric_string("$1,234.56"), "1234.56");
        assert_eq!(clean_numeric_string("€100"), "100");
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("1.6"), Some(1.6));
        assert_eq!(parse_numeric_string("$12,500"), Some(12500.0));
        assert_eq!(parse_numeric_string("N/A"), None);
        assert_eq!(parse_numeric_string("nan"), None);
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_numeric_string("big"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2020-01-15T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-15 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-15 10:30:00 UTC"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-15 12:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2020-01-15"),
            Some(Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_fractional_seconds() {
        let parsed = parse_timestamp("2019-12-02 17:39:51.484 UTC").unwrap();
        assert_eq!(parsed.timestamp(), 1_575_308_391);
    }

    #[test]
    fn test_parse_timestamp_offset_forms() {
        let expected = Utc.with_ymd_and_hms(2019, 12, 2, 17, 39, 51).unwrap();
        for raw in [
            "2019-12-02 17:39:51+00",
            "2019-12-02 17:39:51+0000",
            "2019-12-02 17:39:51 +0000",
            "2019-12-02T17:39:51+00:00",
            "2019-12-02 19:39:51+02",
            "2019-12-02T12:39:51-0500",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{}", raw);
        }
    }

    #[test]
    fn test_parse_timestamp_offset_with_fraction() {
        for raw in [
            "2019-12-02 17:39:51.484+00",
            "2019-12-02T17:39:51.484+0000",
        ] {
            let parsed = parse_timestamp(raw).unwrap();
            assert_eq!(parsed.timestamp(), 1_575_308_391, "{}", raw);
            assert_eq!(parsed.timestamp_subsec_millis(), 484, "{}", raw);
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2020-13-45 99:00:00"), None);
    }

    #[test]
    fn test_require_timestamp() {
        assert!(require_timestamp("reference_date", "2024-01-01").is_ok());
        let err = require_timestamp("reference_date", "soon").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2015.0), "2015");
        assert_eq!(format_number(1.6), "1.6");
    }

    #[test]
    fn test_string_values_renders_whole_floats() {
        let series = Series::new("year".into(), &[Some(2015.0), None, Some(2018.0)]);
        let values = string_values(&series).unwrap();
        assert_eq!(
            values,
            vec![Some("2015".to_string()), None, Some("2018".to_string())]
        );
    }

    #[test]
    fn test_string_values_of_duration() {
        let series = Series::new("recency".into(), &[Some(86_400_000i64), None])
            .cast(&DataType::Duration(TimeUnit::Milliseconds))
            .unwrap();
        let values = string_values(&series).unwrap();
        assert_eq!(values, vec![Some("86400000".to_string()), None]);
    }

    #[test]
    fn test_numeric_values_from_strings() {
        let series = Series::new("price".into(), &[Some("12,000"), Some("oops"), None]);
        let values = numeric_values(&series).unwrap();
        assert_eq!(values, vec![Some(12000.0), None, None]);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let filled = fill_numeric_nulls(&[Some(1.0), None, Some(3.0)], "test", 2.0);
        let values: Vec<f64> = filled.f64().unwrap().into_no_null_iter().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }
}
