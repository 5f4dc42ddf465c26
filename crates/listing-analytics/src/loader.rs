//! CSV ingestion for listing tables.

use crate::error::{AnalysisError, Result};
use polars::io::csv::read::{CsvEncoding, CsvReadOptions};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Load a CSV file, retrying with a tolerant read when the strict one fails.
///
/// 1. Strict: header row, `"` quoting, every row matching the inferred schema
/// 2. Tolerant: the content is decoded lossily and cleaned of blank lines and
///    a byte order mark, then read with ragged lines truncated and cells that
///    do not fit their column's type turned into nulls
pub fn load_csv_with_fallbacks(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    if !path.exists() {
        return Err(AnalysisError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Input file not found: {}", path.display()),
        )));
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(infer_schema_length))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            warn!(
                "Strict read of {} failed ({}), retrying tolerant read",
                path.display(),
                e
            );
        }
    }

    match std::fs::read(path) {
        Ok(bytes) => {
            let content = clean_csv_content(&String::from_utf8_lossy(&bytes));
            read_tolerant(content, infer_schema_length)
        }
        Err(e) => {
            error!("Could not read file: {}", e);
            Err(e.into())
        }
    }
}

/// Read CSV text that may carry ragged rows or mistyped cells.
fn read_tolerant(content: String, infer_schema_length: usize) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(infer_schema_length))
        .with_has_header(true)
        .with_ignore_errors(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_encoding(CsvEncoding::LossyUtf8)
                .with_truncate_ragged_lines(true),
        )
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()
        .map_err(AnalysisError::from)
}

/// Drop a leading byte order mark and blank lines. Quoting is left intact.
fn clean_csv_content(content: &str) -> String {
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
