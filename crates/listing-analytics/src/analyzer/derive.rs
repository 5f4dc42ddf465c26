//! Derived columns appended to a listing table.
//!
//! Every function that appends a column takes `&mut ListingTable` and
//! checks its inputs before touching the table, so a missing column leaves
//! the table unchanged. Values that fail to parse become missing values in
//! the derived column.

use crate::error::Result;
use crate::table::{ListingTable, columns};
use crate::types::RecencySummary;
use crate::utils::{parse_timestamp, string_values, timestamp_values};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use tracing::debug;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Append `under warranty`: `YES` when `tags` equals `warranty_tag`, else `NO`.
///
/// Returns the number of `YES` rows. Running it again overwrites the column
/// with the same values.
pub fn derive_warranty_flag(table: &mut ListingTable, warranty_tag: &str) -> Result<usize> {
    let tags = string_values(table.series(columns::TAGS)?)?;

    let flags: Vec<&str> = tags
        .iter()
        .map(|tag| match tag.as_deref() {
            Some(tag) if tag == warranty_tag => "YES",
            _ => "NO",
        })
        .collect();
    let under_warranty = flags.iter().filter(|flag| **flag == "YES").count();

    table.put_column(Series::new(columns::UNDER_WARRANTY.into(), flags))?;
    Ok(under_warranty)
}

/// Append `sanity_check` = `updated_at > created_at` and report whether it
/// holds for every row.
///
/// Equal timestamps, and rows where either timestamp does not parse, are
/// flagged `false`. An empty table passes.
pub fn sanity_check_timestamps(table: &mut ListingTable) -> Result<bool> {
    table.require(&[columns::CREATED_AT, columns::UPDATED_AT])?;
    let created = timestamp_values(table.series(columns::CREATED_AT)?)?;
    let updated = timestamp_values(table.series(columns::UPDATED_AT)?)?;

    let checks: Vec<bool> = created
        .iter()
        .zip(&updated)
        .map(|pair| match pair {
            (Some(created), Some(updated)) => updated > created,
            _ => false,
        })
        .collect();
    let all_sane = checks.iter().all(|ok| *ok);

    table.put_column(Series::new(columns::SANITY_CHECK.into(), checks))?;
    Ok(all_sane)
}

/// Append `recency` = `anchor` minus `updated_at`, as a millisecond duration.
///
/// Rows whose `updated_at` does not parse get a missing recency.
pub fn derive_recency(table: &mut ListingTable, anchor: DateTime<Utc>) -> Result<RecencySummary> {
    let raw_values = string_values(table.series(columns::UPDATED_AT)?)?;

    let mut recency_ms: Vec<Option<i64>> = Vec::with_capacity(raw_values.len());
    for (row, raw) in raw_values.iter().enumerate() {
        let Some(raw) = raw.as_deref() else {
            recency_ms.push(None);
            continue;
        };
        match parse_timestamp(raw) {
            Some(ts) => recency_ms.push(Some((anchor - ts).num_milliseconds())),
            None => {
                debug!("Row {}: could not parse updated_at '{}'", row, raw);
                recency_ms.push(None);
            }
        }
    }

    let days: Vec<i64> = recency_ms
        .iter()
        .flatten()
        .map(|ms| ms.div_euclid(MILLIS_PER_DAY))
        .collect();
    let summary = RecencySummary {
        missing: recency_ms.iter().filter(|v| v.is_none()).count(),
        min_days: days.iter().min().copied(),
        max_days: days.iter().max().copied(),
    };

    let recency = Series::new(columns::RECENCY.into(), recency_ms)
        .cast(&DataType::Duration(TimeUnit::Milliseconds))?;
    table.put_column(recency)?;
    Ok(summary)
}

/// Convert a `recency` duration column into whole elapsed days.
pub fn recency_in_days(recency: &Series) -> Result<Series> {
    let millis = recency.cast(&DataType::Int64)?;
    let days: Vec<Option<i64>> = millis
        .i64()?
        .into_iter()
        .map(|v| v.map(|ms| ms.div_euclid(MILLIS_PER_DAY)))
        .collect();
    Ok(Series::new(recency.name().clone(), days))
}

/// For each row whose title contains its make, the title with the first
/// occurrence of the make removed.
///
/// Rows that fail the test, or lack a make or title, produce no entry, so
/// the result can be shorter than the table.
pub fn extract_submodel(table: &ListingTable) -> Result<Vec<String>> {
    table.require(&[columns::MAKE, columns::TITLE])?;
    let makes = string_values(table.series(columns::MAKE)?)?;
    let titles = string_values(table.series(columns::TITLE)?)?;

    let mut submodels = Vec::new();
    let mut skipped = 0usize;
    for (make, title) in makes.iter().zip(&titles) {
        match (make, title) {
            (Some(make), Some(title)) if title.contains(make.as_str()) => {
                submodels.push(title.replacen(make.as_str(), "", 1));
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("{} rows have no make in their title", skipped);
    }
    Ok(submodels)
}

/// Append `unique id` = `make model year city created_at` joined by single
/// spaces. A missing component gives a missing id.
pub fn build_unique_id(table: &mut ListingTable) -> Result<usize> {
    let parts = [
        columns::MAKE,
        columns::MODEL,
        columns::YEAR,
        columns::CITY,
        columns::CREATED_AT,
    ];
    table.require(&parts)?;

    let mut part_values = Vec::with_capacity(parts.len());
    for name in parts {
        part_values.push(string_values(table.series(name)?)?);
    }

    let ids: Vec<Option<String>> = (0..table.height())
        .map(|row| {
            part_values
                .iter()
                .map(|values| values[row].as_deref())
                .collect::<Option<Vec<&str>>>()
                .map(|fields| fields.join(" "))
        })
        .collect();
    let missing = ids.iter().filter(|id| id.is_none()).count();

    table.put_column(Series::new(columns::UNIQUE_ID.into(), ids))?;
    Ok(missing)
}
