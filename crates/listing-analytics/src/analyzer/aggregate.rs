//! Read-only questions answered over a listing table.

use crate::error::{AnalysisError, Result};
use crate::table::{ListingTable, columns};
use crate::types::{CityActivityCounts, SecondMostExpensive, WarrantyConsistency};
use crate::utils::{numeric_values, string_values};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

const ROW_INDEX: &str = "__listing_row";

/// Rows that exactly repeat an earlier row across every column.
///
/// The first occurrence of each group is kept out of the result; missing
/// values compare equal to each other.
pub fn find_duplicates(table: &ListingTable) -> Result<DataFrame> {
    let df = table.frame();
    if df.height() == 0 || df.width() == 0 {
        return Ok(df.clear());
    }

    let data_columns: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .map(str::to_string)
        .collect();
    let first_occurrences = df
        .with_row_index(ROW_INDEX.into(), None)?
        .unique_stable(Some(data_columns.as_slice()), UniqueKeepStrategy::First, None)?;

    let mut is_repeat = vec![true; df.height()];
    for row in first_occurrences
        .column(ROW_INDEX)?
        .as_materialized_series()
        .idx()?
        .into_no_null_iter()
    {
        is_repeat[row as usize] = false;
    }

    let mask = BooleanChunked::from_slice("duplicated".into(), &is_repeat);
    Ok(df.filter(&mask)?)
}

/// Fail on a table with no rows, for operations whose answer would
/// otherwise be an empty map.
fn ensure_rows(table: &ListingTable, operation: &str) -> Result<()> {
    if table.height() == 0 {
        return Err(AnalysisError::insufficient(operation, "the table has no rows"));
    }
    Ok(())
}

/// Compare how many titles mention the warranty keyword (case-insensitive)
/// with how many rows carry exactly the warranty tag.
pub fn check_warranty_consistency(
    table: &ListingTable,
    warranty_tag: &str,
    warranty_keyword: &str,
) -> Result<WarrantyConsistency> {
    table.require(&[columns::TITLE, columns::TAGS])?;
    let titles = string_values(table.series(columns::TITLE)?)?;
    let tags = string_values(table.series(columns::TAGS)?)?;

    let keyword = warranty_keyword.to_uppercase();
    let title_mentions = titles
        .iter()
        .flatten()
        .filter(|title| title.to_uppercase().contains(&keyword))
        .count();
    let tagged = tags
        .iter()
        .flatten()
        .filter(|tag| tag.as_str() == warranty_tag)
        .count();

    Ok(WarrantyConsistency {
        title_mentions,
        tagged,
        consistent: title_mentions == tagged,
    })
}

/// Titles of the listings priced at position `len - 2` of the ascending
/// price list.
///
/// Equal prices are counted individually, so when the maximum price is
/// shared by several rows the answer is that same maximum.
pub fn second_most_expensive(table: &ListingTable) -> Result<SecondMostExpensive> {
    table.require(&[columns::PRICE, columns::TITLE])?;
    let prices = numeric_values(table.series(columns::PRICE)?)?;
    let titles = string_values(table.series(columns::TITLE)?)?;

    let mut sorted: Vec<f64> = prices.iter().flatten().copied().collect();
    if sorted.len() < 2 {
        return Err(AnalysisError::insufficient(
            "second most expensive",
            format!("need at least 2 prices, found {}", sorted.len()),
        ));
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let price = sorted[sorted.len() - 2];

    let mut matching_titles = Vec::new();
    for (row, (row_price, title)) in prices.iter().zip(&titles).enumerate() {
        if *row_price != Some(price) {
            continue;
        }
        match title {
            Some(title) => matching_titles.push(title.clone()),
            None => debug!("Row {} matches price {} but has no title", row, price),
        }
    }

    Ok(SecondMostExpensive {
        price,
        titles: matching_titles,
    })
}

/// Number of listings per make. Rows without a make are not counted.
///
/// An empty table, or one where no row has a make, is `InsufficientData`.
pub fn count_by_make(table: &ListingTable) -> Result<BTreeMap<String, usize>> {
    let makes = string_values(table.series(columns::MAKE)?)?;
    ensure_rows(table, "count by make")?;

    let mut counts = BTreeMap::new();
    for make in makes.into_iter().flatten() {
        *counts.entry(make).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Err(AnalysisError::insufficient(
            "count by make",
            "no row has a make",
        ));
    }
    Ok(counts)
}

/// Lowest price seen per make; one entry per distinct make.
///
/// A make whose rows carry no price maps to `None`. An empty table, or one
/// where no row has a make, is `InsufficientData`.
pub fn cheapest_per_make(table: &ListingTable) -> Result<BTreeMap<String, Option<f64>>> {
    table.require(&[columns::MAKE, columns::PRICE])?;
    let makes = string_values(table.series(columns::MAKE)?)?;
    let prices = numeric_values(table.series(columns::PRICE)?)?;
    ensure_rows(table, "cheapest per make")?;

    let mut cheapest: BTreeMap<String, Option<f64>> = BTreeMap::new();
    for (make, price) in makes.into_iter().zip(prices) {
        let Some(make) = make else { continue };
        let lowest = cheapest.entry(make).or_insert(None);
        if let Some(price) = price {
            *lowest = Some(lowest.map_or(price, |current| current.min(price)));
        }
    }
    if cheapest.is_empty() {
        return Err(AnalysisError::insufficient(
            "cheapest per make",
            "no row has a make",
        ));
    }
    Ok(cheapest)
}

/// Count each distinct `active` value per city, ignoring rows where either
/// field is missing.
///
/// Fails with `InsufficientData` when no row is left to count.
pub fn active_counts_by_city(table: &ListingTable) -> Result<CityActivityCounts> {
    table.require(&[columns::CITY, columns::ACTIVE])?;
    let cities = string_values(table.series(columns::CITY)?)?;
    let actives = string_values(table.series(columns::ACTIVE)?)?;
    ensure_rows(table, "active counts by city")?;

    let mut counts = CityActivityCounts::new();
    let mut dropped = 0usize;
    for (city, active) in cities.into_iter().zip(actives) {
        match (city, active) {
            (Some(city), Some(active)) => {
                *counts.entry(city).or_default().entry(active).or_insert(0) += 1;
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("Dropped {} rows with missing city or active flag", dropped);
    }
    if counts.is_empty() {
        return Err(AnalysisError::insufficient(
            "active counts by city",
            format!("all {} rows lack a city or active flag", dropped),
        ));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::derive::derive_recency;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn priced(titles: &[&str], prices: &[f64]) -> ListingTable {
        ListingTable::new(
            df![
                "title" => titles,
                "price" => prices,
            ]
            .unwrap(),
        )
    }

    #[test]
    fn test_find_duplicates_none() {
        let table = ListingTable::new(
            df![
                "make" => ["Ford", "Audi", "BMW"],
                "price" => [1.0, 2.0, 3.0],
            ]
            .unwrap(),
        );
        assert_eq!(find_duplicates(&table).unwrap().height(), 0);
    }

    #[test]
    fn test_find_duplicates_excludes_first_occurrence() {
        let table = ListingTable::new(
            df![
                "make" => ["Ford", "Audi", "Ford", "Ford"],
                "price" => [1.0, 2.0, 1.0, 1.0],
            ]
            .unwrap(),
        );
        let dups = find_duplicates(&table).unwrap();
        assert_eq!(dups.height(), 2);
        let makes = string_values(dups.column("make").unwrap().as_materialized_series()).unwrap();
        assert_eq!(makes, vec![Some("Ford".to_string()), Some("Ford".to_string())]);
    }

    #[test]
    fn test_find_duplicates_requires_full_row_match() {
        let table = ListingTable::new(
            df![
                "make" => ["Ford", "Ford"],
                "price" => [1.0, 2.0],
            ]
            .unwrap(),
        );
        assert_eq!(find_duplicates(&table).unwrap().height(), 0);
    }

    #[test]
    fn test_find_duplicates_missing_values_match() {
        let table = ListingTable::new(
            df![
                "make" => [Some("Ford"), Some("Ford")],
                "engine_displacement" => [Option::<f64>::None, None],
            ]
            .unwrap(),
        );
        assert_eq!(find_duplicates(&table).unwrap().height(), 1);
    }

    #[test]
    fn test_find_duplicates_with_duration_column() {
        let mut table = ListingTable::new(
            df![
                "make" => ["Ford", "Ford", "Audi"],
                "updated_at" => ["2024-03-10 08:00:00", "2024-03-10 08:00:00", "2024-03-01"],
            ]
            .unwrap(),
        );
        let anchor = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        derive_recency(&mut table, anchor).unwrap();

        let dups = find_duplicates(&table).unwrap();
        assert_eq!(dups.height(), 1);
        assert_eq!(dups.width(), 3);
        assert!(dups.column("recency").is_ok());
    }

    #[test]
    fn test_find_duplicates_empty_table() {
        let table = ListingTable::new(df!["make" => Vec::<String>::new()].unwrap());
        let dups = find_duplicates(&table).unwrap();
        assert_eq!(dups.height(), 0);
        assert_eq!(dups.width(), 1);
    }

    #[test]
    fn test_warranty_consistency_counts() {
        let table = ListingTable::new(
            df![
                "title" => [Some("Ford Focus WARRANTY"), Some("Audi A3 warranty"), Some("BMW"), None],
                "tags" => [Some("{under_warranty}"), Some("{other}"), Some("{under_warranty}"), None],
            ]
            .unwrap(),
        );
        let result = check_warranty_consistency(&table, "{under_warranty}", "WARRANTY").unwrap();
        assert_eq!(result.title_mentions, 2);
        assert_eq!(result.tagged, 2);
        assert!(result.consistent);
    }

    #[test]
    fn test_warranty_consistency_mismatch() {
        let table = ListingTable::new(
            df![
                "title" => ["Ford Focus Warranty", "Audi A3"],
                "tags" => ["{}", "{}"],
            ]
            .unwrap(),
        );
        let result = check_warranty_consistency(&table, "{under_warranty}", "WARRANTY").unwrap();
        assert!(!result.consistent);
    }

    #[test]
    fn test_warranty_consistency_missing_tags_column() {
        let table = ListingTable::new(df!["title" => ["Ford"]].unwrap());
        let err = check_warranty_consistency(&table, "{under_warranty}", "WARRANTY").unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn(ref c) if c == "tags"));
    }

    #[test]
    fn test_second_most_expensive_tied_maximum() {
        let table = priced(&["a", "b", "c", "d"], &[10.0, 30.0, 30.0, 5.0]);
        let result = second_most_expensive(&table).unwrap();
        assert_eq!(result.price, 30.0);
        assert_eq!(result.titles, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_second_most_expensive_distinct_prices() {
        let table = priced(&["a", "b", "c"], &[10.0, 30.0, 20.0]);
        let result = second_most_expensive(&table).unwrap();
        assert_eq!(result.price, 20.0);
        assert_eq!(result.titles, vec!["c".to_string()]);
    }

    #[test]
    fn test_second_most_expensive_insufficient() {
        let empty = priced(&[], &[]);
        assert!(matches!(
            second_most_expensive(&empty).unwrap_err(),
            AnalysisError::InsufficientData { .. }
        ));

        let single = priced(&["a"], &[10.0]);
        assert!(matches!(
            second_most_expensive(&single).unwrap_err(),
            AnalysisError::InsufficientData { .. }
        ));
    }

    #[test]
    fn test_count_by_make() {
        let table = ListingTable::new(df!["make" => ["a", "a", "b"]].unwrap());
        let counts = count_by_make(&table).unwrap();
        assert_eq!(
            counts,
            BTreeMap::from([("a".to_string(), 2), ("b".to_string(), 1)])
        );
    }

    #[test]
    fn test_cheapest_per_make() {
        let table = ListingTable::new(
            df![
                "make" => ["a", "a", "b"],
                "model" => ["x", "y", "z"],
                "price" => [100.0, 50.0, 80.0],
            ]
            .unwrap(),
        );
        let cheapest = cheapest_per_make(&table).unwrap();
        assert_eq!(
            cheapest,
            BTreeMap::from([("a".to_string(), Some(50.0)), ("b".to_string(), Some(80.0))])
        );
    }

    #[test]
    fn test_cheapest_per_make_without_prices() {
        let table = ListingTable::new(
            df![
                "make" => ["a", "b"],
                "price" => [Some(10.0), None],
            ]
            .unwrap(),
        );
        let cheapest = cheapest_per_make(&table).unwrap();
        assert_eq!(cheapest.get("b"), Some(&None));
        assert_eq!(cheapest.get("a"), Some(&Some(10.0)));
    }

    #[test]
    fn test_groupings_on_empty_table() {
        let table = ListingTable::new(
            df![
                "make" => Vec::<String>::new(),
                "price" => Vec::<f64>::new(),
                "city" => Vec::<String>::new(),
                "active" => Vec::<bool>::new(),
            ]
            .unwrap(),
        );
        assert!(matches!(
            count_by_make(&table).unwrap_err(),
            AnalysisError::InsufficientData { .. }
        ));
        assert!(matches!(
            cheapest_per_make(&table).unwrap_err(),
            AnalysisError::InsufficientData { .. }
        ));
        assert!(matches!(
            active_counts_by_city(&table).unwrap_err(),
            AnalysisError::InsufficientData { .. }
        ));
    }

    #[test]
    fn test_groupings_without_keys() {
        let table = ListingTable::new(
            df![
                "make" => [Option::<&str>::None, None],
                "price" => [Some(10.0), Some(20.0)],
                "city" => [Some("Lagos"), None],
                "active" => [None, Some(true)],
            ]
            .unwrap(),
        );
        assert!(count_by_make(&table).is_err());
        assert!(cheapest_per_make(&table).is_err());
        assert!(matches!(
            active_counts_by_city(&table).unwrap_err(),
            AnalysisError::InsufficientData { .. }
        ));
    }

    #[test]
    fn test_count_by_make_missing_column_before_empty_check() {
        let table = ListingTable::new(df!["title" => Vec::<String>::new()].unwrap());
        assert!(matches!(
            count_by_make(&table).unwrap_err(),
            AnalysisError::MissingColumn(ref c) if c == "make"
        ));
    }

    #[test]
    fn test_active_counts_by_city() {
        let table = ListingTable::new(
            df![
                "city" => [Some("Lagos"), Some("Abuja"), Some("Lagos"), None, Some("Lagos")],
                "active" => [Some(true), Some(false), Some(false), Some(true), Some(true)],
            ]
            .unwrap(),
        );
        let counts = active_counts_by_city(&table).unwrap();

        let cities: Vec<&String> = counts.keys().collect();
        assert_eq!(cities, vec!["Abuja", "Lagos"]);
        assert_eq!(counts["Lagos"]["true"], 2);
        assert_eq!(counts["Lagos"]["false"], 1);
        assert_eq!(counts["Abuja"]["false"], 1);
    }
}
