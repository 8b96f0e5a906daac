//! Raw record loading for craftprofit.
//!
//! The data-fetch layer delivers recipe records as a JSON array. This module
//! reads that array from a file or a string and applies the ingredient
//! ordering used for display.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::models::RecipeRecord;

/// Parses a JSON array of recipe records.
///
/// Only the shape is checked here. Missing names or prices are reported by
/// [`ItemGraph::from_records`](crate::graph::ItemGraph::from_records).
///
/// # Example
///
/// ```
/// use craftprofit::data::parse_records;
///
/// let records = parse_records(r#"[{"_id": "r1", "Name": "Plank", "Market Data": {"Market Price": 200}}]"#).unwrap();
/// assert_eq!(records[0].name.as_deref(), Some("Plank"));
/// assert!(records[0].ingredients.is_empty());
/// ```
pub fn parse_records(json: &str) -> Result<Vec<RecipeRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Loads recipe records from a JSON file and sorts their ingredients.
///
/// # Format
///
/// A JSON array shaped like:
///
/// ```text
/// [{"_id": "...", "Name": "...", "Market Data": {"Market Price": 0},
///   "Ingredients": [{"Item Name": "...", "Amount": 1, "Market Data": {...}}],
///   "Quantity Produced": 1, "Time to Produce": 1}]
/// ```
pub fn load_records(path: &Path) -> Result<Vec<RecipeRecord>> {
    let file = File::open(path)?;
    let mut records: Vec<RecipeRecord> = serde_json::from_reader(BufReader::new(file))?;
    sort_ingredients_by_price(&mut records);
    debug!(path = %path.display(), records = records.len(), "loaded recipe records");
    Ok(records)
}

/// Orders every record's ingredients by descending market price.
///
/// Ingredients without a price go last; equal prices keep their order.
pub fn sort_ingredients_by_price(records: &mut [RecipeRecord]) {
    for record in records {
        record.ingredients.sort_by(|a, b| {
            let a_price = a.market_price().unwrap_or(f64::NEG_INFINITY);
            let b_price = b.market_price().unwrap_or(f64::NEG_INFINITY);
            b_price
                .partial_cmp(&a_price)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}
