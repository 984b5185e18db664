//! CSV loader for coffeeshop inspection records.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// A single coffeeshop inspection row.
///
/// Header names follow the source tables exactly: the zipcode column is
/// `zip_code` in the coffeeshop export and `ZIPCODE` in the inspection
/// export, and a joined table may carry both. Empty cells deserialize to
/// `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoffeeshopRecord {
    #[serde(default, deserialize_with = "deserialize_zip")]
    pub zip_code: Option<u32>,
    #[serde(rename = "ZIPCODE", default, deserialize_with = "deserialize_zip")]
    pub zipcode: Option<u32>,
    pub rating: Option<f64>,
    #[serde(rename = "SCORE")]
    pub score: Option<f64>,
    pub total_reviews: Option<f64>,
    #[serde(rename = "VIOLATION_DESCRIPTION", default)]
    pub violation_description: String,
}

impl CoffeeshopRecord {
    /// The row's zipcode, preferring the inspection `ZIPCODE` column.
    pub fn zip(&self) -> Option<u32> {
        self.zipcode.or(self.zip_code)
    }
}

/// Reads a zipcode cell written either as `10001` or as `10001.0`.
/// Blank and `NaN` cells are `None`.
fn deserialize_zip<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(zip) = trimmed.parse::<u32>() {
        return Ok(Some(zip));
    }

    match trimmed.parse::<f64>() {
        Ok(n) if n.is_nan() => Ok(None),
        Ok(n) if n.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&n) => Ok(Some(n as u32)),
        _ => Err(D::Error::custom(format!("invalid zipcode '{}'", trimmed))),
    }
}

/// Reads all records from the CSV file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row does not match
/// [`CoffeeshopRecord`].
#[tracing::instrument(skip_all, fields(path = %path.display()))]
pub fn load_records(path: &Path) -> Result<Vec<CoffeeshopRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open records CSV: {}", path.display()))?;
    let records = parse_records(file)
        .with_context(|| format!("Failed to parse records CSV: {}", path.display()))?;

    info!(rows = records.len(), "Records loaded");
    Ok(records)
}

/// Deserializes records from any CSV source with a header row.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<CoffeeshopRecord>> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for (row, result) in rdr.deserialize().enumerate() {
        let record: CoffeeshopRecord =
            result.with_context(|| format!("Invalid record at data row {}", row + 1))?;
        records.push(record);
    }

    debug!(rows = records.len(), "Parsed CSV rows");
    Ok(records)
}
